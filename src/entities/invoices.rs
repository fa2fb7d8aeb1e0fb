use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Whether the invoice records stock received (buying) or stock sold (selling).
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum InvoiceType {
    #[sea_orm(string_value = "buying")]
    Buying,
    #[sea_orm(string_value = "selling")]
    Selling,
}

impl InvoiceType {
    /// Invoice-number prefix for this type.
    pub fn prefix(&self) -> &'static str {
        match self {
            InvoiceType::Buying => "BIL",
            InvoiceType::Selling => "SIL",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceType::Buying => "buying",
            InvoiceType::Selling => "selling",
        }
    }
}

/// Invoice lifecycle. Draft is the only editable state; paid and cancelled
/// are terminal.
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    #[sea_orm(string_value = "draft")]
    Draft,
    #[sea_orm(string_value = "finalized")]
    Finalized,
    #[sea_orm(string_value = "paid")]
    Paid,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

impl InvoiceStatus {
    /// draft -> finalized -> paid, plus cancellation from any non-terminal
    /// state. Terminal states accept nothing.
    pub fn can_transition_to(self, next: InvoiceStatus) -> bool {
        use InvoiceStatus::*;
        matches!(
            (self, next),
            (Draft, Finalized) | (Finalized, Paid) | (Draft, Cancelled) | (Finalized, Cancelled)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, InvoiceStatus::Paid | InvoiceStatus::Cancelled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Draft => "draft",
            InvoiceStatus::Finalized => "finalized",
            InvoiceStatus::Paid => "paid",
            InvoiceStatus::Cancelled => "cancelled",
        }
    }
}

/// Settled invoice record. Money fields are always derived server-side;
/// `total` is an integral rupee value and `round_off` the signed adjustment
/// that made it so. Immutable outside draft except for status transitions.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[schema(as = Invoice)]
#[sea_orm(table_name = "invoices")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    /// Sequential per-type number, e.g. `SIL-042`.
    #[sea_orm(unique)]
    pub invoice_number: String,
    pub invoice_type: InvoiceType,
    pub invoice_date: Date,
    pub status: InvoiceStatus,
    pub sender_name: String,
    pub sender_address: String,
    pub sender_gstin: String,
    pub sender_contact: String,
    pub receiver_name: String,
    pub receiver_address: String,
    pub receiver_gstin: String,
    pub receiver_contact: String,
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub subtotal: Decimal,
    #[sea_orm(column_type = "Decimal(Some((5, 2)))")]
    pub cgst_rate: Decimal,
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub cgst_amount: Decimal,
    #[sea_orm(column_type = "Decimal(Some((5, 2)))")]
    pub sgst_rate: Decimal,
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub sgst_amount: Decimal,
    #[sea_orm(column_type = "Decimal(Some((5, 2)))")]
    pub igst_rate: Decimal,
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub igst_amount: Decimal,
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub round_off: Decimal,
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub total: Decimal,
    pub total_in_words: String,
    pub notes: Option<String>,
    /// True once inventory deltas for this invoice fully applied; terminal.
    pub inventory_synced: bool,
    /// Last per-item sync report, absent until a sync has run.
    pub sync_outcome: Option<Json>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::invoice_items::Entity")]
    InvoiceItems,
}

impl Related<super::invoice_items::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::InvoiceItems.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
