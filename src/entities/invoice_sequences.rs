use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Transactionally-guarded counter backing invoice numbering, one row per
/// invoice type. `next_number` is the number the next invoice will take;
/// reads and bumps happen inside the invoice-create transaction.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "invoice_sequences")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub invoice_type: String,
    pub next_number: i64,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
