use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, DatabaseTransaction,
    EntityTrait, QueryFilter, QueryOrder, SqlErr, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    auth::{BusinessIdentity, IdentityProvider},
    entities::{
        invoice_items::{self, Entity as InvoiceItems},
        invoices::{self, Entity as Invoices, InvoiceStatus, InvoiceType},
        products::Entity as Products,
    },
    errors::{FieldError, ServiceError},
    events::{Event, EventSender},
    money::{self, TaxBreakdown},
    services::inventory_sync::{InventorySyncResult, InventorySyncService},
    services::sequencer::InvoiceNumberSequencer,
    words,
};

/// Retries for the create transaction when a concurrent create of the same
/// type wins the invoice-number race.
const CREATE_MAX_ATTEMPTS: usize = 3;

/// Counterparty identity block, the non-business side of the invoice.
#[derive(Debug, Clone, Deserialize, Serialize, Validate, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct PartyInput {
    #[validate(length(min = 1, message = "must not be empty"))]
    pub name: String,
    #[validate(length(min = 1, message = "must not be empty"))]
    pub address: String,
    #[validate(length(min = 1, message = "must not be empty"))]
    pub gstin: String,
    #[validate(length(min = 1, message = "must not be empty"))]
    pub contact: String,
}

/// One requested line. The amount is never accepted from the client; it is
/// derived from quantity, rate, and discount on the server.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct InvoiceItemInput {
    pub product_id: Uuid,
    pub quantity: Decimal,
    pub rate: Decimal,
    #[serde(default)]
    pub discount_percent: Decimal,
    pub hsn_code: Option<String>,
    /// Buying invoices only: updated pricing to propagate onto the product.
    pub mrp: Option<Decimal>,
    pub selling_price: Option<Decimal>,
    pub wholesale_price: Option<Decimal>,
}

/// Strictly-typed settlement request; unknown fields are rejected at the
/// deserialization boundary.
#[derive(Debug, Clone, Deserialize, Serialize, Validate, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct SettleInvoiceInput {
    pub invoice_type: InvoiceType,
    pub invoice_date: NaiveDate,
    #[validate]
    pub counterparty: PartyInput,
    #[validate(length(min = 1, message = "at least one item is required"))]
    pub items: Vec<InvoiceItemInput>,
    pub cgst_rate: Decimal,
    pub sgst_rate: Decimal,
    pub igst_rate: Decimal,
    pub notes: Option<String>,
    #[serde(default)]
    pub sync_inventory: bool,
}

/// A settled invoice with its ordered lines and, when requested, the
/// inventory sync report.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SettledInvoice {
    pub invoice: invoices::Model,
    pub items: Vec<invoice_items::Model>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inventory_sync: Option<InventorySyncResult>,
}

/// Derived money fields and product lookups, computed once per settlement.
struct ComputedInvoice {
    product_names: Vec<String>,
    amounts: Vec<Decimal>,
    breakdown: TaxBreakdown,
    total_in_words: String,
}

/// Orchestrates invoice settlement: validation, money derivation, numbering,
/// transactional persistence, and optional post-commit inventory sync.
#[derive(Clone)]
pub struct InvoiceSettlementService {
    db: Arc<DatabaseConnection>,
    identity: Arc<dyn IdentityProvider>,
    inventory_sync: InventorySyncService,
    event_sender: Option<EventSender>,
}

impl InvoiceSettlementService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        identity: Arc<dyn IdentityProvider>,
        inventory_sync: InventorySyncService,
        event_sender: Option<EventSender>,
    ) -> Self {
        Self {
            db,
            identity,
            inventory_sync,
            event_sender,
        }
    }

    /// Create and settle a new invoice. The invoice and its items commit in
    /// one transaction; inventory sync runs after the commit and its failure
    /// is reported, never unwound.
    #[instrument(skip(self, input), fields(invoice_type = input.invoice_type.as_str()))]
    pub async fn create_invoice(
        &self,
        input: SettleInvoiceInput,
    ) -> Result<SettledInvoice, ServiceError> {
        input.validate()?;
        validate_money_fields(&input)?;

        let computed = self.compute(&input).await?;
        let business = self.identity.business_identity();
        let invoice_id = Uuid::new_v4();

        let mut attempt = 0;
        let invoice = loop {
            attempt += 1;
            let txn = self.db.begin().await?;
            match self
                .persist_invoice(&txn, invoice_id, &input, &computed, &business)
                .await
            {
                Ok(invoice) => match txn.commit().await {
                    Ok(()) => break invoice,
                    Err(e) if is_unique_violation(&e) && attempt < CREATE_MAX_ATTEMPTS => {
                        warn!(attempt, "invoice number race lost at commit, retrying");
                        continue;
                    }
                    Err(e) => return Err(e.into()),
                },
                Err(ServiceError::DatabaseError(e))
                    if is_unique_violation(&e) && attempt < CREATE_MAX_ATTEMPTS =>
                {
                    let _ = txn.rollback().await;
                    warn!(attempt, "invoice number race lost, retrying");
                    continue;
                }
                Err(other) => {
                    let _ = txn.rollback().await;
                    return Err(other);
                }
            }
        };

        info!(invoice_number = %invoice.invoice_number, "invoice settled");
        if let Some(sender) = &self.event_sender {
            sender
                .send(Event::InvoiceSettled {
                    invoice_id,
                    invoice_number: invoice.invoice_number.clone(),
                    total: invoice.total,
                })
                .await;
        }

        let inventory_sync = if input.sync_inventory {
            Some(self.run_post_commit_sync(invoice_id).await)
        } else {
            None
        };

        // Re-read so the returned invoice reflects any sync bookkeeping.
        let (invoice, items) = self.get_invoice(invoice_id).await?;
        Ok(SettledInvoice {
            invoice,
            items,
            inventory_sync,
        })
    }

    /// Corrective edit of a draft invoice: the full settlement computation
    /// re-runs and the items are replaced; totals are never patched in place.
    #[instrument(skip(self, input), fields(%invoice_id))]
    pub async fn update_invoice(
        &self,
        invoice_id: Uuid,
        input: SettleInvoiceInput,
    ) -> Result<SettledInvoice, ServiceError> {
        input.validate()?;
        validate_money_fields(&input)?;

        let existing = Invoices::find_by_id(invoice_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("invoice {} not found", invoice_id)))?;

        if existing.status != InvoiceStatus::Draft {
            return Err(ServiceError::InvalidOperation(format!(
                "invoice {} is {}; only draft invoices can be edited",
                existing.invoice_number,
                existing.status.as_str()
            )));
        }
        if input.invoice_type != existing.invoice_type {
            return Err(ServiceError::field(
                "invoice_type",
                "invoice type cannot be changed after creation",
            ));
        }

        let computed = self.compute(&input).await?;
        let business = self.identity.business_identity();
        let (sender, receiver) = resolve_parties(input.invoice_type, &business, &input.counterparty);

        let txn = self.db.begin().await?;

        InvoiceItems::delete_many()
            .filter(invoice_items::Column::InvoiceId.eq(invoice_id))
            .exec(&txn)
            .await?;
        insert_items(&txn, invoice_id, &input.items, &computed).await?;

        let mut active: invoices::ActiveModel = existing.into();
        active.invoice_date = Set(input.invoice_date);
        active.sender_name = Set(sender.name);
        active.sender_address = Set(sender.address);
        active.sender_gstin = Set(sender.gstin);
        active.sender_contact = Set(sender.contact);
        active.receiver_name = Set(receiver.name);
        active.receiver_address = Set(receiver.address);
        active.receiver_gstin = Set(receiver.gstin);
        active.receiver_contact = Set(receiver.contact);
        active.subtotal = Set(computed.breakdown.subtotal);
        active.cgst_rate = Set(input.cgst_rate);
        active.cgst_amount = Set(computed.breakdown.cgst_amount);
        active.sgst_rate = Set(input.sgst_rate);
        active.sgst_amount = Set(computed.breakdown.sgst_amount);
        active.igst_rate = Set(input.igst_rate);
        active.igst_amount = Set(computed.breakdown.igst_amount);
        active.round_off = Set(computed.breakdown.round_off);
        active.total = Set(computed.breakdown.total);
        active.total_in_words = Set(computed.total_in_words.clone());
        active.notes = Set(input.notes.clone());
        active.sync_outcome = Set(None);
        active.updated_at = Set(Utc::now());
        let invoice = active.update(&txn).await?;

        txn.commit().await?;
        info!(invoice_number = %invoice.invoice_number, "invoice re-settled");

        let (invoice, items) = self.get_invoice(invoice_id).await?;
        Ok(SettledInvoice {
            invoice,
            items,
            inventory_sync: None,
        })
    }

    /// Enforce the invoice status state machine.
    #[instrument(skip(self), fields(%invoice_id, new_status = new_status.as_str()))]
    pub async fn transition_status(
        &self,
        invoice_id: Uuid,
        new_status: InvoiceStatus,
    ) -> Result<invoices::Model, ServiceError> {
        let invoice = Invoices::find_by_id(invoice_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("invoice {} not found", invoice_id)))?;

        let old_status = invoice.status;
        if !old_status.can_transition_to(new_status) {
            return Err(ServiceError::InvalidStatus(format!(
                "{} -> {} is not allowed",
                old_status.as_str(),
                new_status.as_str()
            )));
        }

        let mut active: invoices::ActiveModel = invoice.into();
        active.status = Set(new_status);
        active.updated_at = Set(Utc::now());
        let updated = active.update(&*self.db).await?;

        if let Some(sender) = &self.event_sender {
            sender
                .send(Event::InvoiceStatusChanged {
                    invoice_id,
                    old_status: old_status.as_str().to_string(),
                    new_status: new_status.as_str().to_string(),
                })
                .await;
        }

        Ok(updated)
    }

    /// Invoice with its lines in serial order.
    pub async fn get_invoice(
        &self,
        invoice_id: Uuid,
    ) -> Result<(invoices::Model, Vec<invoice_items::Model>), ServiceError> {
        let invoice = Invoices::find_by_id(invoice_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("invoice {} not found", invoice_id)))?;

        let items = InvoiceItems::find()
            .filter(invoice_items::Column::InvoiceId.eq(invoice_id))
            .order_by_asc(invoice_items::Column::SerialNo)
            .all(&*self.db)
            .await?;

        Ok((invoice, items))
    }

    /// Derive every money field server-side and capture product names for
    /// denormalization. Aborts with no writes when a referenced product is
    /// missing.
    async fn compute(&self, input: &SettleInvoiceInput) -> Result<ComputedInvoice, ServiceError> {
        let mut product_names = Vec::with_capacity(input.items.len());
        let mut amounts = Vec::with_capacity(input.items.len());

        for (idx, item) in input.items.iter().enumerate() {
            let product = Products::find_by_id(item.product_id)
                .one(&*self.db)
                .await?
                .ok_or_else(|| {
                    ServiceError::field(
                        format!("items[{}].product_id", idx),
                        format!("product {} not found", item.product_id),
                    )
                })?;
            product_names.push(product.name);
            amounts.push(money::line_amount(
                item.quantity,
                item.rate,
                item.discount_percent,
            ));
        }

        let breakdown = TaxBreakdown::compute(
            &amounts,
            input.cgst_rate,
            input.sgst_rate,
            input.igst_rate,
        );

        let total_rupees = breakdown.total.to_u64().ok_or_else(|| {
            ServiceError::InternalError(format!(
                "invoice total {} out of words-conversion range",
                breakdown.total
            ))
        })?;
        let total_in_words = format!("{} Rupees Only", words::rupees_in_words(total_rupees));

        Ok(ComputedInvoice {
            product_names,
            amounts,
            breakdown,
            total_in_words,
        })
    }

    async fn persist_invoice(
        &self,
        txn: &DatabaseTransaction,
        invoice_id: Uuid,
        input: &SettleInvoiceInput,
        computed: &ComputedInvoice,
        business: &BusinessIdentity,
    ) -> Result<invoices::Model, ServiceError> {
        let invoice_number = InvoiceNumberSequencer::next_number(txn, input.invoice_type).await?;
        let (sender, receiver) = resolve_parties(input.invoice_type, business, &input.counterparty);

        // Settle-and-sync finalizes up front; plain settlement stays a draft.
        let status = if input.sync_inventory {
            InvoiceStatus::Finalized
        } else {
            InvoiceStatus::Draft
        };

        let now = Utc::now();
        let invoice = invoices::ActiveModel {
            id: Set(invoice_id),
            invoice_number: Set(invoice_number),
            invoice_type: Set(input.invoice_type),
            invoice_date: Set(input.invoice_date),
            status: Set(status),
            sender_name: Set(sender.name),
            sender_address: Set(sender.address),
            sender_gstin: Set(sender.gstin),
            sender_contact: Set(sender.contact),
            receiver_name: Set(receiver.name),
            receiver_address: Set(receiver.address),
            receiver_gstin: Set(receiver.gstin),
            receiver_contact: Set(receiver.contact),
            subtotal: Set(computed.breakdown.subtotal),
            cgst_rate: Set(input.cgst_rate),
            cgst_amount: Set(computed.breakdown.cgst_amount),
            sgst_rate: Set(input.sgst_rate),
            sgst_amount: Set(computed.breakdown.sgst_amount),
            igst_rate: Set(input.igst_rate),
            igst_amount: Set(computed.breakdown.igst_amount),
            round_off: Set(computed.breakdown.round_off),
            total: Set(computed.breakdown.total),
            total_in_words: Set(computed.total_in_words.clone()),
            notes: Set(input.notes.clone()),
            inventory_synced: Set(false),
            sync_outcome: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(txn)
        .await?;

        insert_items(txn, invoice_id, &input.items, computed).await?;
        Ok(invoice)
    }

    /// Sync after commit; failures are folded into the report rather than
    /// propagated, because the committed invoice is the source of truth.
    async fn run_post_commit_sync(&self, invoice_id: Uuid) -> InventorySyncResult {
        match self.inventory_sync.sync(invoice_id).await {
            Ok(result) => result,
            Err(e) => {
                warn!(%invoice_id, error = %e, "post-settlement inventory sync failed");
                InventorySyncResult {
                    invoice_id,
                    success: false,
                    items: Vec::new(),
                    message: Some(format!("inventory sync failed: {}", e)),
                }
            }
        }
    }
}

/// Buying: the counterparty sent us goods. Selling: we send to them.
fn resolve_parties(
    invoice_type: InvoiceType,
    business: &BusinessIdentity,
    counterparty: &PartyInput,
) -> (BusinessIdentity, BusinessIdentity) {
    let counterparty = BusinessIdentity {
        name: counterparty.name.clone(),
        address: counterparty.address.clone(),
        gstin: counterparty.gstin.clone(),
        contact: counterparty.contact.clone(),
    };
    match invoice_type {
        InvoiceType::Buying => (counterparty, business.clone()),
        InvoiceType::Selling => (business.clone(), counterparty),
    }
}

async fn insert_items(
    txn: &DatabaseTransaction,
    invoice_id: Uuid,
    items: &[InvoiceItemInput],
    computed: &ComputedInvoice,
) -> Result<(), ServiceError> {
    for (idx, item) in items.iter().enumerate() {
        invoice_items::ActiveModel {
            id: Set(Uuid::new_v4()),
            invoice_id: Set(invoice_id),
            serial_no: Set(idx as i32 + 1),
            product_id: Set(item.product_id),
            product_name: Set(computed.product_names[idx].clone()),
            hsn_code: Set(item.hsn_code.clone()),
            quantity: Set(item.quantity),
            rate: Set(item.rate),
            discount_percent: Set(item.discount_percent),
            amount: Set(computed.amounts[idx]),
            mrp: Set(item.mrp),
            selling_price: Set(item.selling_price),
            wholesale_price: Set(item.wholesale_price),
            stock_applied: Set(false),
        }
        .insert(txn)
        .await?;
    }
    Ok(())
}

/// Range checks the `validator` derive cannot express for `Decimal` fields.
fn validate_money_fields(input: &SettleInvoiceInput) -> Result<(), ServiceError> {
    let mut errors = Vec::new();

    for (idx, item) in input.items.iter().enumerate() {
        if item.quantity < Decimal::ZERO {
            errors.push(FieldError::new(
                format!("items[{}].quantity", idx),
                "must be non-negative",
            ));
        }
        if item.rate < Decimal::ZERO {
            errors.push(FieldError::new(
                format!("items[{}].rate", idx),
                "must be non-negative",
            ));
        }
        if item.discount_percent < Decimal::ZERO || item.discount_percent > Decimal::ONE_HUNDRED {
            errors.push(FieldError::new(
                format!("items[{}].discount_percent", idx),
                "must be between 0 and 100",
            ));
        }
    }

    for (field, rate) in [
        ("cgst_rate", input.cgst_rate),
        ("sgst_rate", input.sgst_rate),
        ("igst_rate", input.igst_rate),
    ] {
        if rate < Decimal::ZERO || rate > Decimal::ONE_HUNDRED {
            errors.push(FieldError::new(field, "must be between 0 and 100"));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ServiceError::ValidationFailed(errors))
    }
}

fn is_unique_violation(err: &sea_orm::DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}
