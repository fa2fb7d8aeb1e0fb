use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait,
    DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    entities::{
        invoice_items::{self, Entity as InvoiceItems},
        invoices::{self, Entity as Invoices, InvoiceStatus, InvoiceType},
        products::{self, Entity as Products},
    },
    errors::ServiceError,
    events::{Event, EventSender},
};

/// Bounded retries for the compare-and-swap on a product's version.
const CAS_MAX_ATTEMPTS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ItemSyncStatus {
    /// Delta applied in this run.
    Applied,
    /// Delta was applied by an earlier run; skipped.
    AlreadyApplied,
    /// Hard failure; the delta was not applied.
    Failed,
}

/// Outcome of one invoice line's stock application.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ItemSyncOutcome {
    pub serial_no: i32,
    pub product_id: Uuid,
    pub product_name: String,
    pub status: ItemSyncStatus,
    /// Soft warning (oversell); does not affect overall success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_quantity: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_quantity: Option<Decimal>,
}

/// Structured result of an inventory sync attempt, also persisted onto the
/// invoice for later inspection.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct InventorySyncResult {
    pub invoice_id: Uuid,
    /// True when every line applied without a hard failure. Oversell warnings
    /// do not clear this flag.
    pub success: bool,
    pub items: Vec<ItemSyncOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Applies an invoice's signed stock deltas to the referenced products.
///
/// Per invoice the effect is at most once: a fully synced invoice refuses to
/// re-apply, and each line carries its own applied marker so a retry after a
/// partial failure only touches the lines that did not go through.
#[derive(Clone)]
pub struct InventorySyncService {
    db: Arc<DatabaseConnection>,
    event_sender: Option<EventSender>,
}

impl InventorySyncService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Option<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Synchronize product quantities with the given invoice.
    #[instrument(skip(self), fields(%invoice_id))]
    pub async fn sync(&self, invoice_id: Uuid) -> Result<InventorySyncResult, ServiceError> {
        let invoice = Invoices::find_by_id(invoice_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("invoice {} not found", invoice_id)))?;

        if invoice.inventory_synced {
            // Idempotent no-op under retries.
            info!("invoice already synced, skipping");
            return Ok(InventorySyncResult {
                invoice_id,
                success: true,
                items: Vec::new(),
                message: Some("inventory already synced for this invoice".to_string()),
            });
        }

        match invoice.status {
            InvoiceStatus::Finalized | InvoiceStatus::Paid => {}
            other => {
                return Err(ServiceError::InvalidOperation(format!(
                    "cannot sync inventory for {} invoice {}",
                    other.as_str(),
                    invoice.invoice_number
                )));
            }
        }

        let items = InvoiceItems::find()
            .filter(invoice_items::Column::InvoiceId.eq(invoice_id))
            .order_by_asc(invoice_items::Column::SerialNo)
            .all(&*self.db)
            .await?;

        let mut outcomes = Vec::with_capacity(items.len());
        for item in &items {
            outcomes.push(self.sync_item(&invoice, item).await?);
        }

        let failed = outcomes
            .iter()
            .filter(|o| o.status == ItemSyncStatus::Failed)
            .count();
        let success = failed == 0;

        let result = InventorySyncResult {
            invoice_id,
            success,
            message: (!success).then(|| {
                format!(
                    "{} of {} items failed to sync; invoice left unsynced for retry",
                    failed,
                    outcomes.len()
                )
            }),
            items: outcomes,
        };

        // Persist the outcome; only a fully successful run flips the flag.
        let outcome_json = serde_json::to_value(&result)
            .map_err(|e| ServiceError::InternalError(format!("serialize sync outcome: {}", e)))?;
        let mut active: invoices::ActiveModel = invoice.into();
        active.sync_outcome = Set(Some(outcome_json));
        active.inventory_synced = Set(success);
        active.updated_at = Set(Utc::now());
        active.update(&*self.db).await?;

        if success {
            if let Some(sender) = &self.event_sender {
                sender.send(Event::InvoiceSynced { invoice_id }).await;
            }
            info!("inventory sync complete");
        } else {
            warn!(failed, "inventory sync incomplete, invoice left unsynced");
        }

        Ok(result)
    }

    /// Apply one line's delta inside its own transaction so the product
    /// update and the line's applied marker commit together.
    ///
    /// The marker flip is a conditional update claiming the line: a
    /// concurrent sync that loaded the same snapshot blocks on the row lock
    /// and then claims zero rows, so the delta can never apply twice.
    async fn sync_item(
        &self,
        invoice: &invoices::Model,
        item: &invoice_items::Model,
    ) -> Result<ItemSyncOutcome, ServiceError> {
        let already_applied = ItemSyncOutcome {
            serial_no: item.serial_no,
            product_id: item.product_id,
            product_name: item.product_name.clone(),
            status: ItemSyncStatus::AlreadyApplied,
            warning: None,
            error: None,
            previous_quantity: None,
            new_quantity: None,
        };
        if item.stock_applied {
            return Ok(already_applied);
        }

        let delta = match invoice.invoice_type {
            InvoiceType::Buying => item.quantity,
            InvoiceType::Selling => -item.quantity,
        };

        let txn = self.db.begin().await?;

        let claimed = InvoiceItems::update_many()
            .col_expr(invoice_items::Column::StockApplied, Expr::value(true))
            .filter(invoice_items::Column::Id.eq(item.id))
            .filter(invoice_items::Column::StockApplied.eq(false))
            .exec(&txn)
            .await?;
        if claimed.rows_affected == 0 {
            // Another sync claimed this line after our snapshot.
            txn.rollback().await?;
            return Ok(already_applied);
        }

        let applied = match Self::apply_delta(&txn, item.product_id, delta).await {
            Ok(applied) => applied,
            Err(err @ (ServiceError::NotFound(_) | ServiceError::Conflict(_))) => {
                txn.rollback().await?;
                warn!(
                    serial_no = item.serial_no,
                    product_id = %item.product_id,
                    error = %err,
                    "inventory delta not applied"
                );
                return Ok(ItemSyncOutcome {
                    serial_no: item.serial_no,
                    product_id: item.product_id,
                    product_name: item.product_name.clone(),
                    status: ItemSyncStatus::Failed,
                    warning: None,
                    error: Some(err.to_string()),
                    previous_quantity: None,
                    new_quantity: None,
                });
            }
            Err(other) => {
                txn.rollback().await?;
                return Err(other);
            }
        };

        txn.commit().await?;

        let warning = (invoice.invoice_type == InvoiceType::Selling
            && applied.previous_quantity < item.quantity)
            .then(|| {
                format!(
                    "only {} units were in stock",
                    applied.previous_quantity.normalize()
                )
            });

        if invoice.invoice_type == InvoiceType::Buying {
            self.propagate_prices(item).await;
        }

        if let Some(sender) = &self.event_sender {
            sender
                .send(Event::InventoryUpdated {
                    product_id: item.product_id,
                    previous_quantity: applied.previous_quantity,
                    new_quantity: applied.new_quantity,
                })
                .await;
        }

        Ok(ItemSyncOutcome {
            serial_no: item.serial_no,
            product_id: item.product_id,
            product_name: item.product_name.clone(),
            status: ItemSyncStatus::Applied,
            warning,
            error: None,
            previous_quantity: Some(applied.previous_quantity),
            new_quantity: Some(applied.new_quantity),
        })
    }

    /// Compare-and-swap the product's on-hand quantity: the update is
    /// conditional on the version read, retried a bounded number of times.
    /// Negative results are allowed (oversell).
    async fn apply_delta<C: ConnectionTrait>(
        conn: &C,
        product_id: Uuid,
        delta: Decimal,
    ) -> Result<AppliedDelta, ServiceError> {
        for _ in 0..CAS_MAX_ATTEMPTS {
            let product = Products::find_by_id(product_id)
                .one(conn)
                .await?
                .ok_or_else(|| {
                    ServiceError::NotFound(format!("product {} no longer exists", product_id))
                })?;

            let previous_quantity = product.quantity;
            let new_quantity = previous_quantity + delta;

            let updated = Products::update_many()
                .col_expr(products::Column::Quantity, Expr::value(new_quantity))
                .col_expr(products::Column::Version, Expr::value(product.version + 1))
                .col_expr(products::Column::UpdatedAt, Expr::value(Utc::now()))
                .filter(products::Column::Id.eq(product_id))
                .filter(products::Column::Version.eq(product.version))
                .exec(conn)
                .await?;

            if updated.rows_affected == 1 {
                return Ok(AppliedDelta {
                    previous_quantity,
                    new_quantity,
                });
            }
            // Version moved under us; re-read and retry.
        }

        Err(ServiceError::Conflict(format!(
            "concurrent update on product {} after {} attempts",
            product_id, CAS_MAX_ATTEMPTS
        )))
    }

    /// Best-effort pricing propagation from a buying invoice line onto the
    /// product master. Never fails the sync.
    async fn propagate_prices(&self, item: &invoice_items::Model) {
        if item.mrp.is_none() && item.selling_price.is_none() && item.wholesale_price.is_none() {
            return;
        }

        let mut update = Products::update_many();
        if let Some(mrp) = item.mrp {
            update = update.col_expr(products::Column::Mrp, Expr::value(mrp));
        }
        if let Some(selling) = item.selling_price {
            update = update.col_expr(products::Column::SellingPrice, Expr::value(selling));
        }
        if let Some(wholesale) = item.wholesale_price {
            update = update.col_expr(products::Column::WholesalePrice, Expr::value(wholesale));
        }

        let result = update
            .col_expr(
                products::Column::Version,
                Expr::col(products::Column::Version).add(1),
            )
            .col_expr(products::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(products::Column::Id.eq(item.product_id))
            .exec(&*self.db)
            .await;

        match result {
            Ok(res) if res.rows_affected == 1 => {
                info!(product_id = %item.product_id, "propagated pricing from buying invoice");
            }
            Ok(_) => {
                warn!(product_id = %item.product_id, "pricing propagation skipped, product missing");
            }
            Err(e) => {
                warn!(product_id = %item.product_id, error = %e, "pricing propagation failed");
            }
        }
    }
}

struct AppliedDelta {
    previous_quantity: Decimal,
    new_quantity: Decimal,
}
