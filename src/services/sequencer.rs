use chrono::Utc;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait,
    EntityTrait, PaginatorTrait, QueryFilter,
};
use tracing::warn;

use crate::{
    entities::{
        invoice_sequences::{self, Entity as InvoiceSequences},
        invoices::{self, Entity as Invoices, InvoiceType},
    },
    errors::ServiceError,
};

/// Allocates sequential invoice numbers, one counter row per invoice type.
///
/// Allocation runs inside the caller's invoice-create transaction: the
/// counter bump takes a row lock, so concurrent creates of the same type
/// serialize at the database and commit distinct, contiguous numbers. The
/// unique constraint on `invoices.invoice_number` backstops the counter; a
/// duplicate-key commit surfaces as a retryable conflict upstream.
pub struct InvoiceNumberSequencer;

impl InvoiceNumberSequencer {
    /// Allocate the next number for `invoice_type`, e.g. `SIL-007`.
    pub async fn next_number<C: ConnectionTrait>(
        conn: &C,
        invoice_type: InvoiceType,
    ) -> Result<String, ServiceError> {
        let type_key = invoice_type.as_str();

        // Bump first: the UPDATE locks the counter row for the rest of the
        // transaction, serializing concurrent allocators of this type.
        let bumped = InvoiceSequences::update_many()
            .col_expr(
                invoice_sequences::Column::NextNumber,
                Expr::col(invoice_sequences::Column::NextNumber).add(1),
            )
            .col_expr(
                invoice_sequences::Column::UpdatedAt,
                Expr::value(Utc::now()),
            )
            .filter(invoice_sequences::Column::InvoiceType.eq(type_key))
            .exec(conn)
            .await?;

        let allocated = if bumped.rows_affected == 1 {
            let row = InvoiceSequences::find_by_id(type_key)
                .one(conn)
                .await?
                .ok_or_else(|| {
                    ServiceError::InternalError(format!(
                        "invoice sequence row for {} vanished mid-transaction",
                        type_key
                    ))
                })?;
            row.next_number - 1
        } else {
            // No counter row yet: seed it from existing invoices of this type.
            let seed = Self::recover_next_number(conn, invoice_type).await?;
            invoice_sequences::ActiveModel {
                invoice_type: Set(type_key.to_string()),
                next_number: Set(seed + 1),
                updated_at: Set(Utc::now()),
            }
            .insert(conn)
            .await?;
            seed
        };

        Ok(Self::format_number(invoice_type, allocated))
    }

    /// Seed value when the counter row is missing: highest parsed numeric
    /// suffix + 1. Unparseable historical numbers fall back to count + 1.
    async fn recover_next_number<C: ConnectionTrait>(
        conn: &C,
        invoice_type: InvoiceType,
    ) -> Result<i64, ServiceError> {
        let existing: Vec<invoices::Model> = Invoices::find()
            .filter(invoices::Column::InvoiceType.eq(invoice_type))
            .all(conn)
            .await?;

        if existing.is_empty() {
            return Ok(1);
        }

        let prefix = format!("{}-", invoice_type.prefix());
        let mut max_suffix: i64 = 0;
        for inv in &existing {
            match inv
                .invoice_number
                .strip_prefix(&prefix)
                .and_then(|s| s.parse::<i64>().ok())
            {
                Some(n) => max_suffix = max_suffix.max(n),
                None => {
                    warn!(
                        invoice_number = %inv.invoice_number,
                        invoice_type = invoice_type.as_str(),
                        "unparseable invoice number, seeding sequence from invoice count"
                    );
                    let count = Invoices::find()
                        .filter(invoices::Column::InvoiceType.eq(invoice_type))
                        .count(conn)
                        .await? as i64;
                    return Ok(count + 1);
                }
            }
        }

        Ok(max_suffix + 1)
    }

    /// `<PREFIX>-<NNN>`, zero-padded to at least 3 digits.
    pub fn format_number(invoice_type: InvoiceType, n: i64) -> String {
        format!("{}-{:03}", invoice_type.prefix(), n)
    }
}
