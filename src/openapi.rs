use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "GSTBill API",
        version = "0.3.0",
        description = r#"
# GSTBill Invoice Settlement API

Settlement and inventory engine for GST-compliant small-business billing.

- **Invoice settlement**: server-side computation of line amounts, CGST/SGST/IGST
  breakdown, whole-rupee rounding, and the legal amount-in-words
- **Sequential numbering**: gap-tolerant per-type invoice numbers (`BIL-001`, `SIL-001`)
- **Inventory sync**: at-most-once stock deltas per invoice line, with per-item
  outcomes reported instead of all-or-nothing failure
        "#,
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "invoices", description = "Invoice settlement and inventory sync")
    ),
    paths(
        crate::handlers::invoices::create_invoice,
        crate::handlers::invoices::get_invoice,
        crate::handlers::invoices::update_invoice,
        crate::handlers::invoices::transition_status,
        crate::handlers::invoices::sync_inventory,
    ),
    components(
        schemas(
            crate::services::settlement::SettleInvoiceInput,
            crate::services::settlement::InvoiceItemInput,
            crate::services::settlement::PartyInput,
            crate::services::settlement::SettledInvoice,
            crate::services::inventory_sync::InventorySyncResult,
            crate::services::inventory_sync::ItemSyncOutcome,
            crate::services::inventory_sync::ItemSyncStatus,
            crate::handlers::invoices::StatusTransitionRequest,
            crate::entities::invoices::InvoiceType,
            crate::entities::invoices::InvoiceStatus,
            crate::errors::ErrorResponse,
            crate::errors::FieldError,
        )
    )
)]
pub struct ApiDoc;

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDoc::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_document_generates() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/api/v1/invoices"));
        assert!(doc.paths.paths.contains_key("/api/v1/invoices/{id}/sync"));
    }
}
