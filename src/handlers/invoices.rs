use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    entities::invoices::InvoiceStatus,
    errors::ServiceError,
    handlers::AppState,
    services::{
        inventory_sync::InventorySyncResult,
        settlement::{SettleInvoiceInput, SettledInvoice},
    },
};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", post(create_invoice))
        .route("/:id", get(get_invoice).put(update_invoice))
        .route("/:id/status", post(transition_status))
        .route("/:id/sync", post(sync_inventory))
}

#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct StatusTransitionRequest {
    pub status: InvoiceStatus,
}

/// Settle and persist a new invoice
#[utoipa::path(
    post,
    path = "/api/v1/invoices",
    request_body = SettleInvoiceInput,
    responses(
        (status = 201, description = "Invoice settled", body = SettledInvoice),
        (status = 400, description = "Validation failed", body = crate::errors::ErrorResponse),
        (status = 409, description = "Concurrent write conflict", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    ),
    tag = "invoices"
)]
pub async fn create_invoice(
    State(state): State<Arc<AppState>>,
    Json(input): Json<SettleInvoiceInput>,
) -> Result<impl IntoResponse, ServiceError> {
    let settled = state.services.settlement.create_invoice(input).await?;
    Ok((StatusCode::CREATED, Json(settled)))
}

/// Fetch an invoice with its lines in serial order
#[utoipa::path(
    get,
    path = "/api/v1/invoices/{id}",
    params(("id" = Uuid, Path, description = "Invoice id")),
    responses(
        (status = 200, description = "Invoice found", body = SettledInvoice),
        (status = 404, description = "Invoice not found", body = crate::errors::ErrorResponse)
    ),
    tag = "invoices"
)]
pub async fn get_invoice(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let (invoice, items) = state.services.settlement.get_invoice(id).await?;
    Ok(Json(SettledInvoice {
        invoice,
        items,
        inventory_sync: None,
    }))
}

/// Re-settle a draft invoice with corrected data
#[utoipa::path(
    put,
    path = "/api/v1/invoices/{id}",
    params(("id" = Uuid, Path, description = "Invoice id")),
    request_body = SettleInvoiceInput,
    responses(
        (status = 200, description = "Invoice re-settled", body = SettledInvoice),
        (status = 400, description = "Validation failed or invoice not editable", body = crate::errors::ErrorResponse),
        (status = 404, description = "Invoice not found", body = crate::errors::ErrorResponse)
    ),
    tag = "invoices"
)]
pub async fn update_invoice(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(input): Json<SettleInvoiceInput>,
) -> Result<impl IntoResponse, ServiceError> {
    let settled = state.services.settlement.update_invoice(id, input).await?;
    Ok(Json(settled))
}

/// Move an invoice through its lifecycle
#[utoipa::path(
    post,
    path = "/api/v1/invoices/{id}/status",
    params(("id" = Uuid, Path, description = "Invoice id")),
    request_body = StatusTransitionRequest,
    responses(
        (status = 200, description = "Status updated"),
        (status = 400, description = "Transition not allowed", body = crate::errors::ErrorResponse),
        (status = 404, description = "Invoice not found", body = crate::errors::ErrorResponse)
    ),
    tag = "invoices"
)]
pub async fn transition_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(body): Json<StatusTransitionRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let invoice = state
        .services
        .settlement
        .transition_status(id, body.status)
        .await?;
    Ok(Json(invoice))
}

/// Apply the invoice's stock deltas to inventory
#[utoipa::path(
    post,
    path = "/api/v1/invoices/{id}/sync",
    params(("id" = Uuid, Path, description = "Invoice id")),
    responses(
        (status = 200, description = "Sync report", body = InventorySyncResult),
        (status = 400, description = "Invoice not in a syncable status", body = crate::errors::ErrorResponse),
        (status = 404, description = "Invoice not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Concurrent stock update conflict", body = crate::errors::ErrorResponse)
    ),
    tag = "invoices"
)]
pub async fn sync_inventory(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let result = state.services.inventory_sync.sync(id).await?;
    Ok(Json(result))
}
