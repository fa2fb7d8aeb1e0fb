mod common;

use axum::http::{Method, StatusCode};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{sea_query::Expr, ColumnTrait, EntityTrait, QueryFilter};
use serde_json::{json, Value};
use uuid::Uuid;

use common::TestApp;
use gstbill_api::entities::{
    invoice_items::{self, Entity as InvoiceItems},
    products::Entity as Products,
};

fn dec_field(value: &Value) -> Decimal {
    match value {
        Value::String(s) => s.parse().expect("decimal string"),
        Value::Number(n) => n.to_string().parse().expect("decimal number"),
        other => panic!("expected decimal, got {}", other),
    }
}

fn invoice_body(invoice_type: &str, items: Value) -> Value {
    json!({
        "invoice_type": invoice_type,
        "invoice_date": "2025-06-01",
        "counterparty": {
            "name": "Sharma Traders",
            "address": "14 MG Road, Pune",
            "gstin": "27AAACS1234A1Z5",
            "contact": "+91-9800000000"
        },
        "items": items,
        "cgst_rate": "9",
        "sgst_rate": "9",
        "igst_rate": "0"
    })
}

/// Settle an invoice and move it to finalized so it becomes syncable.
async fn settle_finalized(app: &TestApp, invoice_type: &str, items: Value) -> String {
    let settled = app
        .request_json(
            Method::POST,
            "/api/v1/invoices",
            Some(invoice_body(invoice_type, items)),
            StatusCode::CREATED,
        )
        .await;
    let id = settled["invoice"]["id"].as_str().expect("invoice id").to_string();

    app.request_json(
        Method::POST,
        &format!("/api/v1/invoices/{}/status", id),
        Some(json!({ "status": "finalized" })),
        StatusCode::OK,
    )
    .await;
    id
}

async fn product_quantity(app: &TestApp, id: Uuid) -> Decimal {
    Products::find_by_id(id)
        .one(&*app.state.db)
        .await
        .expect("query product")
        .expect("product exists")
        .quantity
}

#[tokio::test]
async fn buying_invoice_increases_stock_and_propagates_prices() {
    let app = TestApp::new().await;
    let product = app.seed_product("Ceiling Fan", dec!(5)).await;

    let id = settle_finalized(
        &app,
        "buying",
        json!([{
            "product_id": product.id,
            "quantity": "10",
            "rate": "75",
            "mrp": "130",
            "selling_price": "110",
            "wholesale_price": "95"
        }]),
    )
    .await;

    let result = app
        .request_json(
            Method::POST,
            &format!("/api/v1/invoices/{}/sync", id),
            None,
            StatusCode::OK,
        )
        .await;

    assert_eq!(result["success"], true);
    assert_eq!(result["items"][0]["status"], "applied");
    assert_eq!(dec_field(&result["items"][0]["previous_quantity"]), dec!(5));
    assert_eq!(dec_field(&result["items"][0]["new_quantity"]), dec!(15));

    let updated = Products::find_by_id(product.id)
        .one(&*app.state.db)
        .await
        .expect("query product")
        .expect("product exists");
    assert_eq!(updated.quantity, dec!(15));
    assert_eq!(updated.mrp, dec!(130));
    assert_eq!(updated.selling_price, dec!(110));
    assert_eq!(updated.wholesale_price, dec!(95));
    assert!(updated.version > product.version);
}

#[tokio::test]
async fn selling_more_than_stock_oversells_with_a_warning() {
    let app = TestApp::new().await;
    let product = app.seed_product("Copper Wire 10m", dec!(3)).await;

    let id = settle_finalized(
        &app,
        "selling",
        json!([{ "product_id": product.id, "quantity": "10", "rate": "80" }]),
    )
    .await;

    let result = app
        .request_json(
            Method::POST,
            &format!("/api/v1/invoices/{}/sync", id),
            None,
            StatusCode::OK,
        )
        .await;

    assert_eq!(result["success"], true);
    assert_eq!(result["items"][0]["status"], "applied");
    assert_eq!(
        result["items"][0]["warning"],
        "only 3 units were in stock"
    );
    assert_eq!(product_quantity(&app, product.id).await, dec!(-7));
}

#[tokio::test]
async fn sync_is_idempotent_once_fully_applied() {
    let app = TestApp::new().await;
    let product = app.seed_product("LED Bulb", dec!(40)).await;

    let id = settle_finalized(
        &app,
        "selling",
        json!([{ "product_id": product.id, "quantity": "5", "rate": "100" }]),
    )
    .await;
    let sync_path = format!("/api/v1/invoices/{}/sync", id);

    let first = app
        .request_json(Method::POST, &sync_path, None, StatusCode::OK)
        .await;
    assert_eq!(first["success"], true);
    assert_eq!(product_quantity(&app, product.id).await, dec!(35));

    let second = app
        .request_json(Method::POST, &sync_path, None, StatusCode::OK)
        .await;
    assert_eq!(second["success"], true);
    assert_eq!(
        second["message"],
        "inventory already synced for this invoice"
    );
    assert_eq!(product_quantity(&app, product.id).await, dec!(35));
}

#[tokio::test]
async fn deleted_product_fails_its_line_without_blocking_the_rest() {
    let app = TestApp::new().await;
    let kept = app.seed_product("Switchboard", dec!(20)).await;
    let doomed = app.seed_product("Discontinued Heater", dec!(20)).await;

    let id = settle_finalized(
        &app,
        "selling",
        json!([
            { "product_id": kept.id, "quantity": "2", "rate": "60" },
            { "product_id": doomed.id, "quantity": "1", "rate": "900" }
        ]),
    )
    .await;

    Products::delete_by_id(doomed.id)
        .exec(&*app.state.db)
        .await
        .expect("delete product");

    let sync_path = format!("/api/v1/invoices/{}/sync", id);
    let result = app
        .request_json(Method::POST, &sync_path, None, StatusCode::OK)
        .await;

    assert_eq!(result["success"], false);
    assert_eq!(result["items"][0]["status"], "applied");
    assert_eq!(result["items"][1]["status"], "failed");
    assert!(result["items"][1]["error"].is_string());
    assert_eq!(product_quantity(&app, kept.id).await, dec!(18));

    let invoice = app
        .request_json(
            Method::GET,
            &format!("/api/v1/invoices/{}", id),
            None,
            StatusCode::OK,
        )
        .await;
    assert_eq!(invoice["invoice"]["inventory_synced"], false);

    // A retry skips the applied line instead of double-applying it.
    let retry = app
        .request_json(Method::POST, &sync_path, None, StatusCode::OK)
        .await;
    assert_eq!(retry["success"], false);
    assert_eq!(retry["items"][0]["status"], "already_applied");
    assert_eq!(retry["items"][1]["status"], "failed");
    assert_eq!(product_quantity(&app, kept.id).await, dec!(18));
}

#[tokio::test]
async fn already_marked_line_is_never_reapplied() {
    let app = TestApp::new().await;
    let product = app.seed_product("Geyser", dec!(12)).await;

    let id = settle_finalized(
        &app,
        "selling",
        json!([{ "product_id": product.id, "quantity": "4", "rate": "100" }]),
    )
    .await;

    // Model a competing sync that already claimed the line: marker set on the
    // item while the invoice itself is still unsynced.
    InvoiceItems::update_many()
        .col_expr(invoice_items::Column::StockApplied, Expr::value(true))
        .filter(invoice_items::Column::InvoiceId.eq(id.parse::<Uuid>().expect("uuid")))
        .exec(&*app.state.db)
        .await
        .expect("mark line applied");

    let result = app
        .request_json(
            Method::POST,
            &format!("/api/v1/invoices/{}/sync", id),
            None,
            StatusCode::OK,
        )
        .await;

    assert_eq!(result["success"], true);
    assert_eq!(result["items"][0]["status"], "already_applied");
    assert_eq!(product_quantity(&app, product.id).await, dec!(12));
}

#[tokio::test]
async fn draft_invoices_cannot_be_synced() {
    let app = TestApp::new().await;
    let product = app.seed_product("Mixer", dec!(10)).await;

    let settled = app
        .request_json(
            Method::POST,
            "/api/v1/invoices",
            Some(invoice_body(
                "selling",
                json!([{ "product_id": product.id, "quantity": "1", "rate": "100" }]),
            )),
            StatusCode::CREATED,
        )
        .await;
    let id = settled["invoice"]["id"].as_str().expect("invoice id");

    app.request_json(
        Method::POST,
        &format!("/api/v1/invoices/{}/sync", id),
        None,
        StatusCode::BAD_REQUEST,
    )
    .await;
    assert_eq!(product_quantity(&app, product.id).await, dec!(10));
}

#[tokio::test]
async fn settle_and_sync_finalizes_and_reports_inline() {
    let app = TestApp::new().await;
    let product = app.seed_product("Kettle", dec!(8)).await;

    let mut body = invoice_body(
        "selling",
        json!([{ "product_id": product.id, "quantity": "2", "rate": "100" }]),
    );
    body["sync_inventory"] = json!(true);

    let settled = app
        .request_json(Method::POST, "/api/v1/invoices", Some(body), StatusCode::CREATED)
        .await;

    assert_eq!(settled["invoice"]["status"], "finalized");
    assert_eq!(settled["invoice"]["inventory_synced"], true);
    assert_eq!(settled["inventory_sync"]["success"], true);
    assert_eq!(product_quantity(&app, product.id).await, dec!(6));
}

#[tokio::test]
async fn syncing_an_unknown_invoice_returns_404() {
    let app = TestApp::new().await;
    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/invoices/{}/sync", Uuid::new_v4()),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
