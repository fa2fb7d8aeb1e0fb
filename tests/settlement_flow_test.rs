mod common;

use axum::http::{Method, StatusCode};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use uuid::Uuid;

use common::TestApp;

/// Decimal fields serialize as strings; totals read back from SQLite may lose
/// trailing zeros, so compare numerically.
fn dec_field(value: &Value) -> Decimal {
    match value {
        Value::String(s) => s.parse().expect("decimal string"),
        Value::Number(n) => n.to_string().parse().expect("decimal number"),
        other => panic!("expected decimal, got {}", other),
    }
}

fn counterparty() -> Value {
    json!({
        "name": "Sharma Traders",
        "address": "14 MG Road, Pune",
        "gstin": "27AAACS1234A1Z5",
        "contact": "+91-9800000000"
    })
}

fn invoice_body(invoice_type: &str, items: Value) -> Value {
    json!({
        "invoice_type": invoice_type,
        "invoice_date": "2025-06-01",
        "counterparty": counterparty(),
        "items": items,
        "cgst_rate": "9",
        "sgst_rate": "9",
        "igst_rate": "0",
        "notes": null
    })
}

#[tokio::test]
async fn settling_an_invoice_computes_the_full_tax_breakdown() {
    let app = TestApp::new().await;
    let fan = app.seed_product("Ceiling Fan", dec!(20)).await;
    let wire = app.seed_product("Copper Wire 10m", dec!(50)).await;

    let body = invoice_body(
        "selling",
        json!([
            { "product_id": fan.id, "quantity": "2", "rate": "50" },
            { "product_id": wire.id, "quantity": "1", "rate": "80" }
        ]),
    );

    let settled = app
        .request_json(Method::POST, "/api/v1/invoices", Some(body), StatusCode::CREATED)
        .await;

    let invoice = &settled["invoice"];
    assert_eq!(invoice["invoice_number"], "SIL-001");
    assert_eq!(invoice["status"], "draft");
    assert_eq!(dec_field(&invoice["subtotal"]), dec!(180));
    assert_eq!(dec_field(&invoice["cgst_amount"]), dec!(16.20));
    assert_eq!(dec_field(&invoice["sgst_amount"]), dec!(16.20));
    assert_eq!(dec_field(&invoice["igst_amount"]), dec!(0));
    assert_eq!(dec_field(&invoice["total"]), dec!(212));
    assert_eq!(dec_field(&invoice["round_off"]), dec!(-0.40));
    assert_eq!(invoice["total_in_words"], "Two Hundred Twelve Rupees Only");

    let items = settled["items"].as_array().expect("items array");
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["serial_no"], 1);
    assert_eq!(items[0]["product_name"], "Ceiling Fan");
    assert_eq!(dec_field(&items[0]["amount"]), dec!(100));
    assert_eq!(items[1]["serial_no"], 2);
    assert_eq!(dec_field(&items[1]["amount"]), dec!(80));
}

#[tokio::test]
async fn invoice_numbers_are_sequential_per_type() {
    let app = TestApp::new().await;
    let product = app.seed_product("Switchboard", dec!(100)).await;

    let item = json!([{ "product_id": product.id, "quantity": "1", "rate": "10" }]);

    for expected in ["SIL-001", "SIL-002"] {
        let settled = app
            .request_json(
                Method::POST,
                "/api/v1/invoices",
                Some(invoice_body("selling", item.clone())),
                StatusCode::CREATED,
            )
            .await;
        assert_eq!(settled["invoice"]["invoice_number"], expected);
    }

    let settled = app
        .request_json(
            Method::POST,
            "/api/v1/invoices",
            Some(invoice_body("buying", item)),
            StatusCode::CREATED,
        )
        .await;
    assert_eq!(settled["invoice"]["invoice_number"], "BIL-001");
}

#[tokio::test]
async fn business_identity_lands_on_the_correct_side() {
    let app = TestApp::new().await;
    let product = app.seed_product("LED Bulb", dec!(40)).await;
    let item = json!([{ "product_id": product.id, "quantity": "1", "rate": "120" }]);

    let selling = app
        .request_json(
            Method::POST,
            "/api/v1/invoices",
            Some(invoice_body("selling", item.clone())),
            StatusCode::CREATED,
        )
        .await;
    assert_eq!(selling["invoice"]["sender_name"], "Gupta Electronics");
    assert_eq!(selling["invoice"]["receiver_name"], "Sharma Traders");

    let buying = app
        .request_json(
            Method::POST,
            "/api/v1/invoices",
            Some(invoice_body("buying", item)),
            StatusCode::CREATED,
        )
        .await;
    assert_eq!(buying["invoice"]["sender_name"], "Sharma Traders");
    assert_eq!(buying["invoice"]["receiver_name"], "Gupta Electronics");
}

#[tokio::test]
async fn empty_item_list_is_rejected_with_field_detail() {
    let app = TestApp::new().await;

    let error = app
        .request_json(
            Method::POST,
            "/api/v1/invoices",
            Some(invoice_body("selling", json!([]))),
            StatusCode::BAD_REQUEST,
        )
        .await;

    let details = error["details"].as_array().expect("field details");
    assert!(details.iter().any(|d| d["field"] == "items"));
}

#[tokio::test]
async fn unknown_body_field_is_rejected() {
    let app = TestApp::new().await;
    let product = app.seed_product("Heater", dec!(5)).await;

    let mut body = invoice_body(
        "selling",
        json!([{ "product_id": product.id, "quantity": "1", "rate": "10" }]),
    );
    body["total"] = json!("999.00");

    let response = app.request(Method::POST, "/api/v1/invoices", Some(body)).await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn missing_product_aborts_settlement() {
    let app = TestApp::new().await;

    let error = app
        .request_json(
            Method::POST,
            "/api/v1/invoices",
            Some(invoice_body(
                "selling",
                json!([{ "product_id": Uuid::new_v4(), "quantity": "1", "rate": "10" }]),
            )),
            StatusCode::BAD_REQUEST,
        )
        .await;

    let details = error["details"].as_array().expect("field details");
    assert_eq!(details[0]["field"], "items[0].product_id");
}

#[tokio::test]
async fn draft_invoice_update_recomputes_totals() {
    let app = TestApp::new().await;
    let product = app.seed_product("Mixer", dec!(10)).await;

    let created = app
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
    let id = created["invoice"]["id"].as_str().expect("invoice id").to_string();

    let updated = app
        .request_json(
            Method::PUT,
            &format!("/api/v1/invoices/{}", id),
            Some(invoice_body(
                "selling",
                json!([{ "product_id": product.id, "quantity": "3", "rate": "100", "discount_percent": "10" }]),
            )),
            StatusCode::OK,
        )
        .await;

    // 3 * 100 * 0.9 = 270; + 18% tax = 318.60 -> 319 after rounding
    assert_eq!(dec_field(&updated["invoice"]["subtotal"]), dec!(270));
    assert_eq!(dec_field(&updated["invoice"]["total"]), dec!(319));
    assert_eq!(
        updated["invoice"]["invoice_number"],
        created["invoice"]["invoice_number"]
    );
    assert_eq!(updated["items"].as_array().expect("items").len(), 1);
}

#[tokio::test]
async fn non_draft_invoices_cannot_be_edited() {
    let app = TestApp::new().await;
    let product = app.seed_product("Iron Box", dec!(10)).await;
    let body = invoice_body(
        "selling",
        json!([{ "product_id": product.id, "quantity": "1", "rate": "100" }]),
    );

    let created = app
        .request_json(Method::POST, "/api/v1/invoices", Some(body.clone()), StatusCode::CREATED)
        .await;
    let id = created["invoice"]["id"].as_str().expect("invoice id").to_string();

    app.request_json(
        Method::POST,
        &format!("/api/v1/invoices/{}/status", id),
        Some(json!({ "status": "finalized" })),
        StatusCode::OK,
    )
    .await;

    app.request_json(
        Method::PUT,
        &format!("/api/v1/invoices/{}", id),
        Some(body),
        StatusCode::BAD_REQUEST,
    )
    .await;
}

#[tokio::test]
async fn status_machine_rejects_illegal_transitions() {
    let app = TestApp::new().await;
    let product = app.seed_product("Kettle", dec!(10)).await;

    let created = app
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
    let id = created["invoice"]["id"].as_str().expect("invoice id").to_string();
    let status_path = format!("/api/v1/invoices/{}/status", id);

    // draft -> paid skips finalized
    app.request_json(
        Method::POST,
        &status_path,
        Some(json!({ "status": "paid" })),
        StatusCode::BAD_REQUEST,
    )
    .await;

    app.request_json(
        Method::POST,
        &status_path,
        Some(json!({ "status": "finalized" })),
        StatusCode::OK,
    )
    .await;
    app.request_json(
        Method::POST,
        &status_path,
        Some(json!({ "status": "paid" })),
        StatusCode::OK,
    )
    .await;

    // paid is terminal
    app.request_json(
        Method::POST,
        &status_path,
        Some(json!({ "status": "cancelled" })),
        StatusCode::BAD_REQUEST,
    )
    .await;
}

#[tokio::test]
async fn fetching_an_unknown_invoice_returns_404() {
    let app = TestApp::new().await;
    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/invoices/{}", Uuid::new_v4()),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
