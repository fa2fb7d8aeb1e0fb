use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, Response, StatusCode},
    Router,
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ActiveValue::Set};
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

use gstbill_api::{
    config::{AppConfig, BusinessProfile},
    db,
    entities::products,
    events,
    AppState,
};

/// Harness backed by a fresh in-memory SQLite database per test. The pool is
/// pinned to a single connection so every query sees the same database.
pub struct TestApp {
    router: Router,
    pub state: Arc<AppState>,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    pub async fn new() -> Self {
        let mut cfg = AppConfig::new(
            "sqlite::memory:".to_string(),
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;
        cfg.business = test_business_profile();

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let (event_sender, event_rx) = events::channel(256);
        let event_task = tokio::spawn(events::process_events(event_rx));

        let state = Arc::new(AppState::new(Arc::new(pool), cfg, Some(event_sender)));
        let router = gstbill_api::app_router(state.clone());

        Self {
            router,
            state,
            _event_task: event_task,
        }
    }

    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Response<Body> {
        let mut builder = Request::builder().method(method).uri(path);
        let request = match body {
            Some(json) => {
                builder = builder.header("content-type", "application/json");
                builder
                    .body(Body::from(json.to_string()))
                    .expect("build request")
            }
            None => builder.body(Body::empty()).expect("build request"),
        };

        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error")
    }

    /// Issue a request and parse the JSON response, asserting the status.
    pub async fn request_json(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        expected: StatusCode,
    ) -> Value {
        let response = self.request(method, path, body).await;
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read response body");
        assert_eq!(
            status,
            expected,
            "unexpected status, body: {}",
            String::from_utf8_lossy(&bytes)
        );
        serde_json::from_slice(&bytes).expect("parse response json")
    }

    /// Insert a product directly and return its record.
    pub async fn seed_product(&self, name: &str, quantity: Decimal) -> products::Model {
        let now = Utc::now();
        products::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.to_string()),
            hsn_code: Set(Some("8504".to_string())),
            quantity: Set(quantity),
            buying_price: Set(Decimal::new(8000, 2)),
            selling_price: Set(Decimal::new(10000, 2)),
            wholesale_price: Set(Decimal::new(9000, 2)),
            mrp: Set(Decimal::new(12000, 2)),
            discount_percent: Set(Decimal::ZERO),
            tax_rate: Set(Decimal::new(1800, 2)),
            is_active: Set(true),
            version: Set(0),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.state.db)
        .await
        .expect("seed product")
    }
}

pub fn test_business_profile() -> BusinessProfile {
    BusinessProfile {
        name: "Gupta Electronics".to_string(),
        address: "Shop 4, Market Yard, Pune".to_string(),
        gstin: "27AABCG0000B1Z9".to_string(),
        contact: "+91-9700000000".to_string(),
    }
}
