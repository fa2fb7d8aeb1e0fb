pub mod health;
pub mod invoices;

use std::sync::Arc;

use crate::{
    auth::{ConfigIdentityProvider, IdentityProvider},
    config::AppConfig,
    db::DbPool,
    events::EventSender,
    services::{inventory_sync::InventorySyncService, settlement::InvoiceSettlementService},
};

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers.
#[derive(Clone)]
pub struct AppServices {
    pub settlement: Arc<InvoiceSettlementService>,
    pub inventory_sync: Arc<InventorySyncService>,
}

impl AppServices {
    pub fn new(db: Arc<DbPool>, config: &AppConfig, event_sender: Option<EventSender>) -> Self {
        let identity: Arc<dyn IdentityProvider> =
            Arc::new(ConfigIdentityProvider::new(&config.business));
        Self::with_identity(db, identity, event_sender)
    }

    /// Wiring point for tests that substitute the business identity.
    pub fn with_identity(
        db: Arc<DbPool>,
        identity: Arc<dyn IdentityProvider>,
        event_sender: Option<EventSender>,
    ) -> Self {
        let inventory_sync = InventorySyncService::new(db.clone(), event_sender.clone());
        let settlement = Arc::new(InvoiceSettlementService::new(
            db,
            identity,
            inventory_sync.clone(),
            event_sender,
        ));
        Self {
            settlement,
            inventory_sync: Arc::new(inventory_sync),
        }
    }
}
