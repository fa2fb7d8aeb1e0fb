//! In-process event channel for settlement and inventory notifications.
//!
//! Delivery is best-effort; business state lives in the database and the
//! structured sync result, never in these events.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    InvoiceSettled {
        invoice_id: Uuid,
        invoice_number: String,
        total: Decimal,
    },
    InvoiceStatusChanged {
        invoice_id: Uuid,
        old_status: String,
        new_status: String,
    },
    InvoiceSynced {
        invoice_id: Uuid,
    },
    InventoryUpdated {
        product_id: Uuid,
        previous_quantity: Decimal,
        new_quantity: Decimal,
    },
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event, dropping it if the consumer is gone.
    pub async fn send(&self, event: Event) {
        if let Err(e) = self.sender.send(event).await {
            tracing::warn!("event channel closed, dropping event: {}", e);
        }
    }
}

/// Create a connected sender/consumer pair with the given channel capacity.
pub fn channel(capacity: usize) -> (EventSender, mpsc::Receiver<Event>) {
    let (tx, rx) = mpsc::channel(capacity);
    (EventSender::new(tx), rx)
}

/// Consumer loop logging every event; runs until all senders drop.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    while let Some(event) = rx.recv().await {
        match &event {
            Event::InvoiceSettled {
                invoice_id,
                invoice_number,
                total,
            } => {
                info!(%invoice_id, %invoice_number, %total, "invoice settled");
            }
            Event::InvoiceStatusChanged {
                invoice_id,
                old_status,
                new_status,
            } => {
                info!(%invoice_id, %old_status, %new_status, "invoice status changed");
            }
            Event::InvoiceSynced { invoice_id } => {
                info!(%invoice_id, "invoice inventory synced");
            }
            Event::InventoryUpdated {
                product_id,
                previous_quantity,
                new_quantity,
            } => {
                info!(%product_id, %previous_quantity, %new_quantity, "inventory updated");
            }
        }
    }
}
