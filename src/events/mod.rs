use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::entities::{purchase_order::PurchaseOrderStatus, ApprovalStatus};

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }
}

// Define the various events that can occur in the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    // Requisition events
    RequisitionCreated(Uuid),
    RequisitionUpdated(Uuid),
    RequisitionDeleted(Uuid),
    RequisitionStatusChanged {
        requisition_id: Uuid,
        old_status: ApprovalStatus,
        new_status: ApprovalStatus,
    },
    RequisitionLocked(Uuid),
    RequisitionUnlocked(Uuid),

    // Purchase order events
    PurchaseOrderCreated(Uuid),
    PurchaseOrderUpdated(Uuid),
    PurchaseOrderDeleted(Uuid),
    PurchaseOrderStatusChanged {
        purchase_order_id: Uuid,
        old_status: PurchaseOrderStatus,
        new_status: PurchaseOrderStatus,
    },
    PurchaseOrderReceiptRecorded {
        purchase_order_id: Uuid,
        fully_received: bool,
    },

    // Generic event for cases not covered above
    Generic {
        message: String,
        timestamp: DateTime<Utc>,
        metadata: serde_json::Value,
    },
}

/// Drains the event channel, logging each event. Downstream consumers
/// (notifications, webhooks) subscribe here when they are wired in.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        match &event {
            Event::RequisitionStatusChanged {
                requisition_id,
                old_status,
                new_status,
            } => {
                info!(
                    requisition_id = %requisition_id,
                    old_status = %old_status,
                    new_status = %new_status,
                    "Requisition status changed"
                );
            }
            Event::PurchaseOrderStatusChanged {
                purchase_order_id,
                old_status,
                new_status,
            } => {
                info!(
                    purchase_order_id = %purchase_order_id,
                    old_status = %old_status,
                    new_status = %new_status,
                    "Purchase order status changed"
                );
            }
            Event::RequisitionLocked(id) => {
                info!(requisition_id = %id, "Requisition fully consumed and locked");
            }
            other => {
                info!("Received event: {:?}", other);
            }
        }
    }

    warn!("Event channel closed; event processing loop exiting");
}
