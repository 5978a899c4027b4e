use crate::{
    commands::Command,
    db::DbPool,
    entities::purchase_order::{self, Entity as PurchaseOrder, PurchaseOrderStatus},
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, Set};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument};
use uuid::Uuid;

/// Marks an approved PO as dispatched (`Sent`) or acknowledged by the
/// supplier (`Open`). Used by the dispatch collaborator; receipt-driven
/// states (`PartiallyReceived`, `Closed`) go through the receive command
/// instead, and the approval machine owns everything upstream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateDownstreamStatusCommand {
    pub id: Uuid,
    pub actor_id: Uuid,
    pub new_status: PurchaseOrderStatus,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateDownstreamStatusResult {
    pub id: Uuid,
    pub status: String,
}

#[async_trait::async_trait]
impl Command for UpdateDownstreamStatusCommand {
    type Result = UpdateDownstreamStatusResult;

    #[instrument(skip(self, db_pool, event_sender))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        if !matches!(
            self.new_status,
            PurchaseOrderStatus::Sent | PurchaseOrderStatus::Open
        ) {
            return Err(ServiceError::InvalidTransition(format!(
                "{} is not a dispatch status",
                self.new_status
            )));
        }

        let db: &DatabaseConnection = db_pool.as_ref();

        let existing = PurchaseOrder::find_by_id(self.id)
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Purchase order {} not found", self.id))
            })?;

        match existing.status {
            PurchaseOrderStatus::Approved | PurchaseOrderStatus::Sent | PurchaseOrderStatus::Open => {}
            other => {
                return Err(ServiceError::InvalidTransition(format!(
                    "purchase order {} cannot move to {} from {}",
                    existing.po_number, self.new_status, other
                )));
            }
        }

        let old_status = existing.status;
        let mut active: purchase_order::ActiveModel = existing.into();
        active.status = Set(self.new_status);
        active.modified_by = Set(self.actor_id);
        active.updated_at = Set(Utc::now());

        let updated: purchase_order::Model =
            active.update(db).await.map_err(ServiceError::db_error)?;

        info!(
            purchase_order_id = %updated.id,
            po_number = %updated.po_number,
            status = %updated.status,
            "Purchase order downstream status updated"
        );

        event_sender
            .send(Event::PurchaseOrderStatusChanged {
                purchase_order_id: updated.id,
                old_status,
                new_status: updated.status,
            })
            .await
            .map_err(|e| {
                let msg = format!("Failed to send event for downstream status update: {}", e);
                error!("{}", msg);
                ServiceError::EventError(msg)
            })?;

        Ok(UpdateDownstreamStatusResult {
            id: updated.id,
            status: updated.status.to_string(),
        })
    }
}
