use crate::{
    commands::Command,
    db::DbPool,
    entities::{
        purchase_order::Entity as PurchaseOrder,
        purchase_order_line::{self, Entity as PurchaseOrderLine},
        purchase_order_requisition::{self, Entity as PurchaseOrderRequisition},
    },
    errors::ServiceError,
    events::{Event, EventSender},
    workflow,
};
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, QueryFilter, TransactionError,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument};
use uuid::Uuid;

use super::{recompute_requisition_locks, referenced_requisitions};

/// Deleting a draft/rejected PO releases whatever balance its lines were
/// holding, so referenced requisitions are re-evaluated for unlocking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeletePurchaseOrderCommand {
    pub id: Uuid,
    pub actor_id: Uuid,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeletePurchaseOrderResult {
    pub unlocked_requisitions: Vec<Uuid>,
}

#[async_trait::async_trait]
impl Command for DeletePurchaseOrderCommand {
    type Result = DeletePurchaseOrderResult;

    #[instrument(skip(self, db_pool, event_sender))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        let lock_changes = self.delete_purchase_order(db_pool.as_ref()).await?;

        info!(purchase_order_id = %self.id, "Purchase order deleted");

        event_sender
            .send(Event::PurchaseOrderDeleted(self.id))
            .await
            .map_err(|e| {
                let msg = format!("Failed to send event for deleted purchase order: {}", e);
                error!("{}", msg);
                ServiceError::EventError(msg)
            })?;

        for (requisition_id, locked) in &lock_changes {
            let event = if *locked {
                Event::RequisitionLocked(*requisition_id)
            } else {
                Event::RequisitionUnlocked(*requisition_id)
            };
            event_sender
                .send(event)
                .await
                .map_err(ServiceError::EventError)?;
        }

        Ok(DeletePurchaseOrderResult {
            unlocked_requisitions: lock_changes
                .iter()
                .filter(|(_, locked)| !*locked)
                .map(|(id, _)| *id)
                .collect(),
        })
    }
}

impl DeletePurchaseOrderCommand {
    async fn delete_purchase_order(
        &self,
        db: &DatabaseConnection,
    ) -> Result<Vec<(Uuid, bool)>, ServiceError> {
        let command = self.clone();

        db.transaction::<_, Vec<(Uuid, bool)>, ServiceError>(move |txn| {
            Box::pin(async move {
                let existing = PurchaseOrder::find_by_id(command.id)
                    .one(txn)
                    .await
                    .map_err(ServiceError::db_error)?
                    .ok_or_else(|| {
                        ServiceError::NotFound(format!("Purchase order {} not found", command.id))
                    })?;

                if !workflow::is_deletable(existing.status.approval_state()) {
                    return Err(ServiceError::InvalidTransition(format!(
                        "purchase order {} cannot be deleted in status {}",
                        existing.po_number, existing.status
                    )));
                }

                let touched = referenced_requisitions(txn, existing.id).await?;

                PurchaseOrderLine::delete_many()
                    .filter(purchase_order_line::Column::PurchaseOrderId.eq(existing.id))
                    .exec(txn)
                    .await
                    .map_err(ServiceError::db_error)?;
                PurchaseOrderRequisition::delete_many()
                    .filter(purchase_order_requisition::Column::PurchaseOrderId.eq(existing.id))
                    .exec(txn)
                    .await
                    .map_err(ServiceError::db_error)?;
                existing.delete(txn).await.map_err(ServiceError::db_error)?;

                recompute_requisition_locks(txn, &touched).await
            })
        })
        .await
        .map_err(|e| match e {
            TransactionError::Connection(db_err) => ServiceError::db_error(db_err),
            TransactionError::Transaction(service_err) => service_err,
        })
    }
}
