use crate::{
    commands::Command,
    db::DbPool,
    entities::purchase_order::{self, Entity as PurchaseOrder, PurchaseOrderStatus},
    errors::ServiceError,
    events::{Event, EventSender},
    workflow::{self, ApprovalAction, TransitionContext},
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, DatabaseConnection, EntityTrait, Set, TransactionError, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument};
use uuid::Uuid;

use super::{recompute_requisition_locks, referenced_requisitions};

/// Explicit `Rejected -> Draft` reset. The draft's lines count against
/// requisition balances again, so locks are re-evaluated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConvertPurchaseOrderToDraftCommand {
    pub id: Uuid,
    pub actor_id: Uuid,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ConvertPurchaseOrderToDraftResult {
    pub id: Uuid,
    pub status: String,
}

#[async_trait::async_trait]
impl Command for ConvertPurchaseOrderToDraftCommand {
    type Result = ConvertPurchaseOrderToDraftResult;

    #[instrument(skip(self, db_pool, event_sender))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        let (updated, old_status, lock_changes) =
            self.convert_to_draft(db_pool.as_ref()).await?;

        info!(
            purchase_order_id = %updated.id,
            po_number = %updated.po_number,
            "Purchase order converted back to draft"
        );

        event_sender
            .send(Event::PurchaseOrderStatusChanged {
                purchase_order_id: updated.id,
                old_status,
                new_status: updated.status,
            })
            .await
            .map_err(|e| {
                let msg = format!("Failed to send event for PO draft reset: {}", e);
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

        Ok(ConvertPurchaseOrderToDraftResult {
            id: updated.id,
            status: updated.status.to_string(),
        })
    }
}

impl ConvertPurchaseOrderToDraftCommand {
    #[allow(clippy::type_complexity)]
    async fn convert_to_draft(
        &self,
        db: &DatabaseConnection,
    ) -> Result<(purchase_order::Model, PurchaseOrderStatus, Vec<(Uuid, bool)>), ServiceError>
    {
        let command = self.clone();

        db.transaction::<_, (purchase_order::Model, PurchaseOrderStatus, Vec<(Uuid, bool)>), ServiceError>(
            move |txn| {
                Box::pin(async move {
                    let existing = PurchaseOrder::find_by_id(command.id)
                        .one(txn)
                        .await
                        .map_err(ServiceError::db_error)?
                        .ok_or_else(|| {
                            ServiceError::NotFound(format!(
                                "Purchase order {} not found",
                                command.id
                            ))
                        })?;

                    let ctx = TransitionContext {
                        actor_id: command.actor_id,
                        approver_id: existing.approver_id,
                        comment: None,
                    };
                    let old_status = existing.status;
                    let new_approval = workflow::apply(
                        old_status.approval_state(),
                        ApprovalAction::ConvertToDraft,
                        &ctx,
                    )?;

                    let po_id = existing.id;
                    let mut active: purchase_order::ActiveModel = existing.into();
                    active.status = Set(PurchaseOrderStatus::from(new_approval));
                    active.modified_by = Set(command.actor_id);
                    active.updated_at = Set(Utc::now());

                    let updated = active.update(txn).await.map_err(ServiceError::db_error)?;

                    let touched = referenced_requisitions(txn, po_id).await?;
                    let lock_changes = recompute_requisition_locks(txn, &touched).await?;

                    Ok((updated, old_status, lock_changes))
                })
            },
        )
        .await
        .map_err(|e| match e {
            TransactionError::Connection(db_err) => ServiceError::db_error(db_err),
            TransactionError::Transaction(service_err) => service_err,
        })
    }
}
