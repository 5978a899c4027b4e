use crate::{
    commands::{append_approval_comment, Command},
    db::DbPool,
    entities::{
        purchase_order::{self, Entity as PurchaseOrder, PurchaseOrderStatus},
        DocumentKind,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    workflow::{self, ApprovalAction, TransitionContext},
};
use chrono::Utc;
use lazy_static::lazy_static;
use prometheus::IntCounter;
use sea_orm::{
    ActiveModelTrait, DatabaseConnection, EntityTrait, Set, TransactionError, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument};
use uuid::Uuid;
use validator::Validate;

lazy_static! {
    static ref PO_APPROVALS: IntCounter = IntCounter::new(
        "purchase_order_approvals_total",
        "Total number of purchase orders approved"
    )
    .expect("metric can be created");
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ApprovePurchaseOrderCommand {
    pub id: Uuid,
    pub actor_id: Uuid,
    #[validate(length(max = 1000))]
    pub comment: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApprovePurchaseOrderResult {
    pub id: Uuid,
    pub status: String,
}

#[async_trait::async_trait]
impl Command for ApprovePurchaseOrderCommand {
    type Result = ApprovePurchaseOrderResult;

    #[instrument(skip(self, db_pool, event_sender))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        self.validate().map_err(|e| {
            let msg = format!("Invalid input: {}", e);
            error!("{}", msg);
            ServiceError::ValidationError(msg)
        })?;

        let (updated, old_status) = self.approve_purchase_order(db_pool.as_ref()).await?;

        PO_APPROVALS.inc();

        info!(
            purchase_order_id = %updated.id,
            po_number = %updated.po_number,
            approver_id = %self.actor_id,
            "Purchase order approved"
        );

        event_sender
            .send(Event::PurchaseOrderStatusChanged {
                purchase_order_id: updated.id,
                old_status,
                new_status: updated.status,
            })
            .await
            .map_err(|e| {
                let msg = format!("Failed to send event for approved purchase order: {}", e);
                error!("{}", msg);
                ServiceError::EventError(msg)
            })?;

        Ok(ApprovePurchaseOrderResult {
            id: updated.id,
            status: updated.status.to_string(),
        })
    }
}

impl ApprovePurchaseOrderCommand {
    async fn approve_purchase_order(
        &self,
        db: &DatabaseConnection,
    ) -> Result<(purchase_order::Model, PurchaseOrderStatus), ServiceError> {
        let command = self.clone();

        db.transaction::<_, (purchase_order::Model, PurchaseOrderStatus), ServiceError>(
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
                        comment: Some(command.comment.as_str()),
                    };
                    let old_status = existing.status;
                    let new_approval = workflow::apply(
                        old_status.approval_state(),
                        ApprovalAction::Approve,
                        &ctx,
                    )?;

                    append_approval_comment(
                        txn,
                        existing.id,
                        DocumentKind::PurchaseOrder,
                        new_approval,
                        command.actor_id,
                        &command.comment,
                    )
                    .await?;

                    let mut active: purchase_order::ActiveModel = existing.into();
                    active.status = Set(PurchaseOrderStatus::from(new_approval));
                    active.modified_by = Set(command.actor_id);
                    active.updated_at = Set(Utc::now());

                    let updated = active.update(txn).await.map_err(ServiceError::db_error)?;
                    Ok((updated, old_status))
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
