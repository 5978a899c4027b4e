use crate::{
    commands::{append_approval_comment, Command},
    db::DbPool,
    entities::{
        requisition::{self, Entity as Requisition},
        ApprovalStatus, DocumentKind,
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
    static ref REQUISITION_APPROVALS: IntCounter = IntCounter::new(
        "requisition_approvals_total",
        "Total number of requisitions approved"
    )
    .expect("metric can be created");
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ApproveRequisitionCommand {
    pub id: Uuid,
    pub actor_id: Uuid,
    #[validate(length(max = 1000))]
    pub comment: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApproveRequisitionResult {
    pub id: Uuid,
    pub status: String,
}

#[async_trait::async_trait]
impl Command for ApproveRequisitionCommand {
    type Result = ApproveRequisitionResult;

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

        let (updated, old_status) = self
            .apply_transition(db_pool.as_ref(), ApprovalAction::Approve)
            .await?;

        REQUISITION_APPROVALS.inc();

        info!(
            requisition_id = %updated.id,
            requisition_number = %updated.requisition_number,
            approver_id = %self.actor_id,
            "Requisition approved"
        );

        event_sender
            .send(Event::RequisitionStatusChanged {
                requisition_id: updated.id,
                old_status,
                new_status: updated.status,
            })
            .await
            .map_err(|e| {
                let msg = format!("Failed to send event for approved requisition: {}", e);
                error!("{}", msg);
                ServiceError::EventError(msg)
            })?;

        Ok(ApproveRequisitionResult {
            id: updated.id,
            status: updated.status.to_string(),
        })
    }
}

impl ApproveRequisitionCommand {
    async fn apply_transition(
        &self,
        db: &DatabaseConnection,
        action: ApprovalAction,
    ) -> Result<(requisition::Model, ApprovalStatus), ServiceError> {
        let command = self.clone();

        db.transaction::<_, (requisition::Model, ApprovalStatus), ServiceError>(move |txn| {
            Box::pin(async move {
                let existing = Requisition::find_by_id(command.id)
                    .one(txn)
                    .await
                    .map_err(ServiceError::db_error)?
                    .ok_or_else(|| {
                        ServiceError::NotFound(format!("Requisition {} not found", command.id))
                    })?;

                let ctx = TransitionContext {
                    actor_id: command.actor_id,
                    approver_id: existing.approver_id,
                    comment: Some(command.comment.as_str()),
                };
                let old_status = existing.status;
                let new_status = workflow::apply(old_status, action, &ctx)?;

                append_approval_comment(
                    txn,
                    existing.id,
                    DocumentKind::Requisition,
                    new_status,
                    command.actor_id,
                    &command.comment,
                )
                .await?;

                let mut active: requisition::ActiveModel = existing.into();
                active.status = Set(new_status);
                active.modified_by = Set(command.actor_id);
                active.updated_at = Set(Utc::now());

                let updated = active.update(txn).await.map_err(ServiceError::db_error)?;
                Ok((updated, old_status))
            })
        })
        .await
        .map_err(|e| match e {
            TransactionError::Connection(db_err) => ServiceError::db_error(db_err),
            TransactionError::Transaction(service_err) => service_err,
        })
    }
}
