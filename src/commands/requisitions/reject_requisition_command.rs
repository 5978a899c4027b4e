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
use sea_orm::{
    ActiveModelTrait, DatabaseConnection, EntityTrait, Set, TransactionError, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RejectRequisitionCommand {
    pub id: Uuid,
    pub actor_id: Uuid,
    #[validate(length(max = 1000))]
    pub comment: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RejectRequisitionResult {
    pub id: Uuid,
    pub status: String,
}

#[async_trait::async_trait]
impl Command for RejectRequisitionCommand {
    type Result = RejectRequisitionResult;

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

        let (updated, old_status) = self.reject_requisition(db_pool.as_ref()).await?;

        info!(
            requisition_id = %updated.id,
            requisition_number = %updated.requisition_number,
            "Requisition rejected"
        );

        event_sender
            .send(Event::RequisitionStatusChanged {
                requisition_id: updated.id,
                old_status,
                new_status: updated.status,
            })
            .await
            .map_err(|e| {
                let msg = format!("Failed to send event for rejected requisition: {}", e);
                error!("{}", msg);
                ServiceError::EventError(msg)
            })?;

        Ok(RejectRequisitionResult {
            id: updated.id,
            status: updated.status.to_string(),
        })
    }
}

impl RejectRequisitionCommand {
    async fn reject_requisition(
        &self,
        db: &DatabaseConnection,
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
                let new_status = workflow::apply(old_status, ApprovalAction::Reject, &ctx)?;

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
