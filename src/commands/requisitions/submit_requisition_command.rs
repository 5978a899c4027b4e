use crate::{
    commands::{append_approval_comment, Command},
    db::DbPool,
    entities::{
        requisition::{self, Entity as Requisition},
        requisition_line::{self, Entity as RequisitionLine},
        DocumentKind,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    workflow::{self, ApprovalAction, TransitionContext},
};
use chrono::Utc;
use lazy_static::lazy_static;
use prometheus::IntCounterVec;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    Set, TransactionError, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument};
use uuid::Uuid;
use validator::Validate;

lazy_static! {
    static ref REQUISITION_SUBMISSION_FAILURES: IntCounterVec = IntCounterVec::new(
        prometheus::Opts::new(
            "requisition_submission_failures_total",
            "Total number of failed requisition submissions"
        ),
        &["error_type"]
    )
    .expect("metric can be created");
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SubmitRequisitionCommand {
    pub id: Uuid,
    pub actor_id: Uuid,
    #[validate(length(max = 1000))]
    pub comment: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SubmitRequisitionResult {
    pub id: Uuid,
    pub status: String,
}

#[async_trait::async_trait]
impl Command for SubmitRequisitionCommand {
    type Result = SubmitRequisitionResult;

    #[instrument(skip(self, db_pool, event_sender))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        self.validate().map_err(|e| {
            REQUISITION_SUBMISSION_FAILURES
                .with_label_values(&["validation_error"])
                .inc();
            let msg = format!("Invalid input: {}", e);
            error!("{}", msg);
            ServiceError::ValidationError(msg)
        })?;

        let (updated, old_status) = self.submit_requisition(db_pool.as_ref()).await?;

        info!(
            requisition_id = %updated.id,
            requisition_number = %updated.requisition_number,
            "Requisition submitted for approval"
        );

        event_sender
            .send(Event::RequisitionStatusChanged {
                requisition_id: updated.id,
                old_status,
                new_status: updated.status,
            })
            .await
            .map_err(|e| {
                REQUISITION_SUBMISSION_FAILURES
                    .with_label_values(&["event_error"])
                    .inc();
                let msg = format!("Failed to send event for submitted requisition: {}", e);
                error!("{}", msg);
                ServiceError::EventError(msg)
            })?;

        Ok(SubmitRequisitionResult {
            id: updated.id,
            status: updated.status.to_string(),
        })
    }
}

impl SubmitRequisitionCommand {
    async fn submit_requisition(
        &self,
        db: &DatabaseConnection,
    ) -> Result<(requisition::Model, crate::entities::ApprovalStatus), ServiceError> {
        let command = self.clone();

        db.transaction::<_, (requisition::Model, crate::entities::ApprovalStatus), ServiceError>(
            move |txn| {
                Box::pin(async move {
                    let existing = Requisition::find_by_id(command.id)
                        .one(txn)
                        .await
                        .map_err(ServiceError::db_error)?
                        .ok_or_else(|| {
                            ServiceError::NotFound(format!("Requisition {} not found", command.id))
                        })?;

                    // Submission requires at least one valid line; a draft
                    // may be saved with none, but it cannot enter approval.
                    let line_count = RequisitionLine::find()
                        .filter(requisition_line::Column::RequisitionId.eq(existing.id))
                        .count(txn)
                        .await
                        .map_err(ServiceError::db_error)?;
                    if line_count == 0 {
                        REQUISITION_SUBMISSION_FAILURES
                            .with_label_values(&["no_lines"])
                            .inc();
                        return Err(ServiceError::MissingRequiredField(format!(
                            "requisition {} has no lines",
                            existing.requisition_number
                        )));
                    }

                    let ctx = TransitionContext {
                        actor_id: command.actor_id,
                        approver_id: existing.approver_id,
                        comment: command.comment.as_deref(),
                    };
                    let old_status = existing.status;
                    let new_status = workflow::apply(old_status, ApprovalAction::Submit, &ctx)
                        .map_err(|e| {
                            REQUISITION_SUBMISSION_FAILURES
                                .with_label_values(&["invalid_transition"])
                                .inc();
                            e
                        })?;

                    if let Some(comment) = command
                        .comment
                        .as_deref()
                        .filter(|c| !c.trim().is_empty())
                    {
                        append_approval_comment(
                            txn,
                            existing.id,
                            DocumentKind::Requisition,
                            new_status,
                            command.actor_id,
                            comment,
                        )
                        .await?;
                    }

                    let mut active: requisition::ActiveModel = existing.into();
                    active.status = Set(new_status);
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
