use crate::{
    commands::{append_approval_comment, Command},
    db::DbPool,
    entities::{
        purchase_order::{self, Entity as PurchaseOrder, PurchaseOrderStatus},
        purchase_order_line::{self, Entity as PurchaseOrderLine},
        DocumentKind,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    workflow::{self, ApprovalAction, TransitionContext},
};
use chrono::Utc;
use lazy_static::lazy_static;
use prometheus::{IntCounter, IntCounterVec};
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
    static ref PO_SUBMISSIONS: IntCounter = IntCounter::new(
        "purchase_order_submissions_total",
        "Total number of purchase orders submitted"
    )
    .expect("metric can be created");
    static ref PO_SUBMISSION_FAILURES: IntCounterVec = IntCounterVec::new(
        prometheus::Opts::new(
            "purchase_order_submission_failures_total",
            "Total number of failed purchase order submissions"
        ),
        &["error_type"]
    )
    .expect("metric can be created");
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SubmitPurchaseOrderCommand {
    pub id: Uuid,
    pub actor_id: Uuid,
    #[validate(length(max = 1000))]
    pub comment: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SubmitPurchaseOrderResult {
    pub id: Uuid,
    pub status: String,
    pub submitted_at: chrono::DateTime<Utc>,
}

#[async_trait::async_trait]
impl Command for SubmitPurchaseOrderCommand {
    type Result = SubmitPurchaseOrderResult;

    #[instrument(skip(self, db_pool, event_sender))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        self.validate().map_err(|e| {
            PO_SUBMISSION_FAILURES
                .with_label_values(&["validation_error"])
                .inc();
            let msg = format!("Invalid input: {}", e);
            error!("{}", msg);
            ServiceError::ValidationError(msg)
        })?;

        let (updated, old_status) = self.submit_purchase_order(db_pool.as_ref()).await?;

        PO_SUBMISSIONS.inc();

        info!(
            purchase_order_id = %updated.id,
            po_number = %updated.po_number,
            "Purchase order submitted for approval"
        );

        event_sender
            .send(Event::PurchaseOrderStatusChanged {
                purchase_order_id: updated.id,
                old_status,
                new_status: updated.status,
            })
            .await
            .map_err(|e| {
                PO_SUBMISSION_FAILURES
                    .with_label_values(&["event_error"])
                    .inc();
                let msg = format!("Failed to send event for submitted purchase order: {}", e);
                error!("{}", msg);
                ServiceError::EventError(msg)
            })?;

        Ok(SubmitPurchaseOrderResult {
            id: updated.id,
            status: updated.status.to_string(),
            submitted_at: updated.updated_at,
        })
    }
}

impl SubmitPurchaseOrderCommand {
    async fn submit_purchase_order(
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
                        .map_err(|e| {
                            PO_SUBMISSION_FAILURES
                                .with_label_values(&["db_error"])
                                .inc();
                            ServiceError::db_error(e)
                        })?
                        .ok_or_else(|| {
                            PO_SUBMISSION_FAILURES
                                .with_label_values(&["not_found"])
                                .inc();
                            ServiceError::NotFound(format!(
                                "Purchase order {} not found",
                                command.id
                            ))
                        })?;

                    let line_count = PurchaseOrderLine::find()
                        .filter(purchase_order_line::Column::PurchaseOrderId.eq(existing.id))
                        .count(txn)
                        .await
                        .map_err(ServiceError::db_error)?;
                    if line_count == 0 {
                        PO_SUBMISSION_FAILURES
                            .with_label_values(&["no_lines"])
                            .inc();
                        return Err(ServiceError::MissingRequiredField(format!(
                            "purchase order {} has no lines",
                            existing.po_number
                        )));
                    }

                    let ctx = TransitionContext {
                        actor_id: command.actor_id,
                        approver_id: existing.approver_id,
                        comment: command.comment.as_deref(),
                    };
                    let old_status = existing.status;
                    let new_approval = workflow::apply(
                        old_status.approval_state(),
                        ApprovalAction::Submit,
                        &ctx,
                    )
                    .map_err(|e| {
                        PO_SUBMISSION_FAILURES
                            .with_label_values(&["invalid_transition"])
                            .inc();
                        e
                    })?;
                    let new_status = PurchaseOrderStatus::from(new_approval);

                    if let Some(comment) = command
                        .comment
                        .as_deref()
                        .filter(|c| !c.trim().is_empty())
                    {
                        append_approval_comment(
                            txn,
                            existing.id,
                            DocumentKind::PurchaseOrder,
                            new_approval,
                            command.actor_id,
                            comment,
                        )
                        .await?;
                    }

                    let mut active: purchase_order::ActiveModel = existing.into();
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
