use crate::{
    commands::Command,
    db::DbPool,
    entities::requisition::{self, Entity as Requisition},
    errors::ServiceError,
    events::{Event, EventSender},
    workflow::{self, ApprovalAction, TransitionContext},
};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, Set};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument};
use uuid::Uuid;

/// Explicit `Rejected -> Draft` reset. Items and the approver selection
/// persist so the user can amend and resubmit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConvertRequisitionToDraftCommand {
    pub id: Uuid,
    pub actor_id: Uuid,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ConvertRequisitionToDraftResult {
    pub id: Uuid,
    pub status: String,
}

#[async_trait::async_trait]
impl Command for ConvertRequisitionToDraftCommand {
    type Result = ConvertRequisitionToDraftResult;

    #[instrument(skip(self, db_pool, event_sender))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        let db = db_pool.as_ref();

        let existing = Requisition::find_by_id(self.id)
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Requisition {} not found", self.id)))?;

        let ctx = TransitionContext {
            actor_id: self.actor_id,
            approver_id: existing.approver_id,
            comment: None,
        };
        let old_status = existing.status;
        let new_status = workflow::apply(old_status, ApprovalAction::ConvertToDraft, &ctx)?;

        let mut active: requisition::ActiveModel = existing.into();
        active.status = Set(new_status);
        active.modified_by = Set(self.actor_id);
        active.updated_at = Set(Utc::now());

        let updated: requisition::Model =
            active.update(db).await.map_err(ServiceError::db_error)?;

        info!(
            requisition_id = %updated.id,
            requisition_number = %updated.requisition_number,
            "Requisition converted back to draft"
        );

        event_sender
            .send(Event::RequisitionStatusChanged {
                requisition_id: updated.id,
                old_status,
                new_status: updated.status,
            })
            .await
            .map_err(|e| {
                let msg = format!("Failed to send event for requisition draft reset: {}", e);
                error!("{}", msg);
                ServiceError::EventError(msg)
            })?;

        Ok(ConvertRequisitionToDraftResult {
            id: updated.id,
            status: updated.status.to_string(),
        })
    }
}
