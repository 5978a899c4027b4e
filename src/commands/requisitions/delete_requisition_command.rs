use crate::{
    commands::Command,
    db::DbPool,
    entities::{
        requisition::Entity as Requisition,
        requisition_line::{self, Entity as RequisitionLine},
    },
    errors::ServiceError,
    events::{Event, EventSender},
    workflow,
};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, QueryFilter};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument};
use uuid::Uuid;

/// Deletion is permitted only while the document is still mutable
/// (Draft or Rejected); line rows are removed with the header.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteRequisitionCommand {
    pub id: Uuid,
    pub actor_id: Uuid,
}

#[async_trait::async_trait]
impl Command for DeleteRequisitionCommand {
    type Result = ();

    #[instrument(skip(self, db_pool, event_sender))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        let db: &DatabaseConnection = db_pool.as_ref();

        let existing = Requisition::find_by_id(self.id)
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Requisition {} not found", self.id)))?;

        if !workflow::is_deletable(existing.status) {
            return Err(ServiceError::InvalidTransition(format!(
                "requisition {} cannot be deleted in status {}",
                existing.requisition_number, existing.status
            )));
        }

        let requisition_number = existing.requisition_number.clone();
        RequisitionLine::delete_many()
            .filter(requisition_line::Column::RequisitionId.eq(self.id))
            .exec(db)
            .await
            .map_err(ServiceError::db_error)?;
        existing
            .delete(db)
            .await
            .map_err(ServiceError::db_error)?;

        info!(
            requisition_id = %self.id,
            requisition_number = %requisition_number,
            "Requisition deleted"
        );

        event_sender
            .send(Event::RequisitionDeleted(self.id))
            .await
            .map_err(|e| {
                let msg = format!("Failed to send event for deleted requisition: {}", e);
                error!("{}", msg);
                ServiceError::EventError(msg)
            })
    }
}
