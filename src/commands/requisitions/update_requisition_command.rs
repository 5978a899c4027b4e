use crate::{
    commands::Command,
    db::DbPool,
    entities::{
        requisition::{self, Entity as Requisition},
        requisition_line::{self, Entity as RequisitionLine},
        ItemType, ProcurementType,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    reconciliation, workflow,
};
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
    TransactionError, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument};
use uuid::Uuid;
use validator::Validate;

use super::{validate_lines, RequisitionHeader, RequisitionLineInput};

/// Full-document update. The incoming line set replaces the stored one, so
/// a changed `item_type` or `requisition_type` context naturally discards
/// lines that belonged to the previous catalog.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UpdateRequisitionCommand {
    pub id: Uuid,
    pub actor_id: Uuid,
    pub requisition_type: ProcurementType,
    pub item_type: ItemType,
    pub project_id: Option<Uuid>,
    #[validate(length(max = 255))]
    pub project_name: Option<String>,
    pub requisition_date: Option<NaiveDate>,
    pub required_by_date: Option<NaiveDate>,
    pub approver_id: Option<Uuid>,
    #[validate]
    pub lines: Vec<RequisitionLineInput>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateRequisitionResult {
    pub id: Uuid,
    pub total_amount: Decimal,
}

#[async_trait::async_trait]
impl Command for UpdateRequisitionCommand {
    type Result = UpdateRequisitionResult;

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

        RequisitionHeader {
            requisition_type: self.requisition_type,
            project_id: self.project_id,
            requisition_date: self.requisition_date,
            required_by_date: self.required_by_date,
        }
        .validate()?;
        validate_lines(&self.lines)?;

        let updated = self.update_requisition(db_pool.as_ref()).await?;

        info!(requisition_id = %updated.id, "Requisition updated successfully");

        event_sender
            .send(Event::RequisitionUpdated(updated.id))
            .await
            .map_err(|e| {
                let msg = format!("Failed to send event for updated requisition: {}", e);
                error!("{}", msg);
                ServiceError::EventError(msg)
            })?;

        Ok(UpdateRequisitionResult {
            id: updated.id,
            total_amount: updated.total_amount,
        })
    }
}

impl UpdateRequisitionCommand {
    async fn update_requisition(
        &self,
        db: &DatabaseConnection,
    ) -> Result<requisition::Model, ServiceError> {
        let command = self.clone();

        db.transaction::<_, requisition::Model, ServiceError>(move |txn| {
            Box::pin(async move {
                let existing = Requisition::find_by_id(command.id)
                    .one(txn)
                    .await
                    .map_err(ServiceError::db_error)?
                    .ok_or_else(|| {
                        ServiceError::NotFound(format!("Requisition {} not found", command.id))
                    })?;

                if !workflow::is_editable(existing.status) {
                    return Err(ServiceError::InvalidTransition(format!(
                        "requisition {} cannot be edited in status {}",
                        existing.requisition_number, existing.status
                    )));
                }

                let requisition_date = command.requisition_date.ok_or_else(|| {
                    ServiceError::MissingRequiredField("requisition date".to_string())
                })?;
                let required_by_date = command.required_by_date.ok_or_else(|| {
                    ServiceError::MissingRequiredField("required-by date".to_string())
                })?;

                let now = Utc::now();
                let total_amount: Decimal = command
                    .lines
                    .iter()
                    .map(|l| reconciliation::line_amount(l.requested_qty, l.rate))
                    .sum();

                // Replace the stored line set wholesale; amounts are
                // re-derived, never trusted from the caller.
                RequisitionLine::delete_many()
                    .filter(requisition_line::Column::RequisitionId.eq(existing.id))
                    .exec(txn)
                    .await
                    .map_err(ServiceError::db_error)?;

                for (position, line) in command.lines.iter().enumerate() {
                    requisition_line::ActiveModel {
                        id: Set(Uuid::new_v4()),
                        requisition_id: Set(existing.id),
                        item_id: Set(line.item_id),
                        item_name: Set(line.item_name.clone()),
                        unit: Set(line.unit.clone()),
                        boq_qty: Set(line.boq_qty),
                        requested_qty: Set(line.requested_qty),
                        rate: Set(line.rate),
                        amount: Set(reconciliation::line_amount(line.requested_qty, line.rate)),
                        position: Set(position as i32),
                        created_at: Set(now),
                        updated_at: Set(now),
                    }
                    .insert(txn)
                    .await
                    .map_err(ServiceError::db_error)?;
                }

                let requisition_id = existing.id;
                let mut active: requisition::ActiveModel = existing.into();
                active.requisition_type = Set(command.requisition_type);
                active.item_type = Set(command.item_type);
                active.project_id = Set(command.project_id);
                active.project_name = Set(command.project_name.clone());
                active.requisition_date = Set(requisition_date);
                active.required_by_date = Set(required_by_date);
                active.approver_id = Set(command.approver_id);
                active.total_amount = Set(total_amount);
                active.modified_by = Set(command.actor_id);
                active.updated_at = Set(now);

                active.update(txn).await.map_err(|e| {
                    let msg = format!("Failed to update requisition {}: {}", requisition_id, e);
                    error!("{}", msg);
                    ServiceError::db_error(e)
                })
            })
        })
        .await
        .map_err(|e| match e {
            TransactionError::Connection(db_err) => ServiceError::db_error(db_err),
            TransactionError::Transaction(service_err) => service_err,
        })
    }
}
