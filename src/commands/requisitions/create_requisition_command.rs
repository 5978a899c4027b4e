use crate::{
    commands::{next_document_number, Command},
    db::DbPool,
    errors::ServiceError,
    entities::{requisition, requisition_line, ApprovalStatus, ItemType, ProcurementType},
    events::{Event, EventSender},
    reconciliation,
};
use chrono::{NaiveDate, Utc};
use lazy_static::lazy_static;
use prometheus::IntCounter;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set, TransactionError, TransactionTrait};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument};
use uuid::Uuid;
use validator::Validate;

use super::{validate_lines, RequisitionHeader, RequisitionLineInput};

lazy_static! {
    static ref REQUISITION_CREATIONS: IntCounter = IntCounter::new(
        "requisition_creations_total",
        "Total number of requisitions created"
    )
    .expect("metric can be created");
    static ref REQUISITION_CREATION_FAILURES: IntCounter = IntCounter::new(
        "requisition_creation_failures_total",
        "Total number of failed requisition creations"
    )
    .expect("metric can be created");
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateRequisitionCommand {
    pub company_id: Uuid,
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
pub struct CreateRequisitionResult {
    pub id: Uuid,
    pub requisition_number: String,
    pub status: ApprovalStatus,
    pub total_amount: Decimal,
}

#[async_trait::async_trait]
impl Command for CreateRequisitionCommand {
    type Result = CreateRequisitionResult;

    #[instrument(skip(self, db_pool, event_sender))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        self.validate().map_err(|e| {
            REQUISITION_CREATION_FAILURES.inc();
            let msg = format!("Invalid input: {}", e);
            error!("{}", msg);
            ServiceError::ValidationError(msg)
        })?;

        self.header().validate().map_err(|e| {
            REQUISITION_CREATION_FAILURES.inc();
            e
        })?;
        validate_lines(&self.lines).map_err(|e| {
            REQUISITION_CREATION_FAILURES.inc();
            e
        })?;

        let saved = self.create_requisition(db_pool.as_ref()).await?;

        self.log_and_trigger_event(&event_sender, &saved).await?;

        REQUISITION_CREATIONS.inc();

        Ok(CreateRequisitionResult {
            id: saved.id,
            requisition_number: saved.requisition_number,
            status: saved.status,
            total_amount: saved.total_amount,
        })
    }
}

impl CreateRequisitionCommand {
    fn header(&self) -> RequisitionHeader {
        RequisitionHeader {
            requisition_type: self.requisition_type,
            project_id: self.project_id,
            requisition_date: self.requisition_date,
            required_by_date: self.required_by_date,
        }
    }

    async fn create_requisition(
        &self,
        db: &DatabaseConnection,
    ) -> Result<requisition::Model, ServiceError> {
        let command = self.clone();

        db.transaction::<_, requisition::Model, ServiceError>(move |txn| {
            Box::pin(async move {
                let requisition_date = command.requisition_date.ok_or_else(|| {
                    ServiceError::MissingRequiredField("requisition date".to_string())
                })?;
                let required_by_date = command.required_by_date.ok_or_else(|| {
                    ServiceError::MissingRequiredField("required-by date".to_string())
                })?;
                let requisition_number = next_document_number(txn, "requisition", "REQ").await?;
                let now = Utc::now();
                let total_amount: Decimal = command
                    .lines
                    .iter()
                    .map(|l| reconciliation::line_amount(l.requested_qty, l.rate))
                    .sum();

                let new_requisition = requisition::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    requisition_number: Set(requisition_number.clone()),
                    company_id: Set(command.company_id),
                    requisition_type: Set(command.requisition_type),
                    item_type: Set(command.item_type),
                    project_id: Set(command.project_id),
                    project_name: Set(command.project_name.clone()),
                    requisition_date: Set(requisition_date),
                    required_by_date: Set(required_by_date),
                    status: Set(ApprovalStatus::Draft),
                    approver_id: Set(command.approver_id),
                    is_locked: Set(false),
                    total_amount: Set(total_amount),
                    created_by: Set(command.actor_id),
                    modified_by: Set(command.actor_id),
                    created_at: Set(now),
                    updated_at: Set(now),
                };

                let saved = new_requisition.insert(txn).await.map_err(|e| {
                    let msg = format!(
                        "Failed to create requisition {}: {}",
                        requisition_number, e
                    );
                    error!("{}", msg);
                    ServiceError::db_error(e)
                })?;

                for (position, line) in command.lines.iter().enumerate() {
                    requisition_line::ActiveModel {
                        id: Set(Uuid::new_v4()),
                        requisition_id: Set(saved.id),
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
                    .map_err(|e| {
                        let msg = format!(
                            "Failed to create requisition line {} for {}: {}",
                            position + 1,
                            requisition_number,
                            e
                        );
                        error!("{}", msg);
                        ServiceError::db_error(e)
                    })?;
                }

                Ok(saved)
            })
        })
        .await
        .map_err(|e| match e {
            TransactionError::Connection(db_err) => ServiceError::db_error(db_err),
            TransactionError::Transaction(service_err) => service_err,
        })
    }

    async fn log_and_trigger_event(
        &self,
        event_sender: &EventSender,
        saved: &requisition::Model,
    ) -> Result<(), ServiceError> {
        info!(
            requisition_id = %saved.id,
            requisition_number = %saved.requisition_number,
            company_id = %saved.company_id,
            lines = %self.lines.len(),
            "Requisition created successfully"
        );

        event_sender
            .send(Event::RequisitionCreated(saved.id))
            .await
            .map_err(|e| {
                REQUISITION_CREATION_FAILURES.inc();
                let msg = format!("Failed to send event for created requisition: {}", e);
                error!("{}", msg);
                ServiceError::EventError(msg)
            })
    }
}
