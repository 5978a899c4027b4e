use crate::{
    commands::{next_document_number, Command},
    db::DbPool,
    entities::{
        purchase_order::{self, PurchaseOrderStatus},
        purchase_order_line, purchase_order_requisition,
        requisition::{self, Entity as Requisition},
        ApprovalStatus, ItemType, ProcurementType,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    reconciliation,
};
use chrono::{NaiveDate, Utc};
use lazy_static::lazy_static;
use prometheus::IntCounter;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
    TransactionError, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{error, info, instrument};
use uuid::Uuid;
use validator::Validate;

use super::{
    recompute_requisition_locks, validate_consumption, validate_lines, PurchaseOrderHeader,
    PurchaseOrderLineInput,
};

lazy_static! {
    static ref PO_CREATIONS: IntCounter = IntCounter::new(
        "purchase_order_creations_total",
        "Total number of purchase orders created"
    )
    .expect("metric can be created");
    static ref PO_CREATION_FAILURES: IntCounter = IntCounter::new(
        "purchase_order_creation_failures_total",
        "Total number of failed purchase order creations"
    )
    .expect("metric can be created");
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreatePurchaseOrderCommand {
    pub company_id: Uuid,
    pub actor_id: Uuid,
    pub purchase_type: ProcurementType,
    pub item_type: ItemType,
    pub supplier_id: Uuid,
    #[validate(length(min = 1, max = 255))]
    pub supplier_name: String,
    pub project_id: Option<Uuid>,
    #[validate(length(max = 255))]
    pub project_name: Option<String>,
    pub order_date: Option<NaiveDate>,
    pub delivery_date: Option<NaiveDate>,
    pub delivery_location: Option<String>,
    pub mode_of_payment: Option<String>,
    pub approver_id: Option<Uuid>,
    /// Requisitions this PO draws from; empty for a direct purchase.
    pub requisitions: Vec<Uuid>,
    #[validate]
    pub lines: Vec<PurchaseOrderLineInput>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreatePurchaseOrderResult {
    pub id: Uuid,
    pub po_number: String,
    pub status: PurchaseOrderStatus,
    pub total_amount: Decimal,
    pub locked_requisitions: Vec<Uuid>,
}

#[async_trait::async_trait]
impl Command for CreatePurchaseOrderCommand {
    type Result = CreatePurchaseOrderResult;

    #[instrument(skip(self, db_pool, event_sender))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        self.validate().map_err(|e| {
            PO_CREATION_FAILURES.inc();
            let msg = format!("Invalid input: {}", e);
            error!("{}", msg);
            ServiceError::ValidationError(msg)
        })?;

        self.header().validate().map_err(|e| {
            PO_CREATION_FAILURES.inc();
            e
        })?;
        let selected: HashSet<Uuid> = self.requisitions.iter().copied().collect();
        validate_lines(&self.lines, &selected).map_err(|e| {
            PO_CREATION_FAILURES.inc();
            e
        })?;

        let (saved, lock_changes) = self.create_purchase_order(db_pool.as_ref()).await?;

        self.log_and_trigger_events(&event_sender, &saved, &lock_changes)
            .await?;

        PO_CREATIONS.inc();

        Ok(CreatePurchaseOrderResult {
            id: saved.id,
            po_number: saved.po_number,
            status: saved.status,
            total_amount: saved.total_amount,
            locked_requisitions: lock_changes
                .iter()
                .filter(|(_, locked)| *locked)
                .map(|(id, _)| *id)
                .collect(),
        })
    }
}

impl CreatePurchaseOrderCommand {
    fn header(&self) -> PurchaseOrderHeader {
        PurchaseOrderHeader {
            purchase_type: self.purchase_type,
            project_id: self.project_id,
            supplier_name: self.supplier_name.clone(),
            order_date: self.order_date,
            delivery_date: self.delivery_date,
            delivery_location: self.delivery_location.clone(),
            mode_of_payment: self.mode_of_payment.clone(),
        }
    }

    async fn create_purchase_order(
        &self,
        db: &DatabaseConnection,
    ) -> Result<(purchase_order::Model, Vec<(Uuid, bool)>), ServiceError> {
        let command = self.clone();

        db.transaction::<_, (purchase_order::Model, Vec<(Uuid, bool)>), ServiceError>(
            move |txn| {
                Box::pin(async move {
                    let order_date = command.order_date.ok_or_else(|| {
                        ServiceError::MissingRequiredField("PO date".to_string())
                    })?;
                    let delivery_date = command.delivery_date.ok_or_else(|| {
                        ServiceError::MissingRequiredField("delivery date".to_string())
                    })?;
                    let delivery_location = command.delivery_location.clone().ok_or_else(|| {
                        ServiceError::MissingRequiredField("delivery location".to_string())
                    })?;
                    let mode_of_payment = command.mode_of_payment.clone().ok_or_else(|| {
                        ServiceError::MissingRequiredField("mode of payment".to_string())
                    })?;

                    // Snapshot the selected requisitions; each must be an
                    // approved document of the same company.
                    let selected = Requisition::find()
                        .filter(requisition::Column::Id.is_in(command.requisitions.clone()))
                        .all(txn)
                        .await
                        .map_err(ServiceError::db_error)?;
                    if selected.len() != command.requisitions.len() {
                        let found: HashSet<Uuid> = selected.iter().map(|r| r.id).collect();
                        let missing = command
                            .requisitions
                            .iter()
                            .find(|id| !found.contains(id))
                            .copied()
                            .unwrap_or_default();
                        return Err(ServiceError::NotFound(format!(
                            "Requisition {} not found",
                            missing
                        )));
                    }
                    for req in &selected {
                        if req.company_id != command.company_id {
                            return Err(ServiceError::ReferentialIntegrityFault(format!(
                                "requisition {} belongs to another company",
                                req.requisition_number
                            )));
                        }
                        if req.status != ApprovalStatus::Approved {
                            return Err(ServiceError::InvalidTransition(format!(
                                "requisition {} is not approved",
                                req.requisition_number
                            )));
                        }
                    }

                    validate_consumption(txn, command.company_id, &command.lines, None).await?;

                    let po_number = next_document_number(txn, "purchase_order", "PO").await?;
                    let now = Utc::now();
                    let total_amount: Decimal = command
                        .lines
                        .iter()
                        .map(|l| reconciliation::line_amount(l.purchase_qty, l.rate))
                        .sum();

                    let saved = purchase_order::ActiveModel {
                        id: Set(Uuid::new_v4()),
                        po_number: Set(po_number.clone()),
                        company_id: Set(command.company_id),
                        purchase_type: Set(command.purchase_type),
                        item_type: Set(command.item_type),
                        supplier_id: Set(command.supplier_id),
                        supplier_name: Set(command.supplier_name.clone()),
                        project_id: Set(command.project_id),
                        project_name: Set(command.project_name.clone()),
                        order_date: Set(order_date),
                        delivery_date: Set(delivery_date),
                        delivery_location: Set(delivery_location),
                        mode_of_payment: Set(mode_of_payment),
                        status: Set(PurchaseOrderStatus::Draft),
                        approver_id: Set(command.approver_id),
                        total_amount: Set(total_amount),
                        created_by: Set(command.actor_id),
                        modified_by: Set(command.actor_id),
                        created_at: Set(now),
                        updated_at: Set(now),
                    }
                    .insert(txn)
                    .await
                    .map_err(|e| {
                        let msg = format!(
                            "Failed to create purchase order {} for supplier {}: {}",
                            po_number, command.supplier_id, e
                        );
                        error!("{}", msg);
                        ServiceError::db_error(e)
                    })?;

                    for (position, line) in command.lines.iter().enumerate() {
                        purchase_order_line::ActiveModel {
                            id: Set(Uuid::new_v4()),
                            purchase_order_id: Set(saved.id),
                            item_id: Set(line.item_id),
                            item_name: Set(line.item_name.clone()),
                            unit: Set(line.unit.clone()),
                            boq_qty: Set(line.boq_qty),
                            balance_qty: Set(line.balance_qty),
                            purchase_qty: Set(line.purchase_qty),
                            rate: Set(line.rate),
                            amount: Set(reconciliation::line_amount(line.purchase_qty, line.rate)),
                            requisition_id: Set(line.requisition_id),
                            requisition_number: Set(line.requisition_number.clone()),
                            requisition_line_id: Set(line.requisition_line_id),
                            delivery_date: Set(line.delivery_date),
                            received_qty: Set(Decimal::ZERO),
                            position: Set(position as i32),
                            created_at: Set(now),
                            updated_at: Set(now),
                        }
                        .insert(txn)
                        .await
                        .map_err(|e| {
                            let msg = format!(
                                "Failed to create purchase order line {} for {}: {}",
                                position + 1,
                                po_number,
                                e
                            );
                            error!("{}", msg);
                            ServiceError::db_error(e)
                        })?;
                    }

                    for req in &selected {
                        purchase_order_requisition::ActiveModel {
                            id: Set(Uuid::new_v4()),
                            purchase_order_id: Set(saved.id),
                            requisition_id: Set(req.id),
                            requisition_number: Set(req.requisition_number.clone()),
                            requisition_date: Set(req.requisition_date),
                            created_by: Set(req.created_by),
                            created_at: Set(now),
                        }
                        .insert(txn)
                        .await
                        .map_err(ServiceError::db_error)?;
                    }

                    let touched: Vec<Uuid> = selected.iter().map(|r| r.id).collect();
                    let lock_changes = recompute_requisition_locks(txn, &touched).await?;

                    Ok((saved, lock_changes))
                })
            },
        )
        .await
        .map_err(|e| match e {
            TransactionError::Connection(db_err) => ServiceError::db_error(db_err),
            TransactionError::Transaction(service_err) => service_err,
        })
    }

    async fn log_and_trigger_events(
        &self,
        event_sender: &EventSender,
        saved: &purchase_order::Model,
        lock_changes: &[(Uuid, bool)],
    ) -> Result<(), ServiceError> {
        info!(
            purchase_order_id = %saved.id,
            po_number = %saved.po_number,
            supplier_id = %self.supplier_id,
            requisitions = %self.requisitions.len(),
            lines = %self.lines.len(),
            total_amount = %saved.total_amount,
            "Purchase order created successfully"
        );

        event_sender
            .send(Event::PurchaseOrderCreated(saved.id))
            .await
            .map_err(|e| {
                PO_CREATION_FAILURES.inc();
                let msg = format!("Failed to send event for created purchase order: {}", e);
                error!("{}", msg);
                ServiceError::EventError(msg)
            })?;

        for (requisition_id, locked) in lock_changes {
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

        Ok(())
    }
}
