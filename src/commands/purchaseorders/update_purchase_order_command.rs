use crate::{
    commands::Command,
    db::DbPool,
    entities::{
        purchase_order::{self, Entity as PurchaseOrder},
        purchase_order_line::{self, Entity as PurchaseOrderLine},
        purchase_order_requisition::{self, Entity as PurchaseOrderRequisition},
        requisition::{self, Entity as Requisition},
        ApprovalStatus, ItemType, ProcurementType,
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
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{error, info, instrument};
use uuid::Uuid;
use validator::Validate;

use super::{
    recompute_requisition_locks, referenced_requisitions, validate_consumption, validate_lines,
    PurchaseOrderHeader, PurchaseOrderLineInput,
};

/// Full-document update while the PO is still mutable. The incoming line
/// set and requisition set replace the stored ones; consumption is
/// re-validated against every other PO before anything is written.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UpdatePurchaseOrderCommand {
    pub id: Uuid,
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
    pub requisitions: Vec<Uuid>,
    #[validate]
    pub lines: Vec<PurchaseOrderLineInput>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UpdatePurchaseOrderResult {
    pub id: Uuid,
    pub total_amount: Decimal,
    pub locked_requisitions: Vec<Uuid>,
}

#[async_trait::async_trait]
impl Command for UpdatePurchaseOrderCommand {
    type Result = UpdatePurchaseOrderResult;

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

        PurchaseOrderHeader {
            purchase_type: self.purchase_type,
            project_id: self.project_id,
            supplier_name: self.supplier_name.clone(),
            order_date: self.order_date,
            delivery_date: self.delivery_date,
            delivery_location: self.delivery_location.clone(),
            mode_of_payment: self.mode_of_payment.clone(),
        }
        .validate()?;
        let selected: HashSet<Uuid> = self.requisitions.iter().copied().collect();
        validate_lines(&self.lines, &selected)?;

        let (updated, lock_changes) = self.update_purchase_order(db_pool.as_ref()).await?;

        info!(
            purchase_order_id = %updated.id,
            po_number = %updated.po_number,
            "Purchase order updated successfully"
        );

        event_sender
            .send(Event::PurchaseOrderUpdated(updated.id))
            .await
            .map_err(|e| {
                let msg = format!("Failed to send event for updated purchase order: {}", e);
                error!("{}", msg);
                ServiceError::EventError(msg)
            })?;

        for (requisition_id, locked) in &lock_changes {
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

        Ok(UpdatePurchaseOrderResult {
            id: updated.id,
            total_amount: updated.total_amount,
            locked_requisitions: lock_changes
                .iter()
                .filter(|(_, locked)| *locked)
                .map(|(id, _)| *id)
                .collect(),
        })
    }
}

impl UpdatePurchaseOrderCommand {
    async fn update_purchase_order(
        &self,
        db: &DatabaseConnection,
    ) -> Result<(purchase_order::Model, Vec<(Uuid, bool)>), ServiceError> {
        let command = self.clone();

        db.transaction::<_, (purchase_order::Model, Vec<(Uuid, bool)>), ServiceError>(
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

                    // An approved PO accepts no edit of any kind; downstream
                    // states are refinements of Approved and freeze as well.
                    if !workflow::is_editable(existing.status.approval_state()) {
                        return Err(ServiceError::InvalidTransition(format!(
                            "purchase order {} cannot be edited in status {}",
                            existing.po_number, existing.status
                        )));
                    }

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
                        if req.company_id != existing.company_id {
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

                    // This PO's stored lines are about to be replaced, so
                    // they are excluded from the prior-consumption sum.
                    validate_consumption(
                        txn,
                        existing.company_id,
                        &command.lines,
                        Some(existing.id),
                    )
                    .await?;

                    // Requisitions dropped by this edit must be re-evaluated
                    // too, so their locks release.
                    let previously_touched = referenced_requisitions(txn, existing.id).await?;

                    PurchaseOrderLine::delete_many()
                        .filter(purchase_order_line::Column::PurchaseOrderId.eq(existing.id))
                        .exec(txn)
                        .await
                        .map_err(ServiceError::db_error)?;
                    PurchaseOrderRequisition::delete_many()
                        .filter(
                            purchase_order_requisition::Column::PurchaseOrderId.eq(existing.id),
                        )
                        .exec(txn)
                        .await
                        .map_err(ServiceError::db_error)?;

                    let now = Utc::now();
                    for (position, line) in command.lines.iter().enumerate() {
                        purchase_order_line::ActiveModel {
                            id: Set(Uuid::new_v4()),
                            purchase_order_id: Set(existing.id),
                            item_id: Set(line.item_id),
                            item_name: Set(line.item_name.clone()),
                            unit: Set(line.unit.clone()),
                            boq_qty: Set(line.boq_qty),
                            balance_qty: Set(line.balance_qty),
                            purchase_qty: Set(line.purchase_qty),
                            rate: Set(line.rate),
                            amount: Set(reconciliation::line_amount(
                                line.purchase_qty,
                                line.rate,
                            )),
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
                        .map_err(ServiceError::db_error)?;
                    }

                    for req in &selected {
                        purchase_order_requisition::ActiveModel {
                            id: Set(Uuid::new_v4()),
                            purchase_order_id: Set(existing.id),
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

                    let total_amount: Decimal = command
                        .lines
                        .iter()
                        .map(|l| reconciliation::line_amount(l.purchase_qty, l.rate))
                        .sum();

                    let po_id = existing.id;
                    let mut active: purchase_order::ActiveModel = existing.into();
                    active.purchase_type = Set(command.purchase_type);
                    active.item_type = Set(command.item_type);
                    active.supplier_id = Set(command.supplier_id);
                    active.supplier_name = Set(command.supplier_name.clone());
                    active.project_id = Set(command.project_id);
                    active.project_name = Set(command.project_name.clone());
                    active.order_date = Set(order_date);
                    active.delivery_date = Set(delivery_date);
                    active.delivery_location = Set(delivery_location);
                    active.mode_of_payment = Set(mode_of_payment);
                    active.approver_id = Set(command.approver_id);
                    active.total_amount = Set(total_amount);
                    active.modified_by = Set(command.actor_id);
                    active.updated_at = Set(now);

                    let updated = active.update(txn).await.map_err(|e| {
                        let msg = format!("Failed to update purchase order {}: {}", po_id, e);
                        error!("{}", msg);
                        ServiceError::db_error(e)
                    })?;

                    let mut touched: HashSet<Uuid> = previously_touched.into_iter().collect();
                    touched.extend(selected.iter().map(|r| r.id));
                    let touched: Vec<Uuid> = touched.into_iter().collect();
                    let lock_changes = recompute_requisition_locks(txn, &touched).await?;

                    Ok((updated, lock_changes))
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
