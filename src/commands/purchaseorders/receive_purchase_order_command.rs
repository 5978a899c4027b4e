use crate::{
    commands::Command,
    db::DbPool,
    entities::purchase_order::{self, Entity as PurchaseOrder, PurchaseOrderStatus},
    entities::purchase_order_line::{self, Entity as PurchaseOrderLine},
    errors::ServiceError,
    events::{Event, EventSender},
    reconciliation,
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
    TransactionError, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Direction of a recorded movement: goods arriving from the supplier, or
/// goods going back (short delivery, damage).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum AdjustmentType {
    Receipt,
    Return,
}

impl Default for AdjustmentType {
    fn default() -> Self {
        Self::Receipt
    }
}

/// Received quantity for one PO line.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReceiptLineInput {
    pub line_id: Uuid,
    pub received_qty: Decimal,
    #[serde(default)]
    pub adjustment_type: AdjustmentType,
}

/// Records a goods receipt against an approved (or already dispatched) PO.
/// This is the only path that produces the `PartiallyReceived` and `Closed`
/// statuses; the approval machine never does.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ReceivePurchaseOrderCommand {
    pub id: Uuid,
    pub actor_id: Uuid,
    pub items_received: Vec<ReceiptLineInput>,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReceivePurchaseOrderResult {
    pub id: Uuid,
    pub status: String,
    pub fully_received: bool,
}

#[async_trait::async_trait]
impl Command for ReceivePurchaseOrderCommand {
    type Result = ReceivePurchaseOrderResult;

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
        if self.items_received.is_empty() {
            return Err(ServiceError::MissingRequiredField(
                "received items".to_string(),
            ));
        }

        let (updated, old_status) = self.record_receipt(db_pool.as_ref()).await?;
        let fully_received = updated.status == PurchaseOrderStatus::Closed;

        info!(
            purchase_order_id = %updated.id,
            po_number = %updated.po_number,
            status = %updated.status,
            "Purchase order receipt recorded"
        );

        if old_status != updated.status {
            event_sender
                .send(Event::PurchaseOrderStatusChanged {
                    purchase_order_id: updated.id,
                    old_status,
                    new_status: updated.status,
                })
                .await
                .map_err(ServiceError::EventError)?;
        }

        event_sender
            .send(Event::PurchaseOrderReceiptRecorded {
                purchase_order_id: updated.id,
                fully_received,
            })
            .await
            .map_err(|e| {
                let msg = format!("Failed to send event for PO receipt: {}", e);
                error!("{}", msg);
                ServiceError::EventError(msg)
            })?;

        Ok(ReceivePurchaseOrderResult {
            id: updated.id,
            status: updated.status.to_string(),
            fully_received,
        })
    }
}

impl ReceivePurchaseOrderCommand {
    async fn record_receipt(
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
                        .map_err(ServiceError::db_error)?
                        .ok_or_else(|| {
                            ServiceError::NotFound(format!(
                                "Purchase order {} not found",
                                command.id
                            ))
                        })?;

                    // Closed stays in the set so supplier returns can still
                    // be recorded; further receipts fail on the outstanding
                    // check anyway.
                    if !existing.status.is_downstream()
                        && existing.status != PurchaseOrderStatus::Approved
                    {
                        return Err(ServiceError::InvalidTransition(format!(
                            "purchase order {} cannot receive goods in status {}",
                            existing.po_number, existing.status
                        )));
                    }

                    let lines = PurchaseOrderLine::find()
                        .filter(purchase_order_line::Column::PurchaseOrderId.eq(existing.id))
                        .all(txn)
                        .await
                        .map_err(ServiceError::db_error)?;

                    for receipt in &command.items_received {
                        if receipt.received_qty <= Decimal::ZERO {
                            return Err(ServiceError::InvalidQuantity(format!(
                                "received quantity for line {} must be greater than zero",
                                receipt.line_id
                            )));
                        }
                    }

                    let now = Utc::now();
                    let mut updated_lines = Vec::with_capacity(lines.len());
                    for line in lines {
                        // Receipts add, returns subtract; the net movement
                        // is what gets applied.
                        let delta = command
                            .items_received
                            .iter()
                            .filter(|r| r.line_id == line.id)
                            .map(|r| match r.adjustment_type {
                                AdjustmentType::Receipt => r.received_qty,
                                AdjustmentType::Return => -r.received_qty,
                            })
                            .sum::<Decimal>();

                        if delta == Decimal::ZERO {
                            updated_lines.push(line);
                            continue;
                        }

                        let new_received = line.received_qty + delta;
                        if new_received < Decimal::ZERO {
                            return Err(ServiceError::InvalidQuantity(format!(
                                "return exceeds received quantity {} on line {}",
                                line.received_qty, line.id
                            )));
                        }
                        if new_received > line.purchase_qty {
                            let outstanding = reconciliation::balance_qty(
                                line.purchase_qty,
                                line.received_qty,
                            );
                            return Err(ServiceError::InvalidQuantity(format!(
                                "received quantity {} exceeds outstanding {} on line {}",
                                delta, outstanding, line.id
                            )));
                        }

                        let mut active: purchase_order_line::ActiveModel = line.clone().into();
                        active.received_qty = Set(new_received);
                        active.updated_at = Set(now);
                        let saved =
                            active.update(txn).await.map_err(ServiceError::db_error)?;
                        updated_lines.push(saved);
                    }

                    // Unknown line ids are a caller error, not a silent skip.
                    for receipt in &command.items_received {
                        if !updated_lines.iter().any(|l| l.id == receipt.line_id) {
                            return Err(ServiceError::ReferentialIntegrityFault(format!(
                                "line {} does not belong to purchase order {}",
                                receipt.line_id, command.id
                            )));
                        }
                    }

                    let fully_received = updated_lines
                        .iter()
                        .all(|l| l.received_qty >= l.purchase_qty);
                    let any_received = updated_lines
                        .iter()
                        .any(|l| l.received_qty > Decimal::ZERO);
                    let new_status = if fully_received {
                        PurchaseOrderStatus::Closed
                    } else if any_received {
                        PurchaseOrderStatus::PartiallyReceived
                    } else {
                        // Everything returned; the order is back to waiting
                        // on the supplier.
                        match existing.status {
                            PurchaseOrderStatus::PartiallyReceived
                            | PurchaseOrderStatus::Closed => PurchaseOrderStatus::Open,
                            other => other,
                        }
                    };

                    let old_status = existing.status;
                    let mut active: purchase_order::ActiveModel = existing.into();
                    active.status = Set(new_status);
                    active.modified_by = Set(command.actor_id);
                    active.updated_at = Set(now);

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
