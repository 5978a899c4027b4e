use std::collections::{HashMap, HashSet};

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::entities::{
    purchase_order::{self, PurchaseOrderStatus},
    purchase_order_line,
    requisition::{self, Entity as Requisition},
    requisition_line::{self, Entity as RequisitionLine},
    ApprovalStatus, ProcurementType,
};
use crate::errors::ServiceError;
use crate::reconciliation;

pub mod approve_purchase_order_command;
pub mod convert_purchase_order_to_draft_command;
pub mod create_purchase_order_command;
pub mod delete_purchase_order_command;
pub mod receive_purchase_order_command;
pub mod reject_purchase_order_command;
pub mod submit_purchase_order_command;
pub mod update_downstream_status_command;
pub mod update_purchase_order_command;

pub use approve_purchase_order_command::ApprovePurchaseOrderCommand;
pub use convert_purchase_order_to_draft_command::ConvertPurchaseOrderToDraftCommand;
pub use create_purchase_order_command::{CreatePurchaseOrderCommand, CreatePurchaseOrderResult};
pub use delete_purchase_order_command::DeletePurchaseOrderCommand;
pub use receive_purchase_order_command::ReceivePurchaseOrderCommand;
pub use reject_purchase_order_command::RejectPurchaseOrderCommand;
pub use submit_purchase_order_command::SubmitPurchaseOrderCommand;
pub use update_downstream_status_command::UpdateDownstreamStatusCommand;
pub use update_purchase_order_command::UpdatePurchaseOrderCommand;

/// One purchase order line as submitted by a caller. Requisition-sourced
/// lines must carry the full back-reference triple; manual lines carry none
/// of it. `amount` is always derived server-side.
#[derive(Clone, Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct PurchaseOrderLineInput {
    pub item_id: Option<Uuid>,
    #[validate(length(max = 255))]
    pub item_name: String,
    #[validate(length(max = 32))]
    pub unit: String,
    pub boq_qty: Option<Decimal>,
    pub balance_qty: Option<Decimal>,
    pub purchase_qty: Decimal,
    pub rate: Decimal,
    pub requisition_id: Option<Uuid>,
    pub requisition_number: Option<String>,
    pub requisition_line_id: Option<Uuid>,
    pub delivery_date: Option<NaiveDate>,
}

/// Header fields shared by the create and update commands. Everything here
/// is mandatory at save time; commands surface the first missing field.
#[derive(Clone, Debug)]
pub(crate) struct PurchaseOrderHeader {
    pub purchase_type: ProcurementType,
    pub project_id: Option<Uuid>,
    pub supplier_name: String,
    pub order_date: Option<NaiveDate>,
    pub delivery_date: Option<NaiveDate>,
    pub delivery_location: Option<String>,
    pub mode_of_payment: Option<String>,
}

impl PurchaseOrderHeader {
    pub(crate) fn validate(&self) -> Result<(), ServiceError> {
        if self.order_date.is_none() {
            return Err(ServiceError::MissingRequiredField("PO date".to_string()));
        }
        if self.supplier_name.trim().is_empty() {
            return Err(ServiceError::MissingRequiredField("supplier".to_string()));
        }
        if self.delivery_date.is_none() {
            return Err(ServiceError::MissingRequiredField(
                "delivery date".to_string(),
            ));
        }
        if self
            .delivery_location
            .as_deref()
            .map(str::trim)
            .unwrap_or("")
            .is_empty()
        {
            return Err(ServiceError::MissingRequiredField(
                "delivery location".to_string(),
            ));
        }
        if self
            .mode_of_payment
            .as_deref()
            .map(str::trim)
            .unwrap_or("")
            .is_empty()
        {
            return Err(ServiceError::MissingRequiredField(
                "mode of payment".to_string(),
            ));
        }
        if self.purchase_type == ProcurementType::Project && self.project_id.is_none() {
            return Err(ServiceError::MissingRequiredField("project".to_string()));
        }
        Ok(())
    }
}

/// Item-level save rules plus the referential-integrity checks binding a
/// line to its source requisition. `selected_requisitions` is the PO's
/// requisition set; every attributed line must point into it.
pub(crate) fn validate_lines(
    lines: &[PurchaseOrderLineInput],
    selected_requisitions: &HashSet<Uuid>,
) -> Result<(), ServiceError> {
    for (idx, line) in lines.iter().enumerate() {
        let row = idx + 1;
        if line.item_name.trim().is_empty() {
            return Err(ServiceError::MissingRequiredField(format!(
                "Line {}: item",
                row
            )));
        }
        if line.unit.trim().is_empty() {
            return Err(ServiceError::MissingRequiredField(format!(
                "Line {}: unit",
                row
            )));
        }
        if line.purchase_qty <= Decimal::ZERO {
            return Err(ServiceError::InvalidQuantity(format!(
                "Line {}: purchase quantity must be greater than zero",
                row
            )));
        }
        if line.requisition_number.is_some() && line.requisition_id.is_none() {
            return Err(ServiceError::ReferentialIntegrityFault(format!(
                "Line {}: requisition number without a requisition id",
                row
            )));
        }
        if let Some(req_id) = line.requisition_id {
            if line.requisition_line_id.is_none() {
                return Err(ServiceError::ReferentialIntegrityFault(format!(
                    "Line {}: requisition reference without a source line",
                    row
                )));
            }
            if !selected_requisitions.contains(&req_id) {
                return Err(ServiceError::ReferentialIntegrityFault(format!(
                    "Line {}: requisition {} is not part of this purchase order",
                    row, req_id
                )));
            }
        }
    }
    Ok(())
}

/// Sums `purchase_qty` per requisition line over every non-Rejected
/// purchase order, optionally excluding one PO (the document being saved,
/// whose stored lines are about to be replaced).
pub(crate) async fn consumed_per_requisition_line<C: ConnectionTrait>(
    conn: &C,
    requisition_line_ids: &[Uuid],
    exclude_po: Option<Uuid>,
) -> Result<HashMap<Uuid, Decimal>, ServiceError> {
    let mut consumed: HashMap<Uuid, Decimal> = HashMap::new();
    if requisition_line_ids.is_empty() {
        return Ok(consumed);
    }

    let rows = purchase_order_line::Entity::find()
        .filter(
            purchase_order_line::Column::RequisitionLineId
                .is_in(requisition_line_ids.to_vec()),
        )
        .find_also_related(purchase_order::Entity)
        .all(conn)
        .await
        .map_err(ServiceError::db_error)?;

    for (line, header) in rows {
        if Some(line.purchase_order_id) == exclude_po {
            continue;
        }
        let Some(header) = header else {
            return Err(ServiceError::ReferentialIntegrityFault(format!(
                "purchase order line {} has no parent document",
                line.id
            )));
        };
        if header.status == PurchaseOrderStatus::Rejected {
            continue;
        }
        if let Some(req_line_id) = line.requisition_line_id {
            *consumed.entry(req_line_id).or_insert(Decimal::ZERO) += line.purchase_qty;
        }
    }

    Ok(consumed)
}

/// Validates the quantities a PO save wants to draw from its source
/// requisitions: per requisition line, prior consumption (excluding this
/// PO) plus the incoming quantities must not exceed the requested
/// quantity. Runs inside the saving transaction so the read-validate-write
/// is one unit.
pub(crate) async fn validate_consumption<C: ConnectionTrait>(
    conn: &C,
    po_company_id: Uuid,
    lines: &[PurchaseOrderLineInput],
    exclude_po: Option<Uuid>,
) -> Result<(), ServiceError> {
    let referenced: Vec<Uuid> = lines
        .iter()
        .filter_map(|l| l.requisition_line_id)
        .collect();
    if referenced.is_empty() {
        return Ok(());
    }

    let source_lines = RequisitionLine::find()
        .filter(requisition_line::Column::Id.is_in(referenced.clone()))
        .all(conn)
        .await
        .map_err(ServiceError::db_error)?;
    let source_by_id: HashMap<Uuid, &requisition_line::Model> =
        source_lines.iter().map(|l| (l.id, l)).collect();

    let req_ids: Vec<Uuid> = source_lines
        .iter()
        .map(|l| l.requisition_id)
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();
    let requisitions = Requisition::find()
        .filter(requisition::Column::Id.is_in(req_ids))
        .all(conn)
        .await
        .map_err(ServiceError::db_error)?;
    let requisitions_by_id: HashMap<Uuid, &requisition::Model> =
        requisitions.iter().map(|r| (r.id, r)).collect();

    let consumed = consumed_per_requisition_line(conn, &referenced, exclude_po).await?;

    // Incoming quantities grouped by source line; if a PO splits one
    // requisition line across rows, the sum is what is checked.
    let mut incoming: HashMap<Uuid, Decimal> = HashMap::new();
    for line in lines {
        if let Some(req_line_id) = line.requisition_line_id {
            *incoming.entry(req_line_id).or_insert(Decimal::ZERO) += line.purchase_qty;
        }
    }

    for (idx, line) in lines.iter().enumerate() {
        let row = idx + 1;
        let Some(req_line_id) = line.requisition_line_id else {
            continue;
        };
        let source = source_by_id.get(&req_line_id).ok_or_else(|| {
            ServiceError::ReferentialIntegrityFault(format!(
                "Line {}: source requisition line {} does not exist",
                row, req_line_id
            ))
        })?;

        let requisition = requisitions_by_id
            .get(&source.requisition_id)
            .ok_or_else(|| {
                ServiceError::ReferentialIntegrityFault(format!(
                    "Line {}: requisition {} does not exist",
                    row, source.requisition_id
                ))
            })?;
        if Some(requisition.id) != line.requisition_id {
            return Err(ServiceError::ReferentialIntegrityFault(format!(
                "Line {}: source line belongs to requisition {}, not {}",
                row,
                requisition.requisition_number,
                line.requisition_id
                    .map(|id| id.to_string())
                    .unwrap_or_default()
            )));
        }
        if requisition.company_id != po_company_id {
            return Err(ServiceError::ReferentialIntegrityFault(format!(
                "Line {}: requisition {} belongs to another company",
                row, requisition.requisition_number
            )));
        }
        if requisition.status != ApprovalStatus::Approved {
            return Err(ServiceError::InvalidTransition(format!(
                "Line {}: requisition {} is not approved",
                row, requisition.requisition_number
            )));
        }

        let prior = consumed.get(&req_line_id).copied().unwrap_or(Decimal::ZERO);
        let wanted = incoming.get(&req_line_id).copied().unwrap_or(Decimal::ZERO);
        let available = reconciliation::balance_qty(source.requested_qty, prior);
        if wanted > available {
            return Err(ServiceError::InvalidQuantity(format!(
                "Line {}: purchase quantity {} exceeds remaining balance {}",
                row, wanted, available
            )));
        }
    }

    Ok(())
}

/// Re-evaluates the lock policy for the given requisitions after a PO
/// write: a requisition locks when every line is fully consumed, and
/// unlocks when a consuming line is removed or reduced. Returns the
/// requisitions whose flag actually flipped, with the new value.
pub(crate) async fn recompute_requisition_locks<C: ConnectionTrait>(
    conn: &C,
    requisition_ids: &[Uuid],
) -> Result<Vec<(Uuid, bool)>, ServiceError> {
    let mut changes = Vec::new();

    for requisition_id in requisition_ids {
        let Some(req) = Requisition::find_by_id(*requisition_id)
            .one(conn)
            .await
            .map_err(ServiceError::db_error)?
        else {
            continue;
        };

        let lines = RequisitionLine::find()
            .filter(requisition_line::Column::RequisitionId.eq(*requisition_id))
            .all(conn)
            .await
            .map_err(ServiceError::db_error)?;

        let requested: Vec<(Uuid, Decimal)> =
            lines.iter().map(|l| (l.id, l.requested_qty)).collect();
        let line_ids: Vec<Uuid> = lines.iter().map(|l| l.id).collect();
        let consumed = consumed_per_requisition_line(conn, &line_ids, None).await?;

        let balances = reconciliation::requisition_balances(&requested, &consumed);
        let locked = reconciliation::is_locked(&balances);

        if locked != req.is_locked {
            let mut active: requisition::ActiveModel = req.into();
            active.is_locked = Set(locked);
            active.updated_at = Set(Utc::now());
            active.update(conn).await.map_err(ServiceError::db_error)?;
            changes.push((*requisition_id, locked));
        }
    }

    Ok(changes)
}

/// Distinct requisition ids referenced by a PO's stored lines.
pub(crate) async fn referenced_requisitions<C: ConnectionTrait>(
    conn: &C,
    purchase_order_id: Uuid,
) -> Result<Vec<Uuid>, ServiceError> {
    let lines = purchase_order_line::Entity::find()
        .filter(purchase_order_line::Column::PurchaseOrderId.eq(purchase_order_id))
        .all(conn)
        .await
        .map_err(ServiceError::db_error)?;

    let ids: HashSet<Uuid> = lines.iter().filter_map(|l| l.requisition_id).collect();
    Ok(ids.into_iter().collect())
}
