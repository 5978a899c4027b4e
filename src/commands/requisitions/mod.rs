use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::entities::ProcurementType;
use crate::errors::ServiceError;

pub mod approve_requisition_command;
pub mod convert_requisition_to_draft_command;
pub mod create_requisition_command;
pub mod delete_requisition_command;
pub mod reject_requisition_command;
pub mod submit_requisition_command;
pub mod update_requisition_command;

pub use approve_requisition_command::ApproveRequisitionCommand;
pub use convert_requisition_to_draft_command::ConvertRequisitionToDraftCommand;
pub use create_requisition_command::{CreateRequisitionCommand, CreateRequisitionResult};
pub use delete_requisition_command::DeleteRequisitionCommand;
pub use reject_requisition_command::RejectRequisitionCommand;
pub use submit_requisition_command::SubmitRequisitionCommand;
pub use update_requisition_command::UpdateRequisitionCommand;

/// One requisition line as submitted by a caller. `boq_qty` is the snapshot
/// taken from the estimation entry at selection time; `amount` is never
/// accepted from callers, it is always derived.
#[derive(Clone, Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct RequisitionLineInput {
    pub item_id: Option<Uuid>,
    #[validate(length(max = 255))]
    pub item_name: String,
    #[validate(length(max = 32))]
    pub unit: String,
    pub boq_qty: Option<Decimal>,
    pub requested_qty: Decimal,
    pub rate: Decimal,
}

/// Header fields shared by the create and update commands.
#[derive(Clone, Debug)]
pub(crate) struct RequisitionHeader {
    pub requisition_type: ProcurementType,
    pub project_id: Option<Uuid>,
    pub requisition_date: Option<NaiveDate>,
    pub required_by_date: Option<NaiveDate>,
}

impl RequisitionHeader {
    pub(crate) fn validate(&self) -> Result<(), ServiceError> {
        if self.requisition_date.is_none() {
            return Err(ServiceError::MissingRequiredField(
                "requisition date".to_string(),
            ));
        }
        if self.required_by_date.is_none() {
            return Err(ServiceError::MissingRequiredField(
                "required-by date".to_string(),
            ));
        }
        if self.requisition_type == ProcurementType::Project && self.project_id.is_none() {
            return Err(ServiceError::MissingRequiredField("project".to_string()));
        }
        Ok(())
    }
}

/// Line rules applied at save time: every present line must carry an item
/// reference, a unit, and a positive requested quantity. Zero lines is
/// acceptable for a draft; submission enforces at least one.
pub(crate) fn validate_lines(lines: &[RequisitionLineInput]) -> Result<(), ServiceError> {
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
        if line.requested_qty <= Decimal::ZERO {
            return Err(ServiceError::InvalidQuantity(format!(
                "Line {}: requested quantity must be greater than zero",
                row
            )));
        }
    }
    Ok(())
}
