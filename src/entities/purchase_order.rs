use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::{ApprovalStatus, ItemType, ProcurementType};

/// Purchase order status: the approval vocabulary plus downstream states
/// driven by the dispatch/receipt path. The approval machine never produces
/// a downstream state.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    ToSchema,
    strum::Display,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
pub enum PurchaseOrderStatus {
    #[sea_orm(string_value = "Draft")]
    Draft,
    #[sea_orm(string_value = "ApprovalRequest")]
    ApprovalRequest,
    #[sea_orm(string_value = "Approved")]
    Approved,
    #[sea_orm(string_value = "Rejected")]
    Rejected,
    #[sea_orm(string_value = "Sent")]
    Sent,
    #[sea_orm(string_value = "Open")]
    Open,
    #[sea_orm(string_value = "PartiallyReceived")]
    PartiallyReceived,
    #[sea_orm(string_value = "Closed")]
    Closed,
}

impl PurchaseOrderStatus {
    /// Projects this status onto the shared approval vocabulary. Downstream
    /// states are refinements of `Approved`, so the approval machine treats
    /// them as terminal.
    pub fn approval_state(self) -> ApprovalStatus {
        match self {
            Self::Draft => ApprovalStatus::Draft,
            Self::ApprovalRequest => ApprovalStatus::ApprovalRequest,
            Self::Rejected => ApprovalStatus::Rejected,
            Self::Approved | Self::Sent | Self::Open | Self::PartiallyReceived | Self::Closed => {
                ApprovalStatus::Approved
            }
        }
    }

    /// True for states owned by the dispatch/receipt collaborators.
    pub fn is_downstream(self) -> bool {
        matches!(
            self,
            Self::Sent | Self::Open | Self::PartiallyReceived | Self::Closed
        )
    }
}

impl From<ApprovalStatus> for PurchaseOrderStatus {
    fn from(status: ApprovalStatus) -> Self {
        match status {
            ApprovalStatus::Draft => Self::Draft,
            ApprovalStatus::ApprovalRequest => Self::ApprovalRequest,
            ApprovalStatus::Approved => Self::Approved,
            ApprovalStatus::Rejected => Self::Rejected,
        }
    }
}

/// A supplier-facing purchase order, either direct (all lines manual) or
/// derived from one or more approved requisitions. `po_number` is assigned
/// exactly once at first save.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "purchase_orders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub po_number: String,
    pub company_id: Uuid,
    pub purchase_type: ProcurementType,
    pub item_type: ItemType,
    pub supplier_id: Uuid,
    pub supplier_name: String,
    pub project_id: Option<Uuid>,
    pub project_name: Option<String>,
    pub order_date: Date,
    pub delivery_date: Date,
    pub delivery_location: String,
    pub mode_of_payment: String,
    pub status: PurchaseOrderStatus,
    pub approver_id: Option<Uuid>,
    pub total_amount: Decimal,
    pub created_by: Uuid,
    pub modified_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::purchase_order_line::Entity")]
    Lines,
    #[sea_orm(has_many = "super::purchase_order_requisition::Entity")]
    Requisitions,
}

impl Related<super::purchase_order_line::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Lines.def()
    }
}

impl Related<super::purchase_order_requisition::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Requisitions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
