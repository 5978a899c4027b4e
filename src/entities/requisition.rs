use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{ApprovalStatus, ItemType, ProcurementType};

/// A material/service requisition raised against a project BOQ or a
/// general need. `requisition_number` is assigned exactly once at first
/// save and is immutable; `is_locked` is derived by the lock policy and is
/// never set directly by callers.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "requisitions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub requisition_number: String,
    pub company_id: Uuid,
    pub requisition_type: ProcurementType,
    pub item_type: ItemType,
    pub project_id: Option<Uuid>,
    pub project_name: Option<String>,
    pub requisition_date: Date,
    pub required_by_date: Date,
    pub status: ApprovalStatus,
    pub approver_id: Option<Uuid>,
    pub is_locked: bool,
    pub total_amount: Decimal,
    pub created_by: Uuid,
    pub modified_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::requisition_line::Entity")]
    Lines,
}

impl Related<super::requisition_line::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Lines.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
