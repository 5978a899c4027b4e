use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One line of a purchase order. Requisition-sourced lines carry the
/// back-reference triple (`requisition_id`, `requisition_number`,
/// `requisition_line_id`) plus `balance_qty` snapshotted at selection time;
/// manual lines carry none of these. `amount` is always
/// `purchase_qty * rate`.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "purchase_order_lines")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub purchase_order_id: Uuid,
    pub item_id: Option<Uuid>,
    pub item_name: String,
    pub unit: String,
    pub boq_qty: Option<Decimal>,
    pub balance_qty: Option<Decimal>,
    pub purchase_qty: Decimal,
    pub rate: Decimal,
    pub amount: Decimal,
    pub requisition_id: Option<Uuid>,
    pub requisition_number: Option<String>,
    pub requisition_line_id: Option<Uuid>,
    pub delivery_date: Option<Date>,
    pub received_qty: Decimal,
    pub position: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::purchase_order::Entity",
        from = "Column::PurchaseOrderId",
        to = "super::purchase_order::Column::Id"
    )]
    PurchaseOrder,
}

impl Related<super::purchase_order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PurchaseOrder.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
