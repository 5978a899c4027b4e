//! Sea-ORM entities for the procurement document store.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub mod approval_comment;
pub mod document_sequence;
pub mod purchase_order;
pub mod purchase_order_line;
pub mod purchase_order_requisition;
pub mod requisition;
pub mod requisition_line;

/// Approval vocabulary shared by requisitions and purchase orders.
///
/// This is the full status set for a requisition; purchase orders extend it
/// with downstream states (see [`purchase_order::PurchaseOrderStatus`]).
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
pub enum ApprovalStatus {
    #[sea_orm(string_value = "Draft")]
    Draft,
    #[sea_orm(string_value = "ApprovalRequest")]
    ApprovalRequest,
    #[sea_orm(string_value = "Approved")]
    Approved,
    #[sea_orm(string_value = "Rejected")]
    Rejected,
}

/// Which item catalog a document draws from. Switching this on a document
/// clears its lines; cross-type lines are invalid.
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
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum ItemType {
    #[sea_orm(string_value = "Material")]
    Material,
    #[sea_orm(string_value = "Service")]
    Service,
}

/// Whether a document is raised against a project's BOQ or a general need.
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
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum ProcurementType {
    #[sea_orm(string_value = "Project")]
    Project,
    #[sea_orm(string_value = "General")]
    General,
}

/// Discriminator for the shared approval-comment log.
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
pub enum DocumentKind {
    #[sea_orm(string_value = "Requisition")]
    Requisition,
    #[sea_orm(string_value = "PurchaseOrder")]
    PurchaseOrder,
}
