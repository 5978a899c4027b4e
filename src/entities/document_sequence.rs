use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Per-kind counter backing sequential document numbers (REQ-00001,
/// PO-00001). Read and bumped inside the creating transaction.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "document_sequences")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub kind: String,
    pub next_value: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
