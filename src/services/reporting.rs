use std::collections::BTreeMap;
use std::sync::Arc;

use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use serde::Serialize;
use tracing::instrument;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    db::DbPool,
    entities::{
        purchase_order::{self, Entity as PurchaseOrder, PurchaseOrderStatus},
        purchase_order_line::{self, Entity as PurchaseOrderLine},
        requisition::{self, Entity as Requisition},
        requisition_line::{self, Entity as RequisitionLine},
        ApprovalStatus,
    },
    errors::ServiceError,
    reconciliation::ItemReconciliation,
    services::estimation::EstimationProvider,
};

/// One row of the per-project procurement summary: the
/// Estimated -> Requisitioned -> Purchased -> Received chain for an item.
#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct ItemProcurementSummary {
    pub item_id: Option<Uuid>,
    pub item_name: String,
    pub unit: String,
    #[serde(flatten)]
    pub quantities: ItemReconciliation,
}

/// Read-only projection joining estimation, requisition, purchase order,
/// and receipt quantities. Never writes; every number funnels through the
/// reconciliation engine so dashboards and documents agree.
#[derive(Clone)]
pub struct ReportingService {
    db_pool: Arc<DbPool>,
    estimation: Arc<dyn EstimationProvider>,
}

impl ReportingService {
    pub fn new(db_pool: Arc<DbPool>, estimation: Arc<dyn EstimationProvider>) -> Self {
        Self {
            db_pool,
            estimation,
        }
    }

    /// Per-item quantity chain for a project. Rejected documents do not
    /// contribute; issued quantities come from the issue collaborator and
    /// are zero until one is wired in.
    #[instrument(skip(self))]
    pub async fn procurement_summary(
        &self,
        company_id: Uuid,
        project_id: Uuid,
    ) -> Result<Vec<ItemProcurementSummary>, ServiceError> {
        let db = &*self.db_pool;

        // Keyed by item id when present, otherwise by (free-text) name.
        let mut rows: BTreeMap<String, ItemProcurementSummary> = BTreeMap::new();
        let key_for = |item_id: Option<Uuid>, name: &str| match item_id {
            Some(id) => id.to_string(),
            None => format!("name:{}", name),
        };

        for req in self.estimation.material_requirements(project_id).await? {
            let key = key_for(Some(req.material_id), &req.material_name);
            rows.entry(key).or_insert_with(|| ItemProcurementSummary {
                item_id: Some(req.material_id),
                item_name: req.material_name.clone(),
                unit: req.unit.clone(),
                quantities: ItemReconciliation {
                    estimated_qty: req.total_qty,
                    ..Default::default()
                },
            });
        }

        let requisitions = Requisition::find()
            .filter(requisition::Column::CompanyId.eq(company_id))
            .filter(requisition::Column::ProjectId.eq(project_id))
            .filter(requisition::Column::Status.ne(ApprovalStatus::Rejected))
            .all(db)
            .await
            .map_err(ServiceError::DatabaseError)?;
        let requisition_ids: Vec<Uuid> = requisitions.iter().map(|r| r.id).collect();

        if !requisition_ids.is_empty() {
            let lines = RequisitionLine::find()
                .filter(requisition_line::Column::RequisitionId.is_in(requisition_ids))
                .all(db)
                .await
                .map_err(ServiceError::DatabaseError)?;
            for line in lines {
                let key = key_for(line.item_id, &line.item_name);
                let entry = rows.entry(key).or_insert_with(|| ItemProcurementSummary {
                    item_id: line.item_id,
                    item_name: line.item_name.clone(),
                    unit: line.unit.clone(),
                    quantities: ItemReconciliation::default(),
                });
                entry.quantities.requisitioned_qty += line.requested_qty;
            }
        }

        let purchase_orders = PurchaseOrder::find()
            .filter(purchase_order::Column::CompanyId.eq(company_id))
            .filter(purchase_order::Column::ProjectId.eq(project_id))
            .filter(purchase_order::Column::Status.ne(PurchaseOrderStatus::Rejected))
            .all(db)
            .await
            .map_err(ServiceError::DatabaseError)?;
        let po_ids: Vec<Uuid> = purchase_orders.iter().map(|po| po.id).collect();

        if !po_ids.is_empty() {
            let lines = PurchaseOrderLine::find()
                .filter(purchase_order_line::Column::PurchaseOrderId.is_in(po_ids))
                .all(db)
                .await
                .map_err(ServiceError::DatabaseError)?;
            for line in lines {
                let key = key_for(line.item_id, &line.item_name);
                let entry = rows.entry(key).or_insert_with(|| ItemProcurementSummary {
                    item_id: line.item_id,
                    item_name: line.item_name.clone(),
                    unit: line.unit.clone(),
                    quantities: ItemReconciliation::default(),
                });
                entry.quantities.purchased_qty += line.purchase_qty;
                entry.quantities.received_qty += line.received_qty;
            }
        }

        Ok(rows.into_values().collect())
    }

    /// Total outstanding purchase value for a company: approved purchase
    /// amounts not yet fully received.
    #[instrument(skip(self))]
    pub async fn outstanding_purchase_amount(
        &self,
        company_id: Uuid,
    ) -> Result<Decimal, ServiceError> {
        let db = &*self.db_pool;

        let open_pos = PurchaseOrder::find()
            .filter(purchase_order::Column::CompanyId.eq(company_id))
            .filter(purchase_order::Column::Status.is_in([
                PurchaseOrderStatus::Approved,
                PurchaseOrderStatus::Sent,
                PurchaseOrderStatus::Open,
                PurchaseOrderStatus::PartiallyReceived,
            ]))
            .all(db)
            .await
            .map_err(ServiceError::DatabaseError)?;
        let po_ids: Vec<Uuid> = open_pos.iter().map(|po| po.id).collect();
        if po_ids.is_empty() {
            return Ok(Decimal::ZERO);
        }

        let lines = PurchaseOrderLine::find()
            .filter(purchase_order_line::Column::PurchaseOrderId.is_in(po_ids))
            .all(db)
            .await
            .map_err(ServiceError::DatabaseError)?;

        Ok(lines
            .iter()
            .map(|l| {
                let outstanding_qty =
                    crate::reconciliation::balance_qty(l.purchase_qty, l.received_qty);
                crate::reconciliation::line_amount(outstanding_qty, l.rate)
            })
            .sum())
    }
}
