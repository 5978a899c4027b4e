use std::collections::HashSet;
use std::sync::Arc;

use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};
use tracing::instrument;
use uuid::Uuid;

use crate::{
    commands::{
        purchaseorders::{
            consumed_per_requisition_line, ApprovePurchaseOrderCommand,
            ConvertPurchaseOrderToDraftCommand, CreatePurchaseOrderCommand,
            CreatePurchaseOrderResult, DeletePurchaseOrderCommand, ReceivePurchaseOrderCommand,
            RejectPurchaseOrderCommand, SubmitPurchaseOrderCommand, UpdateDownstreamStatusCommand,
            UpdatePurchaseOrderCommand,
        },
        Command,
    },
    db::DbPool,
    entities::{
        approval_comment::{self, Entity as ApprovalComment},
        purchase_order::{self, Entity as PurchaseOrder, PurchaseOrderStatus},
        purchase_order_line::{self, Entity as PurchaseOrderLine},
        purchase_order_requisition::{self, Entity as PurchaseOrderRequisition},
        requisition::Entity as Requisition,
        requisition_line::{self, Entity as RequisitionLine},
        ApprovalStatus, DocumentKind, ItemType,
    },
    errors::ServiceError,
    events::EventSender,
    linkage::{self, PoDraft, SourceLine, SourceRequisition},
    reconciliation,
};

/// Service for managing purchase orders and their requisition linkage
#[derive(Clone)]
pub struct PurchaseOrderService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

impl PurchaseOrderService {
    /// Creates a new purchase order service instance
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Creates a new purchase order
    #[instrument(skip(self, command))]
    pub async fn create_purchase_order(
        &self,
        command: CreatePurchaseOrderCommand,
    ) -> Result<CreatePurchaseOrderResult, ServiceError> {
        command
            .execute(self.db_pool.clone(), self.event_sender.clone())
            .await
    }

    /// Updates an existing purchase order
    #[instrument(skip(self, command))]
    pub async fn update_purchase_order(
        &self,
        command: UpdatePurchaseOrderCommand,
    ) -> Result<(), ServiceError> {
        command
            .execute(self.db_pool.clone(), self.event_sender.clone())
            .await?;
        Ok(())
    }

    /// Submits a purchase order for approval
    #[instrument(skip(self))]
    pub async fn submit_purchase_order(
        &self,
        command: SubmitPurchaseOrderCommand,
    ) -> Result<(), ServiceError> {
        command
            .execute(self.db_pool.clone(), self.event_sender.clone())
            .await?;
        Ok(())
    }

    /// Approves a purchase order
    #[instrument(skip(self))]
    pub async fn approve_purchase_order(
        &self,
        command: ApprovePurchaseOrderCommand,
    ) -> Result<(), ServiceError> {
        command
            .execute(self.db_pool.clone(), self.event_sender.clone())
            .await?;
        Ok(())
    }

    /// Rejects a purchase order
    #[instrument(skip(self))]
    pub async fn reject_purchase_order(
        &self,
        command: RejectPurchaseOrderCommand,
    ) -> Result<(), ServiceError> {
        command
            .execute(self.db_pool.clone(), self.event_sender.clone())
            .await?;
        Ok(())
    }

    /// Resets a rejected purchase order back to draft
    #[instrument(skip(self))]
    pub async fn convert_to_draft(
        &self,
        command: ConvertPurchaseOrderToDraftCommand,
    ) -> Result<(), ServiceError> {
        command
            .execute(self.db_pool.clone(), self.event_sender.clone())
            .await?;
        Ok(())
    }

    /// Deletes a draft/rejected purchase order
    #[instrument(skip(self))]
    pub async fn delete_purchase_order(
        &self,
        command: DeletePurchaseOrderCommand,
    ) -> Result<(), ServiceError> {
        command
            .execute(self.db_pool.clone(), self.event_sender.clone())
            .await?;
        Ok(())
    }

    /// Records a goods receipt against a purchase order
    #[instrument(skip(self))]
    pub async fn receive_purchase_order(
        &self,
        command: ReceivePurchaseOrderCommand,
    ) -> Result<(), ServiceError> {
        command
            .execute(self.db_pool.clone(), self.event_sender.clone())
            .await?;
        Ok(())
    }

    /// Marks an approved purchase order as sent/open
    #[instrument(skip(self))]
    pub async fn update_downstream_status(
        &self,
        command: UpdateDownstreamStatusCommand,
    ) -> Result<(), ServiceError> {
        command
            .execute(self.db_pool.clone(), self.event_sender.clone())
            .await?;
        Ok(())
    }

    /// Gets a purchase order by ID
    #[instrument(skip(self))]
    pub async fn get_purchase_order(
        &self,
        po_id: &Uuid,
    ) -> Result<Option<purchase_order::Model>, ServiceError> {
        let db = &*self.db_pool;
        PurchaseOrder::find_by_id(*po_id)
            .one(db)
            .await
            .map_err(ServiceError::DatabaseError)
    }

    /// Gets a purchase order with its ordered lines and requisition set
    #[instrument(skip(self))]
    #[allow(clippy::type_complexity)]
    pub async fn get_purchase_order_detail(
        &self,
        po_id: &Uuid,
    ) -> Result<
        Option<(
            purchase_order::Model,
            Vec<purchase_order_line::Model>,
            Vec<purchase_order_requisition::Model>,
        )>,
        ServiceError,
    > {
        let db = &*self.db_pool;
        let Some(header) = PurchaseOrder::find_by_id(*po_id)
            .one(db)
            .await
            .map_err(ServiceError::DatabaseError)?
        else {
            return Ok(None);
        };

        let lines = PurchaseOrderLine::find()
            .filter(purchase_order_line::Column::PurchaseOrderId.eq(*po_id))
            .order_by_asc(purchase_order_line::Column::Position)
            .all(db)
            .await
            .map_err(ServiceError::DatabaseError)?;

        let requisitions = PurchaseOrderRequisition::find()
            .filter(purchase_order_requisition::Column::PurchaseOrderId.eq(*po_id))
            .all(db)
            .await
            .map_err(ServiceError::DatabaseError)?;

        Ok(Some((header, lines, requisitions)))
    }

    /// Lists purchase orders for a company, newest first
    #[instrument(skip(self))]
    pub async fn list_purchase_orders(
        &self,
        company_id: &Uuid,
    ) -> Result<Vec<purchase_order::Model>, ServiceError> {
        let db = &*self.db_pool;
        PurchaseOrder::find()
            .filter(purchase_order::Column::CompanyId.eq(*company_id))
            .order_by_desc(purchase_order::Column::CreatedAt)
            .all(db)
            .await
            .map_err(ServiceError::DatabaseError)
    }

    /// Approved service purchase orders for a supplier, consumed by the
    /// work-progress collaborator.
    #[instrument(skip(self))]
    pub async fn get_by_supplier(
        &self,
        supplier_id: &Uuid,
    ) -> Result<Vec<purchase_order::Model>, ServiceError> {
        let db = &*self.db_pool;
        PurchaseOrder::find()
            .filter(purchase_order::Column::SupplierId.eq(*supplier_id))
            .filter(purchase_order::Column::Status.eq(PurchaseOrderStatus::Approved))
            .filter(purchase_order::Column::ItemType.eq(ItemType::Service))
            .order_by_desc(purchase_order::Column::CreatedAt)
            .all(db)
            .await
            .map_err(ServiceError::DatabaseError)
    }

    /// The append-only approval trail for a purchase order, oldest first
    #[instrument(skip(self))]
    pub async fn approval_history(
        &self,
        po_id: &Uuid,
    ) -> Result<Vec<approval_comment::Model>, ServiceError> {
        let db = &*self.db_pool;
        ApprovalComment::find()
            .filter(approval_comment::Column::DocumentId.eq(*po_id))
            .filter(approval_comment::Column::DocumentKind.eq(DocumentKind::PurchaseOrder))
            .order_by_asc(approval_comment::Column::CreatedAt)
            .all(db)
            .await
            .map_err(ServiceError::DatabaseError)
    }

    /// Applies the requisition-toggle algorithm to a PO draft: deselection
    /// drops the requisition's lines; selection maps its open lines in,
    /// honoring the lock policy and the originally-selected exemption of
    /// the PO being edited.
    #[instrument(skip(self, draft))]
    pub async fn toggle_requisition(
        &self,
        company_id: Uuid,
        mut draft: PoDraft,
        requisition_id: Uuid,
        select: bool,
        editing_po: Option<Uuid>,
    ) -> Result<PoDraft, ServiceError> {
        if !select {
            linkage::deselect_requisition(&mut draft, requisition_id);
            return Ok(draft);
        }

        let source = self
            .source_requisition(company_id, requisition_id, editing_po)
            .await?;

        let originally_selected: HashSet<Uuid> = match editing_po {
            Some(po_id) => PurchaseOrderRequisition::find()
                .filter(purchase_order_requisition::Column::PurchaseOrderId.eq(po_id))
                .all(&*self.db_pool)
                .await
                .map_err(ServiceError::DatabaseError)?
                .into_iter()
                .map(|row| row.requisition_id)
                .collect(),
            None => HashSet::new(),
        };

        linkage::select_requisition(&mut draft, &source, &originally_selected)?;
        Ok(draft)
    }

    /// Loads a requisition as a linkage source, with per-line balances
    /// computed against every other purchase order (the PO being edited is
    /// excluded so its own draft lines do not consume from themselves).
    async fn source_requisition(
        &self,
        company_id: Uuid,
        requisition_id: Uuid,
        editing_po: Option<Uuid>,
    ) -> Result<SourceRequisition, ServiceError> {
        let db = &*self.db_pool;

        let header = Requisition::find_by_id(requisition_id)
            .one(db)
            .await
            .map_err(ServiceError::DatabaseError)?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Requisition {} not found", requisition_id))
            })?;

        if header.company_id != company_id {
            return Err(ServiceError::ReferentialIntegrityFault(format!(
                "requisition {} belongs to another company",
                header.requisition_number
            )));
        }
        if header.status != ApprovalStatus::Approved {
            return Err(ServiceError::InvalidTransition(format!(
                "requisition {} is not approved",
                header.requisition_number
            )));
        }

        let lines = RequisitionLine::find()
            .filter(requisition_line::Column::RequisitionId.eq(requisition_id))
            .order_by_asc(requisition_line::Column::Position)
            .all(db)
            .await
            .map_err(ServiceError::DatabaseError)?;

        let line_ids: Vec<Uuid> = lines.iter().map(|l| l.id).collect();
        let consumed = consumed_per_requisition_line(db, &line_ids, editing_po).await?;

        let source_lines = lines
            .into_iter()
            .map(|line| {
                let eaten = consumed
                    .get(&line.id)
                    .copied()
                    .unwrap_or(rust_decimal::Decimal::ZERO);
                SourceLine {
                    line_id: line.id,
                    item_id: line.item_id,
                    item_name: line.item_name,
                    unit: line.unit,
                    requested_qty: line.requested_qty,
                    balance_qty: reconciliation::balance_qty(line.requested_qty, eaten),
                    rate: line.rate,
                }
            })
            .collect();

        Ok(SourceRequisition {
            id: header.id,
            requisition_number: header.requisition_number,
            requisition_date: header.requisition_date,
            created_by: header.created_by,
            is_locked: header.is_locked,
            lines: source_lines,
        })
    }
}
