use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};
use tracing::instrument;
use uuid::Uuid;

use crate::{
    commands::{
        requisitions::{
            ApproveRequisitionCommand, ConvertRequisitionToDraftCommand, CreateRequisitionCommand,
            CreateRequisitionResult, DeleteRequisitionCommand, RejectRequisitionCommand,
            RequisitionLineInput, SubmitRequisitionCommand, UpdateRequisitionCommand,
        },
        Command,
    },
    db::DbPool,
    entities::{
        approval_comment::{self, Entity as ApprovalComment},
        purchase_order_requisition::{self, Entity as PurchaseOrderRequisition},
        requisition::{self, Entity as Requisition},
        requisition_line::{self, Entity as RequisitionLine},
        ApprovalStatus, DocumentKind, ItemType, ProcurementType,
    },
    errors::ServiceError,
    events::EventSender,
    services::estimation::EstimationProvider,
};

/// Service for managing material/service requisitions
#[derive(Clone)]
pub struct RequisitionService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
    estimation: Arc<dyn EstimationProvider>,
}

impl RequisitionService {
    /// Creates a new requisition service instance
    pub fn new(
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
        estimation: Arc<dyn EstimationProvider>,
    ) -> Self {
        Self {
            db_pool,
            event_sender,
            estimation,
        }
    }

    /// Creates a requisition after resolving the lines against the active
    /// catalog (project-bound material requisitions only).
    #[instrument(skip(self, command))]
    pub async fn create_requisition(
        &self,
        command: CreateRequisitionCommand,
    ) -> Result<CreateRequisitionResult, ServiceError> {
        self.check_catalog(
            command.requisition_type,
            command.item_type,
            command.project_id,
            &command.lines,
        )
        .await?;
        command
            .execute(self.db_pool.clone(), self.event_sender.clone())
            .await
    }

    /// Updates a requisition while it is still mutable
    #[instrument(skip(self, command))]
    pub async fn update_requisition(
        &self,
        command: UpdateRequisitionCommand,
    ) -> Result<(), ServiceError> {
        self.check_catalog(
            command.requisition_type,
            command.item_type,
            command.project_id,
            &command.lines,
        )
        .await?;
        command
            .execute(self.db_pool.clone(), self.event_sender.clone())
            .await?;
        Ok(())
    }

    /// Submits a requisition for approval
    #[instrument(skip(self))]
    pub async fn submit_requisition(
        &self,
        command: SubmitRequisitionCommand,
    ) -> Result<(), ServiceError> {
        command
            .execute(self.db_pool.clone(), self.event_sender.clone())
            .await?;
        Ok(())
    }

    /// Approves a requisition
    #[instrument(skip(self))]
    pub async fn approve_requisition(
        &self,
        command: ApproveRequisitionCommand,
    ) -> Result<(), ServiceError> {
        command
            .execute(self.db_pool.clone(), self.event_sender.clone())
            .await?;
        Ok(())
    }

    /// Rejects a requisition
    #[instrument(skip(self))]
    pub async fn reject_requisition(
        &self,
        command: RejectRequisitionCommand,
    ) -> Result<(), ServiceError> {
        command
            .execute(self.db_pool.clone(), self.event_sender.clone())
            .await?;
        Ok(())
    }

    /// Resets a rejected requisition back to draft
    #[instrument(skip(self))]
    pub async fn convert_to_draft(
        &self,
        command: ConvertRequisitionToDraftCommand,
    ) -> Result<(), ServiceError> {
        command
            .execute(self.db_pool.clone(), self.event_sender.clone())
            .await?;
        Ok(())
    }

    /// Deletes a draft/rejected requisition
    #[instrument(skip(self))]
    pub async fn delete_requisition(
        &self,
        command: DeleteRequisitionCommand,
    ) -> Result<(), ServiceError> {
        command
            .execute(self.db_pool.clone(), self.event_sender.clone())
            .await
    }

    /// Gets a requisition by ID
    #[instrument(skip(self))]
    pub async fn get_requisition(
        &self,
        requisition_id: &Uuid,
    ) -> Result<Option<requisition::Model>, ServiceError> {
        let db = &*self.db_pool;
        Requisition::find_by_id(*requisition_id)
            .one(db)
            .await
            .map_err(ServiceError::DatabaseError)
    }

    /// Gets a requisition together with its ordered lines
    #[instrument(skip(self))]
    pub async fn get_requisition_with_lines(
        &self,
        requisition_id: &Uuid,
    ) -> Result<Option<(requisition::Model, Vec<requisition_line::Model>)>, ServiceError> {
        let db = &*self.db_pool;
        let Some(header) = Requisition::find_by_id(*requisition_id)
            .one(db)
            .await
            .map_err(ServiceError::DatabaseError)?
        else {
            return Ok(None);
        };

        let lines = RequisitionLine::find()
            .filter(requisition_line::Column::RequisitionId.eq(*requisition_id))
            .order_by_asc(requisition_line::Column::Position)
            .all(db)
            .await
            .map_err(ServiceError::DatabaseError)?;

        Ok(Some((header, lines)))
    }

    /// Lists requisitions for a company, newest first
    #[instrument(skip(self))]
    pub async fn list_requisitions(
        &self,
        company_id: &Uuid,
    ) -> Result<Vec<requisition::Model>, ServiceError> {
        let db = &*self.db_pool;
        Requisition::find()
            .filter(requisition::Column::CompanyId.eq(*company_id))
            .order_by_desc(requisition::Column::CreatedAt)
            .all(db)
            .await
            .map_err(ServiceError::DatabaseError)
    }

    /// Approved requisitions available to a purchase order builder:
    /// unlocked ones, plus locked ones already part of the PO being edited.
    #[instrument(skip(self))]
    pub async fn get_approved(
        &self,
        company_id: &Uuid,
        editing_po: Option<Uuid>,
    ) -> Result<Vec<requisition::Model>, ServiceError> {
        let db = &*self.db_pool;

        let originally_selected: HashSet<Uuid> = match editing_po {
            Some(po_id) => PurchaseOrderRequisition::find()
                .filter(purchase_order_requisition::Column::PurchaseOrderId.eq(po_id))
                .all(db)
                .await
                .map_err(ServiceError::DatabaseError)?
                .into_iter()
                .map(|row| row.requisition_id)
                .collect(),
            None => HashSet::new(),
        };

        let approved = Requisition::find()
            .filter(requisition::Column::CompanyId.eq(*company_id))
            .filter(requisition::Column::Status.eq(ApprovalStatus::Approved))
            .order_by_desc(requisition::Column::CreatedAt)
            .all(db)
            .await
            .map_err(ServiceError::DatabaseError)?;

        Ok(approved
            .into_iter()
            .filter(|r| !r.is_locked || originally_selected.contains(&r.id))
            .collect())
    }

    /// The append-only approval trail for a requisition, oldest first
    #[instrument(skip(self))]
    pub async fn approval_history(
        &self,
        requisition_id: &Uuid,
    ) -> Result<Vec<approval_comment::Model>, ServiceError> {
        let db = &*self.db_pool;
        ApprovalComment::find()
            .filter(approval_comment::Column::DocumentId.eq(*requisition_id))
            .filter(approval_comment::Column::DocumentKind.eq(DocumentKind::Requisition))
            .order_by_asc(approval_comment::Column::CreatedAt)
            .all(db)
            .await
            .map_err(ServiceError::DatabaseError)
    }

    /// Builds default requisition lines from a project's BOQ. Material
    /// documents draw from the material requirements (estimated quantity
    /// and rate seed `requested_qty` and `rate`); service documents draw
    /// from the work-scope components, which carry no rate.
    #[instrument(skip(self))]
    pub async fn default_lines_from_estimation(
        &self,
        project_id: Uuid,
        item_type: ItemType,
    ) -> Result<Vec<RequisitionLineInput>, ServiceError> {
        match item_type {
            ItemType::Material => {
                let requirements = self.estimation.material_requirements(project_id).await?;
                Ok(requirements
                    .into_iter()
                    .map(|req| RequisitionLineInput {
                        item_id: Some(req.material_id),
                        item_name: req.material_name,
                        unit: req.unit,
                        boq_qty: Some(req.total_qty),
                        requested_qty: req.total_qty,
                        rate: req.material_rate,
                    })
                    .collect())
            }
            ItemType::Service => {
                let requirements = self.estimation.component_requirements(project_id).await?;
                Ok(requirements
                    .into_iter()
                    .map(|req| RequisitionLineInput {
                        item_id: None,
                        item_name: req.component_name,
                        unit: req.unit,
                        boq_qty: Some(req.total_volume),
                        requested_qty: req.total_volume,
                        rate: Decimal::ZERO,
                    })
                    .collect())
            }
        }
    }

    /// Project-bound material lines must reference items in the project's
    /// BOQ, with matching units.
    async fn check_catalog(
        &self,
        requisition_type: ProcurementType,
        item_type: ItemType,
        project_id: Option<Uuid>,
        lines: &[RequisitionLineInput],
    ) -> Result<(), ServiceError> {
        if requisition_type != ProcurementType::Project || item_type != ItemType::Material {
            return Ok(());
        }
        let Some(project_id) = project_id else {
            return Ok(());
        };
        if lines.is_empty() {
            return Ok(());
        }

        let catalog: HashMap<Uuid, String> = self
            .estimation
            .material_requirements(project_id)
            .await?
            .into_iter()
            .map(|req| (req.material_id, req.unit))
            .collect();

        for (idx, line) in lines.iter().enumerate() {
            let row = idx + 1;
            let Some(item_id) = line.item_id else {
                return Err(ServiceError::ReferentialIntegrityFault(format!(
                    "Line {}: material lines must reference a catalog item",
                    row
                )));
            };
            match catalog.get(&item_id) {
                None => {
                    return Err(ServiceError::ReferentialIntegrityFault(format!(
                        "Line {}: item {} is not in the project estimation",
                        row, line.item_name
                    )));
                }
                Some(unit) if unit != &line.unit => {
                    return Err(ServiceError::ReferentialIntegrityFault(format!(
                        "Line {}: unit {} does not match the estimation unit {}",
                        row, line.unit, unit
                    )));
                }
                Some(_) => {}
            }
        }

        Ok(())
    }
}
