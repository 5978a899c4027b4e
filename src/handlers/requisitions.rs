use super::common::{
    created_response, no_content_response, success_response, validate_input, RequestContext,
};
use crate::{
    commands::requisitions::{
        ApproveRequisitionCommand, ConvertRequisitionToDraftCommand, CreateRequisitionCommand,
        DeleteRequisitionCommand, RejectRequisitionCommand, RequisitionLineInput,
        SubmitRequisitionCommand, UpdateRequisitionCommand,
    },
    entities::{ItemType, ProcurementType},
    errors::ServiceError,
    handlers::AppState,
};
use axum::{
    extract::{Json, Path, Query, State},
    routing::{delete, get, post, put},
    Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

// Request and response DTOs

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateRequisitionRequest {
    pub requisition_type: ProcurementType,
    pub item_type: ItemType,
    pub project_id: Option<Uuid>,
    pub project_name: Option<String>,
    pub requisition_date: Option<NaiveDate>,
    pub required_by_date: Option<NaiveDate>,
    pub approver_id: Option<Uuid>,
    #[validate]
    pub lines: Vec<RequisitionLineInput>,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct SubmitRequisitionRequest {
    #[validate(length(max = 1000))]
    pub comment: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct ApprovalDecisionRequest {
    #[validate(length(max = 1000))]
    pub comment: String,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct EstimationDefaultsQuery {
    /// Which catalog to draw defaults from.
    pub item_type: ItemType,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ApprovedRequisitionsQuery {
    /// PO being edited; its requisitions stay selectable even when locked.
    pub editing_po: Option<Uuid>,
}

// Handler functions

/// Create a new requisition
#[utoipa::path(
    post,
    path = "/api/v1/requisitions",
    request_body = CreateRequisitionRequest,
    responses(
        (status = 201, description = "Requisition created"),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse)
    ),
    tag = "requisitions"
)]
pub async fn create_requisition(
    State(state): State<AppState>,
    ctx: RequestContext,
    Json(payload): Json<CreateRequisitionRequest>,
) -> Result<impl axum::response::IntoResponse, ServiceError> {
    validate_input(&payload)?;

    let command = CreateRequisitionCommand {
        company_id: ctx.company_id,
        actor_id: ctx.actor_id,
        requisition_type: payload.requisition_type,
        item_type: payload.item_type,
        project_id: payload.project_id,
        project_name: payload.project_name,
        requisition_date: payload.requisition_date,
        required_by_date: payload.required_by_date,
        approver_id: payload.approver_id,
        lines: payload.lines,
    };

    let result = state.services.requisitions.create_requisition(command).await?;

    info!("Requisition created: {}", result.requisition_number);

    Ok(created_response(serde_json::json!({
        "id": result.id,
        "requisition_number": result.requisition_number,
        "status": result.status,
        "total_amount": result.total_amount,
    })))
}

/// List requisitions for the calling company
#[utoipa::path(
    get,
    path = "/api/v1/requisitions",
    responses(
        (status = 200, description = "Requisitions for the company")
    ),
    tag = "requisitions"
)]
pub async fn list_requisitions(
    State(state): State<AppState>,
    ctx: RequestContext,
) -> Result<impl axum::response::IntoResponse, ServiceError> {
    let requisitions = state
        .services
        .requisitions
        .list_requisitions(&ctx.company_id)
        .await?;
    Ok(success_response(requisitions))
}

/// Approved, selectable requisitions for PO building
#[utoipa::path(
    get,
    path = "/api/v1/requisitions/approved",
    params(ApprovedRequisitionsQuery),
    responses(
        (status = 200, description = "Approved, unlocked requisitions")
    ),
    tag = "requisitions"
)]
pub async fn get_approved_requisitions(
    State(state): State<AppState>,
    ctx: RequestContext,
    Query(query): Query<ApprovedRequisitionsQuery>,
) -> Result<impl axum::response::IntoResponse, ServiceError> {
    let requisitions = state
        .services
        .requisitions
        .get_approved(&ctx.company_id, query.editing_po)
        .await?;
    Ok(success_response(requisitions))
}

/// Default requisition lines from a project's estimation
#[utoipa::path(
    get,
    path = "/api/v1/requisitions/defaults/{project_id}",
    params(
        ("project_id" = Uuid, Path, description = "Project ID"),
        EstimationDefaultsQuery
    ),
    responses(
        (status = 200, description = "Line defaults from the BOQ")
    ),
    tag = "requisitions"
)]
pub async fn get_estimation_defaults(
    State(state): State<AppState>,
    Path(project_id): Path<Uuid>,
    Query(query): Query<EstimationDefaultsQuery>,
) -> Result<impl axum::response::IntoResponse, ServiceError> {
    let lines = state
        .services
        .requisitions
        .default_lines_from_estimation(project_id, query.item_type)
        .await?;
    Ok(success_response(lines))
}

/// Get a requisition with its lines
#[utoipa::path(
    get,
    path = "/api/v1/requisitions/{id}",
    params(("id" = Uuid, Path, description = "Requisition ID")),
    responses(
        (status = 200, description = "Requisition fetched"),
        (status = 404, description = "Requisition not found", body = crate::errors::ErrorResponse)
    ),
    tag = "requisitions"
)]
pub async fn get_requisition(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ServiceError> {
    let (header, lines) = state
        .services
        .requisitions
        .get_requisition_with_lines(&id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Requisition {} not found", id)))?;

    Ok(success_response(serde_json::json!({
        "requisition": header,
        "lines": lines,
    })))
}

/// Approval trail for a requisition
#[utoipa::path(
    get,
    path = "/api/v1/requisitions/{id}/approval-history",
    params(("id" = Uuid, Path, description = "Requisition ID")),
    responses(
        (status = 200, description = "Approval history, oldest first")
    ),
    tag = "requisitions"
)]
pub async fn get_approval_history(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ServiceError> {
    let history = state.services.requisitions.approval_history(&id).await?;
    Ok(success_response(history))
}

/// Update a requisition
#[utoipa::path(
    put,
    path = "/api/v1/requisitions/{id}",
    request_body = CreateRequisitionRequest,
    params(("id" = Uuid, Path, description = "Requisition ID")),
    responses(
        (status = 200, description = "Requisition updated"),
        (status = 404, description = "Requisition not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Requisition is not editable", body = crate::errors::ErrorResponse)
    ),
    tag = "requisitions"
)]
pub async fn update_requisition(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
    Json(payload): Json<CreateRequisitionRequest>,
) -> Result<impl axum::response::IntoResponse, ServiceError> {
    validate_input(&payload)?;

    let command = UpdateRequisitionCommand {
        id,
        actor_id: ctx.actor_id,
        requisition_type: payload.requisition_type,
        item_type: payload.item_type,
        project_id: payload.project_id,
        project_name: payload.project_name,
        requisition_date: payload.requisition_date,
        required_by_date: payload.required_by_date,
        approver_id: payload.approver_id,
        lines: payload.lines,
    };

    state.services.requisitions.update_requisition(command).await?;

    info!("Requisition updated: {}", id);

    Ok(success_response(serde_json::json!({
        "message": "Requisition updated successfully"
    })))
}

/// Submit a requisition for approval
#[utoipa::path(
    post,
    path = "/api/v1/requisitions/{id}/submit",
    request_body = SubmitRequisitionRequest,
    params(("id" = Uuid, Path, description = "Requisition ID")),
    responses(
        (status = 200, description = "Requisition submitted"),
        (status = 400, description = "Missing approver or lines", body = crate::errors::ErrorResponse)
    ),
    tag = "requisitions"
)]
pub async fn submit_requisition(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
    Json(payload): Json<SubmitRequisitionRequest>,
) -> Result<impl axum::response::IntoResponse, ServiceError> {
    validate_input(&payload)?;

    let command = SubmitRequisitionCommand {
        id,
        actor_id: ctx.actor_id,
        comment: payload.comment,
    };

    state.services.requisitions.submit_requisition(command).await?;

    info!("Requisition submitted: {}", id);

    Ok(success_response(serde_json::json!({
        "message": "Requisition submitted for approval"
    })))
}

/// Approve a requisition
#[utoipa::path(
    post,
    path = "/api/v1/requisitions/{id}/approve",
    request_body = ApprovalDecisionRequest,
    params(("id" = Uuid, Path, description = "Requisition ID")),
    responses(
        (status = 200, description = "Requisition approved"),
        (status = 409, description = "Invalid transition", body = crate::errors::ErrorResponse)
    ),
    tag = "requisitions"
)]
pub async fn approve_requisition(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
    Json(payload): Json<ApprovalDecisionRequest>,
) -> Result<impl axum::response::IntoResponse, ServiceError> {
    validate_input(&payload)?;

    let command = ApproveRequisitionCommand {
        id,
        actor_id: ctx.actor_id,
        comment: payload.comment,
    };

    state.services.requisitions.approve_requisition(command).await?;

    info!("Requisition approved: {}", id);

    Ok(success_response(serde_json::json!({
        "message": "Requisition approved successfully"
    })))
}

/// Reject a requisition
#[utoipa::path(
    post,
    path = "/api/v1/requisitions/{id}/reject",
    request_body = ApprovalDecisionRequest,
    params(("id" = Uuid, Path, description = "Requisition ID")),
    responses(
        (status = 200, description = "Requisition rejected"),
        (status = 409, description = "Invalid transition", body = crate::errors::ErrorResponse)
    ),
    tag = "requisitions"
)]
pub async fn reject_requisition(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
    Json(payload): Json<ApprovalDecisionRequest>,
) -> Result<impl axum::response::IntoResponse, ServiceError> {
    validate_input(&payload)?;

    let command = RejectRequisitionCommand {
        id,
        actor_id: ctx.actor_id,
        comment: payload.comment,
    };

    state.services.requisitions.reject_requisition(command).await?;

    info!("Requisition rejected: {}", id);

    Ok(success_response(serde_json::json!({
        "message": "Requisition rejected"
    })))
}

/// Reset a rejected requisition to draft
#[utoipa::path(
    post,
    path = "/api/v1/requisitions/{id}/convert-to-draft",
    params(("id" = Uuid, Path, description = "Requisition ID")),
    responses(
        (status = 200, description = "Requisition reset to draft"),
        (status = 409, description = "Invalid transition", body = crate::errors::ErrorResponse)
    ),
    tag = "requisitions"
)]
pub async fn convert_requisition_to_draft(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ServiceError> {
    let command = ConvertRequisitionToDraftCommand {
        id,
        actor_id: ctx.actor_id,
    };

    state.services.requisitions.convert_to_draft(command).await?;

    info!("Requisition converted to draft: {}", id);

    Ok(success_response(serde_json::json!({
        "message": "Requisition converted to draft"
    })))
}

/// Delete a draft/rejected requisition
#[utoipa::path(
    delete,
    path = "/api/v1/requisitions/{id}",
    params(("id" = Uuid, Path, description = "Requisition ID")),
    responses(
        (status = 204, description = "Requisition deleted"),
        (status = 409, description = "Requisition is not deletable", body = crate::errors::ErrorResponse)
    ),
    tag = "requisitions"
)]
pub async fn delete_requisition(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ServiceError> {
    let command = DeleteRequisitionCommand {
        id,
        actor_id: ctx.actor_id,
    };

    state.services.requisitions.delete_requisition(command).await?;

    info!("Requisition deleted: {}", id);

    Ok(no_content_response())
}

/// Creates the router for requisition endpoints
pub fn requisition_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_requisition))
        .route("/", get(list_requisitions))
        .route("/approved", get(get_approved_requisitions))
        .route("/defaults/:project_id", get(get_estimation_defaults))
        .route("/:id", get(get_requisition))
        .route("/:id", put(update_requisition))
        .route("/:id", delete(delete_requisition))
        .route("/:id/submit", post(submit_requisition))
        .route("/:id/approve", post(approve_requisition))
        .route("/:id/reject", post(reject_requisition))
        .route("/:id/convert-to-draft", post(convert_requisition_to_draft))
        .route("/:id/approval-history", get(get_approval_history))
}
