use super::common::{
    created_response, no_content_response, success_response, validate_input, RequestContext,
};
use crate::{
    commands::purchaseorders::{
        ApprovePurchaseOrderCommand, ConvertPurchaseOrderToDraftCommand,
        CreatePurchaseOrderCommand, DeletePurchaseOrderCommand, PurchaseOrderLineInput,
        ReceivePurchaseOrderCommand, RejectPurchaseOrderCommand, SubmitPurchaseOrderCommand,
        UpdateDownstreamStatusCommand, UpdatePurchaseOrderCommand,
    },
    commands::purchaseorders::receive_purchase_order_command::ReceiptLineInput,
    entities::{purchase_order::PurchaseOrderStatus, ItemType, ProcurementType},
    errors::ServiceError,
    handlers::AppState,
    linkage::PoDraft,
};
use axum::{
    extract::{Json, Path, State},
    routing::{delete, get, post, put},
    Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

// Request and response DTOs

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreatePurchaseOrderRequest {
    pub purchase_type: ProcurementType,
    pub item_type: ItemType,
    pub supplier_id: Uuid,
    #[validate(length(min = 1, max = 255))]
    pub supplier_name: String,
    pub project_id: Option<Uuid>,
    pub project_name: Option<String>,
    pub order_date: Option<NaiveDate>,
    pub delivery_date: Option<NaiveDate>,
    pub delivery_location: Option<String>,
    pub mode_of_payment: Option<String>,
    pub approver_id: Option<Uuid>,
    /// Requisitions this PO draws from; empty for a direct purchase.
    #[serde(default)]
    pub requisitions: Vec<Uuid>,
    #[validate]
    pub lines: Vec<PurchaseOrderLineInput>,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct SubmitPurchaseOrderRequest {
    #[validate(length(max = 1000))]
    pub comment: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct ApprovalDecisionRequest {
    #[validate(length(max = 1000))]
    pub comment: String,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct ReceivePurchaseOrderRequest {
    pub items_received: Vec<ReceiptLineInput>,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DownstreamStatusRequest {
    pub status: PurchaseOrderStatus,
}

/// Stateless application of the requisition-toggle algorithm to a draft.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ToggleRequisitionRequest {
    pub draft: PoDraft,
    pub requisition_id: Uuid,
    pub select: bool,
    /// Set when editing a persisted PO; its own requisitions stay
    /// selectable even when locked.
    pub editing_po: Option<Uuid>,
}

// Handler functions

/// Create a new purchase order
#[utoipa::path(
    post,
    path = "/api/v1/purchase-orders",
    request_body = CreatePurchaseOrderRequest,
    responses(
        (status = 201, description = "Purchase order created"),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 409, description = "Requisition locked or not approved", body = crate::errors::ErrorResponse)
    ),
    tag = "purchase-orders"
)]
pub async fn create_purchase_order(
    State(state): State<AppState>,
    ctx: RequestContext,
    Json(payload): Json<CreatePurchaseOrderRequest>,
) -> Result<impl axum::response::IntoResponse, ServiceError> {
    validate_input(&payload)?;

    let command = CreatePurchaseOrderCommand {
        company_id: ctx.company_id,
        actor_id: ctx.actor_id,
        purchase_type: payload.purchase_type,
        item_type: payload.item_type,
        supplier_id: payload.supplier_id,
        supplier_name: payload.supplier_name,
        project_id: payload.project_id,
        project_name: payload.project_name,
        order_date: payload.order_date,
        delivery_date: payload.delivery_date,
        delivery_location: payload.delivery_location,
        mode_of_payment: payload.mode_of_payment,
        approver_id: payload.approver_id,
        requisitions: payload.requisitions,
        lines: payload.lines,
    };

    let result = state
        .services
        .purchase_orders
        .create_purchase_order(command)
        .await?;

    info!("Purchase order created: {}", result.po_number);

    Ok(created_response(serde_json::json!({
        "id": result.id,
        "po_number": result.po_number,
        "status": result.status,
        "total_amount": result.total_amount,
        "locked_requisitions": result.locked_requisitions,
    })))
}

/// List purchase orders for the calling company
#[utoipa::path(
    get,
    path = "/api/v1/purchase-orders",
    responses(
        (status = 200, description = "Purchase orders for the company")
    ),
    tag = "purchase-orders"
)]
pub async fn list_purchase_orders(
    State(state): State<AppState>,
    ctx: RequestContext,
) -> Result<impl axum::response::IntoResponse, ServiceError> {
    let pos = state
        .services
        .purchase_orders
        .list_purchase_orders(&ctx.company_id)
        .await?;
    Ok(success_response(pos))
}

/// Get a purchase order with lines and requisition set
#[utoipa::path(
    get,
    path = "/api/v1/purchase-orders/{id}",
    params(("id" = Uuid, Path, description = "Purchase order ID")),
    responses(
        (status = 200, description = "Purchase order fetched"),
        (status = 404, description = "Purchase order not found", body = crate::errors::ErrorResponse)
    ),
    tag = "purchase-orders"
)]
pub async fn get_purchase_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ServiceError> {
    let (header, lines, requisitions) = state
        .services
        .purchase_orders
        .get_purchase_order_detail(&id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Purchase order {} not found", id)))?;

    Ok(success_response(serde_json::json!({
        "purchase_order": header,
        "lines": lines,
        "requisitions": requisitions,
    })))
}

/// Approved service POs for a supplier
#[utoipa::path(
    get,
    path = "/api/v1/purchase-orders/supplier/{supplier_id}",
    params(("supplier_id" = Uuid, Path, description = "Supplier ID")),
    responses(
        (status = 200, description = "Approved service purchase orders")
    ),
    tag = "purchase-orders"
)]
pub async fn get_purchase_orders_by_supplier(
    State(state): State<AppState>,
    Path(supplier_id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ServiceError> {
    let pos = state
        .services
        .purchase_orders
        .get_by_supplier(&supplier_id)
        .await?;
    Ok(success_response(pos))
}

/// Approval trail for a purchase order
#[utoipa::path(
    get,
    path = "/api/v1/purchase-orders/{id}/approval-history",
    params(("id" = Uuid, Path, description = "Purchase order ID")),
    responses(
        (status = 200, description = "Approval history, oldest first")
    ),
    tag = "purchase-orders"
)]
pub async fn get_approval_history(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ServiceError> {
    let history = state.services.purchase_orders.approval_history(&id).await?;
    Ok(success_response(history))
}

/// Apply the requisition-toggle algorithm to a PO draft
#[utoipa::path(
    post,
    path = "/api/v1/purchase-orders/requisition-toggle",
    request_body = ToggleRequisitionRequest,
    responses(
        (status = 200, description = "Updated draft", body = PoDraft),
        (status = 409, description = "Requisition locked", body = crate::errors::ErrorResponse)
    ),
    tag = "purchase-orders"
)]
pub async fn toggle_requisition(
    State(state): State<AppState>,
    ctx: RequestContext,
    Json(payload): Json<ToggleRequisitionRequest>,
) -> Result<impl axum::response::IntoResponse, ServiceError> {
    let draft = state
        .services
        .purchase_orders
        .toggle_requisition(
            ctx.company_id,
            payload.draft,
            payload.requisition_id,
            payload.select,
            payload.editing_po,
        )
        .await?;
    Ok(success_response(draft))
}

/// Update a purchase order
#[utoipa::path(
    put,
    path = "/api/v1/purchase-orders/{id}",
    request_body = CreatePurchaseOrderRequest,
    params(("id" = Uuid, Path, description = "Purchase order ID")),
    responses(
        (status = 200, description = "Purchase order updated"),
        (status = 409, description = "Purchase order is not editable", body = crate::errors::ErrorResponse)
    ),
    tag = "purchase-orders"
)]
pub async fn update_purchase_order(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
    Json(payload): Json<CreatePurchaseOrderRequest>,
) -> Result<impl axum::response::IntoResponse, ServiceError> {
    validate_input(&payload)?;

    let command = UpdatePurchaseOrderCommand {
        id,
        actor_id: ctx.actor_id,
        purchase_type: payload.purchase_type,
        item_type: payload.item_type,
        supplier_id: payload.supplier_id,
        supplier_name: payload.supplier_name,
        project_id: payload.project_id,
        project_name: payload.project_name,
        order_date: payload.order_date,
        delivery_date: payload.delivery_date,
        delivery_location: payload.delivery_location,
        mode_of_payment: payload.mode_of_payment,
        approver_id: payload.approver_id,
        requisitions: payload.requisitions,
        lines: payload.lines,
    };

    state
        .services
        .purchase_orders
        .update_purchase_order(command)
        .await?;

    info!("Purchase order updated: {}", id);

    Ok(success_response(serde_json::json!({
        "message": "Purchase order updated successfully"
    })))
}

/// Submit a purchase order for approval
#[utoipa::path(
    post,
    path = "/api/v1/purchase-orders/{id}/submit",
    request_body = SubmitPurchaseOrderRequest,
    params(("id" = Uuid, Path, description = "Purchase order ID")),
    responses(
        (status = 200, description = "Purchase order submitted"),
        (status = 400, description = "Missing approver or lines", body = crate::errors::ErrorResponse)
    ),
    tag = "purchase-orders"
)]
pub async fn submit_purchase_order(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
    Json(payload): Json<SubmitPurchaseOrderRequest>,
) -> Result<impl axum::response::IntoResponse, ServiceError> {
    validate_input(&payload)?;

    let command = SubmitPurchaseOrderCommand {
        id,
        actor_id: ctx.actor_id,
        comment: payload.comment,
    };

    state
        .services
        .purchase_orders
        .submit_purchase_order(command)
        .await?;

    info!("Purchase order submitted: {}", id);

    Ok(success_response(serde_json::json!({
        "message": "Purchase order submitted for approval"
    })))
}

/// Approve a purchase order
#[utoipa::path(
    post,
    path = "/api/v1/purchase-orders/{id}/approve",
    request_body = ApprovalDecisionRequest,
    params(("id" = Uuid, Path, description = "Purchase order ID")),
    responses(
        (status = 200, description = "Purchase order approved"),
        (status = 409, description = "Invalid transition", body = crate::errors::ErrorResponse)
    ),
    tag = "purchase-orders"
)]
pub async fn approve_purchase_order(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
    Json(payload): Json<ApprovalDecisionRequest>,
) -> Result<impl axum::response::IntoResponse, ServiceError> {
    validate_input(&payload)?;

    let command = ApprovePurchaseOrderCommand {
        id,
        actor_id: ctx.actor_id,
        comment: payload.comment,
    };

    state
        .services
        .purchase_orders
        .approve_purchase_order(command)
        .await?;

    info!("Purchase order approved: {}", id);

    Ok(success_response(serde_json::json!({
        "message": "Purchase order approved successfully"
    })))
}

/// Reject a purchase order
#[utoipa::path(
    post,
    path = "/api/v1/purchase-orders/{id}/reject",
    request_body = ApprovalDecisionRequest,
    params(("id" = Uuid, Path, description = "Purchase order ID")),
    responses(
        (status = 200, description = "Purchase order rejected"),
        (status = 409, description = "Invalid transition", body = crate::errors::ErrorResponse)
    ),
    tag = "purchase-orders"
)]
pub async fn reject_purchase_order(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
    Json(payload): Json<ApprovalDecisionRequest>,
) -> Result<impl axum::response::IntoResponse, ServiceError> {
    validate_input(&payload)?;

    let command = RejectPurchaseOrderCommand {
        id,
        actor_id: ctx.actor_id,
        comment: payload.comment,
    };

    state
        .services
        .purchase_orders
        .reject_purchase_order(command)
        .await?;

    info!("Purchase order rejected: {}", id);

    Ok(success_response(serde_json::json!({
        "message": "Purchase order rejected"
    })))
}

/// Reset a rejected purchase order to draft
#[utoipa::path(
    post,
    path = "/api/v1/purchase-orders/{id}/convert-to-draft",
    params(("id" = Uuid, Path, description = "Purchase order ID")),
    responses(
        (status = 200, description = "Purchase order reset to draft"),
        (status = 409, description = "Invalid transition", body = crate::errors::ErrorResponse)
    ),
    tag = "purchase-orders"
)]
pub async fn convert_purchase_order_to_draft(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ServiceError> {
    let command = ConvertPurchaseOrderToDraftCommand {
        id,
        actor_id: ctx.actor_id,
    };

    state
        .services
        .purchase_orders
        .convert_to_draft(command)
        .await?;

    info!("Purchase order converted to draft: {}", id);

    Ok(success_response(serde_json::json!({
        "message": "Purchase order converted to draft"
    })))
}

/// Record a goods receipt against a purchase order
#[utoipa::path(
    post,
    path = "/api/v1/purchase-orders/{id}/receive",
    request_body = ReceivePurchaseOrderRequest,
    params(("id" = Uuid, Path, description = "Purchase order ID")),
    responses(
        (status = 200, description = "Receipt recorded"),
        (status = 400, description = "Invalid receipt quantities", body = crate::errors::ErrorResponse)
    ),
    tag = "purchase-orders"
)]
pub async fn receive_purchase_order(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
    Json(payload): Json<ReceivePurchaseOrderRequest>,
) -> Result<impl axum::response::IntoResponse, ServiceError> {
    validate_input(&payload)?;

    let command = ReceivePurchaseOrderCommand {
        id,
        actor_id: ctx.actor_id,
        items_received: payload.items_received,
        notes: payload.notes,
    };

    state
        .services
        .purchase_orders
        .receive_purchase_order(command)
        .await?;

    info!("Purchase order receipt recorded: {}", id);

    Ok(success_response(serde_json::json!({
        "message": "Purchase order receipt recorded"
    })))
}

/// Mark a purchase order as sent/open (dispatch collaborator)
#[utoipa::path(
    post,
    path = "/api/v1/purchase-orders/{id}/downstream-status",
    request_body = DownstreamStatusRequest,
    params(("id" = Uuid, Path, description = "Purchase order ID")),
    responses(
        (status = 200, description = "Downstream status updated"),
        (status = 409, description = "Invalid transition", body = crate::errors::ErrorResponse)
    ),
    tag = "purchase-orders"
)]
pub async fn update_downstream_status(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
    Json(payload): Json<DownstreamStatusRequest>,
) -> Result<impl axum::response::IntoResponse, ServiceError> {
    let command = UpdateDownstreamStatusCommand {
        id,
        actor_id: ctx.actor_id,
        new_status: payload.status,
    };

    state
        .services
        .purchase_orders
        .update_downstream_status(command)
        .await?;

    info!("Purchase order downstream status updated: {}", id);

    Ok(success_response(serde_json::json!({
        "message": "Purchase order status updated"
    })))
}

/// Delete a draft/rejected purchase order
#[utoipa::path(
    delete,
    path = "/api/v1/purchase-orders/{id}",
    params(("id" = Uuid, Path, description = "Purchase order ID")),
    responses(
        (status = 204, description = "Purchase order deleted"),
        (status = 409, description = "Purchase order is not deletable", body = crate::errors::ErrorResponse)
    ),
    tag = "purchase-orders"
)]
pub async fn delete_purchase_order(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ServiceError> {
    let command = DeletePurchaseOrderCommand {
        id,
        actor_id: ctx.actor_id,
    };

    state
        .services
        .purchase_orders
        .delete_purchase_order(command)
        .await?;

    info!("Purchase order deleted: {}", id);

    Ok(no_content_response())
}

/// Creates the router for purchase order endpoints
pub fn purchase_order_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_purchase_order))
        .route("/", get(list_purchase_orders))
        .route("/requisition-toggle", post(toggle_requisition))
        .route("/supplier/:supplier_id", get(get_purchase_orders_by_supplier))
        .route("/:id", get(get_purchase_order))
        .route("/:id", put(update_purchase_order))
        .route("/:id", delete(delete_purchase_order))
        .route("/:id/submit", post(submit_purchase_order))
        .route("/:id/approve", post(approve_purchase_order))
        .route("/:id/reject", post(reject_purchase_order))
        .route("/:id/convert-to-draft", post(convert_purchase_order_to_draft))
        .route("/:id/receive", post(receive_purchase_order))
        .route("/:id/downstream-status", post(update_downstream_status))
        .route("/:id/approval-history", get(get_approval_history))
}
