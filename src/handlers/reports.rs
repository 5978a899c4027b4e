use super::common::{success_response, RequestContext};
use crate::{errors::ServiceError, handlers::AppState};
use axum::{
    extract::{Path, State},
    routing::get,
    Router,
};
use uuid::Uuid;

/// Per-item quantity chain (Estimated -> Requisitioned -> Purchased ->
/// Received) for a project
#[utoipa::path(
    get,
    path = "/api/v1/reports/procurement-summary/{project_id}",
    params(("project_id" = Uuid, Path, description = "Project ID")),
    responses(
        (status = 200, description = "Procurement summary per item")
    ),
    tag = "reports"
)]
pub async fn procurement_summary(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(project_id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ServiceError> {
    let summary = state
        .services
        .reporting
        .procurement_summary(ctx.company_id, project_id)
        .await?;
    Ok(success_response(summary))
}

/// Outstanding (ordered, not yet received) purchase value for the company
#[utoipa::path(
    get,
    path = "/api/v1/reports/outstanding-purchase-amount",
    responses(
        (status = 200, description = "Outstanding purchase amount")
    ),
    tag = "reports"
)]
pub async fn outstanding_purchase_amount(
    State(state): State<AppState>,
    ctx: RequestContext,
) -> Result<impl axum::response::IntoResponse, ServiceError> {
    let amount = state
        .services
        .reporting
        .outstanding_purchase_amount(ctx.company_id)
        .await?;
    Ok(success_response(serde_json::json!({
        "outstanding_amount": amount,
    })))
}

/// Creates the router for reporting endpoints
pub fn report_routes() -> Router<AppState> {
    Router::new()
        .route("/procurement-summary/:project_id", get(procurement_summary))
        .route(
            "/outstanding-purchase-amount",
            get(outstanding_purchase_amount),
        )
}
