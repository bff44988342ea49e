use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use uuid::Uuid;

use crate::{
    dto::courier::{AssignmentView, Deliveries, IssueForm, ReportIssueRequest},
    error::AppResult,
    middleware::auth::AuthUser,
    models::Order,
    response::ApiResponse,
    services::courier_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/deliveries", get(deliveries))
        .route("/orders/{id}/accept", post(accept))
        .route("/orders/{id}/unaccept", post(unaccept))
        .route("/orders/{id}/complete", post(complete))
        .route("/orders/{id}/issue", get(issue_form).post(report_issue))
}

#[utoipa::path(
    get,
    path = "/api/courier/deliveries",
    responses(
        (status = 200, description = "Claimable orders and the courier's own assignments", body = ApiResponse<Deliveries>)
    ),
    security(("bearer_auth" = [])),
    tag = "Courier"
)]
pub async fn deliveries(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<Deliveries>>> {
    let resp = courier_service::deliveries(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/courier/orders/{id}/accept",
    params(("id" = Uuid, Path, description = "Order id")),
    responses(
        (status = 200, description = "Order claimed and shipped", body = ApiResponse<AssignmentView>),
        (status = 400, description = "Order is not ready to ship"),
        (status = 409, description = "Another courier claimed it first")
    ),
    security(("bearer_auth" = [])),
    tag = "Courier"
)]
pub async fn accept(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<AssignmentView>>> {
    let resp = courier_service::accept(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/courier/orders/{id}/unaccept",
    params(("id" = Uuid, Path, description = "Order id")),
    responses(
        (status = 200, description = "Claim released", body = ApiResponse<Order>),
        (status = 403, description = "Claimed by another courier")
    ),
    security(("bearer_auth" = [])),
    tag = "Courier"
)]
pub async fn unaccept(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Order>>> {
    let resp = courier_service::unaccept(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/courier/orders/{id}/complete",
    params(("id" = Uuid, Path, description = "Order id")),
    responses(
        (status = 200, description = "Order delivered", body = ApiResponse<AssignmentView>),
        (status = 403, description = "Claimed by another courier")
    ),
    security(("bearer_auth" = [])),
    tag = "Courier"
)]
pub async fn complete(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<AssignmentView>>> {
    let resp = courier_service::complete(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/courier/orders/{id}/issue",
    params(("id" = Uuid, Path, description = "Order id")),
    responses(
        (status = 200, description = "Current issue and a one-time report token", body = ApiResponse<IssueForm>),
        (status = 404, description = "No assignment on this order")
    ),
    security(("bearer_auth" = [])),
    tag = "Courier"
)]
pub async fn issue_form(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<IssueForm>>> {
    let resp = courier_service::issue_form(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/courier/orders/{id}/issue",
    params(("id" = Uuid, Path, description = "Order id")),
    request_body = ReportIssueRequest,
    responses(
        (status = 200, description = "Issue recorded, or a replayed submission ignored", body = ApiResponse<AssignmentView>),
        (status = 400, description = "Missing description or wrong order state")
    ),
    security(("bearer_auth" = [])),
    tag = "Courier"
)]
pub async fn report_issue(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<ReportIssueRequest>,
) -> AppResult<Json<ApiResponse<AssignmentView>>> {
    let resp = courier_service::report_issue(&state, &user, id, payload).await?;
    Ok(Json(resp))
}
