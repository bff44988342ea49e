use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post},
};
use uuid::Uuid;

use crate::{
    dto::{
        orders::{OrderDetails, OrderList},
        upgrades::UpgradeRequestList,
    },
    error::AppResult,
    middleware::auth::AuthUser,
    models::{Order, UpgradeRequest},
    response::ApiResponse,
    routes::params::{OrderListQuery, UpgradeListQuery},
    services::{admin_service, upgrade_service},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/orders", get(list_all_orders))
        .route("/orders/{id}", get(get_order_admin))
        .route("/orders/{id}/cancel", post(cancel_order_admin))
        .route("/upgrades", get(list_upgrade_requests))
        .route("/upgrades/{id}/approve", post(approve_upgrade))
}

#[utoipa::path(
    get,
    path = "/api/admin/orders",
    params(OrderListQuery),
    responses(
        (status = 200, description = "All orders", body = ApiResponse<OrderList>),
        (status = 403, description = "Admins only")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn list_all_orders(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<OrderListQuery>,
) -> AppResult<Json<ApiResponse<OrderList>>> {
    let resp = admin_service::list_all_orders(&state, &user, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/admin/orders/{id}",
    params(("id" = Uuid, Path, description = "Order id")),
    responses(
        (status = 200, description = "Any order with details", body = ApiResponse<OrderDetails>),
        (status = 404, description = "Order not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn get_order_admin(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<OrderDetails>>> {
    let resp = admin_service::get_order(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/admin/orders/{id}/cancel",
    params(("id" = Uuid, Path, description = "Order id")),
    responses(
        (status = 200, description = "Order cancelled", body = ApiResponse<Order>),
        (status = 409, description = "A courier already claimed the order")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn cancel_order_admin(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Order>>> {
    let resp = admin_service::cancel_order(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/admin/upgrades",
    params(UpgradeListQuery),
    responses(
        (status = 200, description = "Upgrade requests, pending only by default", body = ApiResponse<UpgradeRequestList>)
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn list_upgrade_requests(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<UpgradeListQuery>,
) -> AppResult<Json<ApiResponse<UpgradeRequestList>>> {
    let resp = upgrade_service::list_requests(&state, &user, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/admin/upgrades/{id}/approve",
    params(("id" = Uuid, Path, description = "Upgrade request id")),
    responses(
        (status = 200, description = "Role switched", body = ApiResponse<UpgradeRequest>),
        (status = 400, description = "Already approved")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn approve_upgrade(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<UpgradeRequest>>> {
    let resp = upgrade_service::approve(&state, &user, id).await?;
    Ok(Json(resp))
}
