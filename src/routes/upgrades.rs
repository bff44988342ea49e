use axum::{
    Json, Router,
    extract::{Query, State},
    routing::get,
};

use crate::{
    dto::upgrades::{CreateUpgradeRequest, UpgradeRequestList},
    error::AppResult,
    middleware::auth::AuthUser,
    models::UpgradeRequest,
    response::ApiResponse,
    routes::params::Pagination,
    services::upgrade_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(my_requests).post(request_upgrade))
}

#[utoipa::path(
    post,
    path = "/api/upgrades",
    request_body = CreateUpgradeRequest,
    responses(
        (status = 200, description = "Ask an admin for the seller or courier role", body = ApiResponse<UpgradeRequest>),
        (status = 400, description = "Invalid target or request already pending")
    ),
    security(("bearer_auth" = [])),
    tag = "Upgrades"
)]
pub async fn request_upgrade(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateUpgradeRequest>,
) -> AppResult<Json<ApiResponse<UpgradeRequest>>> {
    let resp = upgrade_service::request_upgrade(&state, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/upgrades",
    params(Pagination),
    responses(
        (status = 200, description = "The caller's upgrade requests", body = ApiResponse<UpgradeRequestList>)
    ),
    security(("bearer_auth" = [])),
    tag = "Upgrades"
)]
pub async fn my_requests(
    State(state): State<AppState>,
    user: AuthUser,
    Query(pagination): Query<Pagination>,
) -> AppResult<Json<ApiResponse<UpgradeRequestList>>> {
    let resp = upgrade_service::my_requests(&state, &user, pagination).await?;
    Ok(Json(resp))
}
