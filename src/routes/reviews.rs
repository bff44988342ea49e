use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::get,
};
use uuid::Uuid;

use crate::{
    dto::reviews::{ReviewForm, ShopReviews, SubmitReviewRequest},
    error::AppResult,
    middleware::auth::AuthUser,
    models::Review,
    response::ApiResponse,
    routes::params::Pagination,
    services::review_service,
    state::AppState,
};

/// Mounted under `/shops`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{id}/reviews", get(list_reviews).post(submit_review))
        .route("/{id}/reviews/form", get(review_form))
}

#[utoipa::path(
    get,
    path = "/api/shops/{id}/reviews",
    params(("id" = Uuid, Path, description = "Shop id"), Pagination),
    responses(
        (status = 200, description = "Reviews of a shop with its average rating", body = ApiResponse<ShopReviews>),
        (status = 404, description = "Shop not found")
    ),
    tag = "Reviews"
)]
pub async fn list_reviews(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(pagination): Query<Pagination>,
) -> AppResult<Json<ApiResponse<ShopReviews>>> {
    let resp = review_service::list_shop_reviews(&state, id, pagination).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/shops/{id}/reviews/form",
    params(("id" = Uuid, Path, description = "Shop id")),
    responses(
        (status = 200, description = "One-time review token", body = ApiResponse<ReviewForm>),
        (status = 400, description = "No completed order with this shop, or already reviewed")
    ),
    security(("bearer_auth" = [])),
    tag = "Reviews"
)]
pub async fn review_form(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<ReviewForm>>> {
    let resp = review_service::review_form(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/shops/{id}/reviews",
    params(("id" = Uuid, Path, description = "Shop id")),
    request_body = SubmitReviewRequest,
    responses(
        (status = 200, description = "Review stored, or a replayed submission ignored", body = ApiResponse<Review>),
        (status = 400, description = "Not eligible or already reviewed")
    ),
    security(("bearer_auth" = [])),
    tag = "Reviews"
)]
pub async fn submit_review(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<SubmitReviewRequest>,
) -> AppResult<Json<ApiResponse<Review>>> {
    let resp = review_service::submit_review(&state, &user, id, payload).await?;
    Ok(Json(resp))
}
