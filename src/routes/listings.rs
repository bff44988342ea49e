use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::get,
};
use uuid::Uuid;

use crate::{
    dto::listings::{ListingDetails, ListingList},
    error::AppResult,
    middleware::auth::AuthUser,
    response::ApiResponse,
    routes::params::ListingQuery,
    services::listing_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_listings))
        .route("/{id}", get(get_listing))
}

#[utoipa::path(
    get,
    path = "/api/listings",
    params(ListingQuery),
    responses(
        (status = 200, description = "Books for sale", body = ApiResponse<ListingList>)
    ),
    tag = "Listings"
)]
pub async fn list_listings(
    State(state): State<AppState>,
    Query(query): Query<ListingQuery>,
) -> AppResult<Json<ApiResponse<ListingList>>> {
    let resp = listing_service::list_listings(&state, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/listings/{id}",
    params(("id" = Uuid, Path, description = "Listing id")),
    responses(
        (status = 200, description = "Listing with shop rating", body = ApiResponse<ListingDetails>),
        (status = 404, description = "Listing not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Listings"
)]
pub async fn get_listing(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<ListingDetails>>> {
    let resp = listing_service::get_listing(&state, &user, id).await?;
    Ok(Json(resp))
}
