use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post, put},
};
use uuid::Uuid;

use crate::{
    dto::{
        listings::{CreateListingRequest, ListingList, UpdateListingRequest},
        seller::{RenameShopRequest, SellerDashboard, SellerOrderList},
    },
    error::AppResult,
    middleware::auth::AuthUser,
    models::{BookListing, Order, Shop},
    response::ApiResponse,
    routes::params::{ListingQuery, OrderListQuery},
    services::{listing_service, seller_service},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/shop", get(get_shop).put(rename_shop))
        .route("/dashboard", get(dashboard))
        .route("/listings", get(my_listings).post(create_listing))
        .route("/listings/{id}", put(update_listing).delete(delete_listing))
        .route("/orders", get(list_orders))
        .route("/orders/{id}/toggle-ready", post(toggle_ready))
}

#[utoipa::path(
    get,
    path = "/api/seller/shop",
    responses((status = 200, description = "The seller's shop", body = ApiResponse<Shop>)),
    security(("bearer_auth" = [])),
    tag = "Seller"
)]
pub async fn get_shop(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<Shop>>> {
    let resp = seller_service::get_shop(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/seller/shop",
    request_body = RenameShopRequest,
    responses((status = 200, description = "Shop renamed", body = ApiResponse<Shop>)),
    security(("bearer_auth" = [])),
    tag = "Seller"
)]
pub async fn rename_shop(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<RenameShopRequest>,
) -> AppResult<Json<ApiResponse<Shop>>> {
    let resp = seller_service::rename_shop(&state, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/seller/dashboard",
    responses((status = 200, description = "Order and revenue totals", body = ApiResponse<SellerDashboard>)),
    security(("bearer_auth" = [])),
    tag = "Seller"
)]
pub async fn dashboard(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<SellerDashboard>>> {
    let resp = seller_service::dashboard(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/seller/listings",
    params(ListingQuery),
    responses((status = 200, description = "Unsold listings of the seller's shop", body = ApiResponse<ListingList>)),
    security(("bearer_auth" = [])),
    tag = "Seller"
)]
pub async fn my_listings(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<ListingQuery>,
) -> AppResult<Json<ApiResponse<ListingList>>> {
    let resp = listing_service::my_listings(&state, &user, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/seller/listings",
    request_body = CreateListingRequest,
    responses(
        (status = 200, description = "Listing created", body = ApiResponse<BookListing>),
        (status = 400, description = "Invalid listing")
    ),
    security(("bearer_auth" = [])),
    tag = "Seller"
)]
pub async fn create_listing(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateListingRequest>,
) -> AppResult<Json<ApiResponse<BookListing>>> {
    let resp = listing_service::create_listing(&state, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/seller/listings/{id}",
    params(("id" = Uuid, Path, description = "Listing id")),
    request_body = UpdateListingRequest,
    responses(
        (status = 200, description = "Listing updated", body = ApiResponse<BookListing>),
        (status = 400, description = "Invalid field or listing already sold")
    ),
    security(("bearer_auth" = [])),
    tag = "Seller"
)]
pub async fn update_listing(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateListingRequest>,
) -> AppResult<Json<ApiResponse<BookListing>>> {
    let resp = listing_service::update_listing(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/seller/listings/{id}",
    params(("id" = Uuid, Path, description = "Listing id")),
    responses(
        (status = 200, description = "Listing deleted", body = ApiResponse<serde_json::Value>),
        (status = 400, description = "Listing already sold")
    ),
    security(("bearer_auth" = [])),
    tag = "Seller"
)]
pub async fn delete_listing(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = listing_service::delete_listing(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/seller/orders",
    params(OrderListQuery),
    responses((status = 200, description = "Orders containing the shop's books", body = ApiResponse<SellerOrderList>)),
    security(("bearer_auth" = [])),
    tag = "Seller"
)]
pub async fn list_orders(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<OrderListQuery>,
) -> AppResult<Json<ApiResponse<SellerOrderList>>> {
    let resp = seller_service::list_orders(&state, &user, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/seller/orders/{id}/toggle-ready",
    params(("id" = Uuid, Path, description = "Order id")),
    responses(
        (status = 200, description = "Order moved between pending and ready_to_ship", body = ApiResponse<Order>),
        (status = 400, description = "Order is past the seller's stage"),
        (status = 409, description = "A courier already claimed the order")
    ),
    security(("bearer_auth" = [])),
    tag = "Seller"
)]
pub async fn toggle_ready(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Order>>> {
    let resp = seller_service::toggle_ready(&state, &user, id).await?;
    Ok(Json(resp))
}
