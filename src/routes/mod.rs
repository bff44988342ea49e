use axum::{
    Json, Router,
    http::{StatusCode, Uri},
    routing::get,
};

use crate::{
    response::{ApiResponse, Meta},
    state::AppState,
};

pub mod admin;
pub mod auth;
pub mod cart;
pub mod courier;
pub mod doc;
pub mod health;
pub mod listings;
pub mod orders;
pub mod params;
pub mod reviews;
pub mod seller;
pub mod upgrades;

// Build the API router without binding state; it will be provided at the top level.
pub fn create_api_router() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/listings", listings::router())
        .nest("/cart", cart::router())
        .nest("/orders", orders::router())
        .nest("/shops", reviews::router())
        .nest("/seller", seller::router())
        .nest("/courier", courier::router())
        .nest("/upgrades", upgrades::router())
        .nest("/admin", admin::router())
}

/// Health, `/api`, docs and the JSON 404, bound to `state`. Transport
/// layers are added by the binary.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .nest("/api", create_api_router())
        .merge(doc::scalar_docs())
        .fallback(not_found)
        .with_state(state)
}

async fn not_found(uri: Uri) -> (StatusCode, Json<ApiResponse<serde_json::Value>>) {
    let body = ApiResponse::success(
        "Not Found",
        serde_json::json!({ "path": uri.path() }),
        Some(Meta::empty()),
    );
    (StatusCode::NOT_FOUND, Json(body))
}
