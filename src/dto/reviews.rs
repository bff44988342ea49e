use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::{Review, Shop};

#[derive(Debug, Deserialize, ToSchema)]
pub struct SubmitReviewRequest {
    pub rating: i32,
    pub comment: String,
    pub form_token: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ReviewForm {
    pub shop: Shop,
    pub form_token: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ShopReviews {
    pub shop: Shop,
    pub average_rating: f64,
    pub items: Vec<Review>,
}
