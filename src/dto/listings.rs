use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    domain::BookCondition,
    models::{BookListing, Shop},
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateListingRequest {
    pub title: String,
    pub author: String,
    pub condition: BookCondition,
    pub price: i64,
    pub image_url: Option<String>,
    pub image_file_id: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateListingRequest {
    pub title: Option<String>,
    pub author: Option<String>,
    pub condition: Option<BookCondition>,
    pub price: Option<i64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ListingList {
    pub items: Vec<BookListing>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ListingDetails {
    pub listing: BookListing,
    pub shop: Shop,
    /// Average rating rounded to one decimal, 0 when unrated.
    pub shop_rating: f64,
    pub total_reviews: i64,
    pub in_cart: bool,
}
