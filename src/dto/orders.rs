use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    domain::pricing::PriceBreakdown,
    dto::cart::CartLine,
    models::{Order, OrderAssignment, OrderItem, Review, Shop},
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CheckoutRequest {
    pub address: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
    pub card_number: String,
    /// `MM/YY`
    pub expiry: String,
    pub cvv: String,
    pub form_token: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CheckoutSummary {
    pub items: Vec<CartLine>,
    pub totals: PriceBreakdown,
    pub form_token: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderWithItems {
    pub order: Order,
    pub items: Vec<OrderItem>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderList {
    pub items: Vec<Order>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderDetails {
    pub order: Order,
    pub items: Vec<OrderItem>,
    pub totals: PriceBreakdown,
    pub shop: Option<Shop>,
    /// The caller's review of `shop`, if any.
    pub review: Option<Review>,
    pub assignment: Option<OrderAssignment>,
}
