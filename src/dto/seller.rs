use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::{Order, OrderItem, Shop};

#[derive(Debug, Deserialize, ToSchema)]
pub struct RenameShopRequest {
    pub name: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SellerOrder {
    pub order: Order,
    pub items: Vec<OrderItem>,
    /// A courier has claimed the order; readiness can no longer change.
    pub assigned: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SellerOrderList {
    pub items: Vec<SellerOrder>,
}

#[derive(Debug, Serialize, ToSchema, sqlx::FromRow)]
pub struct DashboardStats {
    pub total_orders: i64,
    pub pending_orders: i64,
    pub revenue: i64,
    pub books_sold: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SellerDashboard {
    pub shop: Shop,
    pub stats: DashboardStats,
}
