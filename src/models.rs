use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    domain::{BookCondition, OrderStatus, Role},
    entity,
    error::AppError,
};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Shop {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BookListing {
    pub id: Uuid,
    pub shop_id: Uuid,
    pub title: String,
    pub author: String,
    pub condition: BookCondition,
    /// Price in cents.
    pub price: i64,
    pub image_url: Option<String>,
    pub image_file_id: Option<String>,
    pub bought: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CartItem {
    pub id: Uuid,
    pub cart_id: Uuid,
    pub book_listing_id: Uuid,
    pub quantity: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub status: OrderStatus,
    /// Subtotal plus tax, in cents, fixed when the order was placed.
    pub total_price: i64,
    pub address: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
    pub placed_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub book_listing_id: Uuid,
    pub quantity: i32,
    pub purchase_price: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrderAssignment {
    pub id: Uuid,
    pub order_id: Uuid,
    pub courier_id: Uuid,
    pub assigned_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DeliveryIssue {
    pub id: Uuid,
    pub order_assignment_id: Uuid,
    pub issue_description: String,
    pub reported_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Review {
    pub id: Uuid,
    pub shop_id: Uuid,
    pub user_id: Uuid,
    pub rating: i32,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UpgradeRequest {
    pub id: Uuid,
    pub user_id: Uuid,
    pub target_role: String,
    pub approved: bool,
    pub requested_at: DateTime<Utc>,
}

impl TryFrom<entity::users::Model> for User {
    type Error = AppError;

    fn try_from(model: entity::users::Model) -> Result<Self, Self::Error> {
        let role = model
            .role
            .parse::<Role>()
            .map_err(|e| AppError::Integrity(format!("user {}: {e}", model.id)))?;
        Ok(Self {
            id: model.id,
            email: model.email,
            name: model.name,
            role,
            created_at: model.created_at.with_timezone(&Utc),
        })
    }
}

impl From<entity::shops::Model> for Shop {
    fn from(model: entity::shops::Model) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            name: model.name,
        }
    }
}

impl From<entity::book_listings::Model> for BookListing {
    fn from(model: entity::book_listings::Model) -> Self {
        Self {
            id: model.id,
            shop_id: model.shop_id,
            title: model.title,
            author: model.author,
            condition: model.condition,
            price: model.price,
            image_url: model.image_url,
            image_file_id: model.image_file_id,
            bought: model.bought,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

impl From<entity::cart_items::Model> for CartItem {
    fn from(model: entity::cart_items::Model) -> Self {
        Self {
            id: model.id,
            cart_id: model.cart_id,
            book_listing_id: model.book_listing_id,
            quantity: model.quantity,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

impl From<entity::orders::Model> for Order {
    fn from(model: entity::orders::Model) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            status: model.status,
            total_price: model.total_price,
            address: model.address,
            city: model.city,
            state: model.state,
            postal_code: model.postal_code,
            country: model.country,
            placed_at: model.placed_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        }
    }
}

impl From<entity::order_items::Model> for OrderItem {
    fn from(model: entity::order_items::Model) -> Self {
        Self {
            id: model.id,
            order_id: model.order_id,
            book_listing_id: model.book_listing_id,
            quantity: model.quantity,
            purchase_price: model.purchase_price,
        }
    }
}

impl From<entity::order_assignments::Model> for OrderAssignment {
    fn from(model: entity::order_assignments::Model) -> Self {
        Self {
            id: model.id,
            order_id: model.order_id,
            courier_id: model.courier_id,
            assigned_at: model.assigned_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        }
    }
}

impl From<entity::delivery_issues::Model> for DeliveryIssue {
    fn from(model: entity::delivery_issues::Model) -> Self {
        Self {
            id: model.id,
            order_assignment_id: model.order_assignment_id,
            issue_description: model.issue_description,
            reported_at: model.reported_at.with_timezone(&Utc),
        }
    }
}

impl From<entity::reviews::Model> for Review {
    fn from(model: entity::reviews::Model) -> Self {
        Self {
            id: model.id,
            shop_id: model.shop_id,
            user_id: model.user_id,
            rating: model.rating,
            comment: model.comment,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

impl From<entity::upgrade_requests::Model> for UpgradeRequest {
    fn from(model: entity::upgrade_requests::Model) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            target_role: model.target_role,
            approved: model.approved,
            requested_at: model.requested_at.with_timezone(&Utc),
        }
    }
}
