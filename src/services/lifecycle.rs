//! Shared steps for moving an order through its lifecycle inside a
//! transaction. Callers lock the order row first, then ask the state
//! machine, then persist.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QuerySelect, Set, sea_query::LockType,
};
use uuid::Uuid;

use crate::{
    domain::{OrderEvent, OrderStatus, Role},
    entity::{
        order_assignments::{Column as AssignCol, Entity as OrderAssignments},
        orders::{ActiveModel as OrderActive, Entity as Orders, Model as OrderModel},
    },
    error::{AppError, AppResult},
};

/// `SELECT … FOR UPDATE` on the order row.
pub async fn lock_order<C: ConnectionTrait>(conn: &C, order_id: Uuid) -> AppResult<OrderModel> {
    Orders::find_by_id(order_id)
        .lock(LockType::Update)
        .one(conn)
        .await?
        .ok_or(AppError::NotFound)
}

pub async fn is_claimed<C: ConnectionTrait>(conn: &C, order_id: Uuid) -> AppResult<bool> {
    let count = OrderAssignments::find()
        .filter(AssignCol::OrderId.eq(order_id))
        .count(conn)
        .await?;
    Ok(count > 0)
}

pub fn authorize(event: OrderEvent, role: Role) -> AppResult<()> {
    if event.allowed_for(role) {
        Ok(())
    } else {
        Err(AppError::Forbidden)
    }
}

/// Run `event` against a locked order and persist the new status.
pub async fn transition<C: ConnectionTrait>(
    conn: &C,
    order: OrderModel,
    event: OrderEvent,
    claimed: bool,
) -> AppResult<OrderModel> {
    let from = order.status;
    let to = from.apply(event, claimed)?;
    let updated = save_status(conn, order, to).await?;
    tracing::info!(
        order_id = %updated.id,
        from = from.as_str(),
        to = to.as_str(),
        %event,
        "order status changed"
    );
    Ok(updated)
}

pub async fn save_status<C: ConnectionTrait>(
    conn: &C,
    order: OrderModel,
    status: OrderStatus,
) -> AppResult<OrderModel> {
    let mut active: OrderActive = order.into();
    active.status = Set(status);
    active.updated_at = Set(Utc::now().into());
    Ok(active.update(conn).await?)
}
