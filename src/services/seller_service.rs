use std::collections::{HashMap, HashSet};

use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, JoinType, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, RelationTrait, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit,
    domain::{Capability, OrderEvent},
    dto::seller::{DashboardStats, RenameShopRequest, SellerDashboard, SellerOrder, SellerOrderList},
    entity::{
        book_listings::Column as ListingCol,
        order_assignments::{Column as AssignCol, Entity as OrderAssignments},
        order_items::{self, Column as OrderItemCol, Entity as OrderItems},
        orders::{self, Column as OrderCol, Entity as Orders},
        shops::{ActiveModel as ShopActive, Column as ShopCol, Entity as Shops, Model as ShopModel},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_capability},
    models::{Order, OrderItem, Shop},
    response::{ApiResponse, Meta},
    routes::params::{OrderListQuery, SortOrder},
    services::lifecycle,
    state::AppState,
};

/// The caller's shop. A seller without one is an integrity problem: the
/// shop is created together with the seller role.
pub async fn my_shop<C: ConnectionTrait>(conn: &C, user: &AuthUser) -> AppResult<ShopModel> {
    ensure_capability(user, Capability::ManageShop)?;
    Shops::find()
        .filter(ShopCol::UserId.eq(user.user_id))
        .one(conn)
        .await?
        .ok_or_else(|| AppError::Integrity(format!("seller {} has no shop", user.user_id)))
}

/// True when any item of `order_id` is one of `shop_id`'s listings.
async fn order_touches_shop<C: ConnectionTrait>(
    conn: &C,
    order_id: Uuid,
    shop_id: Uuid,
) -> AppResult<bool> {
    let count = OrderItems::find()
        .join(JoinType::InnerJoin, order_items::Relation::BookListings.def())
        .filter(OrderItemCol::OrderId.eq(order_id))
        .filter(ListingCol::ShopId.eq(shop_id))
        .count(conn)
        .await?;
    Ok(count > 0)
}

pub async fn get_shop(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<Shop>> {
    let shop = my_shop(&state.orm, user).await?;
    Ok(ApiResponse::success("OK", shop.into(), Some(Meta::empty())))
}

pub async fn rename_shop(
    state: &AppState,
    user: &AuthUser,
    payload: RenameShopRequest,
) -> AppResult<ApiResponse<Shop>> {
    let name = payload.name.trim().to_string();
    if name.is_empty() {
        return Err(AppError::BadRequest("Shop name is required".into()));
    }
    let shop = my_shop(&state.orm, user).await?;
    let mut active: ShopActive = shop.into();
    active.name = Set(name);
    let shop = active.update(&state.orm).await?;

    audit::record(
        &state.pool,
        user.user_id,
        "shop_rename",
        "shops",
        serde_json::json!({ "shop_id": shop.id, "name": shop.name }),
    )
    .await;

    Ok(ApiResponse::success("Shop updated", shop.into(), Some(Meta::empty())))
}

pub async fn list_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<SellerOrderList>> {
    let shop = my_shop(&state.orm, user).await?;
    let (page, limit, offset) = query.pagination().normalize();

    let mut finder = Orders::find()
        .distinct()
        .join(JoinType::InnerJoin, orders::Relation::OrderItems.def())
        .join(JoinType::InnerJoin, order_items::Relation::BookListings.def())
        .filter(ListingCol::ShopId.eq(shop.id));
    if let Some(status) = query.status {
        finder = finder.filter(OrderCol::Status.eq(status));
    }
    finder = match query.sort_order.unwrap_or(SortOrder::Desc) {
        SortOrder::Asc => finder.order_by_asc(OrderCol::PlacedAt),
        SortOrder::Desc => finder.order_by_desc(OrderCol::PlacedAt),
    };

    let total = finder.clone().count(&state.orm).await? as i64;
    let orders = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?;

    let order_ids: Vec<Uuid> = orders.iter().map(|o| o.id).collect();

    let mut items_by_order: HashMap<Uuid, Vec<OrderItem>> = HashMap::new();
    for item in OrderItems::find()
        .filter(OrderItemCol::OrderId.is_in(order_ids.clone()))
        .order_by_asc(OrderItemCol::CreatedAt)
        .all(&state.orm)
        .await?
    {
        items_by_order.entry(item.order_id).or_default().push(item.into());
    }

    let assigned: HashSet<Uuid> = OrderAssignments::find()
        .filter(AssignCol::OrderId.is_in(order_ids))
        .all(&state.orm)
        .await?
        .into_iter()
        .map(|a| a.order_id)
        .collect();

    let items = orders
        .into_iter()
        .map(|order| SellerOrder {
            items: items_by_order.remove(&order.id).unwrap_or_default(),
            assigned: assigned.contains(&order.id),
            order: order.into(),
        })
        .collect();

    Ok(ApiResponse::success(
        "OK",
        SellerOrderList { items },
        Some(Meta::new(page, limit, total)),
    ))
}

/// Flip an order between pending and ready_to_ship. Refused once a courier
/// has claimed it.
pub async fn toggle_ready(
    state: &AppState,
    user: &AuthUser,
    order_id: Uuid,
) -> AppResult<ApiResponse<Order>> {
    let txn = state.orm.begin().await?;
    let shop = my_shop(&txn, user).await?;

    // Lock before looking at the assignment so a courier accepting in
    // parallel waits for us.
    let order = lifecycle::lock_order(&txn, order_id).await?;
    if !order_touches_shop(&txn, order.id, shop.id).await? {
        return Err(AppError::NotFound);
    }

    let event = OrderEvent::readiness_toggle(order.status);
    lifecycle::authorize(event, user.role)?;
    let claimed = lifecycle::is_claimed(&txn, order.id).await?;
    let order = lifecycle::transition(&txn, order, event, claimed).await?;

    txn.commit().await?;

    audit::record(
        &state.pool,
        user.user_id,
        "order_toggle_ready",
        "orders",
        serde_json::json!({ "order_id": order.id, "status": order.status.as_str() }),
    )
    .await;

    Ok(ApiResponse::success(
        "Order status updated",
        order.into(),
        Some(Meta::empty()),
    ))
}

pub async fn dashboard(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<SellerDashboard>> {
    let shop = my_shop(&state.orm, user).await?;

    let stats = sqlx::query_as::<_, DashboardStats>(
        r#"
        SELECT
            COUNT(DISTINCT o.id)::BIGINT AS total_orders,
            (COUNT(DISTINCT o.id) FILTER (WHERE o.status = 'pending'))::BIGINT AS pending_orders,
            (COALESCE(SUM(oi.purchase_price * oi.quantity) FILTER (WHERE o.status = 'completed'), 0))::BIGINT AS revenue,
            (COALESCE(SUM(oi.quantity) FILTER (WHERE o.status <> 'cancelled'), 0))::BIGINT AS books_sold
        FROM order_items oi
        JOIN orders o ON o.id = oi.order_id
        JOIN book_listings bl ON bl.id = oi.book_listing_id
        WHERE bl.shop_id = $1
        "#,
    )
    .bind(shop.id)
    .fetch_one(&state.pool)
    .await?;

    Ok(ApiResponse::success(
        "OK",
        SellerDashboard {
            shop: shop.into(),
            stats,
        },
        Some(Meta::empty()),
    ))
}
