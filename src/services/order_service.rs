use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, Condition, ConnectionTrait, EntityTrait,
    ModelTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
    sea_query::{Expr, LockType},
};
use uuid::Uuid;

use crate::{
    audit,
    domain::{
        Capability, OrderEvent, OrderStatus,
        payment::{self, CardDetails, ShippingAddress},
        pricing,
    },
    dto::orders::{CheckoutRequest, CheckoutSummary, OrderDetails, OrderList, OrderWithItems},
    entity::{
        book_listings::{Column as ListingCol, Entity as BookListings},
        carts::{Column as CartCol, Entity as Carts},
        order_assignments::Entity as OrderAssignments,
        order_items::{
            ActiveModel as OrderItemActive, Column as OrderItemCol, Entity as OrderItems,
        },
        orders::{ActiveModel as OrderActive, Column as OrderCol, Entity as Orders, Model as OrderModel},
        reviews::{Column as ReviewCol, Entity as Reviews},
        shops::Entity as Shops,
    },
    error::{AppError, AppResult},
    forms::{FormAction, FormKey},
    middleware::auth::{AuthUser, ensure_capability},
    models::{Order, OrderItem},
    response::{ApiResponse, Meta},
    routes::params::{OrderListQuery, SortOrder},
    services::{cart_service, lifecycle},
    state::AppState,
};

fn checkout_key(user: &AuthUser) -> FormKey {
    FormKey::new(user.session_id, FormAction::Checkout, user.user_id)
}

fn sold_error() -> AppError {
    AppError::BadRequest("One of the books in your cart has already been sold".into())
}

pub fn validate_checkout(payload: &CheckoutRequest) -> AppResult<()> {
    payment::validate_address(&ShippingAddress {
        address: &payload.address,
        city: &payload.city,
        state: &payload.state,
        postal_code: &payload.postal_code,
        country: &payload.country,
    })?;
    payment::validate_card(&CardDetails {
        number: &payload.card_number,
        expiry: &payload.expiry,
        cvv: &payload.cvv,
    })?;
    Ok(())
}

pub async fn checkout_summary(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<CheckoutSummary>> {
    ensure_capability(user, Capability::Purchase)?;
    let cart = cart_service::find_cart(&state.orm, user.user_id)
        .await?
        .ok_or_else(|| AppError::BadRequest("Cart is empty".into()))?;
    let lines = cart_service::load_lines(&state.orm, cart.id).await?;
    if lines.is_empty() {
        return Err(AppError::BadRequest("Cart is empty".into()));
    }
    if lines.iter().any(|(_, listing)| listing.bought) {
        return Err(sold_error());
    }

    let totals = cart_service::totals_of(&lines)?;
    let form_token = state.forms.mint(checkout_key(user));

    Ok(ApiResponse::success(
        "OK",
        CheckoutSummary {
            items: cart_service::to_cart_lines(lines)?,
            totals,
            form_token,
        },
        Some(Meta::empty()),
    ))
}

pub async fn checkout(
    state: &AppState,
    user: &AuthUser,
    payload: CheckoutRequest,
) -> AppResult<ApiResponse<OrderWithItems>> {
    ensure_capability(user, Capability::Purchase)?;
    validate_checkout(&payload)?;

    let form_token = payload.form_token.as_deref();
    if !state.forms.is_live(checkout_key(user), form_token) {
        tracing::info!(user_id = %user.user_id, "checkout replay ignored");
        return Ok(ApiResponse::ignored());
    }

    let txn = state.orm.begin().await?;

    let cart = Carts::find()
        .filter(CartCol::UserId.eq(user.user_id))
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::BadRequest("Cart is empty".into()))?;

    let lines = cart_service::load_lines(&txn, cart.id).await?;
    if lines.is_empty() {
        return Err(AppError::BadRequest("Cart is empty".into()));
    }
    if lines.iter().any(|(_, listing)| listing.bought) {
        return Err(sold_error());
    }

    let totals = cart_service::totals_of(&lines)?;

    let order = OrderActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(user.user_id),
        status: Set(OrderStatus::Pending),
        total_price: Set(totals.total),
        address: Set(payload.address.trim().to_string()),
        city: Set(payload.city.trim().to_string()),
        state: Set(payload.state.trim().to_string()),
        postal_code: Set(payload.postal_code.trim().to_string()),
        country: Set(payload.country.trim().to_string()),
        placed_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&txn)
    .await?;

    let mut items: Vec<OrderItem> = Vec::with_capacity(lines.len());
    for (cart_item, listing) in &lines {
        let item = OrderItemActive {
            id: Set(Uuid::new_v4()),
            order_id: Set(order.id),
            book_listing_id: Set(listing.id),
            quantity: Set(cart_item.quantity),
            purchase_price: Set(listing.price),
            created_at: NotSet,
        }
        .insert(&txn)
        .await?;
        items.push(item.into());
    }

    // Compare-and-set: a concurrent checkout that sold any of these first
    // leaves fewer rows to flip.
    let listing_ids: Vec<Uuid> = lines.iter().map(|(_, listing)| listing.id).collect();
    let marked = BookListings::update_many()
        .col_expr(ListingCol::Bought, Expr::value(true))
        .filter(ListingCol::Id.is_in(listing_ids.clone()))
        .filter(ListingCol::Bought.eq(false))
        .exec(&txn)
        .await?;
    if marked.rows_affected != listing_ids.len() as u64 {
        tracing::warn!(
            user_id = %user.user_id,
            expected = listing_ids.len(),
            marked = marked.rows_affected,
            "checkout lost race on listings"
        );
        return Err(AppError::Conflict(
            "Someone else bought one of these books first".into(),
        ));
    }

    cart.delete(&txn).await?;

    // The token is spent only by a checkout that is about to commit; a
    // parallel submit of the same form loses here and rolls back.
    if !state.forms.redeem(checkout_key(user), form_token) {
        tracing::info!(user_id = %user.user_id, "checkout replay ignored");
        return Ok(ApiResponse::ignored());
    }
    txn.commit().await?;

    tracing::info!(order_id = %order.id, total = order.total_price, "order placed");
    audit::record(
        &state.pool,
        user.user_id,
        "checkout",
        "orders",
        serde_json::json!({
            "order_id": order.id,
            "subtotal": totals.subtotal,
            "tax": totals.tax,
            "total": totals.total,
        }),
    )
    .await;

    Ok(ApiResponse::success(
        "Checkout success",
        OrderWithItems {
            order: order.into(),
            items,
        },
        Some(Meta::empty()),
    ))
}

pub async fn list_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    ensure_capability(user, Capability::Purchase)?;
    paged_orders(
        state,
        Condition::all().add(OrderCol::UserId.eq(user.user_id)),
        query,
    )
    .await
}

/// Orders matching `condition` plus the query's status filter, newest first
/// unless asked otherwise.
pub async fn paged_orders(
    state: &AppState,
    mut condition: Condition,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    let (page, limit, offset) = query.pagination().normalize();
    if let Some(status) = query.status {
        condition = condition.add(OrderCol::Status.eq(status));
    }

    let mut finder = Orders::find().filter(condition);
    finder = match query.sort_order.unwrap_or(SortOrder::Desc) {
        SortOrder::Asc => finder.order_by_asc(OrderCol::PlacedAt),
        SortOrder::Desc => finder.order_by_desc(OrderCol::PlacedAt),
    };

    let total = finder.clone().count(&state.orm).await? as i64;

    let orders: Vec<Order> = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Order::from)
        .collect();

    Ok(ApiResponse::success(
        "OK",
        OrderList { items: orders },
        Some(Meta::new(page, limit, total)),
    ))
}

/// Items, totals, shop, the buyer's review of that shop and the courier
/// assignment for one order.
pub async fn order_details<C: ConnectionTrait>(
    conn: &C,
    order: OrderModel,
) -> AppResult<OrderDetails> {
    let rows = OrderItems::find()
        .filter(OrderItemCol::OrderId.eq(order.id))
        .order_by_asc(OrderItemCol::CreatedAt)
        .find_also_related(BookListings)
        .all(conn)
        .await?;

    let totals = pricing::breakdown(
        rows.iter()
            .map(|(item, _)| (item.purchase_price, item.quantity)),
    )?;

    let shop_id = rows
        .iter()
        .find_map(|(_, listing)| listing.as_ref().map(|l| l.shop_id));

    let (shop, review) = match shop_id {
        Some(shop_id) => {
            let shop = Shops::find_by_id(shop_id).one(conn).await?;
            let review = Reviews::find()
                .filter(ReviewCol::ShopId.eq(shop_id))
                .filter(ReviewCol::UserId.eq(order.user_id))
                .one(conn)
                .await?;
            (shop.map(Into::into), review.map(Into::into))
        }
        None => (None, None),
    };

    let assignment = order
        .find_related(OrderAssignments)
        .one(conn)
        .await?
        .map(Into::into);

    Ok(OrderDetails {
        order: order.into(),
        items: rows.into_iter().map(|(item, _)| item.into()).collect(),
        totals,
        shop,
        review,
        assignment,
    })
}

pub async fn get_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<OrderDetails>> {
    ensure_capability(user, Capability::Purchase)?;
    let order = Orders::find()
        .filter(
            Condition::all()
                .add(OrderCol::UserId.eq(user.user_id))
                .add(OrderCol::Id.eq(id)),
        )
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let details = order_details(&state.orm, order).await?;
    Ok(ApiResponse::success("OK", details, Some(Meta::empty())))
}

/// Cancel a pending or ready order nobody has claimed. Its listings stay
/// sold: the cancelled order's items still reference them. `owner`
/// restricts the order to one buyer.
pub async fn cancel(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    owner: Option<Uuid>,
) -> AppResult<ApiResponse<Order>> {
    lifecycle::authorize(OrderEvent::Cancel, user.role)?;

    let txn = state.orm.begin().await?;
    let order = lifecycle::lock_order(&txn, id).await?;
    if owner.is_some_and(|owner| owner != order.user_id) {
        return Err(AppError::NotFound);
    }

    let claimed = lifecycle::is_claimed(&txn, order.id).await?;
    let order = lifecycle::transition(&txn, order, OrderEvent::Cancel, claimed).await?;

    txn.commit().await?;

    audit::record(
        &state.pool,
        user.user_id,
        "order_cancel",
        "orders",
        serde_json::json!({ "order_id": order.id, "by": user.role }),
    )
    .await;

    Ok(ApiResponse::success(
        "Order cancelled",
        order.into(),
        Some(Meta::empty()),
    ))
}

pub async fn cancel_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<Order>> {
    ensure_capability(user, Capability::Purchase)?;
    cancel(state, user, id, Some(user.user_id)).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> CheckoutRequest {
        CheckoutRequest {
            address: "12 Paper Lane".into(),
            city: "Springfield".into(),
            state: "Oregon".into(),
            postal_code: "97477".into(),
            country: "USA".into(),
            card_number: "4111 1111 1111 1111".into(),
            expiry: "09/29".into(),
            cvv: "123".into(),
            form_token: None,
        }
    }

    #[test]
    fn well_formed_checkout_passes() {
        assert!(validate_checkout(&request()).is_ok());
    }

    #[test]
    fn bad_fields_are_rejected_before_anything_runs() {
        let mut r = request();
        r.city = "Area 51".into();
        assert!(matches!(validate_checkout(&r), Err(AppError::BadRequest(_))));

        let mut r = request();
        r.card_number = "4111 1111".into();
        assert!(validate_checkout(&r).is_err());

        let mut r = request();
        r.expiry = "13/29".into();
        assert!(validate_checkout(&r).is_err());

        let mut r = request();
        r.postal_code = "97-477".into();
        assert!(validate_checkout(&r).is_err());
    }
}
