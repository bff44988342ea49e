use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait, sea_query::OnConflict,
};
use uuid::Uuid;

use crate::{
    audit,
    domain::{Capability, pricing},
    dto::cart::{AddToCartRequest, CartLine, CartView},
    entity::{
        book_listings::{Entity as BookListings, Model as ListingModel},
        cart_items::{
            ActiveModel as CartItemActive, Column as CartItemCol, Entity as CartItems,
            Model as CartItemModel,
        },
        carts::{ActiveModel as CartActive, Column as CartCol, Entity as Carts, Model as CartModel},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_capability},
    models::CartItem,
    response::{ApiResponse, Meta},
    state::AppState,
};

pub async fn find_cart<C: ConnectionTrait>(conn: &C, user_id: Uuid) -> AppResult<Option<CartModel>> {
    Ok(Carts::find()
        .filter(CartCol::UserId.eq(user_id))
        .one(conn)
        .await?)
}

pub async fn get_or_create_cart<C: ConnectionTrait>(conn: &C, user_id: Uuid) -> AppResult<CartModel> {
    if let Some(cart) = find_cart(conn, user_id).await? {
        return Ok(cart);
    }
    // A concurrent request may create it first; the unique index on
    // `carts.user_id` keeps a single row either way.
    Carts::insert(CartActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        created_at: NotSet,
    })
    .on_conflict(OnConflict::column(CartCol::UserId).do_nothing().to_owned())
    .exec_without_returning(conn)
    .await?;
    find_cart(conn, user_id)
        .await?
        .ok_or_else(|| AppError::Integrity(format!("cart for {user_id} vanished")))
}

/// Cart items joined with their listings, oldest first.
pub async fn load_lines<C: ConnectionTrait>(
    conn: &C,
    cart_id: Uuid,
) -> AppResult<Vec<(CartItemModel, ListingModel)>> {
    let rows = CartItems::find()
        .filter(CartItemCol::CartId.eq(cart_id))
        .order_by_asc(CartItemCol::CreatedAt)
        .find_also_related(BookListings)
        .all(conn)
        .await?;

    rows.into_iter()
        .map(|(item, listing)| {
            listing.map(|l| (item.clone(), l)).ok_or_else(|| {
                AppError::Integrity(format!("cart item {} has no listing", item.id))
            })
        })
        .collect()
}

pub fn to_cart_lines(lines: Vec<(CartItemModel, ListingModel)>) -> AppResult<Vec<CartLine>> {
    lines
        .into_iter()
        .map(|(item, listing)| {
            Ok(CartLine {
                id: item.id,
                line_total: pricing::line_total(listing.price, item.quantity)?,
                listing: listing.into(),
                quantity: item.quantity,
            })
        })
        .collect()
}

pub fn totals_of(lines: &[(CartItemModel, ListingModel)]) -> AppResult<pricing::PriceBreakdown> {
    Ok(pricing::breakdown(
        lines.iter().map(|(item, listing)| (listing.price, item.quantity)),
    )?)
}

/// Requested line quantity, 1 when omitted.
pub fn check_quantity(quantity: Option<i32>) -> AppResult<i32> {
    let quantity = quantity.unwrap_or(1);
    if quantity <= 0 {
        return Err(AppError::BadRequest(
            "quantity must be greater than 0".to_string(),
        ));
    }
    if quantity > pricing::MAX_QUANTITY {
        return Err(AppError::BadRequest(format!(
            "quantity must be at most {}",
            pricing::MAX_QUANTITY
        )));
    }
    Ok(quantity)
}

pub async fn list_cart(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<CartView>> {
    ensure_capability(user, Capability::Purchase)?;
    let lines = match find_cart(&state.orm, user.user_id).await? {
        Some(cart) => load_lines(&state.orm, cart.id).await?,
        None => Vec::new(),
    };
    let totals = totals_of(&lines)?;
    let items = to_cart_lines(lines)?;
    let meta = Meta::new(1, items.len() as i64, items.len() as i64);
    Ok(ApiResponse::success("OK", CartView { items, totals }, Some(meta)))
}

pub async fn add_to_cart(
    state: &AppState,
    user: &AuthUser,
    payload: AddToCartRequest,
) -> AppResult<ApiResponse<CartItem>> {
    ensure_capability(user, Capability::Purchase)?;
    let quantity = check_quantity(payload.quantity)?;

    let txn = state.orm.begin().await?;

    let listing = BookListings::find_by_id(payload.book_listing_id)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;
    if listing.bought {
        return Err(AppError::BadRequest(
            "This book has already been sold".to_string(),
        ));
    }

    let cart = get_or_create_cart(&txn, user.user_id).await?;
    let lines = load_lines(&txn, cart.id).await?;

    if let Some((_, first)) = lines.first() {
        if first.shop_id != listing.shop_id {
            return Err(AppError::BadRequest(
                "You can only add books from the same shop to the cart.".to_string(),
            ));
        }
    }

    let existing = lines
        .into_iter()
        .find(|(item, _)| item.book_listing_id == listing.id)
        .map(|(item, _)| item);

    let cart_item = match existing {
        Some(item) => {
            let mut active: CartItemActive = item.into();
            active.quantity = Set(quantity);
            active.update(&txn).await?
        }
        None => {
            CartItemActive {
                id: Set(Uuid::new_v4()),
                cart_id: Set(cart.id),
                book_listing_id: Set(listing.id),
                quantity: Set(quantity),
                created_at: NotSet,
            }
            .insert(&txn)
            .await?
        }
    };

    txn.commit().await?;

    audit::record(
        &state.pool,
        user.user_id,
        "cart_update",
        "cart_items",
        serde_json::json!({ "book_listing_id": listing.id, "quantity": quantity }),
    )
    .await;

    Ok(ApiResponse::success("OK", cart_item.into(), None))
}

pub async fn remove_from_cart(
    state: &AppState,
    user: &AuthUser,
    item_id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_capability(user, Capability::Purchase)?;
    let cart = find_cart(&state.orm, user.user_id)
        .await?
        .ok_or(AppError::NotFound)?;

    let result = CartItems::delete_many()
        .filter(CartItemCol::Id.eq(item_id))
        .filter(CartItemCol::CartId.eq(cart.id))
        .exec(&state.orm)
        .await?;

    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }

    audit::record(
        &state.pool,
        user.user_id,
        "cart_remove",
        "cart_items",
        serde_json::json!({ "cart_item_id": item_id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Removed from cart",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quantity_defaults_to_one() {
        assert_eq!(check_quantity(None).unwrap(), 1);
        assert_eq!(check_quantity(Some(3)).unwrap(), 3);
    }

    #[test]
    fn quantity_outside_bounds_is_rejected() {
        assert!(matches!(check_quantity(Some(0)), Err(AppError::BadRequest(_))));
        assert!(check_quantity(Some(-1)).is_err());
        assert!(check_quantity(Some(pricing::MAX_QUANTITY)).is_ok());
        assert!(check_quantity(Some(pricing::MAX_QUANTITY + 1)).is_err());
        assert!(check_quantity(Some(i32::MAX)).is_err());
    }
}
