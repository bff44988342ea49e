use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, Condition, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
    sea_query::{Expr, extension::postgres::PgExpr},
};
use uuid::Uuid;

use crate::{
    audit,
    domain::{Capability, pricing::MAX_PRICE_CENTS},
    dto::listings::{
        CreateListingRequest, ListingDetails, ListingList, UpdateListingRequest,
    },
    entity::{
        book_listings::{
            ActiveModel as ListingActive, Column as ListingCol, Entity as BookListings,
            Model as ListingModel,
        },
        cart_items::{Column as CartItemCol, Entity as CartItems},
        shops::Entity as Shops,
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_capability},
    models::BookListing,
    response::{ApiResponse, Meta},
    routes::params::{ListingQuery, SortOrder},
    services::{cart_service, review_service, seller_service},
    state::AppState,
};

fn required(field: &str, value: &str) -> AppResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AppError::BadRequest(format!("{field} is required")));
    }
    Ok(value.to_string())
}

fn positive_price(price: i64) -> AppResult<i64> {
    if price <= 0 {
        return Err(AppError::BadRequest("price must be greater than 0".into()));
    }
    if price > MAX_PRICE_CENTS {
        return Err(AppError::BadRequest(format!(
            "price must be at most {MAX_PRICE_CENTS} cents"
        )));
    }
    Ok(price)
}

/// Unsold listings, optionally narrowed to a shop and a title/author search.
async fn paged_listings(
    state: &AppState,
    mut condition: Condition,
    query: ListingQuery,
) -> AppResult<(Vec<BookListing>, Meta)> {
    let (page, limit, offset) = query.pagination().normalize();
    condition = condition.add(ListingCol::Bought.eq(false));

    if let Some(search) = query.q.as_ref().map(|s| s.trim()).filter(|s| !s.is_empty()) {
        let pattern = format!("%{}%", search);
        condition = condition.add(
            Condition::any()
                .add(Expr::col(ListingCol::Title).ilike(pattern.clone()))
                .add(Expr::col(ListingCol::Author).ilike(pattern)),
        );
    }

    let mut finder = BookListings::find().filter(condition);
    finder = match query.sort_order.unwrap_or(SortOrder::Desc) {
        SortOrder::Asc => finder.order_by_asc(ListingCol::CreatedAt),
        SortOrder::Desc => finder.order_by_desc(ListingCol::CreatedAt),
    };

    let total = finder.clone().count(&state.orm).await? as i64;

    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(BookListing::from)
        .collect();

    Ok((items, Meta::new(page, limit, total)))
}

pub async fn list_listings(
    state: &AppState,
    query: ListingQuery,
) -> AppResult<ApiResponse<ListingList>> {
    let (items, meta) = paged_listings(state, Condition::all(), query).await?;
    Ok(ApiResponse::success("Listings", ListingList { items }, Some(meta)))
}

pub async fn get_listing(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<ListingDetails>> {
    ensure_capability(user, Capability::Purchase)?;
    let (listing, shop) = BookListings::find_by_id(id)
        .find_also_related(Shops)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    let shop = shop.ok_or_else(|| {
        AppError::Integrity(format!("listing {} has no shop", listing.id))
    })?;

    let rating = review_service::shop_rating(&state.pool, shop.id).await?;

    let in_cart = match cart_service::find_cart(&state.orm, user.user_id).await? {
        Some(cart) => {
            CartItems::find()
                .filter(CartItemCol::CartId.eq(cart.id))
                .filter(CartItemCol::BookListingId.eq(listing.id))
                .count(&state.orm)
                .await?
                > 0
        }
        None => false,
    };

    Ok(ApiResponse::success(
        "Listing",
        ListingDetails {
            listing: listing.into(),
            shop: shop.into(),
            shop_rating: rating.average,
            total_reviews: rating.total,
            in_cart,
        },
        None,
    ))
}

pub async fn my_listings(
    state: &AppState,
    user: &AuthUser,
    query: ListingQuery,
) -> AppResult<ApiResponse<ListingList>> {
    let shop = seller_service::my_shop(&state.orm, user).await?;
    let (items, meta) = paged_listings(
        state,
        Condition::all().add(ListingCol::ShopId.eq(shop.id)),
        query,
    )
    .await?;
    Ok(ApiResponse::success("Listings", ListingList { items }, Some(meta)))
}

pub async fn create_listing(
    state: &AppState,
    user: &AuthUser,
    payload: CreateListingRequest,
) -> AppResult<ApiResponse<BookListing>> {
    let shop = seller_service::my_shop(&state.orm, user).await?;
    let listing = ListingActive {
        id: Set(Uuid::new_v4()),
        shop_id: Set(shop.id),
        title: Set(required("title", &payload.title)?),
        author: Set(required("author", &payload.author)?),
        condition: Set(payload.condition),
        price: Set(positive_price(payload.price)?),
        image_url: Set(payload.image_url.filter(|s| !s.trim().is_empty())),
        image_file_id: Set(payload.image_file_id.filter(|s| !s.trim().is_empty())),
        bought: Set(false),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    audit::record(
        &state.pool,
        user.user_id,
        "listing_create",
        "book_listings",
        serde_json::json!({ "listing_id": listing.id, "shop_id": shop.id }),
    )
    .await;

    Ok(ApiResponse::success("Listing created", listing.into(), None))
}

/// A listing of the caller's shop that has not been sold yet.
async fn owned_unsold(state: &AppState, user: &AuthUser, id: Uuid) -> AppResult<ListingModel> {
    let shop = seller_service::my_shop(&state.orm, user).await?;
    let listing = BookListings::find_by_id(id)
        .filter(ListingCol::ShopId.eq(shop.id))
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    if listing.bought {
        return Err(AppError::BadRequest(
            "Sold listings are part of an order and cannot be changed".into(),
        ));
    }
    Ok(listing)
}

pub async fn update_listing(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateListingRequest,
) -> AppResult<ApiResponse<BookListing>> {
    let listing = owned_unsold(state, user, id).await?;
    let mut active: ListingActive = listing.clone().into();

    if let Some(title) = payload.title {
        active.title = Set(required("title", &title)?);
    }
    if let Some(author) = payload.author {
        active.author = Set(required("author", &author)?);
    }
    if let Some(condition) = payload.condition {
        active.condition = Set(condition);
    }
    if let Some(price) = payload.price {
        active.price = Set(positive_price(price)?);
    }
    if !active.is_changed() {
        return Ok(ApiResponse::success("Listing unchanged", listing.into(), None));
    }

    // The sale check above is advisory; this one holds under races.
    let updated = BookListings::update_many()
        .set(active)
        .filter(ListingCol::Id.eq(id))
        .filter(ListingCol::Bought.eq(false))
        .exec_with_returning(&state.orm)
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| AppError::Conflict("The listing was sold in the meantime".into()))?;

    audit::record(
        &state.pool,
        user.user_id,
        "listing_update",
        "book_listings",
        serde_json::json!({ "listing_id": updated.id }),
    )
    .await;

    Ok(ApiResponse::success("Listing updated", updated.into(), None))
}

pub async fn delete_listing(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let listing = owned_unsold(state, user, id).await?;
    let result = BookListings::delete_many()
        .filter(ListingCol::Id.eq(listing.id))
        .filter(ListingCol::Bought.eq(false))
        .exec(&state.orm)
        .await?;
    if result.rows_affected == 0 {
        return Err(AppError::Conflict("The listing was sold in the meantime".into()));
    }

    audit::record(
        &state.pool,
        user.user_id,
        "listing_delete",
        "book_listings",
        serde_json::json!({ "listing_id": id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Listing deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_text_fields_are_rejected() {
        assert!(required("title", "   ").is_err());
        assert_eq!(required("title", " Dune ").unwrap(), "Dune");
    }

    #[test]
    fn price_must_be_positive() {
        assert!(positive_price(0).is_err());
        assert!(positive_price(-100).is_err());
        assert_eq!(positive_price(1250).unwrap(), 1250);
        assert!(positive_price(MAX_PRICE_CENTS).is_ok());
        assert!(positive_price(MAX_PRICE_CENTS + 1).is_err());
        assert!(positive_price(i64::MAX).is_err());
    }
}
