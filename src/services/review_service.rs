use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, ConnectionTrait, EntityTrait, JoinType,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, RelationTrait, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit,
    db::DbPool,
    domain::{Capability, OrderStatus},
    dto::reviews::{ReviewForm, ShopReviews, SubmitReviewRequest},
    entity::{
        book_listings::Column as ListingCol,
        order_items,
        orders::{self, Column as OrderCol, Entity as Orders},
        reviews::{ActiveModel as ReviewActive, Column as ReviewCol, Entity as Reviews},
        shops::{Entity as Shops, Model as ShopModel},
    },
    error::{AppError, AppResult, is_unique_violation},
    forms::{FormAction, FormKey},
    middleware::auth::{AuthUser, ensure_capability},
    models::{Review, Shop},
    response::{ApiResponse, Meta},
    routes::params::Pagination,
    state::AppState,
};

const NOT_ELIGIBLE: &str =
    "You can only review a shop if you have at least one COMPLETED order with that seller.";
const ALREADY_REVIEWED: &str = "You have already reviewed this shop.";

#[derive(Debug, sqlx::FromRow)]
pub struct ShopRating {
    pub average: f64,
    pub total: i64,
}

/// Average rating rounded to one decimal, 0 for a shop nobody rated.
pub async fn shop_rating(pool: &DbPool, shop_id: Uuid) -> AppResult<ShopRating> {
    let rating = sqlx::query_as::<_, ShopRating>(
        r#"
        SELECT
            COALESCE(ROUND(AVG(rating)::NUMERIC, 1), 0)::FLOAT8 AS average,
            COUNT(*)::BIGINT AS total
        FROM reviews
        WHERE shop_id = $1
        "#,
    )
    .bind(shop_id)
    .fetch_one(pool)
    .await?;
    Ok(rating)
}

fn review_key(user: &AuthUser, shop_id: Uuid) -> FormKey {
    FormKey::new(user.session_id, FormAction::Review, shop_id)
}

pub fn validate_review(payload: &SubmitReviewRequest) -> AppResult<()> {
    if !(1..=5).contains(&payload.rating) {
        return Err(AppError::BadRequest("rating must be between 1 and 5".into()));
    }
    if payload.comment.trim().is_empty() {
        return Err(AppError::BadRequest("comment is required".into()));
    }
    Ok(())
}

async fn find_shop<C: ConnectionTrait>(conn: &C, shop_id: Uuid) -> AppResult<ShopModel> {
    Shops::find_by_id(shop_id)
        .one(conn)
        .await?
        .ok_or(AppError::NotFound)
}

/// The buyer has a completed order containing at least one of the shop's books.
pub async fn has_completed_order<C: ConnectionTrait>(
    conn: &C,
    user_id: Uuid,
    shop_id: Uuid,
) -> AppResult<bool> {
    let count = Orders::find()
        .join(JoinType::InnerJoin, orders::Relation::OrderItems.def())
        .join(JoinType::InnerJoin, order_items::Relation::BookListings.def())
        .filter(OrderCol::UserId.eq(user_id))
        .filter(OrderCol::Status.eq(OrderStatus::Completed))
        .filter(ListingCol::ShopId.eq(shop_id))
        .count(conn)
        .await?;
    Ok(count > 0)
}

async fn already_reviewed<C: ConnectionTrait>(
    conn: &C,
    user_id: Uuid,
    shop_id: Uuid,
) -> AppResult<bool> {
    let count = Reviews::find()
        .filter(ReviewCol::UserId.eq(user_id))
        .filter(ReviewCol::ShopId.eq(shop_id))
        .count(conn)
        .await?;
    Ok(count > 0)
}

async fn ensure_eligible<C: ConnectionTrait>(
    conn: &C,
    user_id: Uuid,
    shop_id: Uuid,
) -> AppResult<()> {
    if !has_completed_order(conn, user_id, shop_id).await? {
        return Err(AppError::BadRequest(NOT_ELIGIBLE.into()));
    }
    if already_reviewed(conn, user_id, shop_id).await? {
        return Err(AppError::BadRequest(ALREADY_REVIEWED.into()));
    }
    Ok(())
}

pub async fn review_form(
    state: &AppState,
    user: &AuthUser,
    shop_id: Uuid,
) -> AppResult<ApiResponse<ReviewForm>> {
    ensure_capability(user, Capability::Review)?;
    let shop = find_shop(&state.orm, shop_id).await?;
    ensure_eligible(&state.orm, user.user_id, shop.id).await?;

    let form_token = state.forms.mint(review_key(user, shop.id));
    Ok(ApiResponse::success(
        "OK",
        ReviewForm {
            shop: shop.into(),
            form_token,
        },
        Some(Meta::empty()),
    ))
}

pub async fn submit_review(
    state: &AppState,
    user: &AuthUser,
    shop_id: Uuid,
    payload: SubmitReviewRequest,
) -> AppResult<ApiResponse<Review>> {
    ensure_capability(user, Capability::Review)?;
    validate_review(&payload)?;

    let form_token = payload.form_token.as_deref();
    if !state.forms.is_live(review_key(user, shop_id), form_token) {
        tracing::info!(user_id = %user.user_id, %shop_id, "review replay ignored");
        return Ok(ApiResponse::ignored());
    }

    let txn = state.orm.begin().await?;
    let shop = find_shop(&txn, shop_id).await?;
    ensure_eligible(&txn, user.user_id, shop.id).await?;

    let review = ReviewActive {
        id: Set(Uuid::new_v4()),
        shop_id: Set(shop.id),
        user_id: Set(user.user_id),
        rating: Set(payload.rating),
        comment: Set(payload.comment.trim().to_string()),
        created_at: NotSet,
    }
    .insert(&txn)
    .await
    .map_err(|err| {
        if is_unique_violation(&err) {
            tracing::warn!(user_id = %user.user_id, shop_id = %shop.id, "concurrent duplicate review");
            AppError::BadRequest(ALREADY_REVIEWED.into())
        } else {
            err.into()
        }
    })?;

    if !state.forms.redeem(review_key(user, shop.id), form_token) {
        tracing::info!(user_id = %user.user_id, shop_id = %shop.id, "review replay ignored");
        return Ok(ApiResponse::ignored());
    }
    txn.commit().await?;

    audit::record(
        &state.pool,
        user.user_id,
        "review_create",
        "reviews",
        serde_json::json!({ "review_id": review.id, "shop_id": shop.id, "rating": review.rating }),
    )
    .await;

    Ok(ApiResponse::success(
        "Review submitted",
        review.into(),
        Some(Meta::empty()),
    ))
}

pub async fn list_shop_reviews(
    state: &AppState,
    shop_id: Uuid,
    pagination: Pagination,
) -> AppResult<ApiResponse<ShopReviews>> {
    let (page, limit, offset) = pagination.normalize();
    let shop = find_shop(&state.orm, shop_id).await?;
    let rating = shop_rating(&state.pool, shop.id).await?;

    let items: Vec<Review> = Reviews::find()
        .filter(ReviewCol::ShopId.eq(shop.id))
        .order_by_desc(ReviewCol::CreatedAt)
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Review::from)
        .collect();

    Ok(ApiResponse::success(
        "OK",
        ShopReviews {
            shop: Shop::from(shop),
            average_rating: rating.average,
            items,
        },
        Some(Meta::new(page, limit, rating.total)),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn review(rating: i32, comment: &str) -> SubmitReviewRequest {
        SubmitReviewRequest {
            rating,
            comment: comment.into(),
            form_token: None,
        }
    }

    #[test]
    fn rating_must_be_one_to_five() {
        assert!(validate_review(&review(0, "meh")).is_err());
        assert!(validate_review(&review(6, "wow")).is_err());
        assert!(validate_review(&review(1, "slow")).is_ok());
        assert!(validate_review(&review(5, "great")).is_ok());
    }

    #[test]
    fn comment_cannot_be_blank() {
        assert!(matches!(
            validate_review(&review(4, "  ")),
            Err(AppError::BadRequest(_))
        ));
    }
}
