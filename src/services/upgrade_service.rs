use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, Condition, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait, sea_query::LockType,
};
use uuid::Uuid;

use crate::{
    audit,
    domain::{Capability, Role},
    dto::upgrades::{CreateUpgradeRequest, UpgradeRequestList},
    entity::{
        shops::{ActiveModel as ShopActive, Column as ShopCol, Entity as Shops},
        upgrade_requests::{
            ActiveModel as UpgradeActive, Column as UpgradeCol, Entity as UpgradeRequests,
        },
        users::{ActiveModel as UserActive, Entity as Users},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin, ensure_capability},
    models::UpgradeRequest,
    response::{ApiResponse, Meta},
    routes::params::{Pagination, UpgradeListQuery},
    state::AppState,
};

/// Name given to the shop created for a newly approved seller.
pub fn default_shop_name(owner: &str) -> String {
    format!("{}'s Shop", owner.trim())
}

pub async fn request_upgrade(
    state: &AppState,
    user: &AuthUser,
    payload: CreateUpgradeRequest,
) -> AppResult<ApiResponse<UpgradeRequest>> {
    ensure_capability(user, Capability::RequestUpgrade)?;
    let target = payload.target_role;
    if !target.is_upgrade_target() {
        return Err(AppError::BadRequest(format!(
            "cannot request the {target} role"
        )));
    }

    let open = UpgradeRequests::find()
        .filter(UpgradeCol::UserId.eq(user.user_id))
        .filter(UpgradeCol::TargetRole.eq(target.as_str()))
        .filter(UpgradeCol::Approved.eq(false))
        .count(&state.orm)
        .await?;
    if open > 0 {
        return Err(AppError::BadRequest(format!(
            "You already have a pending request to become a {target}"
        )));
    }

    let request = UpgradeActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(user.user_id),
        target_role: Set(target.as_str().to_string()),
        approved: Set(false),
        requested_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    audit::record(
        &state.pool,
        user.user_id,
        "upgrade_request",
        "upgrade_requests",
        serde_json::json!({ "request_id": request.id, "target_role": target }),
    )
    .await;

    Ok(ApiResponse::success(
        "Upgrade requested",
        request.into(),
        Some(Meta::empty()),
    ))
}

pub async fn my_requests(
    state: &AppState,
    user: &AuthUser,
    pagination: Pagination,
) -> AppResult<ApiResponse<UpgradeRequestList>> {
    paged(
        state,
        Condition::all().add(UpgradeCol::UserId.eq(user.user_id)),
        pagination,
    )
    .await
}

pub async fn list_requests(
    state: &AppState,
    user: &AuthUser,
    query: UpgradeListQuery,
) -> AppResult<ApiResponse<UpgradeRequestList>> {
    ensure_admin(user)?;
    let mut condition = Condition::all();
    if query.pending.unwrap_or(true) {
        condition = condition.add(UpgradeCol::Approved.eq(false));
    }
    paged(state, condition, query.pagination()).await
}

async fn paged(
    state: &AppState,
    condition: Condition,
    pagination: Pagination,
) -> AppResult<ApiResponse<UpgradeRequestList>> {
    let (page, limit, offset) = pagination.normalize();
    let finder = UpgradeRequests::find()
        .filter(condition)
        .order_by_desc(UpgradeCol::RequestedAt);
    let total = finder.clone().count(&state.orm).await? as i64;
    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(UpgradeRequest::from)
        .collect();
    Ok(ApiResponse::success(
        "OK",
        UpgradeRequestList { items },
        Some(Meta::new(page, limit, total)),
    ))
}

/// Switch the requester to the target role. A new seller gets a shop in the
/// same transaction.
pub async fn approve(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<UpgradeRequest>> {
    ensure_admin(user)?;

    let txn = state.orm.begin().await?;
    let request = UpgradeRequests::find_by_id(id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;
    if request.approved {
        return Err(AppError::BadRequest("Request is already approved".into()));
    }

    let target = request
        .target_role
        .parse::<Role>()
        .map_err(|e| AppError::Integrity(format!("upgrade request {}: {e}", request.id)))?;
    if !target.is_upgrade_target() {
        return Err(AppError::Integrity(format!(
            "upgrade request {} targets {target}",
            request.id
        )));
    }

    let requester = Users::find_by_id(request.user_id)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;
    let requester_name = requester.name.clone();
    let mut active: UserActive = requester.into();
    active.role = Set(target.as_str().to_string());
    let requester = active.update(&txn).await?;

    if target == Role::Seller {
        let has_shop = Shops::find()
            .filter(ShopCol::UserId.eq(requester.id))
            .count(&txn)
            .await?
            > 0;
        if !has_shop {
            let shop = ShopActive {
                id: Set(Uuid::new_v4()),
                user_id: Set(requester.id),
                name: Set(default_shop_name(&requester_name)),
                created_at: NotSet,
            }
            .insert(&txn)
            .await?;
            tracing::info!(shop_id = %shop.id, user_id = %requester.id, "shop opened");
        }
    }

    let mut active: UpgradeActive = request.into();
    active.approved = Set(true);
    let request = active.update(&txn).await?;

    txn.commit().await?;

    tracing::info!(user_id = %requester.id, role = %target, "role upgraded");
    audit::record(
        &state.pool,
        user.user_id,
        "upgrade_approve",
        "upgrade_requests",
        serde_json::json!({ "request_id": request.id, "user_id": requester.id, "role": target }),
    )
    .await;

    Ok(ApiResponse::success(
        "Upgrade approved",
        request.into(),
        Some(Meta::empty()),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_shops_are_named_after_their_owner() {
        assert_eq!(default_shop_name("Mira "), "Mira's Shop");
    }
}
