use std::collections::HashMap;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, ConnectionTrait, EntityTrait, JoinType,
    ModelTrait, QueryFilter, QueryOrder, QuerySelect, RelationTrait, Set, TransactionTrait,
    sea_query::Expr,
};
use uuid::Uuid;

use crate::{
    audit,
    domain::{Capability, OrderEvent, OrderStatus},
    dto::courier::{AssignmentView, Deliveries, IssueForm, ReportIssueRequest},
    entity::{
        delivery_issues::{
            ActiveModel as IssueActive, Column as IssueCol, Entity as DeliveryIssues,
            Model as IssueModel,
        },
        order_assignments::{
            ActiveModel as AssignActive, Column as AssignCol, Entity as OrderAssignments,
            Model as AssignModel,
        },
        orders::{self, Column as OrderCol, Entity as Orders, Model as OrderModel},
    },
    error::{AppError, AppResult, is_unique_violation},
    forms::{FormAction, FormKey},
    middleware::auth::{AuthUser, ensure_capability},
    models::Order,
    response::{ApiResponse, Meta},
    services::lifecycle,
    state::AppState,
};

const ALREADY_CLAIMED: &str = "This order was already claimed by another courier";

fn issue_key(user: &AuthUser, order_id: Uuid) -> FormKey {
    FormKey::new(user.session_id, FormAction::ReportIssue, order_id)
}

fn view(assignment: AssignModel, order: OrderModel, issue: Option<IssueModel>) -> AssignmentView {
    AssignmentView {
        assignment: assignment.into(),
        order: order.into(),
        issue: issue.map(Into::into),
    }
}

/// The assignment on `order_id`, refusing if another courier holds it.
async fn own_assignment<C: ConnectionTrait>(
    conn: &C,
    user: &AuthUser,
    order_id: Uuid,
) -> AppResult<Option<AssignModel>> {
    let assignment = OrderAssignments::find()
        .filter(AssignCol::OrderId.eq(order_id))
        .one(conn)
        .await?;
    match assignment {
        Some(a) if a.courier_id != user.user_id => Err(AppError::Forbidden),
        other => Ok(other),
    }
}

async fn touch<C: ConnectionTrait>(conn: &C, assignment: AssignModel) -> AppResult<AssignModel> {
    let mut active: AssignActive = assignment.into();
    active.updated_at = Set(Utc::now().into());
    Ok(active.update(conn).await?)
}

pub async fn deliveries(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<Deliveries>> {
    ensure_capability(user, Capability::Deliver)?;

    let available: Vec<Order> = Orders::find()
        .join(JoinType::LeftJoin, orders::Relation::OrderAssignments.def())
        .filter(OrderCol::Status.eq(OrderStatus::ReadyToShip))
        .filter(AssignCol::Id.is_null())
        .order_by_asc(OrderCol::PlacedAt)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Order::from)
        .collect();

    let assignments = OrderAssignments::find()
        .filter(AssignCol::CourierId.eq(user.user_id))
        .order_by_desc(AssignCol::UpdatedAt)
        .find_also_related(Orders)
        .all(&state.orm)
        .await?;

    let ids: Vec<Uuid> = assignments.iter().map(|(a, _)| a.id).collect();
    let mut issues: HashMap<Uuid, IssueModel> = DeliveryIssues::find()
        .filter(IssueCol::OrderAssignmentId.is_in(ids))
        .all(&state.orm)
        .await?
        .into_iter()
        .map(|issue| (issue.order_assignment_id, issue))
        .collect();

    let mine = assignments
        .into_iter()
        .map(|(assignment, order)| {
            let order = order.ok_or_else(|| {
                AppError::Integrity(format!("assignment {} has no order", assignment.id))
            })?;
            let issue = issues.remove(&assignment.id);
            Ok(view(assignment, order, issue))
        })
        .collect::<AppResult<Vec<_>>>()?;

    Ok(ApiResponse::success(
        "OK",
        Deliveries { available, mine },
        Some(Meta::empty()),
    ))
}

/// Claim a ready order. The conditional status update and the unique index
/// on `order_assignments.order_id` decide races between couriers.
pub async fn accept(
    state: &AppState,
    user: &AuthUser,
    order_id: Uuid,
) -> AppResult<ApiResponse<AssignmentView>> {
    ensure_capability(user, Capability::Deliver)?;
    lifecycle::authorize(OrderEvent::Accept, user.role)?;

    let txn = state.orm.begin().await?;
    let order = lifecycle::lock_order(&txn, order_id).await?;
    if lifecycle::is_claimed(&txn, order.id).await? {
        tracing::warn!(%order_id, courier_id = %user.user_id, "order already claimed");
        return Err(AppError::Conflict(ALREADY_CLAIMED.into()));
    }
    let next = order.status.apply(OrderEvent::Accept, false)?;

    let flipped = Orders::update_many()
        .col_expr(OrderCol::Status, Expr::value(next))
        .col_expr(OrderCol::UpdatedAt, Expr::current_timestamp().into())
        .filter(OrderCol::Id.eq(order.id))
        .filter(OrderCol::Status.eq(OrderStatus::ReadyToShip))
        .exec(&txn)
        .await?;
    if flipped.rows_affected == 0 {
        tracing::warn!(%order_id, courier_id = %user.user_id, "accept lost race on status");
        return Err(AppError::Conflict(ALREADY_CLAIMED.into()));
    }

    let assignment = AssignActive {
        id: Set(Uuid::new_v4()),
        order_id: Set(order.id),
        courier_id: Set(user.user_id),
        assigned_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&txn)
    .await
    .map_err(|err| {
        if is_unique_violation(&err) {
            tracing::warn!(%order_id, courier_id = %user.user_id, "accept lost race on assignment");
            AppError::Conflict(ALREADY_CLAIMED.into())
        } else {
            err.into()
        }
    })?;

    let order = Orders::find_by_id(order.id)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;

    txn.commit().await?;

    tracing::info!(
        order_id = %order.id,
        courier_id = %user.user_id,
        to = order.status.as_str(),
        "order claimed"
    );
    audit::record(
        &state.pool,
        user.user_id,
        "order_accept",
        "order_assignments",
        serde_json::json!({ "order_id": order.id, "assignment_id": assignment.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Order accepted",
        view(assignment, order, None),
        Some(Meta::empty()),
    ))
}

/// Release a claim: the assignment (and any issue) goes away and the order
/// is ready to ship again.
pub async fn unaccept(
    state: &AppState,
    user: &AuthUser,
    order_id: Uuid,
) -> AppResult<ApiResponse<Order>> {
    ensure_capability(user, Capability::Deliver)?;
    lifecycle::authorize(OrderEvent::Unaccept, user.role)?;

    let txn = state.orm.begin().await?;
    let order = lifecycle::lock_order(&txn, order_id).await?;
    let assignment = own_assignment(&txn, user, order.id).await?;
    let order =
        lifecycle::transition(&txn, order, OrderEvent::Unaccept, assignment.is_some()).await?;
    if let Some(assignment) = assignment {
        assignment.delete(&txn).await?;
    }
    txn.commit().await?;

    audit::record(
        &state.pool,
        user.user_id,
        "order_unaccept",
        "order_assignments",
        serde_json::json!({ "order_id": order.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Order released",
        order.into(),
        Some(Meta::empty()),
    ))
}

pub async fn complete(
    state: &AppState,
    user: &AuthUser,
    order_id: Uuid,
) -> AppResult<ApiResponse<AssignmentView>> {
    ensure_capability(user, Capability::Deliver)?;
    lifecycle::authorize(OrderEvent::Complete, user.role)?;

    let txn = state.orm.begin().await?;
    let order = lifecycle::lock_order(&txn, order_id).await?;
    let assignment = own_assignment(&txn, user, order.id).await?;
    let order =
        lifecycle::transition(&txn, order, OrderEvent::Complete, assignment.is_some()).await?;
    let assignment = match assignment {
        Some(a) => touch(&txn, a).await?,
        None => {
            return Err(AppError::Integrity(format!(
                "order {} completed unclaimed",
                order.id
            )));
        }
    };
    let issue = assignment.find_related(DeliveryIssues).one(&txn).await?;
    txn.commit().await?;

    audit::record(
        &state.pool,
        user.user_id,
        "order_complete",
        "orders",
        serde_json::json!({ "order_id": order.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Order delivered",
        view(assignment, order, issue),
        Some(Meta::empty()),
    ))
}

pub async fn issue_form(
    state: &AppState,
    user: &AuthUser,
    order_id: Uuid,
) -> AppResult<ApiResponse<IssueForm>> {
    ensure_capability(user, Capability::Deliver)?;
    let assignment = own_assignment(&state.orm, user, order_id)
        .await?
        .ok_or(AppError::NotFound)?;
    let order = Orders::find_by_id(order_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    // Fail early on an order whose state no longer takes issue reports.
    order.status.apply(OrderEvent::ReportIssue, true)?;

    let issue = assignment.find_related(DeliveryIssues).one(&state.orm).await?;
    let form_token = state.forms.mint(issue_key(user, order_id));

    Ok(ApiResponse::success(
        "OK",
        IssueForm {
            assignment: view(assignment, order, issue),
            form_token,
        },
        Some(Meta::empty()),
    ))
}

pub async fn report_issue(
    state: &AppState,
    user: &AuthUser,
    order_id: Uuid,
    payload: ReportIssueRequest,
) -> AppResult<ApiResponse<AssignmentView>> {
    ensure_capability(user, Capability::Deliver)?;
    lifecycle::authorize(OrderEvent::ReportIssue, user.role)?;
    let description = payload.issue_description.trim().to_string();
    if description.is_empty() {
        return Err(AppError::BadRequest("issue_description is required".into()));
    }

    let form_token = payload.form_token.as_deref();
    if !state.forms.is_live(issue_key(user, order_id), form_token) {
        tracing::info!(%order_id, courier_id = %user.user_id, "issue report replay ignored");
        return Ok(ApiResponse::ignored());
    }

    let txn = state.orm.begin().await?;
    let order = lifecycle::lock_order(&txn, order_id).await?;
    let assignment = own_assignment(&txn, user, order.id).await?;
    let order =
        lifecycle::transition(&txn, order, OrderEvent::ReportIssue, assignment.is_some()).await?;
    let assignment = match assignment {
        Some(a) => touch(&txn, a).await?,
        None => {
            return Err(AppError::Integrity(format!(
                "order {} has an issue but no courier",
                order.id
            )));
        }
    };

    let issue = match assignment.find_related(DeliveryIssues).one(&txn).await? {
        Some(existing) => {
            let mut active: IssueActive = existing.into();
            active.issue_description = Set(description);
            active.reported_at = Set(Utc::now().into());
            active.update(&txn).await?
        }
        None => {
            IssueActive {
                id: Set(Uuid::new_v4()),
                order_assignment_id: Set(assignment.id),
                issue_description: Set(description),
                reported_at: NotSet,
            }
            .insert(&txn)
            .await?
        }
    };

    if !state.forms.redeem(issue_key(user, order_id), form_token) {
        tracing::info!(%order_id, courier_id = %user.user_id, "issue report replay ignored");
        return Ok(ApiResponse::ignored());
    }
    txn.commit().await?;

    audit::record(
        &state.pool,
        user.user_id,
        "order_issue",
        "delivery_issues",
        serde_json::json!({ "order_id": order.id, "issue_id": issue.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Issue reported",
        view(assignment, order, Some(issue)),
        Some(Meta::empty()),
    ))
}
