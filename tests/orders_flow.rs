use bookstore_marketplace_api::{
    db::{create_pool, run_migrations},
    domain::{BookCondition, OrderStatus, Role},
    dto::{
        cart::AddToCartRequest,
        courier::ReportIssueRequest,
        orders::CheckoutRequest,
        reviews::SubmitReviewRequest,
    },
    entity::{
        BookListings, OrderAssignments, Orders,
        book_listings::ActiveModel as ListingActive,
        order_assignments::{ActiveModel as AssignActive, Column as AssignCol},
        orders::Column as OrderCol,
        shops::ActiveModel as ShopActive,
        users::ActiveModel as UserActive,
    },
    error::AppError,
    middleware::auth::AuthUser,
    services::{
        admin_service, cart_service, courier_service, order_service, review_service,
        seller_service,
    },
    state::AppState,
};
use sea_orm::ActiveValue::NotSet;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, Set};
use uuid::Uuid;

// One test drives every scenario in order: they share a database and the
// migration runner is not safe to call concurrently.
#[tokio::test]
async fn marketplace_order_lifecycle() -> anyhow::Result<()> {
    // Allow skipping when no DB is configured in the environment.
    let database_url = match std::env::var("TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
    {
        Ok(url) => url,
        Err(_) => {
            eprintln!(
                "Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run integration flow tests."
            );
            return Ok(());
        }
    };

    let state = setup_state(&database_url).await?;

    role_gate_rejects_wrong_roles(&state).await?;
    let (buyer, seller, shop_id, order_id) = checkout_snapshot_and_replay(&state).await?;
    sold_listing_blocks_checkout(&state, shop_id).await?;
    cart_holds_books_from_one_shop(&state, shop_id).await?;
    cancelled_orders_keep_listings_sold(&state).await?;
    claimed_ready_order_is_frozen(&state).await?;
    courier_claim_and_review_gate(&state, &buyer, &seller, shop_id, order_id).await?;

    Ok(())
}

async fn role_gate_rejects_wrong_roles(state: &AppState) -> anyhow::Result<()> {
    let courier = create_user(state, Role::Courier).await?;
    let buyer = create_user(state, Role::Buyer).await?;

    let err = cart_service::add_to_cart(
        state,
        &courier,
        AddToCartRequest {
            book_listing_id: Uuid::new_v4(),
            quantity: None,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Forbidden));

    let err = courier_service::accept(state, &buyer, Uuid::new_v4())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden));

    let err = seller_service::toggle_ready(state, &buyer, Uuid::new_v4())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden));
    Ok(())
}

async fn checkout_snapshot_and_replay(
    state: &AppState,
) -> anyhow::Result<(AuthUser, AuthUser, Uuid, Uuid)> {
    let seller = create_user(state, Role::Seller).await?;
    let shop_id = create_shop(state, &seller).await?;
    let book_a = create_listing(state, shop_id, "Book A", 1000).await?;
    let book_b = create_listing(state, shop_id, "Book B", 500).await?;

    let buyer = create_user(state, Role::Buyer).await?;
    add(state, &buyer, book_a, 2).await?;
    add(state, &buyer, book_b, 1).await?;

    let summary = order_service::checkout_summary(state, &buyer)
        .await?
        .data
        .expect("summary");
    assert_eq!(summary.totals.subtotal, 2500);
    assert_eq!(summary.totals.tax, 150);
    assert_eq!(summary.totals.total, 2650);

    let placed = order_service::checkout(state, &buyer, checkout_form(Some(summary.form_token.clone())))
        .await?
        .data
        .expect("order");
    assert_eq!(placed.order.total_price, 2650);
    assert_eq!(placed.order.status, OrderStatus::Pending);
    assert_eq!(placed.items.len(), 2);

    for id in [book_a, book_b] {
        assert!(is_bought(state, id).await?, "listing should be marked bought");
    }
    let cart = cart_service::list_cart(state, &buyer).await?.data.expect("cart");
    assert!(cart.items.is_empty());

    // Same token again: nothing happens and nothing fails.
    let replay = order_service::checkout(state, &buyer, checkout_form(Some(summary.form_token)))
        .await?;
    assert!(replay.is_ignored());
    assert_eq!(orders_of(state, &buyer).await?, 1);

    Ok((buyer, seller, shop_id, placed.order.id))
}

async fn sold_listing_blocks_checkout(state: &AppState, shop_id: Uuid) -> anyhow::Result<()> {
    let book = create_listing(state, shop_id, "Contested", 800).await?;
    let spare = create_listing(state, shop_id, "Spare", 700).await?;
    let first = create_user(state, Role::Buyer).await?;
    let second = create_user(state, Role::Buyer).await?;
    add(state, &first, book, 1).await?;
    add(state, &second, book, 1).await?;
    add(state, &second, spare, 1).await?;

    // The second buyer opens the checkout form before the first one pays.
    let token = order_service::checkout_summary(state, &second)
        .await?
        .data
        .expect("summary")
        .form_token;
    place_order(state, &first).await?;

    let err = order_service::checkout_summary(state, &second).await.unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    let err = order_service::checkout(state, &second, checkout_form(Some(token.clone())))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));
    assert_eq!(orders_of(state, &second).await?, 0);
    assert!(!is_bought(state, spare).await?, "failed checkout sells nothing");
    let cart = cart_service::list_cart(state, &second).await?.data.expect("cart");
    assert_eq!(cart.items.len(), 2, "failed checkout leaves the cart alone");

    // Dropping the sold book and resubmitting the same form goes through.
    let sold_line = cart
        .items
        .iter()
        .find(|line| line.listing.id == book)
        .expect("sold line")
        .id;
    cart_service::remove_from_cart(state, &second, sold_line).await?;
    let retry = order_service::checkout(state, &second, checkout_form(Some(token))).await?;
    assert!(!retry.is_ignored(), "a failed checkout must not spend its token");
    let placed = retry.data.expect("order");
    assert_eq!(placed.items.len(), 1);
    assert_eq!(placed.order.total_price, 742);
    assert!(is_bought(state, spare).await?);

    let err = add(state, &second, book, 1).await.unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));
    Ok(())
}

async fn cart_holds_books_from_one_shop(state: &AppState, shop_id: Uuid) -> anyhow::Result<()> {
    let here = create_listing(state, shop_id, "Near", 400).await?;
    let other_seller = create_user(state, Role::Seller).await?;
    let other_shop = create_shop(state, &other_seller).await?;
    let there = create_listing(state, other_shop, "Far", 400).await?;

    let buyer = create_user(state, Role::Buyer).await?;
    add(state, &buyer, here, 1).await?;
    match add(state, &buyer, there, 1).await.unwrap_err() {
        AppError::BadRequest(msg) => assert!(msg.contains("same shop"), "{msg}"),
        other => panic!("unexpected error: {other:?}"),
    }
    let cart = cart_service::list_cart(state, &buyer).await?.data.expect("cart");
    assert_eq!(cart.items.len(), 1);
    assert_eq!(cart.items[0].listing.id, here);
    Ok(())
}

async fn cancelled_orders_keep_listings_sold(state: &AppState) -> anyhow::Result<()> {
    let seller = create_user(state, Role::Seller).await?;
    let shop_id = create_shop(state, &seller).await?;
    let first_book = create_listing(state, shop_id, "Returned", 900).await?;
    let second_book = create_listing(state, shop_id, "Revoked", 600).await?;

    let buyer = create_user(state, Role::Buyer).await?;
    add(state, &buyer, first_book, 1).await?;
    let order_id = place_order(state, &buyer).await?;

    let stranger = create_user(state, Role::Buyer).await?;
    let err = order_service::cancel_order(state, &stranger, order_id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound));

    let cancelled = order_service::cancel_order(state, &buyer, order_id)
        .await?
        .data
        .expect("order");
    assert_eq!(cancelled.status, OrderStatus::Cancelled);
    assert!(is_bought(state, first_book).await?, "cancelling does not relist");
    let err = add(state, &stranger, first_book, 1).await.unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    let err = order_service::cancel_order(state, &buyer, order_id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    add(state, &buyer, second_book, 1).await?;
    let order_id = place_order(state, &buyer).await?;
    let admin = create_user(state, Role::Admin).await?;
    let cancelled = admin_service::cancel_order(state, &admin, order_id)
        .await?
        .data
        .expect("order");
    assert_eq!(cancelled.status, OrderStatus::Cancelled);
    assert!(is_bought(state, second_book).await?);
    Ok(())
}

async fn claimed_ready_order_is_frozen(state: &AppState) -> anyhow::Result<()> {
    let seller = create_user(state, Role::Seller).await?;
    let shop_id = create_shop(state, &seller).await?;
    let book = create_listing(state, shop_id, "Frozen", 1200).await?;
    let buyer = create_user(state, Role::Buyer).await?;
    add(state, &buyer, book, 1).await?;
    let order_id = place_order(state, &buyer).await?;

    let ready = seller_service::toggle_ready(state, &seller, order_id)
        .await?
        .data
        .expect("order");
    assert_eq!(ready.status, OrderStatus::ReadyToShip);

    // A claim without the status change: only the assignment guard stands
    // between the seller and the order.
    let courier = create_user(state, Role::Courier).await?;
    AssignActive {
        id: Set(Uuid::new_v4()),
        order_id: Set(order_id),
        courier_id: Set(courier.user_id),
        assigned_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    let err = seller_service::toggle_ready(state, &seller, order_id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
    assert_eq!(status_of(state, order_id).await?, OrderStatus::ReadyToShip);

    let err = order_service::cancel_order(state, &buyer, order_id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
    let admin = create_user(state, Role::Admin).await?;
    let err = admin_service::cancel_order(state, &admin, order_id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
    assert_eq!(status_of(state, order_id).await?, OrderStatus::ReadyToShip);
    Ok(())
}

async fn courier_claim_and_review_gate(
    state: &AppState,
    buyer: &AuthUser,
    seller: &AuthUser,
    shop_id: Uuid,
    order_id: Uuid,
) -> anyhow::Result<()> {
    let ready = seller_service::toggle_ready(state, seller, order_id)
        .await?
        .data
        .expect("order");
    assert_eq!(ready.status, OrderStatus::ReadyToShip);

    let first = create_user(state, Role::Courier).await?;
    let second = create_user(state, Role::Courier).await?;

    let claimed = courier_service::accept(state, &first, order_id)
        .await?
        .data
        .expect("assignment");
    assert_eq!(claimed.order.status, OrderStatus::Shipped);
    assert_eq!(claimed.assignment.courier_id, first.user_id);

    let err = courier_service::accept(state, &second, order_id).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
    assert_eq!(assignments_of(state, order_id).await?, 1);

    let err = seller_service::toggle_ready(state, seller, order_id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));
    assert_eq!(status_of(state, order_id).await?, OrderStatus::Shipped);

    let err = review_service::review_form(state, buyer, shop_id).await.unwrap_err();
    match err {
        AppError::BadRequest(msg) => assert!(msg.contains("COMPLETED"), "{msg}"),
        other => panic!("unexpected error: {other:?}"),
    }

    // The first courier gives the order back; the second one takes it.
    let released = courier_service::unaccept(state, &first, order_id)
        .await?
        .data
        .expect("order");
    assert_eq!(released.status, OrderStatus::ReadyToShip);
    assert_eq!(assignments_of(state, order_id).await?, 0);

    let claimed = courier_service::accept(state, &second, order_id)
        .await?
        .data
        .expect("assignment");
    assert_eq!(claimed.assignment.courier_id, second.user_id);

    let err = courier_service::complete(state, &first, order_id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden));

    let token = courier_service::issue_form(state, &second, order_id)
        .await?
        .data
        .expect("form")
        .form_token;
    let reported = courier_service::report_issue(state, &second, order_id, issue_form(Some(token.clone())))
        .await?
        .data
        .expect("assignment");
    assert_eq!(reported.order.status, OrderStatus::IssueReported);
    assert_eq!(
        reported.issue.as_ref().map(|i| i.issue_description.as_str()),
        Some("Nobody home")
    );

    let replay = courier_service::report_issue(state, &second, order_id, issue_form(Some(token)))
        .await?;
    assert!(replay.is_ignored());
    assert_eq!(status_of(state, order_id).await?, OrderStatus::IssueReported);

    let done = courier_service::complete(state, &second, order_id)
        .await?
        .data
        .expect("assignment");
    assert_eq!(done.order.status, OrderStatus::Completed);
    assert!(done.issue.is_some());

    let token = review_service::review_form(state, buyer, shop_id)
        .await?
        .data
        .expect("form")
        .form_token;
    let review = review_service::submit_review(state, buyer, shop_id, review_form(Some(token.clone())))
        .await?
        .data
        .expect("review");
    assert_eq!(review.rating, 5);

    let replay = review_service::submit_review(state, buyer, shop_id, review_form(Some(token)))
        .await?;
    assert!(replay.is_ignored());

    let err = review_service::review_form(state, buyer, shop_id).await.unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    let details = order_service::get_order(state, buyer, order_id)
        .await?
        .data
        .expect("details");
    assert_eq!(details.totals.total, 2650);
    assert!(details.review.is_some());
    assert!(details.assignment.is_some());
    Ok(())
}

async fn setup_state(database_url: &str) -> anyhow::Result<AppState> {
    let pool = create_pool(database_url).await?;
    let state = AppState::new(pool);
    run_migrations(&state.orm).await?;
    Ok(state)
}

async fn create_user(state: &AppState, role: Role) -> anyhow::Result<AuthUser> {
    let id = Uuid::new_v4();
    UserActive {
        id: Set(id),
        email: Set(format!("{}-{}@example.com", role, id.simple())),
        name: Set(format!("Test {role}")),
        password_hash: Set("dummy".into()),
        role: Set(role.as_str().into()),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    Ok(AuthUser {
        user_id: id,
        session_id: Uuid::new_v4(),
        role,
    })
}

async fn create_shop(state: &AppState, seller: &AuthUser) -> anyhow::Result<Uuid> {
    let shop = ShopActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(seller.user_id),
        name: Set("Test Shop".into()),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;
    Ok(shop.id)
}

async fn create_listing(
    state: &AppState,
    shop_id: Uuid,
    title: &str,
    price: i64,
) -> anyhow::Result<Uuid> {
    let listing = ListingActive {
        id: Set(Uuid::new_v4()),
        shop_id: Set(shop_id),
        title: Set(title.into()),
        author: Set("Anon".into()),
        condition: Set(BookCondition::Used),
        price: Set(price),
        image_url: Set(None),
        image_file_id: Set(None),
        bought: Set(false),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;
    Ok(listing.id)
}

async fn add(
    state: &AppState,
    user: &AuthUser,
    listing: Uuid,
    quantity: i32,
) -> Result<(), AppError> {
    cart_service::add_to_cart(
        state,
        user,
        AddToCartRequest {
            book_listing_id: listing,
            quantity: Some(quantity),
        },
    )
    .await?;
    Ok(())
}

/// Check out whatever is in the buyer's cart.
async fn place_order(state: &AppState, buyer: &AuthUser) -> anyhow::Result<Uuid> {
    let token = order_service::checkout_summary(state, buyer)
        .await?
        .data
        .expect("summary")
        .form_token;
    let placed = order_service::checkout(state, buyer, checkout_form(Some(token)))
        .await?
        .data
        .expect("order");
    Ok(placed.order.id)
}

async fn is_bought(state: &AppState, listing: Uuid) -> anyhow::Result<bool> {
    let listing = BookListings::find_by_id(listing)
        .one(&state.orm)
        .await?
        .expect("listing");
    Ok(listing.bought)
}

async fn status_of(state: &AppState, order_id: Uuid) -> anyhow::Result<OrderStatus> {
    let order = Orders::find_by_id(order_id)
        .one(&state.orm)
        .await?
        .expect("order");
    Ok(order.status)
}

async fn assignments_of(state: &AppState, order_id: Uuid) -> anyhow::Result<u64> {
    Ok(OrderAssignments::find()
        .filter(AssignCol::OrderId.eq(order_id))
        .count(&state.orm)
        .await?)
}

async fn orders_of(state: &AppState, user: &AuthUser) -> anyhow::Result<u64> {
    Ok(Orders::find()
        .filter(OrderCol::UserId.eq(user.user_id))
        .count(&state.orm)
        .await?)
}

fn checkout_form(form_token: Option<String>) -> CheckoutRequest {
    CheckoutRequest {
        address: "221B Baker Street".into(),
        city: "London".into(),
        state: "Greater London".into(),
        postal_code: "12345".into(),
        country: "United Kingdom".into(),
        card_number: "4242 4242 4242 4242".into(),
        expiry: "12/30".into(),
        cvv: "123".into(),
        form_token,
    }
}

fn review_form(form_token: Option<String>) -> SubmitReviewRequest {
    SubmitReviewRequest {
        rating: 5,
        comment: "Well packed and exactly as described".into(),
        form_token,
    }
}

fn issue_form(form_token: Option<String>) -> ReportIssueRequest {
    ReportIssueRequest {
        issue_description: "Nobody home".into(),
        form_token,
    }
}
