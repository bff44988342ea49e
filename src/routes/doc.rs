use utoipa::{
    Modify, OpenApi,
    openapi::{
        self, OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    domain::{BookCondition, OrderStatus, Role, pricing::PriceBreakdown},
    dto::{
        auth::{LoginRequest, LoginResponse, RegisterRequest},
        cart::{AddToCartRequest, CartLine, CartView},
        courier::{AssignmentView, Deliveries, IssueForm, ReportIssueRequest},
        listings::{CreateListingRequest, ListingDetails, ListingList, UpdateListingRequest},
        orders::{CheckoutRequest, CheckoutSummary, OrderDetails, OrderList, OrderWithItems},
        reviews::{ReviewForm, ShopReviews, SubmitReviewRequest},
        seller::{DashboardStats, RenameShopRequest, SellerDashboard, SellerOrder, SellerOrderList},
        upgrades::{CreateUpgradeRequest, UpgradeRequestList},
    },
    models::{
        BookListing, CartItem, DeliveryIssue, Order, OrderAssignment, OrderItem, Review, Shop,
        UpgradeRequest, User,
    },
    response::{ApiResponse, Meta},
    routes::{admin, auth, cart, courier, health, listings, orders, params, reviews, seller, upgrades},
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        auth::login,
        auth::register,
        listings::list_listings,
        listings::get_listing,
        cart::cart_list,
        cart::add_to_cart,
        cart::remove_from_cart,
        orders::list_orders,
        orders::checkout_summary,
        orders::checkout,
        orders::get_order,
        orders::cancel_order,
        reviews::list_reviews,
        reviews::review_form,
        reviews::submit_review,
        seller::get_shop,
        seller::rename_shop,
        seller::dashboard,
        seller::my_listings,
        seller::create_listing,
        seller::update_listing,
        seller::delete_listing,
        seller::list_orders,
        seller::toggle_ready,
        courier::deliveries,
        courier::accept,
        courier::unaccept,
        courier::complete,
        courier::issue_form,
        courier::report_issue,
        upgrades::request_upgrade,
        upgrades::my_requests,
        admin::list_all_orders,
        admin::get_order_admin,
        admin::cancel_order_admin,
        admin::list_upgrade_requests,
        admin::approve_upgrade
    ),
    components(
        schemas(
            Role,
            OrderStatus,
            BookCondition,
            PriceBreakdown,
            User,
            Shop,
            BookListing,
            CartItem,
            Order,
            OrderItem,
            OrderAssignment,
            DeliveryIssue,
            Review,
            UpgradeRequest,
            RegisterRequest,
            LoginRequest,
            LoginResponse,
            AddToCartRequest,
            CartLine,
            CartView,
            CheckoutRequest,
            CheckoutSummary,
            OrderWithItems,
            OrderList,
            OrderDetails,
            CreateListingRequest,
            UpdateListingRequest,
            ListingList,
            ListingDetails,
            SubmitReviewRequest,
            ReviewForm,
            ShopReviews,
            RenameShopRequest,
            SellerOrder,
            SellerOrderList,
            DashboardStats,
            SellerDashboard,
            AssignmentView,
            Deliveries,
            IssueForm,
            ReportIssueRequest,
            CreateUpgradeRequest,
            UpgradeRequestList,
            params::Pagination,
            params::SortOrder,
            params::ListingQuery,
            params::OrderListQuery,
            params::UpgradeListQuery,
            Meta,
            ApiResponse<OrderWithItems>,
            ApiResponse<OrderDetails>,
            ApiResponse<CartView>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Auth", description = "Authentication endpoints"),
        (name = "Listings", description = "Catalog endpoints"),
        (name = "Cart", description = "Cart endpoints"),
        (name = "Orders", description = "Buyer order endpoints"),
        (name = "Reviews", description = "Shop review endpoints"),
        (name = "Seller", description = "Shop, listing and fulfilment endpoints"),
        (name = "Courier", description = "Delivery endpoints"),
        (name = "Upgrades", description = "Role upgrade requests"),
        (name = "Admin", description = "Admin endpoints"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
