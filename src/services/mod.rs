pub mod admin_service;
pub mod auth_service;
pub mod cart_service;
pub mod courier_service;
pub mod lifecycle;
pub mod listing_service;
pub mod order_service;
pub mod review_service;
pub mod seller_service;
pub mod upgrade_service;
