pub mod auth;
pub mod cart;
pub mod courier;
pub mod listings;
pub mod orders;
pub mod reviews;
pub mod seller;
pub mod upgrades;
