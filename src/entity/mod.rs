pub mod book_listings;
pub mod cart_items;
pub mod carts;
pub mod delivery_issues;
pub mod order_assignments;
pub mod order_items;
pub mod orders;
pub mod reviews;
pub mod shops;
pub mod upgrade_requests;
pub mod users;

pub use book_listings::Entity as BookListings;
pub use cart_items::Entity as CartItems;
pub use carts::Entity as Carts;
pub use delivery_issues::Entity as DeliveryIssues;
pub use order_assignments::Entity as OrderAssignments;
pub use order_items::Entity as OrderItems;
pub use orders::Entity as Orders;
pub use reviews::Entity as Reviews;
pub use shops::Entity as Shops;
pub use upgrade_requests::Entity as UpgradeRequests;
pub use users::Entity as Users;
