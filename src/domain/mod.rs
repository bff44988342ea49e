//! Pure marketplace rules: roles, order lifecycle, pricing and checkout
//! input validation. Nothing in here touches the database.

pub mod condition;
pub mod order_status;
pub mod payment;
pub mod pricing;
pub mod role;

pub use condition::BookCondition;
pub use order_status::{OrderEvent, OrderStatus, TransitionError};
pub use role::{Capability, Role};
