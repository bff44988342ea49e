use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Account role. Stored as lowercase text in `users.role`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Buyer,
    Seller,
    Courier,
    Admin,
}

/// What a gated entry point needs from the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// Browse-to-checkout: cart and orders.
    Purchase,
    Review,
    ManageShop,
    Deliver,
    RequestUpgrade,
    Administer,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Buyer => "buyer",
            Role::Seller => "seller",
            Role::Courier => "courier",
            Role::Admin => "admin",
        }
    }

    pub fn permits(self, capability: Capability) -> bool {
        match self {
            Role::Buyer => matches!(
                capability,
                Capability::Purchase | Capability::Review | Capability::RequestUpgrade
            ),
            Role::Seller => matches!(
                capability,
                Capability::Purchase | Capability::Review | Capability::ManageShop
            ),
            Role::Courier => matches!(capability, Capability::Deliver),
            Role::Admin => matches!(capability, Capability::Administer),
        }
    }

    /// Roles a buyer may ask an admin to switch them to.
    pub fn is_upgrade_target(self) -> bool {
        matches!(self, Role::Seller | Role::Courier)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown role `{0}`")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "buyer" => Ok(Role::Buyer),
            "seller" => Ok(Role::Seller),
            "courier" => Ok(Role::Courier),
            "admin" => Ok(Role::Admin),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_roles_and_rejects_others() {
        for role in [Role::Buyer, Role::Seller, Role::Courier, Role::Admin] {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
        assert!("Buyer".parse::<Role>().is_err());
        assert!("superuser".parse::<Role>().is_err());
    }

    #[test]
    fn couriers_cannot_purchase_and_buyers_cannot_deliver() {
        assert!(!Role::Courier.permits(Capability::Purchase));
        assert!(!Role::Buyer.permits(Capability::Deliver));
        assert!(Role::Courier.permits(Capability::Deliver));
    }

    #[test]
    fn sellers_review_and_buy_but_only_buyers_request_upgrades() {
        assert!(Role::Seller.permits(Capability::Review));
        assert!(Role::Seller.permits(Capability::Purchase));
        assert!(!Role::Seller.permits(Capability::RequestUpgrade));
        assert!(Role::Buyer.permits(Capability::RequestUpgrade));
    }

    #[test]
    fn admin_only_administers() {
        assert!(Role::Admin.permits(Capability::Administer));
        assert!(!Role::Admin.permits(Capability::ManageShop));
        assert!(!Role::Seller.permits(Capability::Administer));
    }

    #[test]
    fn upgrade_targets() {
        assert!(Role::Seller.is_upgrade_target());
        assert!(Role::Courier.is_upgrade_target());
        assert!(!Role::Admin.is_upgrade_target());
        assert!(!Role::Buyer.is_upgrade_target());
    }
}
