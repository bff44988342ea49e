use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{domain::Role, models::UpgradeRequest};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateUpgradeRequest {
    pub target_role: Role,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UpgradeRequestList {
    pub items: Vec<UpgradeRequest>,
}
