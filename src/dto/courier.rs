use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::{DeliveryIssue, Order, OrderAssignment};

#[derive(Debug, Serialize, ToSchema)]
pub struct AssignmentView {
    pub assignment: OrderAssignment,
    pub order: Order,
    pub issue: Option<DeliveryIssue>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct Deliveries {
    /// Ready to ship and not yet claimed by anyone.
    pub available: Vec<Order>,
    pub mine: Vec<AssignmentView>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct IssueForm {
    pub assignment: AssignmentView,
    pub form_token: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ReportIssueRequest {
    pub issue_description: String,
    pub form_token: Option<String>,
}
