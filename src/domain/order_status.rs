use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::Role;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "ready_to_ship")]
    ReadyToShip,
    #[sea_orm(string_value = "shipped")]
    Shipped,
    #[sea_orm(string_value = "completed")]
    Completed,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
    #[sea_orm(string_value = "issue_reported")]
    IssueReported,
}

/// Something an actor does to an existing order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderEvent {
    MarkReady,
    UnmarkReady,
    Accept,
    Unaccept,
    Complete,
    ReportIssue,
    Cancel,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    /// A courier holds the order; nobody else may move it.
    #[error("order is already claimed by a courier")]
    Claimed,
    #[error("order is not claimed by a courier")]
    Unclaimed,
    #[error("cannot {} an order that is {}", .event, .from.as_str())]
    Invalid { from: OrderStatus, event: OrderEvent },
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::ReadyToShip => "ready_to_ship",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::IssueReported => "issue_reported",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Completed | OrderStatus::Cancelled)
    }

    /// Next status for `event`, given whether an assignment currently
    /// exists for the order.
    pub fn apply(self, event: OrderEvent, claimed: bool) -> Result<OrderStatus, TransitionError> {
        use OrderEvent::*;
        use OrderStatus::*;

        let invalid = TransitionError::Invalid { from: self, event };
        match (event, self) {
            (MarkReady, Pending) | (UnmarkReady, ReadyToShip) | (Cancel, Pending | ReadyToShip)
                if claimed =>
            {
                Err(TransitionError::Claimed)
            }
            (MarkReady, Pending) => Ok(ReadyToShip),
            (UnmarkReady, ReadyToShip) => Ok(Pending),
            (Cancel, Pending | ReadyToShip) => Ok(Cancelled),

            (Accept, ReadyToShip) if claimed => Err(TransitionError::Claimed),
            (Accept, ReadyToShip) => Ok(Shipped),

            (Unaccept | Complete | ReportIssue, Shipped) if !claimed => {
                Err(TransitionError::Unclaimed)
            }
            (Unaccept, Shipped) => Ok(ReadyToShip),
            (Complete, Shipped | IssueReported) if claimed => Ok(Completed),
            (ReportIssue, Shipped | IssueReported) if claimed => Ok(IssueReported),

            _ => Err(invalid),
        }
    }
}

impl OrderEvent {
    /// The seller's readiness button flips between the two pre-claim states.
    pub fn readiness_toggle(current: OrderStatus) -> OrderEvent {
        match current {
            OrderStatus::ReadyToShip => OrderEvent::UnmarkReady,
            _ => OrderEvent::MarkReady,
        }
    }

    pub fn allowed_for(self, role: Role) -> bool {
        match role {
            Role::Seller => matches!(
                self,
                OrderEvent::MarkReady | OrderEvent::UnmarkReady | OrderEvent::Cancel
            ),
            Role::Courier => matches!(
                self,
                OrderEvent::Accept
                    | OrderEvent::Unaccept
                    | OrderEvent::Complete
                    | OrderEvent::ReportIssue
            ),
            Role::Buyer | Role::Admin => matches!(self, OrderEvent::Cancel),
        }
    }
}

impl std::fmt::Display for OrderEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            OrderEvent::MarkReady => "mark ready",
            OrderEvent::UnmarkReady => "unmark ready",
            OrderEvent::Accept => "accept",
            OrderEvent::Unaccept => "unaccept",
            OrderEvent::Complete => "complete",
            OrderEvent::ReportIssue => "report an issue on",
            OrderEvent::Cancel => "cancel",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use OrderEvent::*;
    use OrderStatus::*;

    #[test]
    fn happy_path_through_delivery() {
        let status = Pending.apply(MarkReady, false).unwrap();
        assert_eq!(status, ReadyToShip);
        let status = status.apply(Accept, false).unwrap();
        assert_eq!(status, Shipped);
        let status = status.apply(Complete, true).unwrap();
        assert_eq!(status, Completed);
        assert!(status.is_terminal());
    }

    #[test]
    fn seller_toggle_goes_both_ways_until_claimed() {
        assert_eq!(ReadyToShip.apply(UnmarkReady, false), Ok(Pending));
        assert_eq!(Pending.apply(MarkReady, true), Err(TransitionError::Claimed));
        assert_eq!(ReadyToShip.apply(UnmarkReady, true), Err(TransitionError::Claimed));
    }

    #[test]
    fn readiness_toggle_picks_event_from_current_status() {
        assert_eq!(OrderEvent::readiness_toggle(Pending), MarkReady);
        assert_eq!(OrderEvent::readiness_toggle(ReadyToShip), UnmarkReady);
    }

    #[test]
    fn accept_requires_ready_and_unclaimed() {
        assert_eq!(ReadyToShip.apply(Accept, true), Err(TransitionError::Claimed));
        assert!(matches!(
            Pending.apply(Accept, false),
            Err(TransitionError::Invalid { from: Pending, event: Accept })
        ));
    }

    #[test]
    fn unaccept_reverts_to_ready_to_ship() {
        assert_eq!(Shipped.apply(Unaccept, true), Ok(ReadyToShip));
        assert_eq!(Shipped.apply(Unaccept, false), Err(TransitionError::Unclaimed));
    }

    #[test]
    fn issue_branch_can_be_updated_and_resolved() {
        assert_eq!(Shipped.apply(ReportIssue, true), Ok(IssueReported));
        assert_eq!(IssueReported.apply(ReportIssue, true), Ok(IssueReported));
        assert_eq!(IssueReported.apply(Complete, true), Ok(Completed));
        assert!(IssueReported.apply(Unaccept, true).is_err());
    }

    #[test]
    fn cancellation_only_before_claim() {
        assert_eq!(Pending.apply(Cancel, false), Ok(Cancelled));
        assert_eq!(ReadyToShip.apply(Cancel, false), Ok(Cancelled));
        assert_eq!(ReadyToShip.apply(Cancel, true), Err(TransitionError::Claimed));
        assert!(Shipped.apply(Cancel, true).is_err());
    }

    #[test]
    fn terminal_states_accept_nothing() {
        for event in [MarkReady, UnmarkReady, Accept, Unaccept, Complete, ReportIssue, Cancel] {
            assert!(Completed.apply(event, true).is_err());
            assert!(Cancelled.apply(event, false).is_err());
        }
    }

    #[test]
    fn events_are_gated_by_role() {
        assert!(MarkReady.allowed_for(Role::Seller));
        assert!(!MarkReady.allowed_for(Role::Courier));
        assert!(Accept.allowed_for(Role::Courier));
        assert!(!Accept.allowed_for(Role::Seller));
        assert!(Cancel.allowed_for(Role::Buyer));
        assert!(Cancel.allowed_for(Role::Admin));
        assert!(!Cancel.allowed_for(Role::Courier));
    }

    #[test]
    fn invalid_transition_message_names_event_and_status() {
        let err = Completed.apply(Accept, false).unwrap_err();
        assert_eq!(err.to_string(), "cannot accept an order that is completed");
    }
}
