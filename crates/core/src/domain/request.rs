use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::user::{Role, UserId};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(pub String);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Draft,
    Submitted,
    PendingApproval,
    Approved,
    Rejected,
    Cancelled,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Submitted => "submitted",
            Self::PendingApproval => "pending_approval",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Approved | Self::Rejected | Self::Cancelled)
    }
}

impl std::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A purchase request and its in-flight approval chain.
///
/// `level_roles` is the resolved role sequence frozen at submission; it is
/// empty until the request is submitted and never re-resolved afterwards,
/// so a policy edit mid-flight cannot reorder an in-progress chain.
/// `version` is the optimistic-lock token maintained by the persistence
/// layer; the engine copies it through unchanged.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PurchaseRequest {
    pub id: RequestId,
    pub title: String,
    pub description: String,
    pub amount: Decimal,
    pub currency: String,
    pub request_type: String,
    pub requester: UserId,
    pub status: RequestStatus,
    pub level_roles: Vec<Role>,
    pub current_level: u32,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl PurchaseRequest {
    /// Role required to act at the current level, when one is pending.
    pub fn current_required_role(&self) -> Option<Role> {
        if self.status != RequestStatus::PendingApproval {
            return None;
        }
        self.level_roles.get(self.current_level as usize).copied()
    }

    /// Whether the current level is the last one in the frozen sequence.
    pub fn at_final_level(&self) -> bool {
        !self.level_roles.is_empty()
            && self.current_level as usize == self.level_roles.len() - 1
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;

    use crate::domain::user::{Role, UserId};

    use super::{PurchaseRequest, RequestId, RequestStatus};

    fn pending(level_roles: Vec<Role>, current_level: u32) -> PurchaseRequest {
        let now = Utc::now();
        PurchaseRequest {
            id: RequestId("PR-1".to_string()),
            title: "Laptops".to_string(),
            description: "Replacement laptops".to_string(),
            amount: Decimal::new(5_000_00, 2),
            currency: "USD".to_string(),
            request_type: "equipment".to_string(),
            requester: UserId("u-staff".to_string()),
            status: RequestStatus::PendingApproval,
            level_roles,
            current_level,
            version: 1,
            created_at: now,
            submitted_at: Some(now),
            updated_at: now,
        }
    }

    #[test]
    fn required_role_follows_current_level() {
        let request = pending(vec![Role::ApproverLevel1, Role::Finance], 1);
        assert_eq!(request.current_required_role(), Some(Role::Finance));
        assert!(request.at_final_level());
    }

    #[test]
    fn no_required_role_outside_pending_approval() {
        let mut request = pending(vec![Role::ApproverLevel1], 0);
        request.status = RequestStatus::Approved;
        assert_eq!(request.current_required_role(), None);
    }

    #[test]
    fn terminal_statuses_are_flagged() {
        assert!(RequestStatus::Approved.is_terminal());
        assert!(RequestStatus::Rejected.is_terminal());
        assert!(RequestStatus::Cancelled.is_terminal());
        assert!(!RequestStatus::PendingApproval.is_terminal());
        assert!(!RequestStatus::Draft.is_terminal());
    }
}
