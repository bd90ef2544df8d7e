use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::request::RequestId;
use crate::domain::user::UserId;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActionId(pub String);

impl ActionId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

/// Inbound intent against a request. Distinct from [`Decision`], which is
/// what actually got recorded.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowAction {
    Submit,
    Approve,
    Reject,
    Cancel,
    AdminOverride,
}

impl WorkflowAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Submit => "submit",
            Self::Approve => "approve",
            Self::Reject => "reject",
            Self::Cancel => "cancel",
            Self::AdminOverride => "admin_override",
        }
    }
}

impl std::fmt::Display for WorkflowAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Recorded outcome of a successful transition. `AdminOverride` is kept
/// separate from `Approved` so bypasses stay auditable on their own.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Submitted,
    Approved,
    Rejected,
    Cancelled,
    AdminOverride,
}

impl Decision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Submitted => "submitted",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Cancelled => "cancelled",
            Self::AdminOverride => "admin_override",
        }
    }
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Append-only audit entry. One per successful transition; never mutated
/// once written. Total order per request by `recorded_at`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalAction {
    pub id: ActionId,
    pub request_id: RequestId,
    pub actor: UserId,
    /// Level index the actor acted at; absent when no level was pending.
    pub level: Option<u32>,
    pub decision: Decision,
    pub comment: Option<String>,
    pub recorded_at: DateTime<Utc>,
}
