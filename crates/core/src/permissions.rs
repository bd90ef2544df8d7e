use serde::{Deserialize, Serialize};

use crate::domain::action::WorkflowAction;
use crate::domain::request::{PurchaseRequest, RequestStatus};
use crate::domain::user::{Role, UserProfile};

/// Why an access check failed. Carried alongside a human-readable reason
/// so callers can branch without parsing strings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AccessDenial {
    InactiveUser { user: String },
    SelfApproval { user: String },
    RoleMismatch { required: Role, actual: Role },
    NoPendingLevel { status: RequestStatus },
    NotRequester { user: String },
    StatusNotActionable { status: RequestStatus, action: WorkflowAction },
    AdminRequired { actual: Role },
}

impl AccessDenial {
    fn reason(&self) -> String {
        match self {
            Self::InactiveUser { user } => format!("user `{user}` is inactive"),
            Self::SelfApproval { user } => {
                format!("requester `{user}` cannot approve their own request")
            }
            Self::RoleMismatch { required, actual } => {
                format!("current level requires role `{required}`, actor has `{actual}`")
            }
            Self::NoPendingLevel { status } => {
                format!("request is not awaiting approval (status `{status}`)")
            }
            Self::NotRequester { user } => {
                format!("only the requester may do this, not `{user}`")
            }
            Self::StatusNotActionable { status, action } => {
                format!("`{action}` is not available while status is `{status}`")
            }
            Self::AdminRequired { actual } => {
                format!("admin override requires role `admin`, actor has `{actual}`")
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessDecision {
    pub allowed: bool,
    pub reason: String,
    pub denial: Option<AccessDenial>,
}

impl AccessDecision {
    fn allow(reason: impl Into<String>) -> Self {
        Self { allowed: true, reason: reason.into(), denial: None }
    }

    fn deny(denial: AccessDenial) -> Self {
        Self { allowed: false, reason: denial.reason(), denial: Some(denial) }
    }
}

/// Pure authorization check over an explicit `{user, request, action}`
/// triple. No session state, no side effects; the engine turns a denial
/// into an `Authorization` error.
#[derive(Clone, Copy, Debug, Default)]
pub struct PermissionEvaluator;

impl PermissionEvaluator {
    pub fn authorize(
        &self,
        user: &UserProfile,
        request: &PurchaseRequest,
        action: WorkflowAction,
    ) -> AccessDecision {
        if !user.active {
            return AccessDecision::deny(AccessDenial::InactiveUser {
                user: user.id.0.clone(),
            });
        }

        match action {
            WorkflowAction::Approve | WorkflowAction::Reject => {
                self.authorize_level_action(user, request)
            }
            WorkflowAction::Submit | WorkflowAction::Cancel => {
                self.authorize_requester_action(user, request, action)
            }
            WorkflowAction::AdminOverride => self.authorize_override(user, request),
        }
    }

    fn authorize_level_action(
        &self,
        user: &UserProfile,
        request: &PurchaseRequest,
    ) -> AccessDecision {
        let Some(required) = request.current_required_role() else {
            return AccessDecision::deny(AccessDenial::NoPendingLevel {
                status: request.status,
            });
        };

        if user.id == request.requester {
            return AccessDecision::deny(AccessDenial::SelfApproval {
                user: user.id.0.clone(),
            });
        }

        if user.role != required {
            return AccessDecision::deny(AccessDenial::RoleMismatch {
                required,
                actual: user.role,
            });
        }

        AccessDecision::allow(format!(
            "`{}` holds `{required}` required at level {}",
            user.id.0, request.current_level
        ))
    }

    fn authorize_requester_action(
        &self,
        user: &UserProfile,
        request: &PurchaseRequest,
        action: WorkflowAction,
    ) -> AccessDecision {
        if user.id != request.requester {
            return AccessDecision::deny(AccessDenial::NotRequester {
                user: user.id.0.clone(),
            });
        }

        let actionable = match action {
            WorkflowAction::Submit => {
                matches!(request.status, RequestStatus::Draft | RequestStatus::Submitted)
            }
            WorkflowAction::Cancel => !request.status.is_terminal(),
            _ => false,
        };

        if !actionable {
            return AccessDecision::deny(AccessDenial::StatusNotActionable {
                status: request.status,
                action,
            });
        }

        AccessDecision::allow(format!("requester `{}` may {action}", user.id.0))
    }

    fn authorize_override(
        &self,
        user: &UserProfile,
        request: &PurchaseRequest,
    ) -> AccessDecision {
        if user.role != Role::Admin {
            return AccessDecision::deny(AccessDenial::AdminRequired { actual: user.role });
        }

        if user.id == request.requester {
            return AccessDecision::deny(AccessDenial::SelfApproval {
                user: user.id.0.clone(),
            });
        }

        AccessDecision::allow(format!("admin `{}` may override", user.id.0))
    }
}
