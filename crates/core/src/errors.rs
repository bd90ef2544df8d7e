use thiserror::Error;

use crate::domain::action::WorkflowAction;
use crate::domain::request::RequestStatus;

/// Failures the pure engine can produce. Persistence and race failures
/// live one layer up, next to the repository that detects them.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum WorkflowError {
    #[error("no applicable approval levels for request type `{request_type}`")]
    PolicyConfiguration { request_type: String },
    #[error("not authorized: {reason}")]
    Authorization { reason: String },
    #[error("action `{action}` is not legal while status is `{status}`: {detail}")]
    InvalidState { status: RequestStatus, action: WorkflowAction, detail: String },
    #[error("unknown role `{role}`")]
    UnknownRole { role: String },
}

impl WorkflowError {
    pub fn invalid_state(
        status: RequestStatus,
        action: WorkflowAction,
        detail: impl Into<String>,
    ) -> Self {
        Self::InvalidState { status, action, detail: detail.into() }
    }
}

#[cfg(test)]
mod tests {
    use crate::domain::action::WorkflowAction;
    use crate::domain::request::RequestStatus;

    use super::WorkflowError;

    #[test]
    fn messages_name_the_offending_state() {
        let error = WorkflowError::invalid_state(
            RequestStatus::Approved,
            WorkflowAction::Approve,
            "request is closed",
        );
        let rendered = error.to_string();
        assert!(rendered.contains("approved"));
        assert!(rendered.contains("approve"));
    }
}
