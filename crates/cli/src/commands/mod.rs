pub mod act;
pub mod config;
pub mod doctor;
pub mod history;
pub mod migrate;
pub mod seed;
pub mod submit;

use serde::Serialize;

use procura_core::errors::WorkflowError;
use procura_service::ServiceError;

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
}

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message: message.into(),
        };
        Self { exit_code: 0, output: serialize_payload(payload) }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: message.into(),
        };
        Self { exit_code, output: serialize_payload(payload) }
    }
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}

/// Stable error classes for workflow failures, so scripts can branch on
/// them without parsing messages.
pub(crate) fn service_error_class(error: &ServiceError) -> &'static str {
    match error {
        ServiceError::Workflow(WorkflowError::PolicyConfiguration { .. }) => {
            "policy_configuration"
        }
        ServiceError::Workflow(WorkflowError::Authorization { .. }) => "authorization",
        ServiceError::Workflow(WorkflowError::InvalidState { .. }) => "invalid_state",
        ServiceError::Workflow(WorkflowError::UnknownRole { .. }) => "unknown_role",
        ServiceError::RequestNotFound { .. } | ServiceError::UserNotFound { .. } => "not_found",
        ServiceError::ConcurrentModification { .. } => "concurrent_modification",
        ServiceError::Repository(_) => "repository",
    }
}

/// Exit codes for workflow failures: validation-like errors are caller
/// mistakes, conflicts are retryable, repository errors are operational.
pub(crate) fn service_error_exit_code(error: &ServiceError) -> u8 {
    match error {
        ServiceError::Workflow(_) => 2,
        ServiceError::RequestNotFound { .. } | ServiceError::UserNotFound { .. } => 3,
        ServiceError::ConcurrentModification { .. } => 4,
        ServiceError::Repository(_) => 5,
    }
}

#[cfg(test)]
mod tests {
    use procura_core::errors::WorkflowError;
    use procura_service::ServiceError;

    use super::{service_error_class, service_error_exit_code, CommandResult};

    #[test]
    fn success_payload_is_machine_readable() {
        let result = CommandResult::success("migrate", "applied pending migrations");
        let payload: serde_json::Value =
            serde_json::from_str(&result.output).expect("payload should be JSON");
        assert_eq!(payload["command"], "migrate");
        assert_eq!(payload["status"], "ok");
        assert!(payload["error_class"].is_null());
        assert_eq!(result.exit_code, 0);
    }

    #[test]
    fn workflow_failures_map_to_stable_classes() {
        let conflict = ServiceError::ConcurrentModification { request_id: "pr-1".to_string() };
        assert_eq!(service_error_class(&conflict), "concurrent_modification");
        assert_eq!(service_error_exit_code(&conflict), 4);

        let denied = ServiceError::Workflow(WorkflowError::Authorization {
            reason: "role mismatch".to_string(),
        });
        assert_eq!(service_error_class(&denied), "authorization");
        assert_eq!(service_error_exit_code(&denied), 2);

        let missing = ServiceError::RequestNotFound { request_id: "pr-1".to_string() };
        assert_eq!(service_error_class(&missing), "not_found");
        assert_eq!(service_error_exit_code(&missing), 3);
    }
}
