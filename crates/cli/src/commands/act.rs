use clap::ValueEnum;

use procura_core::config::{AppConfig, LoadOptions};
use procura_core::domain::action::WorkflowAction;
use procura_core::domain::request::RequestId;
use procura_core::domain::user::UserId;
use procura_service::{bootstrap_with_config, ServiceError};

use crate::commands::{service_error_class, service_error_exit_code, CommandResult};

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum ActionArg {
    Approve,
    Reject,
    Cancel,
    Override,
}

impl From<ActionArg> for WorkflowAction {
    fn from(arg: ActionArg) -> Self {
        match arg {
            ActionArg::Approve => WorkflowAction::Approve,
            ActionArg::Reject => WorkflowAction::Reject,
            ActionArg::Cancel => WorkflowAction::Cancel,
            ActionArg::Override => WorkflowAction::AdminOverride,
        }
    }
}

pub fn run(
    request_id: &str,
    action: ActionArg,
    user: &str,
    comment: Option<String>,
) -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "act",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "act",
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                3,
            );
        }
    };

    let workflow_action = WorkflowAction::from(action);
    let result = runtime.block_on(async {
        let app = bootstrap_with_config(config)
            .await
            .map_err(|error| ("bootstrap", error.to_string(), 4u8))?;

        let request = app
            .service
            .apply_action(
                &RequestId(request_id.to_string()),
                &UserId(user.to_string()),
                workflow_action,
                comment,
            )
            .await
            .map_err(service_failure)?;

        app.db_pool.close().await;
        Ok::<_, (&'static str, String, u8)>(request)
    });

    match result {
        Ok(request) => CommandResult::success(
            "act",
            format!(
                "applied {workflow_action} to {}: status {}, level {}",
                request.id.0, request.status, request.current_level
            ),
        ),
        Err((error_class, message, exit_code)) => {
            let message = if error_class == "concurrent_modification" {
                format!("{message}; reload the request and retry")
            } else {
                message
            };
            CommandResult::failure("act", error_class, message, exit_code)
        }
    }
}

fn service_failure(error: ServiceError) -> (&'static str, String, u8) {
    (service_error_class(&error), error.to_string(), service_error_exit_code(&error))
}
