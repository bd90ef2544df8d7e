use rust_decimal::Decimal;

use procura_core::config::{AppConfig, LoadOptions};
use procura_core::domain::action::WorkflowAction;
use procura_core::domain::user::UserId;
use procura_service::{bootstrap_with_config, NewRequest, ServiceError};

use crate::commands::{service_error_class, service_error_exit_code, CommandResult};

pub struct SubmitArgs {
    pub user: String,
    pub title: String,
    pub description: String,
    pub amount: String,
    pub currency: String,
    pub request_type: String,
    pub draft: bool,
}

pub fn run(args: SubmitArgs) -> CommandResult {
    let amount = match args.amount.parse::<Decimal>() {
        Ok(amount) => amount,
        Err(error) => {
            return CommandResult::failure(
                "submit",
                "invalid_argument",
                format!("amount `{}` is not a valid decimal: {error}", args.amount),
                2,
            );
        }
    };

    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "submit",
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
                "submit",
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                3,
            );
        }
    };

    let result = runtime.block_on(async {
        let app = bootstrap_with_config(config)
            .await
            .map_err(|error| ("bootstrap", error.to_string(), 4u8))?;

        let draft = app
            .service
            .create_draft(NewRequest {
                title: args.title.clone(),
                description: args.description.clone(),
                amount,
                currency: args.currency.clone(),
                request_type: args.request_type.clone(),
                requester: UserId(args.user.clone()),
            })
            .await
            .map_err(service_failure)?;

        let request = if args.draft {
            draft
        } else {
            app.service
                .apply_action(&draft.id, &UserId(args.user.clone()), WorkflowAction::Submit, None)
                .await
                .map_err(service_failure)?
        };

        app.db_pool.close().await;
        Ok::<_, (&'static str, String, u8)>(request)
    });

    match result {
        Ok(request) => {
            let route = request
                .level_roles
                .iter()
                .map(|role| role.as_str())
                .collect::<Vec<_>>()
                .join(" -> ");
            let route = if route.is_empty() { "none (draft)".to_string() } else { route };
            CommandResult::success(
                "submit",
                format!(
                    "request {} is {} (amount {} {}, approval route: {route})",
                    request.id.0, request.status, request.amount, request.currency
                ),
            )
        }
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("submit", error_class, message, exit_code)
        }
    }
}

fn service_failure(error: ServiceError) -> (&'static str, String, u8) {
    (service_error_class(&error), error.to_string(), service_error_exit_code(&error))
}
