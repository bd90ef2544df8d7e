use procura_core::config::{AppConfig, LoadOptions};
use procura_core::domain::request::RequestId;
use procura_service::{bootstrap_with_config, ServiceError};

use crate::commands::{service_error_class, service_error_exit_code, CommandResult};

pub fn run(request_id: &str) -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "history",
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
                "history",
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

        let id = RequestId(request_id.to_string());
        let request = app.service.get_request(&id).await.map_err(service_failure)?;
        let history = app.service.history(&id).await.map_err(service_failure)?;

        app.db_pool.close().await;
        Ok::<_, (&'static str, String, u8)>((request, history))
    });

    match result {
        Ok((request, history)) => {
            let mut lines = vec![format!(
                "request {} [{}], {} recorded action(s):",
                request.id.0,
                request.status,
                history.len()
            )];
            for (index, entry) in history.iter().enumerate() {
                let level = entry
                    .level
                    .map(|l| format!("level {l}"))
                    .unwrap_or_else(|| "no level".to_string());
                let comment = entry.comment.as_deref().unwrap_or("-");
                lines.push(format!(
                    "  {}. {} by {} ({level}) at {}: {comment}",
                    index + 1,
                    entry.decision,
                    entry.actor.0,
                    entry.recorded_at.to_rfc3339()
                ));
            }
            CommandResult::success("history", lines.join("\n"))
        }
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("history", error_class, message, exit_code)
        }
    }
}

fn service_failure(error: ServiceError) -> (&'static str, String, u8) {
    (service_error_class(&error), error.to_string(), service_error_exit_code(&error))
}
