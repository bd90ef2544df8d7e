use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use procura_core::config::{AppConfig, ConfigError, LoadOptions};
use procura_core::workflow::WorkflowEngine;
use procura_db::repositories::{SqlRequestRepository, SqlUserRepository};
use procura_db::{connect_with_settings, migrations, DbPool};

use crate::service::WorkflowService;

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub service: WorkflowService,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
}

/// Load configuration, connect, migrate, and wire the workflow service.
pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(event_name = "system.bootstrap.start", "starting application bootstrap");

    let db_pool = connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    .map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        database_url = %config.database.url,
        "database connection established"
    );

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(event_name = "system.bootstrap.migrations_applied", "database migrations applied");

    let catalog = config.policy_catalog()?;
    info!(
        event_name = "system.bootstrap.policy_loaded",
        request_types = catalog.request_types().len(),
        "approval policy catalog loaded"
    );

    let service = WorkflowService::new(
        WorkflowEngine::new(catalog),
        Arc::new(SqlRequestRepository::new(db_pool.clone())),
        Arc::new(SqlUserRepository::new(db_pool.clone())),
    );

    Ok(Application { config, db_pool, service })
}
