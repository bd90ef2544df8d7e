//! Orchestration layer: wires the pure workflow engine to persistence,
//! owns application bootstrap, and exposes the service API the CLI uses.

pub mod bootstrap;
pub mod logging;
pub mod service;

pub use bootstrap::{bootstrap, bootstrap_with_config, Application, BootstrapError};
pub use logging::init_logging;
pub use service::{NewRequest, ServiceError, WorkflowService};
