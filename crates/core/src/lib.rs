pub mod config;
pub mod domain;
pub mod errors;
pub mod permissions;
pub mod policy;
pub mod workflow;

pub use domain::action::{ActionId, ApprovalAction, Decision, WorkflowAction};
pub use domain::request::{PurchaseRequest, RequestId, RequestStatus};
pub use domain::user::{Role, UserId, UserProfile};
pub use errors::WorkflowError;
pub use permissions::{AccessDecision, AccessDenial, PermissionEvaluator};
pub use policy::{ApprovalLevel, PolicyCatalog, PolicyError};
pub use workflow::{Transition, WorkflowEngine};
