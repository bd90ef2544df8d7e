use async_trait::async_trait;
use thiserror::Error;

use procura_core::domain::action::ApprovalAction;
use procura_core::domain::request::{PurchaseRequest, RequestId, RequestStatus};
use procura_core::domain::user::{UserId, UserProfile};

pub mod memory;
pub mod request;
pub mod user;

pub use memory::{InMemoryRequestRepository, InMemoryUserRepository};
pub use request::SqlRequestRepository;
pub use user::SqlUserRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    /// Lost the optimistic-version race on a concurrent transition.
    #[error("request `{request_id}` was modified concurrently")]
    Conflict { request_id: String },
}

/// Persistence collaborator for requests and their audit trail.
///
/// `save_transition` is the single write path for workflow transitions:
/// the request update and the audit append either both land or neither
/// does, guarded by the version the caller loaded.
#[async_trait]
pub trait RequestRepository: Send + Sync {
    async fn find_by_id(&self, id: &RequestId)
        -> Result<Option<PurchaseRequest>, RepositoryError>;

    async fn create(&self, request: PurchaseRequest) -> Result<(), RepositoryError>;

    async fn save_transition(
        &self,
        request: PurchaseRequest,
        expected_version: i64,
        audit: ApprovalAction,
    ) -> Result<PurchaseRequest, RepositoryError>;

    /// Audit trail for one request, oldest first. Re-reading a closed
    /// request yields the same sequence.
    async fn history(&self, id: &RequestId) -> Result<Vec<ApprovalAction>, RepositoryError>;

    async fn list_by_status(
        &self,
        status: RequestStatus,
    ) -> Result<Vec<PurchaseRequest>, RepositoryError>;
}

/// Identity collaborator storage. The engine only ever reads profiles.
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_id(&self, id: &UserId) -> Result<Option<UserProfile>, RepositoryError>;
    async fn save(&self, user: UserProfile) -> Result<(), RepositoryError>;
}
