use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tracing::info;

use procura_core::domain::action::{ActionId, ApprovalAction, WorkflowAction};
use procura_core::domain::request::{PurchaseRequest, RequestId, RequestStatus};
use procura_core::domain::user::{UserId, UserProfile};
use procura_core::errors::WorkflowError;
use procura_core::workflow::WorkflowEngine;
use procura_db::repositories::{RepositoryError, RequestRepository, UserRepository};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Workflow(#[from] WorkflowError),
    #[error("purchase request `{request_id}` not found")]
    RequestNotFound { request_id: String },
    #[error("user `{user_id}` not found")]
    UserNotFound { user_id: String },
    #[error("purchase request `{request_id}` was modified concurrently, retry the action")]
    ConcurrentModification { request_id: String },
    #[error(transparent)]
    Repository(RepositoryError),
}

impl From<RepositoryError> for ServiceError {
    fn from(error: RepositoryError) -> Self {
        match error {
            RepositoryError::Conflict { request_id } => {
                ServiceError::ConcurrentModification { request_id }
            }
            other => ServiceError::Repository(other),
        }
    }
}

/// Parameters for opening a new draft request.
#[derive(Debug, Clone)]
pub struct NewRequest {
    pub title: String,
    pub description: String,
    pub amount: rust_decimal::Decimal,
    pub currency: String,
    pub request_type: String,
    pub requester: UserId,
}

/// Orchestrates the approval workflow over persisted state: loads the
/// request and actor, runs the pure engine, and stores the resulting
/// transition together with its audit entry.
pub struct WorkflowService {
    engine: WorkflowEngine,
    requests: Arc<dyn RequestRepository>,
    users: Arc<dyn UserRepository>,
}

impl WorkflowService {
    pub fn new(
        engine: WorkflowEngine,
        requests: Arc<dyn RequestRepository>,
        users: Arc<dyn UserRepository>,
    ) -> Self {
        Self { engine, requests, users }
    }

    /// Open a new draft request. Drafts carry no approval route until
    /// submission freezes one.
    pub async fn create_draft(&self, input: NewRequest) -> Result<PurchaseRequest, ServiceError> {
        self.load_user(&input.requester).await?;

        let now = Utc::now();
        let request = PurchaseRequest {
            id: RequestId(format!("pr-{}", uuid_suffix())),
            title: input.title,
            description: input.description,
            amount: input.amount,
            currency: input.currency,
            request_type: input.request_type,
            requester: input.requester,
            status: RequestStatus::Draft,
            level_roles: Vec::new(),
            current_level: 0,
            version: 1,
            created_at: now,
            submitted_at: None,
            updated_at: now,
        };
        self.requests.create(request.clone()).await?;

        info!(
            event_name = "workflow.request.created",
            request_id = %request.id.0,
            requester_id = %request.requester.0,
            request_type = %request.request_type,
            "draft purchase request created"
        );
        Ok(request)
    }

    /// Apply one workflow action on behalf of an actor.
    ///
    /// The state write is guarded by the version loaded here, so two actors
    /// racing on the same request resolve to one winner and one
    /// [`ServiceError::ConcurrentModification`].
    pub async fn apply_action(
        &self,
        request_id: &RequestId,
        actor_id: &UserId,
        action: WorkflowAction,
        comment: Option<String>,
    ) -> Result<PurchaseRequest, ServiceError> {
        let request = self.load_request(request_id).await?;
        let actor = self.load_user(actor_id).await?;
        let loaded_version = request.version;

        let transition = self.engine.apply(&request, &actor, action, comment, Utc::now())?;
        let saved =
            self.requests.save_transition(transition.request, loaded_version, transition.audit).await?;

        info!(
            event_name = "workflow.request.transition",
            request_id = %saved.id.0,
            actor_id = %actor.id.0,
            action = %action,
            status = %saved.status,
            current_level = saved.current_level,
            "workflow action applied"
        );
        Ok(saved)
    }

    pub async fn get_request(
        &self,
        request_id: &RequestId,
    ) -> Result<PurchaseRequest, ServiceError> {
        self.load_request(request_id).await
    }

    /// Full audit trail for one request, oldest entry first.
    pub async fn history(
        &self,
        request_id: &RequestId,
    ) -> Result<Vec<ApprovalAction>, ServiceError> {
        self.load_request(request_id).await?;
        Ok(self.requests.history(request_id).await?)
    }

    pub async fn list_by_status(
        &self,
        status: RequestStatus,
    ) -> Result<Vec<PurchaseRequest>, ServiceError> {
        Ok(self.requests.list_by_status(status).await?)
    }

    async fn load_request(&self, id: &RequestId) -> Result<PurchaseRequest, ServiceError> {
        self.requests
            .find_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::RequestNotFound { request_id: id.0.clone() })
    }

    async fn load_user(&self, id: &UserId) -> Result<UserProfile, ServiceError> {
        self.users
            .find_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::UserNotFound { user_id: id.0.clone() })
    }
}

fn uuid_suffix() -> String {
    ActionId::generate().0
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use rust_decimal::Decimal;

    use procura_core::domain::action::{ApprovalAction, Decision, WorkflowAction};
    use procura_core::domain::request::{PurchaseRequest, RequestId, RequestStatus};
    use procura_core::domain::user::{Role, UserId, UserProfile};
    use procura_core::errors::WorkflowError;
    use procura_core::policy::PolicyCatalog;
    use procura_core::workflow::WorkflowEngine;
    use procura_db::repositories::{
        InMemoryRequestRepository, InMemoryUserRepository, RepositoryError, RequestRepository,
    };

    use super::{NewRequest, ServiceError, WorkflowService};

    fn user(id: &str, role: Role) -> UserProfile {
        UserProfile {
            id: UserId(id.to_string()),
            username: id.to_string(),
            role,
            active: true,
        }
    }

    async fn service_with_users() -> WorkflowService {
        let users = InMemoryUserRepository::with_users(vec![
            user("u-staff", Role::Staff),
            user("u-approver1", Role::ApproverLevel1),
            user("u-approver2", Role::ApproverLevel2),
            user("u-finance", Role::Finance),
            user("u-admin", Role::Admin),
        ])
        .await;

        WorkflowService::new(
            WorkflowEngine::new(PolicyCatalog::stock()),
            Arc::new(InMemoryRequestRepository::new()),
            Arc::new(users),
        )
    }

    fn new_request(amount: i64) -> NewRequest {
        NewRequest {
            title: "Standing desks".to_string(),
            description: "Desks for the new hires".to_string(),
            amount: Decimal::new(amount * 100, 2),
            currency: "USD".to_string(),
            request_type: "equipment".to_string(),
            requester: UserId("u-staff".to_string()),
        }
    }

    #[tokio::test]
    async fn full_approval_path_records_every_step() {
        let service = service_with_users().await;
        let staff = UserId("u-staff".to_string());

        let draft = service.create_draft(new_request(5_000)).await.expect("create draft");
        assert_eq!(draft.status, RequestStatus::Draft);

        let submitted = service
            .apply_action(&draft.id, &staff, WorkflowAction::Submit, None)
            .await
            .expect("submit");
        assert_eq!(submitted.status, RequestStatus::PendingApproval);
        assert_eq!(submitted.level_roles, vec![Role::ApproverLevel1, Role::ApproverLevel2]);

        let first = service
            .apply_action(
                &draft.id,
                &UserId("u-approver1".to_string()),
                WorkflowAction::Approve,
                Some("within budget".to_string()),
            )
            .await
            .expect("first approval");
        assert_eq!(first.status, RequestStatus::PendingApproval);
        assert_eq!(first.current_level, 1);

        let last = service
            .apply_action(
                &draft.id,
                &UserId("u-approver2".to_string()),
                WorkflowAction::Approve,
                None,
            )
            .await
            .expect("final approval");
        assert_eq!(last.status, RequestStatus::Approved);

        let history = service.history(&draft.id).await.expect("history");
        let decisions: Vec<Decision> = history.iter().map(|entry| entry.decision).collect();
        assert_eq!(decisions, vec![Decision::Submitted, Decision::Approved, Decision::Approved]);
        assert_eq!(history[1].level, Some(0));
        assert_eq!(history[2].level, Some(1));
    }

    #[tokio::test]
    async fn self_approval_is_rejected_without_audit() {
        let users = InMemoryUserRepository::with_users(vec![user(
            "u-requesting-approver",
            Role::ApproverLevel1,
        )])
        .await;
        let service = WorkflowService::new(
            WorkflowEngine::new(PolicyCatalog::stock()),
            Arc::new(InMemoryRequestRepository::new()),
            Arc::new(users),
        );

        let requester = UserId("u-requesting-approver".to_string());
        let draft = service
            .create_draft(NewRequest {
                requester: requester.clone(),
                ..new_request(500)
            })
            .await
            .expect("create draft");
        service
            .apply_action(&draft.id, &requester, WorkflowAction::Submit, None)
            .await
            .expect("submit");

        let error = service
            .apply_action(&draft.id, &requester, WorkflowAction::Approve, None)
            .await
            .expect_err("self-approval must fail");
        assert!(matches!(error, ServiceError::Workflow(WorkflowError::Authorization { .. })));

        // The failed attempt leaves no trace beyond the submission.
        let history = service.history(&draft.id).await.expect("history");
        assert_eq!(history.len(), 1);
    }

    #[tokio::test]
    async fn closed_requests_absorb_further_actions() {
        let service = service_with_users().await;
        let staff = UserId("u-staff".to_string());

        let draft = service.create_draft(new_request(200)).await.expect("create draft");
        service
            .apply_action(&draft.id, &staff, WorkflowAction::Submit, None)
            .await
            .expect("submit");
        service
            .apply_action(
                &draft.id,
                &UserId("u-approver1".to_string()),
                WorkflowAction::Reject,
                Some("not needed".to_string()),
            )
            .await
            .expect("reject");

        let error = service
            .apply_action(
                &draft.id,
                &UserId("u-admin".to_string()),
                WorkflowAction::AdminOverride,
                None,
            )
            .await
            .expect_err("closed request must not accept actions");
        assert!(matches!(error, ServiceError::Workflow(WorkflowError::InvalidState { .. })));
    }

    #[tokio::test]
    async fn unknown_request_and_unknown_actor_are_distinct_errors() {
        let service = service_with_users().await;

        let missing = service
            .apply_action(
                &RequestId("nope".to_string()),
                &UserId("u-staff".to_string()),
                WorkflowAction::Submit,
                None,
            )
            .await
            .expect_err("missing request");
        assert!(matches!(missing, ServiceError::RequestNotFound { .. }));

        let draft = service.create_draft(new_request(100)).await.expect("create draft");
        let ghost = service
            .apply_action(&draft.id, &UserId("ghost".to_string()), WorkflowAction::Submit, None)
            .await
            .expect_err("missing actor");
        assert!(matches!(ghost, ServiceError::UserNotFound { .. }));
    }

    /// Serves a fixed stale snapshot on every read while delegating writes,
    /// so a second transition observes the version conflict.
    struct StaleReadRepository {
        inner: Arc<InMemoryRequestRepository>,
        snapshot: PurchaseRequest,
    }

    #[async_trait]
    impl RequestRepository for StaleReadRepository {
        async fn find_by_id(
            &self,
            id: &RequestId,
        ) -> Result<Option<PurchaseRequest>, RepositoryError> {
            if id == &self.snapshot.id {
                Ok(Some(self.snapshot.clone()))
            } else {
                self.inner.find_by_id(id).await
            }
        }

        async fn create(&self, request: PurchaseRequest) -> Result<(), RepositoryError> {
            self.inner.create(request).await
        }

        async fn save_transition(
            &self,
            request: PurchaseRequest,
            expected_version: i64,
            audit: ApprovalAction,
        ) -> Result<PurchaseRequest, RepositoryError> {
            self.inner.save_transition(request, expected_version, audit).await
        }

        async fn history(
            &self,
            id: &RequestId,
        ) -> Result<Vec<ApprovalAction>, RepositoryError> {
            self.inner.history(id).await
        }

        async fn list_by_status(
            &self,
            status: RequestStatus,
        ) -> Result<Vec<PurchaseRequest>, RepositoryError> {
            self.inner.list_by_status(status).await
        }
    }

    #[tokio::test]
    async fn concurrent_transitions_resolve_to_one_winner() {
        let users = Arc::new(
            InMemoryUserRepository::with_users(vec![
                user("u-staff", Role::Staff),
                user("u-approver1", Role::ApproverLevel1),
            ])
            .await,
        );
        let shared = Arc::new(InMemoryRequestRepository::new());
        let staff = UserId("u-staff".to_string());

        let service = WorkflowService::new(
            WorkflowEngine::new(PolicyCatalog::stock()),
            shared.clone(),
            users.clone(),
        );
        let draft = service.create_draft(new_request(500)).await.expect("create draft");
        let submitted = service
            .apply_action(&draft.id, &staff, WorkflowAction::Submit, None)
            .await
            .expect("submit");

        // First actor wins and bumps the stored version.
        service
            .apply_action(&draft.id, &staff, WorkflowAction::Cancel, None)
            .await
            .expect("winner cancels");

        // Second actor loaded the pre-cancel snapshot and must lose.
        let racing = WorkflowService::new(
            WorkflowEngine::new(PolicyCatalog::stock()),
            Arc::new(StaleReadRepository { inner: shared, snapshot: submitted }),
            users,
        );
        let error = racing
            .apply_action(
                &draft.id,
                &UserId("u-approver1".to_string()),
                WorkflowAction::Approve,
                None,
            )
            .await
            .expect_err("stale actor must conflict");
        assert!(matches!(error, ServiceError::ConcurrentModification { .. }));
    }
}
