use std::collections::HashMap;

use tokio::sync::RwLock;

use procura_core::domain::action::ApprovalAction;
use procura_core::domain::request::{PurchaseRequest, RequestId, RequestStatus};
use procura_core::domain::user::{UserId, UserProfile};

use super::{RepositoryError, RequestRepository, UserRepository};

/// Test and prototyping double for [`RequestRepository`]. Enforces the
/// same optimistic version discipline as the SQL repository.
#[derive(Default)]
pub struct InMemoryRequestRepository {
    requests: RwLock<HashMap<String, PurchaseRequest>>,
    audits: RwLock<HashMap<String, Vec<ApprovalAction>>>,
}

impl InMemoryRequestRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl RequestRepository for InMemoryRequestRepository {
    async fn find_by_id(
        &self,
        id: &RequestId,
    ) -> Result<Option<PurchaseRequest>, RepositoryError> {
        Ok(self.requests.read().await.get(&id.0).cloned())
    }

    async fn create(&self, request: PurchaseRequest) -> Result<(), RepositoryError> {
        self.requests.write().await.insert(request.id.0.clone(), request);
        Ok(())
    }

    async fn save_transition(
        &self,
        request: PurchaseRequest,
        expected_version: i64,
        audit: ApprovalAction,
    ) -> Result<PurchaseRequest, RepositoryError> {
        // Both maps behind one write section so the state update and the
        // audit append land together, as the SQL transaction does.
        let mut requests = self.requests.write().await;
        let mut audits = self.audits.write().await;

        let stored_version = requests
            .get(&request.id.0)
            .map(|stored| stored.version)
            .unwrap_or(expected_version);
        if stored_version != expected_version {
            return Err(RepositoryError::Conflict { request_id: request.id.0.clone() });
        }

        let mut saved = request;
        saved.version = expected_version + 1;
        requests.insert(saved.id.0.clone(), saved.clone());
        audits.entry(saved.id.0.clone()).or_default().push(audit);
        Ok(saved)
    }

    async fn history(&self, id: &RequestId) -> Result<Vec<ApprovalAction>, RepositoryError> {
        Ok(self.audits.read().await.get(&id.0).cloned().unwrap_or_default())
    }

    async fn list_by_status(
        &self,
        status: RequestStatus,
    ) -> Result<Vec<PurchaseRequest>, RepositoryError> {
        let requests = self.requests.read().await;
        let mut matches: Vec<PurchaseRequest> =
            requests.values().filter(|r| r.status == status).cloned().collect();
        matches.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(matches)
    }
}

#[derive(Default)]
pub struct InMemoryUserRepository {
    users: RwLock<HashMap<String, UserProfile>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Convenience for test setup.
    pub async fn with_users(users: Vec<UserProfile>) -> Self {
        let repo = Self::default();
        {
            let mut map = repo.users.write().await;
            for user in users {
                map.insert(user.id.0.clone(), user);
            }
        }
        repo
    }
}

#[async_trait::async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_by_id(&self, id: &UserId) -> Result<Option<UserProfile>, RepositoryError> {
        Ok(self.users.read().await.get(&id.0).cloned())
    }

    async fn save(&self, user: UserProfile) -> Result<(), RepositoryError> {
        self.users.write().await.insert(user.id.0.clone(), user);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;

    use procura_core::domain::action::{ActionId, ApprovalAction, Decision};
    use procura_core::domain::request::{PurchaseRequest, RequestId, RequestStatus};
    use procura_core::domain::user::UserId;

    use super::InMemoryRequestRepository;
    use crate::repositories::{RepositoryError, RequestRepository};

    fn sample_request(id: &str) -> PurchaseRequest {
        let now = Utc::now();
        PurchaseRequest {
            id: RequestId(id.to_string()),
            title: "Laptops".to_string(),
            description: String::new(),
            amount: Decimal::new(1_200_00, 2),
            currency: "USD".to_string(),
            request_type: "equipment".to_string(),
            requester: UserId("u-staff".to_string()),
            status: RequestStatus::Draft,
            level_roles: Vec::new(),
            current_level: 0,
            version: 1,
            created_at: now,
            submitted_at: None,
            updated_at: now,
        }
    }

    fn audit_entry(request_id: &str, decision: Decision) -> ApprovalAction {
        ApprovalAction {
            id: ActionId::generate(),
            request_id: RequestId(request_id.to_string()),
            actor: UserId("u-staff".to_string()),
            level: None,
            decision,
            comment: None,
            recorded_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn save_transition_checks_version() {
        let repo = InMemoryRequestRepository::new();
        let mut request = sample_request("PR-001");
        repo.create(request.clone()).await.expect("create");

        request.status = RequestStatus::PendingApproval;
        let saved = repo
            .save_transition(request.clone(), 1, audit_entry("PR-001", Decision::Submitted))
            .await
            .expect("first writer");
        assert_eq!(saved.version, 2);

        let error = repo
            .save_transition(request, 1, audit_entry("PR-001", Decision::Cancelled))
            .await
            .expect_err("stale writer must conflict");
        assert!(matches!(error, RepositoryError::Conflict { .. }));

        let history = repo.history(&RequestId("PR-001".to_string())).await.expect("history");
        assert_eq!(history.len(), 1);
    }

    #[tokio::test]
    async fn list_by_status_filters_and_orders() {
        let repo = InMemoryRequestRepository::new();
        repo.create(sample_request("PR-001")).await.expect("create");
        let mut second = sample_request("PR-002");
        second.status = RequestStatus::Approved;
        repo.create(second).await.expect("create");

        let drafts = repo.list_by_status(RequestStatus::Draft).await.expect("list");
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].id.0, "PR-001");
    }
}
