use sqlx::Executor;

use crate::connection::DbPool;
use crate::repositories::RepositoryError;

/// Canonical seed accounts, one per workflow role.
const SEED_USERS: &[SeedUserContract] = &[
    SeedUserContract { id: "u-staff", username: "staff", role: "staff" },
    SeedUserContract { id: "u-approver1", username: "approver1", role: "approver_level_1" },
    SeedUserContract { id: "u-approver2", username: "approver2", role: "approver_level_2" },
    SeedUserContract { id: "u-finance", username: "finance", role: "finance" },
    SeedUserContract { id: "u-admin", username: "admin", role: "admin" },
];

const SEED_REQUESTS: &[SeedRequestContract] = &[
    SeedRequestContract {
        request_id: "pr-draft-001",
        request_type: "office_supplies",
        status: "draft",
        current_level: 0,
        expected_audit_count: 0,
        description: "Small supplies order, still in draft",
    },
    SeedRequestContract {
        request_id: "pr-pending-001",
        request_type: "equipment",
        status: "pending_approval",
        current_level: 0,
        expected_audit_count: 1,
        description: "Equipment order awaiting first approval",
    },
];

const SEED_REQUEST_IDS: &[&str] = &["pr-draft-001", "pr-pending-001"];
const SEED_AUDIT_IDS: &[&str] = &["aa-pending-001"];
const SEED_USER_IDS: &[&str] = &["u-staff", "u-approver1", "u-approver2", "u-finance", "u-admin"];

/// Deterministic fixtures for exercising the approval workflow end to end:
/// one account per role, a draft request, and a request mid-approval with
/// its submission audit entry.
pub struct SeedDataset;

impl SeedDataset {
    pub const SQL: &str = include_str!("../../../config/fixtures/seed_data.sql");

    /// Load the seed dataset. Idempotent: reloading replaces the same rows.
    pub async fn load(pool: &DbPool) -> Result<SeedResult, RepositoryError> {
        let mut tx = pool.begin().await?;
        tx.execute(sqlx::query(Self::SQL)).await?;
        tx.commit().await?;

        let requests_seeded = SEED_REQUESTS
            .iter()
            .map(|request| RequestSeedInfo {
                request_id: request.request_id,
                status: request.status,
                description: request.description,
            })
            .collect::<Vec<_>>();

        Ok(SeedResult { users_seeded: SEED_USERS.len(), requests_seeded })
    }

    /// Verify that seeded rows exist and match the contract.
    pub async fn verify(pool: &DbPool) -> Result<VerificationResult, RepositoryError> {
        let mut checks = Vec::new();

        for user in SEED_USERS {
            let exists: i64 = sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM user_profile
                               WHERE id = ?1 AND username = ?2 AND role = ?3 AND active = 1)",
            )
            .bind(user.id)
            .bind(user.username)
            .bind(user.role)
            .fetch_one(pool)
            .await?;
            checks.push((user.id, exists == 1));
        }

        for request in SEED_REQUESTS {
            let exists: i64 = sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM purchase_request
                               WHERE id = ?1 AND request_type = ?2 AND status = ?3
                                 AND current_level = ?4)",
            )
            .bind(request.request_id)
            .bind(request.request_type)
            .bind(request.status)
            .bind(request.current_level)
            .fetch_one(pool)
            .await?;
            checks.push((request.request_id, exists == 1));

            let audit_count: i64 =
                sqlx::query_scalar("SELECT COUNT(1) FROM approval_action WHERE request_id = ?1")
                    .bind(request.request_id)
                    .fetch_one(pool)
                    .await?;
            checks.push((request.audit_label(), audit_count == request.expected_audit_count));
        }

        let all_present = checks.iter().all(|(_, present)| *present);
        Ok(VerificationResult { all_present, checks })
    }

    /// Remove seeded fixtures from a test database.
    pub async fn clean(pool: &DbPool) -> Result<(), RepositoryError> {
        let mut tx = pool.begin().await?;

        let quoted_audits = sql_array_from_ids(SEED_AUDIT_IDS);
        let quoted_requests = sql_array_from_ids(SEED_REQUEST_IDS);
        let quoted_users = sql_array_from_ids(SEED_USER_IDS);

        sqlx::query(&format!("DELETE FROM approval_action WHERE id IN {quoted_audits}"))
            .execute(&mut *tx)
            .await?;
        sqlx::query(&format!("DELETE FROM purchase_request WHERE id IN {quoted_requests}"))
            .execute(&mut *tx)
            .await?;
        sqlx::query(&format!("DELETE FROM user_profile WHERE id IN {quoted_users}"))
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
struct SeedUserContract {
    id: &'static str,
    username: &'static str,
    role: &'static str,
}

#[derive(Debug, Clone, Copy)]
struct SeedRequestContract {
    request_id: &'static str,
    request_type: &'static str,
    status: &'static str,
    current_level: i64,
    expected_audit_count: i64,
    description: &'static str,
}

impl SeedRequestContract {
    fn audit_label(&self) -> &'static str {
        match self.request_id {
            "pr-draft-001" => "pr-draft-001-audit-count",
            _ => "pr-pending-001-audit-count",
        }
    }
}

fn sql_array_from_ids(ids: &[&str]) -> String {
    let quoted = ids.iter().map(|id| format!("'{}'", id)).collect::<Vec<_>>().join(",");
    format!("({quoted})")
}

#[derive(Debug)]
pub struct SeedResult {
    pub users_seeded: usize,
    pub requests_seeded: Vec<RequestSeedInfo>,
}

#[derive(Debug)]
pub struct RequestSeedInfo {
    pub request_id: &'static str,
    pub status: &'static str,
    pub description: &'static str,
}

#[derive(Debug)]
pub struct VerificationResult {
    pub all_present: bool,
    pub checks: Vec<(&'static str, bool)>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{connect_with_settings, migrations};

    #[test]
    fn sql_fixture_is_valid() {
        assert!(!SeedDataset::SQL.is_empty());
    }

    #[tokio::test]
    async fn verify_seed_contract_and_idempotency() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30)
            .await
            .expect("connect to test database");
        migrations::run_pending(&pool).await.expect("run migrations");

        let first = SeedDataset::load(&pool).await.expect("load seed fixtures");
        let first_verification = SeedDataset::verify(&pool).await.expect("verify seed fixtures");
        assert!(first_verification.all_present);
        assert_eq!(first.users_seeded, 5);
        assert_eq!(first.requests_seeded.len(), 2);

        let second = SeedDataset::load(&pool).await.expect("reload seed fixtures");
        let second_verification =
            SeedDataset::verify(&pool).await.expect("re-verify seed fixtures");
        assert!(second_verification.all_present);
        assert_eq!(second.requests_seeded.len(), 2);
        assert_eq!(first_verification.checks, second_verification.checks);
    }

    #[tokio::test]
    async fn seeded_pending_request_carries_frozen_levels() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30)
            .await
            .expect("connect to test database");
        migrations::run_pending(&pool).await.expect("run migrations");
        SeedDataset::load(&pool).await.expect("load seed fixtures");

        let level_roles: String =
            sqlx::query_scalar("SELECT level_roles FROM purchase_request WHERE id = ?1")
                .bind("pr-pending-001")
                .fetch_one(&pool)
                .await
                .expect("query pending request");
        let roles: Vec<String> =
            serde_json::from_str(&level_roles).expect("level roles should be a JSON list");
        assert_eq!(roles, vec!["approver_level_1", "approver_level_2"]);

        let submitted_events: i64 = sqlx::query_scalar(
            "SELECT COUNT(1) FROM approval_action
             WHERE request_id = ?1 AND decision = 'submitted'",
        )
        .bind("pr-pending-001")
        .fetch_one(&pool)
        .await
        .expect("query submission events");
        assert_eq!(submitted_events, 1);
    }

    #[tokio::test]
    async fn clean_removes_seeded_rows() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30)
            .await
            .expect("connect to test database");
        migrations::run_pending(&pool).await.expect("run migrations");
        SeedDataset::load(&pool).await.expect("load seed fixtures");

        SeedDataset::clean(&pool).await.expect("clean seed fixtures");

        let remaining_users: i64 = sqlx::query_scalar("SELECT COUNT(1) FROM user_profile")
            .fetch_one(&pool)
            .await
            .expect("count users");
        assert_eq!(remaining_users, 0);
    }
}
