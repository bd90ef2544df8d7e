use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::Row;

use procura_core::domain::action::{ActionId, ApprovalAction, Decision};
use procura_core::domain::request::{PurchaseRequest, RequestId, RequestStatus};
use procura_core::domain::user::{Role, UserId};

use super::{RepositoryError, RequestRepository};
use crate::DbPool;

pub struct SqlRequestRepository {
    pool: DbPool,
}

impl SqlRequestRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn parse_status(s: &str) -> Result<RequestStatus, RepositoryError> {
    match s {
        "draft" => Ok(RequestStatus::Draft),
        "submitted" => Ok(RequestStatus::Submitted),
        "pending_approval" => Ok(RequestStatus::PendingApproval),
        "approved" => Ok(RequestStatus::Approved),
        "rejected" => Ok(RequestStatus::Rejected),
        "cancelled" => Ok(RequestStatus::Cancelled),
        other => Err(RepositoryError::Decode(format!("unknown request status `{other}`"))),
    }
}

fn parse_decision(s: &str) -> Result<Decision, RepositoryError> {
    match s {
        "submitted" => Ok(Decision::Submitted),
        "approved" => Ok(Decision::Approved),
        "rejected" => Ok(Decision::Rejected),
        "cancelled" => Ok(Decision::Cancelled),
        "admin_override" => Ok(Decision::AdminOverride),
        other => Err(RepositoryError::Decode(format!("unknown decision `{other}`"))),
    }
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Decode(format!("bad timestamp `{s}`: {e}")))
}

fn parse_level_roles(raw: &str) -> Result<Vec<Role>, RepositoryError> {
    let names: Vec<String> =
        serde_json::from_str(raw).map_err(|e| RepositoryError::Decode(e.to_string()))?;
    names
        .iter()
        .map(|name| name.parse::<Role>().map_err(|e| RepositoryError::Decode(e.to_string())))
        .collect()
}

fn level_roles_json(roles: &[Role]) -> Result<String, RepositoryError> {
    let names: Vec<&str> = roles.iter().map(Role::as_str).collect();
    serde_json::to_string(&names).map_err(|e| RepositoryError::Decode(e.to_string()))
}

fn row_to_request(row: &sqlx::sqlite::SqliteRow) -> Result<PurchaseRequest, RepositoryError> {
    let id: String = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let title: String =
        row.try_get("title").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let description: String =
        row.try_get("description").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let amount_str: String =
        row.try_get("amount").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let currency: String =
        row.try_get("currency").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let request_type: String =
        row.try_get("request_type").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let requester_id: String =
        row.try_get("requester_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let status_str: String =
        row.try_get("status").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let level_roles_str: String =
        row.try_get("level_roles").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let current_level: i64 =
        row.try_get("current_level").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let version: i64 =
        row.try_get("version").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let created_at_str: String =
        row.try_get("created_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let submitted_at_str: Option<String> =
        row.try_get("submitted_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let updated_at_str: String =
        row.try_get("updated_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    let amount = amount_str
        .parse::<Decimal>()
        .map_err(|e| RepositoryError::Decode(format!("bad amount `{amount_str}`: {e}")))?;

    Ok(PurchaseRequest {
        id: RequestId(id),
        title,
        description,
        amount,
        currency,
        request_type,
        requester: UserId(requester_id),
        status: parse_status(&status_str)?,
        level_roles: parse_level_roles(&level_roles_str)?,
        current_level: current_level as u32,
        version,
        created_at: parse_timestamp(&created_at_str)?,
        submitted_at: submitted_at_str.as_deref().map(parse_timestamp).transpose()?,
        updated_at: parse_timestamp(&updated_at_str)?,
    })
}

fn row_to_action(row: &sqlx::sqlite::SqliteRow) -> Result<ApprovalAction, RepositoryError> {
    let id: String = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let request_id: String =
        row.try_get("request_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let actor_id: String =
        row.try_get("actor_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let level: Option<i64> =
        row.try_get("level").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let decision_str: String =
        row.try_get("decision").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let comment: Option<String> =
        row.try_get("comment").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let recorded_at_str: String =
        row.try_get("recorded_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    Ok(ApprovalAction {
        id: ActionId(id),
        request_id: RequestId(request_id),
        actor: UserId(actor_id),
        level: level.map(|l| l as u32),
        decision: parse_decision(&decision_str)?,
        comment,
        recorded_at: parse_timestamp(&recorded_at_str)?,
    })
}

const REQUEST_COLUMNS: &str = "id, title, description, amount, currency, request_type, \
     requester_id, status, level_roles, current_level, version, \
     created_at, submitted_at, updated_at";

#[async_trait::async_trait]
impl RequestRepository for SqlRequestRepository {
    async fn find_by_id(
        &self,
        id: &RequestId,
    ) -> Result<Option<PurchaseRequest>, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {REQUEST_COLUMNS} FROM purchase_request WHERE id = ?"
        ))
        .bind(&id.0)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_request(r)?)),
            None => Ok(None),
        }
    }

    async fn create(&self, request: PurchaseRequest) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO purchase_request (id, title, description, amount, currency,
                                           request_type, requester_id, status, level_roles,
                                           current_level, version, created_at, submitted_at,
                                           updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&request.id.0)
        .bind(&request.title)
        .bind(&request.description)
        .bind(request.amount.to_string())
        .bind(&request.currency)
        .bind(&request.request_type)
        .bind(&request.requester.0)
        .bind(request.status.as_str())
        .bind(level_roles_json(&request.level_roles)?)
        .bind(request.current_level as i64)
        .bind(request.version)
        .bind(request.created_at.to_rfc3339())
        .bind(request.submitted_at.map(|dt| dt.to_rfc3339()))
        .bind(request.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn save_transition(
        &self,
        request: PurchaseRequest,
        expected_version: i64,
        audit: ApprovalAction,
    ) -> Result<PurchaseRequest, RepositoryError> {
        let mut saved = request;
        saved.version = expected_version + 1;

        let mut tx = self.pool.begin().await?;

        // Version-guarded update: zero affected rows means another
        // transition won the race since this state was loaded.
        let updated = sqlx::query(
            "UPDATE purchase_request
             SET status = ?, level_roles = ?, current_level = ?, version = ?,
                 submitted_at = ?, updated_at = ?
             WHERE id = ? AND version = ?",
        )
        .bind(saved.status.as_str())
        .bind(level_roles_json(&saved.level_roles)?)
        .bind(saved.current_level as i64)
        .bind(saved.version)
        .bind(saved.submitted_at.map(|dt| dt.to_rfc3339()))
        .bind(saved.updated_at.to_rfc3339())
        .bind(&saved.id.0)
        .bind(expected_version)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(RepositoryError::Conflict { request_id: saved.id.0 });
        }

        sqlx::query(
            "INSERT INTO approval_action (id, request_id, actor_id, level, decision,
                                          comment, recorded_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&audit.id.0)
        .bind(&audit.request_id.0)
        .bind(&audit.actor.0)
        .bind(audit.level.map(|l| l as i64))
        .bind(audit.decision.as_str())
        .bind(&audit.comment)
        .bind(audit.recorded_at.to_rfc3339())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(saved)
    }

    async fn history(&self, id: &RequestId) -> Result<Vec<ApprovalAction>, RepositoryError> {
        let rows: Vec<sqlx::sqlite::SqliteRow> = sqlx::query(
            "SELECT id, request_id, actor_id, level, decision, comment, recorded_at
             FROM approval_action
             WHERE request_id = ?
             ORDER BY recorded_at ASC, rowid ASC",
        )
        .bind(&id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_action).collect()
    }

    async fn list_by_status(
        &self,
        status: RequestStatus,
    ) -> Result<Vec<PurchaseRequest>, RepositoryError> {
        let rows: Vec<sqlx::sqlite::SqliteRow> = sqlx::query(&format!(
            "SELECT {REQUEST_COLUMNS} FROM purchase_request
             WHERE status = ? ORDER BY created_at ASC"
        ))
        .bind(status.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_request).collect()
    }
}
