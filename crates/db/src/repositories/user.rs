use sqlx::Row;

use procura_core::domain::user::{Role, UserId, UserProfile};

use super::{RepositoryError, UserRepository};
use crate::DbPool;

pub struct SqlUserRepository {
    pool: DbPool,
}

impl SqlUserRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_user(row: &sqlx::sqlite::SqliteRow) -> Result<UserProfile, RepositoryError> {
    let id: String = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let username: String =
        row.try_get("username").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let role_str: String =
        row.try_get("role").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let active: i64 =
        row.try_get("active").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    let role = role_str
        .parse::<Role>()
        .map_err(|e| RepositoryError::Decode(e.to_string()))?;

    Ok(UserProfile { id: UserId(id), username, role, active: active != 0 })
}

#[async_trait::async_trait]
impl UserRepository for SqlUserRepository {
    async fn find_by_id(&self, id: &UserId) -> Result<Option<UserProfile>, RepositoryError> {
        let row = sqlx::query("SELECT id, username, role, active FROM user_profile WHERE id = ?")
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_user(r)?)),
            None => Ok(None),
        }
    }

    async fn save(&self, user: UserProfile) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO user_profile (id, username, role, active, created_at)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 username = excluded.username,
                 role = excluded.role,
                 active = excluded.active",
        )
        .bind(&user.id.0)
        .bind(&user.username)
        .bind(user.role.as_str())
        .bind(user.active as i64)
        .bind(chrono::Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
