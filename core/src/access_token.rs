use anyhow::Result;
use chrono::Utc;
use sqlx::{Pool, Row, Sqlite, sqlite::SqliteRow};
use uuid::Uuid;

use crate::{db::Database, ids::UserId};

#[derive(Debug, Clone)]
pub struct AccessTokenRecord {
    pub id: String,
    pub user_id: UserId,
    pub name: String,
    pub token: Option<String>,
    pub created_at: i64,
    pub expires_at: Option<i64>,
}

#[derive(Clone)]
pub struct AccessTokenStore {
    pool: Pool<Sqlite>,
}

impl AccessTokenStore {
    pub fn new(database: &Database) -> Self {
        Self {
            pool: database.pool().clone(),
        }
    }

    fn map_row(row: &SqliteRow, include_token: bool) -> AccessTokenRecord {
        AccessTokenRecord {
            id: row.get("id"),
            user_id: UserId::from(row.get::<String, _>("user_id")),
            name: row.get("name"),
            token: include_token.then(|| row.get("token")),
            created_at: row.get("created_at"),
            expires_at: row.get("expires_at"),
        }
    }

    pub async fn create(
        &self,
        user_id: &str,
        name: &str,
        expires_at: Option<i64>,
    ) -> Result<AccessTokenRecord> {
        let id = Uuid::new_v4().to_string();
        let token = generate_token();
        let created_at = Utc::now().timestamp();

        sqlx::query(
            "INSERT INTO access_tokens (id, user_id, name, token, created_at, expires_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )
        .bind(&id)
        .bind(user_id)
        .bind(name)
        .bind(&token)
        .bind(created_at)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;

        Ok(AccessTokenRecord {
            id,
            user_id: UserId::from(user_id),
            name: name.to_owned(),
            token: Some(token),
            created_at,
            expires_at,
        })
    }

    /// Tokens for a user, with the secret value redacted.
    pub async fn list(&self, user_id: &str) -> Result<Vec<AccessTokenRecord>> {
        let rows = sqlx::query(
            "SELECT * FROM access_tokens WHERE user_id = ?1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(|row| Self::map_row(row, false)).collect())
    }

    pub async fn find_active_by_token(&self, token: &str) -> Result<Option<AccessTokenRecord>> {
        let now = Utc::now().timestamp();
        let row = sqlx::query(
            "SELECT * FROM access_tokens
             WHERE token = ?1 AND (expires_at IS NULL OR expires_at > ?2)",
        )
        .bind(token)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| Self::map_row(&row, true)))
    }

    pub async fn revoke(&self, id: &str, user_id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM access_tokens WHERE id = ?1 AND user_id = ?2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

fn generate_token() -> String {
    let mut token = format!("cd_{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple());
    token.truncate(40);
    token
}
