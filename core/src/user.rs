use anyhow::Result;
use chrono::Utc;
use sqlx::{Pool, Row, Sqlite, sqlite::SqliteRow};
use uuid::Uuid;

use crate::{
    db::Database,
    ids::{UserId, WorkspaceId},
};

pub const DEFAULT_MAX_WORKSPACES: i64 = 3;
pub const DEFAULT_MAX_MEMBERS: i64 = 25;

#[derive(Debug, Clone)]
pub struct UserRecord {
    pub id: UserId,
    pub email: String,
    pub name: Option<String>,
    pub max_workspaces: i64,
    pub max_members: i64,
    pub selected_workspace_id: Option<WorkspaceId>,
    pub created_at: i64,
}

#[derive(Clone)]
pub struct UserStore {
    pool: Pool<Sqlite>,
}

impl UserStore {
    pub fn new(database: &Database) -> Self {
        Self {
            pool: database.pool().clone(),
        }
    }

    fn map_row(row: SqliteRow) -> UserRecord {
        UserRecord {
            id: UserId::from(row.get::<String, _>("id")),
            email: row.get("email"),
            name: row.get("name"),
            max_workspaces: row.get("max_workspaces"),
            max_members: row.get("max_members"),
            selected_workspace_id: row
                .get::<Option<String>, _>("selected_workspace_id")
                .map(WorkspaceId::from),
            created_at: row.get("created_at"),
        }
    }

    pub async fn create(&self, email: &str, name: Option<&str>) -> Result<UserRecord> {
        let id = Uuid::new_v4().to_string();
        self.create_with_id(&id, email, name).await
    }

    /// Insert a user under an externally assigned id (identities arrive from
    /// the account system), updating the display name if the id already
    /// exists.
    pub async fn create_with_id(
        &self,
        id: &str,
        email: &str,
        name: Option<&str>,
    ) -> Result<UserRecord> {
        let created_at = Utc::now().timestamp();

        sqlx::query(
            "INSERT INTO users (id, email, name, max_workspaces, max_members, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT (id) DO UPDATE SET name = excluded.name",
        )
        .bind(id)
        .bind(email)
        .bind(name)
        .bind(DEFAULT_MAX_WORKSPACES)
        .bind(DEFAULT_MAX_MEMBERS)
        .bind(created_at)
        .execute(&self.pool)
        .await?;

        self.find_by_id(id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("user {id} missing after insert"))
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<UserRecord>> {
        let row = sqlx::query("SELECT * FROM users WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Self::map_row))
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>> {
        let row = sqlx::query("SELECT * FROM users WHERE email = ?1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Self::map_row))
    }

    pub async fn find_by_emails(&self, emails: &[String]) -> Result<Vec<UserRecord>> {
        if emails.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = std::iter::repeat("?")
            .take(emails.len())
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!("SELECT * FROM users WHERE email IN ({placeholders})");

        let mut query = sqlx::query(&sql);
        for email in emails {
            query = query.bind(email);
        }

        let rows = query.fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(Self::map_row).collect())
    }

    pub async fn set_selected_workspace(
        &self,
        user_id: &str,
        workspace_id: Option<&str>,
    ) -> Result<bool> {
        let result = sqlx::query("UPDATE users SET selected_workspace_id = ?2 WHERE id = ?1")
            .bind(user_id)
            .bind(workspace_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
