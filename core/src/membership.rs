use anyhow::{Result, anyhow};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::{Pool, Row, Sqlite, sqlite::SqliteRow};
use uuid::Uuid;

use crate::{
    db::Database,
    ids::{MemberId, SpaceId, UserId, WorkspaceId},
};

/// Closed role set. The member record is the sole source of role truth; any
/// comparison goes through this enum, never through raw strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MemberRole {
    Admin,
    Editor,
    Viewer,
}

impl MemberRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MemberRole::Admin => "ADMIN",
            MemberRole::Editor => "EDITOR",
            MemberRole::Viewer => "VIEWER",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "ADMIN" => Some(MemberRole::Admin),
            "EDITOR" => Some(MemberRole::Editor),
            "VIEWER" => Some(MemberRole::Viewer),
            _ => None,
        }
    }
}

impl std::fmt::Display for MemberRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct MemberRecord {
    pub id: MemberId,
    pub workspace_id: WorkspaceId,
    pub user_id: UserId,
    pub role: MemberRole,
    pub created_at: i64,
    /// Spaces this member has been explicitly granted into.
    pub space_ids: Vec<SpaceId>,
}

impl MemberRecord {
    pub fn has_space_access(&self, space_id: &str) -> bool {
        self.space_ids.iter().any(|id| id.as_str() == space_id)
    }
}

#[derive(Debug, Clone)]
pub struct MemberWithUser {
    pub member_id: MemberId,
    pub user_id: UserId,
    pub role: MemberRole,
    pub email: String,
    pub name: Option<String>,
    pub created_at: i64,
}

#[derive(Clone)]
pub struct MembershipStore {
    pool: Pool<Sqlite>,
}

impl MembershipStore {
    pub fn new(database: &Database) -> Self {
        Self {
            pool: database.pool().clone(),
        }
    }

    fn map_member_row(row: &SqliteRow) -> Result<MemberRecord> {
        let role_raw: String = row.get("role");
        let role = MemberRole::parse(&role_raw)
            .ok_or_else(|| anyhow!("unknown member role in store: {role_raw}"))?;

        Ok(MemberRecord {
            id: MemberId::from(row.get::<String, _>("id")),
            workspace_id: WorkspaceId::from(row.get::<String, _>("workspace_id")),
            user_id: UserId::from(row.get::<String, _>("user_id")),
            role,
            created_at: row.get("created_at"),
            space_ids: Vec::new(),
        })
    }

    async fn load_space_grants(&self, member: &mut MemberRecord) -> Result<()> {
        let rows = sqlx::query("SELECT space_id FROM member_spaces WHERE member_id = ?1")
            .bind(member.id.as_str())
            .fetch_all(&self.pool)
            .await?;

        member.space_ids = rows
            .into_iter()
            .map(|row| SpaceId::from(row.get::<String, _>("space_id")))
            .collect();
        Ok(())
    }

    pub async fn find_member(
        &self,
        workspace_id: &str,
        user_id: &str,
    ) -> Result<Option<MemberRecord>> {
        let row = sqlx::query("SELECT * FROM members WHERE workspace_id = ?1 AND user_id = ?2")
            .bind(workspace_id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let mut member = Self::map_member_row(&row)?;
        self.load_space_grants(&mut member).await?;
        Ok(Some(member))
    }

    pub async fn find_member_by_id(&self, member_id: &str) -> Result<Option<MemberRecord>> {
        let row = sqlx::query("SELECT * FROM members WHERE id = ?1")
            .bind(member_id)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let mut member = Self::map_member_row(&row)?;
        self.load_space_grants(&mut member).await?;
        Ok(Some(member))
    }

    /// Membership constrained to an explicit space grant. Returns `None` when
    /// the user is a workspace member but was never provisioned into the
    /// space.
    pub async fn find_member_with_space_access(
        &self,
        workspace_id: &str,
        user_id: &str,
        space_id: &str,
    ) -> Result<Option<MemberRecord>> {
        let row = sqlx::query(
            "SELECT m.* FROM members m
             JOIN member_spaces ms ON ms.member_id = m.id
             WHERE m.workspace_id = ?1 AND m.user_id = ?2 AND ms.space_id = ?3",
        )
        .bind(workspace_id)
        .bind(user_id)
        .bind(space_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let mut member = Self::map_member_row(&row)?;
        self.load_space_grants(&mut member).await?;
        Ok(Some(member))
    }

    /// Reverse lookup used when the caller only knows a space id: space →
    /// owning workspace → member with a grant into the space.
    pub async fn find_member_by_space(
        &self,
        space_id: &str,
        user_id: &str,
    ) -> Result<Option<MemberRecord>> {
        let row = sqlx::query(
            "SELECT m.* FROM members m
             JOIN spaces s ON s.workspace_id = m.workspace_id
             JOIN member_spaces ms ON ms.member_id = m.id AND ms.space_id = s.id
             WHERE s.id = ?1 AND m.user_id = ?2",
        )
        .bind(space_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let mut member = Self::map_member_row(&row)?;
        self.load_space_grants(&mut member).await?;
        Ok(Some(member))
    }

    pub async fn list_members(&self, workspace_id: &str) -> Result<Vec<MemberWithUser>> {
        let rows = sqlx::query(
            "SELECT m.id AS member_id, m.user_id, m.role, m.created_at, u.email, u.name
             FROM members m
             JOIN users u ON u.id = m.user_id
             WHERE m.workspace_id = ?1
             ORDER BY m.created_at ASC",
        )
        .bind(workspace_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                let role_raw: String = row.get("role");
                let role = MemberRole::parse(&role_raw)
                    .ok_or_else(|| anyhow!("unknown member role in store: {role_raw}"))?;
                Ok(MemberWithUser {
                    member_id: MemberId::from(row.get::<String, _>("member_id")),
                    user_id: UserId::from(row.get::<String, _>("user_id")),
                    role,
                    email: row.get("email"),
                    name: row.get("name"),
                    created_at: row.get("created_at"),
                })
            })
            .collect()
    }

    pub async fn count_members(&self, workspace_id: &str) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM members WHERE workspace_id = ?1")
            .bind(workspace_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    pub async fn insert_member(
        &self,
        workspace_id: &str,
        user_id: &str,
        role: MemberRole,
    ) -> Result<MemberRecord> {
        let id = Uuid::new_v4().to_string();
        let created_at = Utc::now().timestamp();

        sqlx::query(
            "INSERT INTO members (id, workspace_id, user_id, role, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(&id)
        .bind(workspace_id)
        .bind(user_id)
        .bind(role.as_str())
        .bind(created_at)
        .execute(&self.pool)
        .await?;

        Ok(MemberRecord {
            id: MemberId::from(id),
            workspace_id: WorkspaceId::from(workspace_id),
            user_id: UserId::from(user_id),
            role,
            created_at,
            space_ids: Vec::new(),
        })
    }

    /// Conditional role update keyed on the role the caller last observed, so
    /// a concurrent change between check and act surfaces as zero rows
    /// instead of silently overwriting.
    pub async fn update_member_role_checked(
        &self,
        member_id: &str,
        expected_role: MemberRole,
        new_role: MemberRole,
    ) -> Result<bool> {
        let result = sqlx::query("UPDATE members SET role = ?3 WHERE id = ?1 AND role = ?2")
            .bind(member_id)
            .bind(expected_role.as_str())
            .bind(new_role.as_str())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn remove_member(&self, member_id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM members WHERE id = ?1")
            .bind(member_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn remove_member_by_user(&self, workspace_id: &str, user_id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM members WHERE workspace_id = ?1 AND user_id = ?2")
            .bind(workspace_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Idempotent space grant; returns `false` when the grant already existed.
    pub async fn grant_space(&self, member_id: &str, space_id: &str) -> Result<bool> {
        let result = sqlx::query(
            "INSERT OR IGNORE INTO member_spaces (member_id, space_id) VALUES (?1, ?2)",
        )
        .bind(member_id)
        .bind(space_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn revoke_space(&self, member_id: &str, space_id: &str) -> Result<bool> {
        let result =
            sqlx::query("DELETE FROM member_spaces WHERE member_id = ?1 AND space_id = ?2")
                .bind(member_id)
                .bind(space_id)
                .execute(&self.pool)
                .await?;

        Ok(result.rows_affected() > 0)
    }
}
