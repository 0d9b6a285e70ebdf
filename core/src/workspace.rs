use anyhow::{Result, anyhow};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::{Pool, Row, Sqlite, sqlite::SqliteRow};
use uuid::Uuid;

use crate::{
    db::Database,
    ids::{SpaceId, UserId, WorkspaceId},
    membership::MemberRole,
    space::{SpaceRecord, SpaceType},
    user::{DEFAULT_MAX_MEMBERS, DEFAULT_MAX_WORKSPACES},
};

pub const DEFAULT_WORKSPACE_NAME: &str = "Untitled Workspace";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum WorkspaceType {
    Personal,
    Public,
}

impl WorkspaceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkspaceType::Personal => "PERSONAL",
            WorkspaceType::Public => "PUBLIC",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "PERSONAL" => Some(WorkspaceType::Personal),
            "PUBLIC" => Some(WorkspaceType::Public),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct WorkspaceRecord {
    pub id: WorkspaceId,
    pub name: String,
    pub owner_id: UserId,
    pub workspace_type: WorkspaceType,
    pub created_at: i64,
}

#[derive(Debug, Clone)]
pub struct UserWorkspace {
    pub workspace: WorkspaceRecord,
    pub role: MemberRole,
    pub owned: bool,
}

/// Everything created when a fresh user is provisioned: the personal
/// workspace and its default space.
#[derive(Debug, Clone)]
pub struct ProvisionedWorkspace {
    pub workspace: WorkspaceRecord,
    pub default_space: SpaceRecord,
}

#[derive(Clone)]
pub struct WorkspaceStore {
    pool: Pool<Sqlite>,
}

impl WorkspaceStore {
    pub fn new(database: &Database) -> Self {
        Self {
            pool: database.pool().clone(),
        }
    }

    fn map_row(row: &SqliteRow) -> Result<WorkspaceRecord> {
        let type_raw: String = row.get("workspace_type");
        let workspace_type = WorkspaceType::parse(&type_raw)
            .ok_or_else(|| anyhow!("unknown workspace type in store: {type_raw}"))?;

        Ok(WorkspaceRecord {
            id: WorkspaceId::from(row.get::<String, _>("id")),
            name: row.get("name"),
            owner_id: UserId::from(row.get::<String, _>("owner_id")),
            workspace_type,
            created_at: row.get("created_at"),
        })
    }

    fn resolved_name(name: &str) -> String {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            DEFAULT_WORKSPACE_NAME.to_owned()
        } else {
            trimmed.to_owned()
        }
    }

    /// Create a workspace and its owner's ADMIN member record in one
    /// transaction. Ownership and the role table must never disagree, so the
    /// member row is not an afterthought of the caller.
    pub async fn create(
        &self,
        owner_id: &str,
        name: &str,
        workspace_type: WorkspaceType,
    ) -> Result<WorkspaceRecord> {
        let id = Uuid::new_v4().to_string();
        let created_at = Utc::now().timestamp();
        let resolved_name = Self::resolved_name(name);

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO workspaces (id, name, owner_id, workspace_type, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(&id)
        .bind(&resolved_name)
        .bind(owner_id)
        .bind(workspace_type.as_str())
        .bind(created_at)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO members (id, workspace_id, user_id, role, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&id)
        .bind(owner_id)
        .bind(MemberRole::Admin.as_str())
        .bind(created_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(WorkspaceRecord {
            id: WorkspaceId::from(id),
            name: resolved_name,
            owner_id: UserId::from(owner_id),
            workspace_type,
            created_at,
        })
    }

    /// Provision a freshly verified account: upsert the user, create their
    /// personal workspace with a default space, grant the owner's ADMIN
    /// member into it and remember the selection. All or nothing.
    pub async fn provision_personal(
        &self,
        user_id: &str,
        email: &str,
        display_name: Option<&str>,
    ) -> Result<ProvisionedWorkspace> {
        let created_at = Utc::now().timestamp();
        let workspace_id = Uuid::new_v4().to_string();
        let space_id = Uuid::new_v4().to_string();
        let member_id = Uuid::new_v4().to_string();
        let workspace_name = match display_name {
            Some(name) if !name.trim().is_empty() => format!("{}'s Workspace", name.trim()),
            _ => DEFAULT_WORKSPACE_NAME.to_owned(),
        };

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO users (id, email, name, max_workspaces, max_members, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT (id) DO UPDATE SET name = excluded.name",
        )
        .bind(user_id)
        .bind(email)
        .bind(display_name)
        .bind(DEFAULT_MAX_WORKSPACES)
        .bind(DEFAULT_MAX_MEMBERS)
        .bind(created_at)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO workspaces (id, name, owner_id, workspace_type, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(&workspace_id)
        .bind(&workspace_name)
        .bind(user_id)
        .bind(WorkspaceType::Personal.as_str())
        .bind(created_at)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO spaces (id, workspace_id, name, space_type, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(&space_id)
        .bind(&workspace_id)
        .bind(&workspace_name)
        .bind(SpaceType::Default.as_str())
        .bind(created_at)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO members (id, workspace_id, user_id, role, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(&member_id)
        .bind(&workspace_id)
        .bind(user_id)
        .bind(MemberRole::Admin.as_str())
        .bind(created_at)
        .execute(&mut *tx)
        .await?;

        sqlx::query("INSERT INTO member_spaces (member_id, space_id) VALUES (?1, ?2)")
            .bind(&member_id)
            .bind(&space_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("UPDATE users SET selected_workspace_id = ?2 WHERE id = ?1")
            .bind(user_id)
            .bind(&workspace_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(ProvisionedWorkspace {
            workspace: WorkspaceRecord {
                id: WorkspaceId::from(workspace_id.clone()),
                name: workspace_name.clone(),
                owner_id: UserId::from(user_id),
                workspace_type: WorkspaceType::Personal,
                created_at,
            },
            default_space: SpaceRecord {
                id: SpaceId::from(space_id),
                workspace_id: WorkspaceId::from(workspace_id),
                name: workspace_name,
                space_type: SpaceType::Default,
                created_at,
            },
        })
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<WorkspaceRecord>> {
        let row = sqlx::query("SELECT * FROM workspaces WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|row| Self::map_row(&row)).transpose()
    }

    /// Workspaces the user belongs to, flagged with ownership. Membership is
    /// the access source of truth, so this joins through members rather than
    /// unioning on the owner column.
    pub async fn list_for_user(&self, user_id: &str) -> Result<Vec<UserWorkspace>> {
        let rows = sqlx::query(
            "SELECT w.*, m.role AS member_role FROM workspaces w
             JOIN members m ON m.workspace_id = w.id
             WHERE m.user_id = ?1
             ORDER BY w.created_at ASC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                let workspace = Self::map_row(&row)?;
                let role_raw: String = row.get("member_role");
                let role = MemberRole::parse(&role_raw)
                    .ok_or_else(|| anyhow!("unknown member role in store: {role_raw}"))?;
                let owned = workspace.owner_id.as_str() == user_id;
                Ok(UserWorkspace {
                    workspace,
                    role,
                    owned,
                })
            })
            .collect()
    }

    pub async fn count_owned_by(&self, user_id: &str) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM workspaces WHERE owner_id = ?1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    pub async fn update_name(&self, id: &str, name: &str) -> Result<bool> {
        let result = sqlx::query("UPDATE workspaces SET name = ?2 WHERE id = ?1")
            .bind(id)
            .bind(Self::resolved_name(name))
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn delete(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM workspaces WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
