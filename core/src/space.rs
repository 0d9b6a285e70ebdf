use anyhow::{Result, anyhow};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::{Pool, Row, Sqlite, sqlite::SqliteRow};
use uuid::Uuid;

use crate::{
    db::Database,
    ids::{MemberId, SpaceId, UserId, WorkspaceId},
    membership::MemberRole,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SpaceType {
    Default,
    Custom,
}

impl SpaceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SpaceType::Default => "DEFAULT",
            SpaceType::Custom => "CUSTOM",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "DEFAULT" => Some(SpaceType::Default),
            "CUSTOM" => Some(SpaceType::Custom),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SpaceRecord {
    pub id: SpaceId,
    pub workspace_id: WorkspaceId,
    pub name: String,
    pub space_type: SpaceType,
    pub created_at: i64,
}

#[derive(Debug, Clone)]
pub struct SpaceMember {
    pub member_id: MemberId,
    pub user_id: UserId,
    pub role: MemberRole,
    pub name: Option<String>,
}

#[derive(Clone)]
pub struct SpaceStore {
    pool: Pool<Sqlite>,
}

impl SpaceStore {
    pub fn new(database: &Database) -> Self {
        Self {
            pool: database.pool().clone(),
        }
    }

    fn map_row(row: &SqliteRow) -> Result<SpaceRecord> {
        let type_raw: String = row.get("space_type");
        let space_type = SpaceType::parse(&type_raw)
            .ok_or_else(|| anyhow!("unknown space type in store: {type_raw}"))?;

        Ok(SpaceRecord {
            id: SpaceId::from(row.get::<String, _>("id")),
            workspace_id: WorkspaceId::from(row.get::<String, _>("workspace_id")),
            name: row.get("name"),
            space_type,
            created_at: row.get("created_at"),
        })
    }

    /// Create a space and grant it to the given workspace members (by user
    /// id) in the same transaction. Users without a member record in the
    /// workspace are ignored rather than failing the whole batch.
    pub async fn create_with_grants(
        &self,
        workspace_id: &str,
        name: &str,
        space_type: SpaceType,
        member_user_ids: &[String],
    ) -> Result<SpaceRecord> {
        let id = Uuid::new_v4().to_string();
        let created_at = Utc::now().timestamp();

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO spaces (id, workspace_id, name, space_type, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(&id)
        .bind(workspace_id)
        .bind(name)
        .bind(space_type.as_str())
        .bind(created_at)
        .execute(&mut *tx)
        .await?;

        for user_id in member_user_ids {
            sqlx::query(
                "INSERT OR IGNORE INTO member_spaces (member_id, space_id)
                 SELECT id, ?2 FROM members WHERE workspace_id = ?1 AND user_id = ?3",
            )
            .bind(workspace_id)
            .bind(&id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(SpaceRecord {
            id: SpaceId::from(id),
            workspace_id: WorkspaceId::from(workspace_id),
            name: name.to_owned(),
            space_type,
            created_at,
        })
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<SpaceRecord>> {
        let row = sqlx::query("SELECT * FROM spaces WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|row| Self::map_row(&row)).transpose()
    }

    /// Spaces in the workspace the user has been granted into.
    pub async fn list_for_member(
        &self,
        workspace_id: &str,
        user_id: &str,
    ) -> Result<Vec<SpaceRecord>> {
        let rows = sqlx::query(
            "SELECT s.* FROM spaces s
             JOIN member_spaces ms ON ms.space_id = s.id
             JOIN members m ON m.id = ms.member_id
             WHERE s.workspace_id = ?1 AND m.user_id = ?2
             ORDER BY s.created_at ASC",
        )
        .bind(workspace_id)
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::map_row).collect()
    }

    pub async fn update(
        &self,
        id: &str,
        name: Option<&str>,
        space_type: Option<SpaceType>,
    ) -> Result<bool> {
        if name.is_none() && space_type.is_none() {
            return Ok(false);
        }

        let mut builder = sqlx::QueryBuilder::new("UPDATE spaces SET ");
        let mut separated = false;

        if let Some(name) = name {
            builder.push("name = ");
            builder.push_bind(name);
            separated = true;
        }
        if let Some(space_type) = space_type {
            if separated {
                builder.push(", ");
            }
            builder.push("space_type = ");
            builder.push_bind(space_type.as_str());
        }

        builder.push(" WHERE id = ");
        builder.push_bind(id);

        let result = builder.build().execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn delete(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM spaces WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn list_space_members(&self, space_id: &str) -> Result<Vec<SpaceMember>> {
        let rows = sqlx::query(
            "SELECT m.id AS member_id, m.user_id, m.role, u.name
             FROM members m
             JOIN member_spaces ms ON ms.member_id = m.id
             JOIN users u ON u.id = m.user_id
             WHERE ms.space_id = ?1
             ORDER BY m.created_at ASC",
        )
        .bind(space_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                let role_raw: String = row.get("role");
                let role = MemberRole::parse(&role_raw)
                    .ok_or_else(|| anyhow!("unknown member role in store: {role_raw}"))?;
                Ok(SpaceMember {
                    member_id: MemberId::from(row.get::<String, _>("member_id")),
                    user_id: UserId::from(row.get::<String, _>("user_id")),
                    role,
                    name: row.get("name"),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db::test_util::connect_temp,
        membership::MembershipStore,
        user::UserStore,
        workspace::{WorkspaceStore, WorkspaceType},
    };

    async fn seed(database: &crate::db::Database) -> (String, String, String) {
        let users = UserStore::new(database);
        let workspaces = WorkspaceStore::new(database);
        let members = MembershipStore::new(database);

        let owner = users
            .create("owner@example.com", None)
            .await
            .expect("create owner");
        let editor = users
            .create("editor@example.com", None)
            .await
            .expect("create editor");

        let workspace = workspaces
            .create(owner.id.as_str(), "Studio", WorkspaceType::Public)
            .await
            .expect("create workspace");
        members
            .insert_member(workspace.id.as_str(), editor.id.as_str(), MemberRole::Editor)
            .await
            .expect("add editor");

        (
            workspace.id.into_inner(),
            owner.id.into_inner(),
            editor.id.into_inner(),
        )
    }

    #[tokio::test]
    async fn creation_grants_listed_members_and_skips_strangers() {
        let (_dir, database) = connect_temp().await;
        let spaces = SpaceStore::new(&database);
        let (workspace_id, owner_id, editor_id) = seed(&database).await;

        let space = spaces
            .create_with_grants(
                &workspace_id,
                "Production",
                SpaceType::Custom,
                &[
                    owner_id.clone(),
                    editor_id.clone(),
                    "not-a-member".to_owned(),
                ],
            )
            .await
            .expect("create space");

        let listed = spaces
            .list_space_members(space.id.as_str())
            .await
            .expect("list members");
        assert_eq!(listed.len(), 2);

        let owner_spaces = spaces
            .list_for_member(&workspace_id, &owner_id)
            .await
            .expect("owner spaces");
        assert_eq!(owner_spaces.len(), 1);
        assert_eq!(owner_spaces[0].id, space.id);

        // a user with no grant sees nothing
        let stranger_spaces = spaces
            .list_for_member(&workspace_id, "not-a-member")
            .await
            .expect("stranger spaces");
        assert!(stranger_spaces.is_empty());
    }

    #[tokio::test]
    async fn update_renames_and_retypes() {
        let (_dir, database) = connect_temp().await;
        let spaces = SpaceStore::new(&database);
        let (workspace_id, _, _) = seed(&database).await;

        let space = spaces
            .create_with_grants(&workspace_id, "Draft", SpaceType::Custom, &[])
            .await
            .expect("create space");

        assert!(
            spaces
                .update(space.id.as_str(), Some("Final"), Some(SpaceType::Default))
                .await
                .expect("update")
        );

        let reloaded = spaces
            .find_by_id(space.id.as_str())
            .await
            .expect("reload")
            .expect("present");
        assert_eq!(reloaded.name, "Final");
        assert_eq!(reloaded.space_type, SpaceType::Default);

        // no fields → no-op
        assert!(!spaces.update(space.id.as_str(), None, None).await.expect("noop"));
    }
}
