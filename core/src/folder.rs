use anyhow::{Result, anyhow};
use chrono::Utc;
use sqlx::{Pool, Row, Sqlite, sqlite::SqliteRow};
use uuid::Uuid;

use crate::{
    db::Database,
    ids::{FolderId, SpaceId, WorkspaceId},
};

pub const DEFAULT_FOLDER_NAME: &str = "Untitled Folder";

/// Upper bound on parent walks. Hierarchies deeper than this are treated as
/// corrupt rather than traversed forever.
pub const MAX_FOLDER_DEPTH: usize = 64;

#[derive(Debug, Clone)]
pub struct FolderRecord {
    pub id: FolderId,
    pub workspace_id: WorkspaceId,
    pub space_id: Option<SpaceId>,
    pub parent_folder_id: Option<FolderId>,
    pub name: String,
    pub created_at: i64,
}

/// Where a folder lands after a move. At most one pointer is set; the store
/// clears the other in the same statement.
#[derive(Debug, Clone)]
pub enum FolderPlacement {
    Parent(FolderId),
    Space(SpaceId),
    WorkspaceRoot,
}

#[derive(Clone)]
pub struct FolderStore {
    pool: Pool<Sqlite>,
}

impl FolderStore {
    pub fn new(database: &Database) -> Self {
        Self {
            pool: database.pool().clone(),
        }
    }

    fn map_row(row: &SqliteRow) -> FolderRecord {
        FolderRecord {
            id: FolderId::from(row.get::<String, _>("id")),
            workspace_id: WorkspaceId::from(row.get::<String, _>("workspace_id")),
            space_id: row.get::<Option<String>, _>("space_id").map(SpaceId::from),
            parent_folder_id: row
                .get::<Option<String>, _>("parent_folder_id")
                .map(FolderId::from),
            name: row.get("name"),
            created_at: row.get("created_at"),
        }
    }

    pub async fn create(
        &self,
        workspace_id: &str,
        space_id: Option<&str>,
        parent_folder_id: Option<&str>,
        name: &str,
    ) -> Result<FolderRecord> {
        let id = Uuid::new_v4().to_string();
        let created_at = Utc::now().timestamp();
        let name = if name.trim().is_empty() {
            DEFAULT_FOLDER_NAME
        } else {
            name.trim()
        };

        sqlx::query(
            "INSERT INTO folders (id, workspace_id, space_id, parent_folder_id, name, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )
        .bind(&id)
        .bind(workspace_id)
        .bind(space_id)
        .bind(parent_folder_id)
        .bind(name)
        .bind(created_at)
        .execute(&self.pool)
        .await?;

        Ok(FolderRecord {
            id: FolderId::from(id),
            workspace_id: WorkspaceId::from(workspace_id),
            space_id: space_id.map(SpaceId::from),
            parent_folder_id: parent_folder_id.map(FolderId::from),
            name: name.to_owned(),
            created_at,
        })
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<FolderRecord>> {
        let row = sqlx::query("SELECT * FROM folders WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(Self::map_row))
    }

    /// Direct children of a parent folder, or roots of a space, or library
    /// roots of the workspace when neither is given.
    pub async fn list_children(
        &self,
        workspace_id: &str,
        parent_folder_id: Option<&str>,
        space_id: Option<&str>,
    ) -> Result<Vec<FolderRecord>> {
        let rows = sqlx::query(
            "SELECT * FROM folders
             WHERE workspace_id = ?1
               AND parent_folder_id IS ?2
               AND space_id IS ?3
             ORDER BY created_at DESC",
        )
        .bind(workspace_id)
        .bind(parent_folder_id)
        .bind(space_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(Self::map_row).collect())
    }

    pub async fn rename(&self, id: &str, name: &str) -> Result<bool> {
        let result = sqlx::query("UPDATE folders SET name = ?2 WHERE id = ?1")
            .bind(id)
            .bind(name.trim())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Delete a folder together with every descendant. A single recursive
    /// statement keeps the subtree removal atomic.
    pub async fn delete_subtree(&self, id: &str) -> Result<u64> {
        let result = sqlx::query(
            "WITH RECURSIVE subtree (id) AS (
                 SELECT id FROM folders WHERE id = ?1
                 UNION ALL
                 SELECT f.id FROM folders f JOIN subtree s ON f.parent_folder_id = s.id
             )
             DELETE FROM folders WHERE id IN (SELECT id FROM subtree)",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Re-anchor the folder. Exactly one of the two container pointers
    /// survives (or neither, for the workspace root); one UPDATE keeps the
    /// invariant from ever being observable half-applied.
    pub async fn set_placement(&self, id: &str, placement: &FolderPlacement) -> Result<bool> {
        let (parent, space): (Option<&str>, Option<&str>) = match placement {
            FolderPlacement::Parent(parent_id) => (Some(parent_id.as_str()), None),
            FolderPlacement::Space(space_id) => (None, Some(space_id.as_str())),
            FolderPlacement::WorkspaceRoot => (None, None),
        };

        let result =
            sqlx::query("UPDATE folders SET parent_folder_id = ?2, space_id = ?3 WHERE id = ?1")
                .bind(id)
                .bind(parent)
                .bind(space)
                .execute(&self.pool)
                .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Ancestor chain from the root down to the folder itself, one store
    /// round-trip per step, bounded by [`MAX_FOLDER_DEPTH`].
    pub async fn ancestors(&self, folder_id: &str) -> Result<Vec<FolderRecord>> {
        let mut chain = Vec::new();
        let mut current = self.find_by_id(folder_id).await?;

        while let Some(folder) = current {
            if chain.len() >= MAX_FOLDER_DEPTH {
                return Err(anyhow!(
                    "folder hierarchy exceeds maximum depth of {MAX_FOLDER_DEPTH}"
                ));
            }

            let parent_id = folder.parent_folder_id.clone();
            chain.push(folder);

            current = match parent_id {
                Some(parent_id) => self.find_by_id(parent_id.as_str()).await?,
                None => None,
            };
        }

        chain.reverse();
        Ok(chain)
    }

    /// Whether `candidate_id` lies inside the subtree rooted at `root_id`
    /// (including the root itself). Used to reject moves that would make a
    /// folder its own ancestor.
    pub async fn is_in_subtree(&self, root_id: &str, candidate_id: &str) -> Result<bool> {
        if root_id == candidate_id {
            return Ok(true);
        }

        let count: i64 = sqlx::query_scalar(
            "WITH RECURSIVE chain (id, parent_folder_id, depth) AS (
                 SELECT id, parent_folder_id, 0 FROM folders WHERE id = ?1
                 UNION ALL
                 SELECT f.id, f.parent_folder_id, c.depth + 1
                 FROM folders f JOIN chain c ON f.id = c.parent_folder_id
                 WHERE c.depth < ?3
             )
             SELECT COUNT(*) FROM chain WHERE id = ?2",
        )
        .bind(candidate_id)
        .bind(root_id)
        .bind(MAX_FOLDER_DEPTH as i64)
        .fetch_one(&self.pool)
        .await?;

        Ok(count > 0)
    }
}
