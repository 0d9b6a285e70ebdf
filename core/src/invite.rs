use anyhow::{Result, anyhow};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::{Row, Sqlite, pool::Pool, sqlite::SqliteRow};
use uuid::Uuid;

use crate::{
    db::Database,
    ids::{InviteId, MemberId, UserId, WorkspaceId},
    membership::{MemberRecord, MemberRole},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum InviteStatus {
    Pending,
    Accepted,
    Rejected,
}

impl InviteStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InviteStatus::Pending => "PENDING",
            InviteStatus::Accepted => "ACCEPTED",
            InviteStatus::Rejected => "REJECTED",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "PENDING" => Some(InviteStatus::Pending),
            "ACCEPTED" => Some(InviteStatus::Accepted),
            "REJECTED" => Some(InviteStatus::Rejected),
            _ => None,
        }
    }
}

/// Invites are an audit trail: they move to a terminal status but are never
/// deleted.
#[derive(Debug, Clone)]
pub struct InviteRecord {
    pub id: InviteId,
    pub workspace_id: WorkspaceId,
    pub sender_id: UserId,
    pub receiver_id: Option<UserId>,
    pub receiver_email: String,
    pub role: MemberRole,
    pub status: InviteStatus,
    pub created_at: i64,
    pub resolved_at: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct InviteTarget {
    pub email: String,
    pub user_id: Option<UserId>,
}

#[derive(Debug)]
pub enum AcceptOutcome {
    Accepted {
        invite: InviteRecord,
        member: MemberRecord,
    },
    /// The receiver already holds a member record; nothing was written.
    AlreadyMember,
    AlreadyResolved(InviteStatus),
    /// The invited email has no registered account yet.
    ReceiverUnregistered,
    NotFound,
}

#[derive(Debug)]
pub enum DeclineOutcome {
    Declined(InviteRecord),
    AlreadyResolved(InviteStatus),
    NotFound,
}

#[derive(Clone)]
pub struct InviteStore {
    pool: Pool<Sqlite>,
}

impl InviteStore {
    pub fn new(database: &Database) -> Self {
        Self {
            pool: database.pool().clone(),
        }
    }

    fn map_row(row: &SqliteRow) -> Result<InviteRecord> {
        let status_raw: String = row.get("status");
        let status = InviteStatus::parse(&status_raw)
            .ok_or_else(|| anyhow!("unknown invite status in store: {status_raw}"))?;
        let role_raw: String = row.get("role");
        let role = MemberRole::parse(&role_raw)
            .ok_or_else(|| anyhow!("unknown invite role in store: {role_raw}"))?;

        Ok(InviteRecord {
            id: InviteId::from(row.get::<String, _>("id")),
            workspace_id: WorkspaceId::from(row.get::<String, _>("workspace_id")),
            sender_id: UserId::from(row.get::<String, _>("sender_id")),
            receiver_id: row.get::<Option<String>, _>("receiver_id").map(UserId::from),
            receiver_email: row.get("receiver_email"),
            role,
            status,
            created_at: row.get("created_at"),
            resolved_at: row.get("resolved_at"),
        })
    }

    /// Create PENDING invites for the targets that need one. Existing
    /// members and emails that already hold a PENDING invite for the
    /// workspace are skipped, so repeated invitations never pile up
    /// duplicate records.
    pub async fn create_pending_batch(
        &self,
        workspace_id: &str,
        sender_id: &str,
        role: MemberRole,
        targets: &[InviteTarget],
    ) -> Result<Vec<InviteRecord>> {
        let created_at = Utc::now().timestamp();
        let mut created = Vec::new();

        let mut tx = self.pool.begin().await?;

        for target in targets {
            if let Some(user_id) = &target.user_id {
                let member_exists: i64 = sqlx::query_scalar(
                    "SELECT COUNT(*) FROM members WHERE workspace_id = ?1 AND user_id = ?2",
                )
                .bind(workspace_id)
                .bind(user_id.as_str())
                .fetch_one(&mut *tx)
                .await?;

                if member_exists > 0 {
                    continue;
                }
            }

            let pending_exists: i64 = sqlx::query_scalar(
                "SELECT COUNT(*) FROM invites
                 WHERE workspace_id = ?1 AND receiver_email = ?2 AND status = 'PENDING'",
            )
            .bind(workspace_id)
            .bind(&target.email)
            .fetch_one(&mut *tx)
            .await?;

            if pending_exists > 0 {
                continue;
            }

            let id = Uuid::new_v4().to_string();
            sqlx::query(
                "INSERT INTO invites
                     (id, workspace_id, sender_id, receiver_id, receiver_email, role, status, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, 'PENDING', ?7)",
            )
            .bind(&id)
            .bind(workspace_id)
            .bind(sender_id)
            .bind(target.user_id.as_ref().map(|id| id.as_str()))
            .bind(&target.email)
            .bind(role.as_str())
            .bind(created_at)
            .execute(&mut *tx)
            .await?;

            created.push(InviteRecord {
                id: InviteId::from(id),
                workspace_id: WorkspaceId::from(workspace_id),
                sender_id: UserId::from(sender_id),
                receiver_id: target.user_id.clone(),
                receiver_email: target.email.clone(),
                role,
                status: InviteStatus::Pending,
                created_at,
                resolved_at: None,
            });
        }

        tx.commit().await?;
        Ok(created)
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<InviteRecord>> {
        let row = sqlx::query("SELECT * FROM invites WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|row| Self::map_row(&row)).transpose()
    }

    pub async fn list_for_workspace(&self, workspace_id: &str) -> Result<Vec<InviteRecord>> {
        let rows = sqlx::query(
            "SELECT * FROM invites WHERE workspace_id = ?1 ORDER BY created_at DESC",
        )
        .bind(workspace_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::map_row).collect()
    }

    /// Accept an invite: resolve the receiver (falling back to an email
    /// lookup and back-filling pending invites for that address), mark the
    /// invite ACCEPTED and insert the member record — one transaction, so a
    /// member can never appear without the invite flipping status.
    pub async fn accept(&self, invite_id: &str) -> Result<AcceptOutcome> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query("SELECT * FROM invites WHERE id = ?1")
            .bind(invite_id)
            .fetch_optional(&mut *tx)
            .await?;

        let Some(row) = row else {
            return Ok(AcceptOutcome::NotFound);
        };
        let invite = Self::map_row(&row)?;

        if invite.status != InviteStatus::Pending {
            return Ok(AcceptOutcome::AlreadyResolved(invite.status));
        }

        let receiver_id = match &invite.receiver_id {
            Some(id) => id.clone(),
            None => {
                // the receiver may have registered after the invite was sent
                let found: Option<String> = sqlx::query_scalar("SELECT id FROM users WHERE email = ?1")
                    .bind(&invite.receiver_email)
                    .fetch_optional(&mut *tx)
                    .await?;

                let Some(found) = found else {
                    return Ok(AcceptOutcome::ReceiverUnregistered);
                };

                sqlx::query(
                    "UPDATE invites SET receiver_id = ?2
                     WHERE receiver_email = ?1 AND receiver_id IS NULL",
                )
                .bind(&invite.receiver_email)
                .bind(&found)
                .execute(&mut *tx)
                .await?;

                UserId::from(found)
            }
        };

        let member_exists: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM members WHERE workspace_id = ?1 AND user_id = ?2",
        )
        .bind(invite.workspace_id.as_str())
        .bind(receiver_id.as_str())
        .fetch_one(&mut *tx)
        .await?;

        if member_exists > 0 {
            return Ok(AcceptOutcome::AlreadyMember);
        }

        let resolved_at = Utc::now().timestamp();
        sqlx::query("UPDATE invites SET status = 'ACCEPTED', resolved_at = ?2 WHERE id = ?1")
            .bind(invite_id)
            .bind(resolved_at)
            .execute(&mut *tx)
            .await?;

        let member_id = Uuid::new_v4().to_string();
        sqlx::query(
            "INSERT INTO members (id, workspace_id, user_id, role, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(&member_id)
        .bind(invite.workspace_id.as_str())
        .bind(receiver_id.as_str())
        .bind(invite.role.as_str())
        .bind(resolved_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        let member = MemberRecord {
            id: MemberId::from(member_id),
            workspace_id: invite.workspace_id.clone(),
            user_id: receiver_id.clone(),
            role: invite.role,
            created_at: resolved_at,
            space_ids: Vec::new(),
        };

        Ok(AcceptOutcome::Accepted {
            invite: InviteRecord {
                status: InviteStatus::Accepted,
                resolved_at: Some(resolved_at),
                receiver_id: Some(receiver_id),
                ..invite
            },
            member,
        })
    }

    pub async fn decline(&self, invite_id: &str) -> Result<DeclineOutcome> {
        let resolved_at = Utc::now().timestamp();
        let result = sqlx::query(
            "UPDATE invites SET status = 'REJECTED', resolved_at = ?2
             WHERE id = ?1 AND status = 'PENDING'",
        )
        .bind(invite_id)
        .bind(resolved_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() > 0 {
            let invite = self
                .find_by_id(invite_id)
                .await?
                .ok_or_else(|| anyhow!("invite {invite_id} missing after decline"))?;
            return Ok(DeclineOutcome::Declined(invite));
        }

        match self.find_by_id(invite_id).await? {
            Some(invite) => Ok(DeclineOutcome::AlreadyResolved(invite.status)),
            None => Ok(DeclineOutcome::NotFound),
        }
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

    async fn seed(database: &crate::db::Database) -> (String, String) {
        let users = UserStore::new(database);
        let workspaces = WorkspaceStore::new(database);
        let owner = users
            .create("sender@example.com", None)
            .await
            .expect("create sender");
        let workspace = workspaces
            .create(owner.id.as_str(), "Invites", WorkspaceType::Public)
            .await
            .expect("create workspace");
        (workspace.id.into_inner(), owner.id.into_inner())
    }

    #[tokio::test]
    async fn repeated_invitations_do_not_duplicate_pending_records() {
        let (_dir, database) = connect_temp().await;
        let invites = InviteStore::new(&database);
        let (workspace_id, sender_id) = seed(&database).await;

        let target = InviteTarget {
            email: "guest@example.com".to_owned(),
            user_id: None,
        };

        let first = invites
            .create_pending_batch(
                &workspace_id,
                &sender_id,
                MemberRole::Editor,
                std::slice::from_ref(&target),
            )
            .await
            .expect("first batch");
        assert_eq!(first.len(), 1);

        let second = invites
            .create_pending_batch(
                &workspace_id,
                &sender_id,
                MemberRole::Editor,
                &[target],
            )
            .await
            .expect("second batch");
        assert!(second.is_empty());

        let all = invites
            .list_for_workspace(&workspace_id)
            .await
            .expect("list");
        assert_eq!(all.len(), 1);
    }

    #[tokio::test]
    async fn existing_members_are_not_invited() {
        let (_dir, database) = connect_temp().await;
        let invites = InviteStore::new(&database);
        let users = UserStore::new(&database);
        let members = MembershipStore::new(&database);
        let (workspace_id, sender_id) = seed(&database).await;

        let existing = users
            .create("already@example.com", None)
            .await
            .expect("create user");
        members
            .insert_member(&workspace_id, existing.id.as_str(), MemberRole::Viewer)
            .await
            .expect("add member");

        let created = invites
            .create_pending_batch(
                &workspace_id,
                &sender_id,
                MemberRole::Editor,
                &[InviteTarget {
                    email: existing.email.clone(),
                    user_id: Some(existing.id.clone()),
                }],
            )
            .await
            .expect("batch");
        assert!(created.is_empty());
    }

    #[tokio::test]
    async fn accept_backfills_receiver_and_creates_member() {
        let (_dir, database) = connect_temp().await;
        let invites = InviteStore::new(&database);
        let users = UserStore::new(&database);
        let members = MembershipStore::new(&database);
        let (workspace_id, sender_id) = seed(&database).await;

        // invited before registering
        let created = invites
            .create_pending_batch(
                &workspace_id,
                &sender_id,
                MemberRole::Editor,
                &[InviteTarget {
                    email: "late@example.com".to_owned(),
                    user_id: None,
                }],
            )
            .await
            .expect("batch");
        let invite_id = created[0].id.clone();

        // unregistered receiver cannot accept yet
        match invites.accept(invite_id.as_str()).await.expect("accept") {
            AcceptOutcome::ReceiverUnregistered => {}
            other => panic!("expected ReceiverUnregistered, got {other:?}"),
        }

        let late = users
            .create("late@example.com", Some("Late"))
            .await
            .expect("register");

        match invites.accept(invite_id.as_str()).await.expect("accept") {
            AcceptOutcome::Accepted { invite, member } => {
                assert_eq!(invite.status, InviteStatus::Accepted);
                assert_eq!(invite.receiver_id.as_ref(), Some(&late.id));
                assert_eq!(member.role, MemberRole::Editor);
            }
            other => panic!("expected Accepted, got {other:?}"),
        }

        assert!(
            members
                .find_member(&workspace_id, late.id.as_str())
                .await
                .expect("find member")
                .is_some()
        );

        // terminal invites stay terminal
        match invites.accept(invite_id.as_str()).await.expect("re-accept") {
            AcceptOutcome::AlreadyResolved(InviteStatus::Accepted) => {}
            other => panic!("expected AlreadyResolved, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn accept_for_existing_member_leaves_invite_pending() {
        let (_dir, database) = connect_temp().await;
        let invites = InviteStore::new(&database);
        let users = UserStore::new(&database);
        let members = MembershipStore::new(&database);
        let (workspace_id, sender_id) = seed(&database).await;

        let guest = users
            .create("guest@example.com", None)
            .await
            .expect("create guest");
        let created = invites
            .create_pending_batch(
                &workspace_id,
                &sender_id,
                MemberRole::Editor,
                &[InviteTarget {
                    email: guest.email.clone(),
                    user_id: Some(guest.id.clone()),
                }],
            )
            .await
            .expect("batch");
        let invite_id = created[0].id.clone();

        // joined through some other path in the meantime
        members
            .insert_member(&workspace_id, guest.id.as_str(), MemberRole::Viewer)
            .await
            .expect("join");

        match invites.accept(invite_id.as_str()).await.expect("accept") {
            AcceptOutcome::AlreadyMember => {}
            other => panic!("expected AlreadyMember, got {other:?}"),
        }

        let reloaded = invites
            .find_by_id(invite_id.as_str())
            .await
            .expect("reload")
            .expect("present");
        assert_eq!(reloaded.status, InviteStatus::Pending);
    }

    #[tokio::test]
    async fn decline_is_terminal() {
        let (_dir, database) = connect_temp().await;
        let invites = InviteStore::new(&database);
        let (workspace_id, sender_id) = seed(&database).await;

        let created = invites
            .create_pending_batch(
                &workspace_id,
                &sender_id,
                MemberRole::Editor,
                &[InviteTarget {
                    email: "no@example.com".to_owned(),
                    user_id: None,
                }],
            )
            .await
            .expect("batch");
        let invite_id = created[0].id.clone();

        match invites.decline(invite_id.as_str()).await.expect("decline") {
            DeclineOutcome::Declined(invite) => {
                assert_eq!(invite.status, InviteStatus::Rejected);
                assert!(invite.resolved_at.is_some());
            }
            other => panic!("expected Declined, got {other:?}"),
        }

        match invites.decline(invite_id.as_str()).await.expect("redecline") {
            DeclineOutcome::AlreadyResolved(InviteStatus::Rejected) => {}
            other => panic!("expected AlreadyResolved, got {other:?}"),
        }

        match invites.decline("missing").await.expect("missing") {
            DeclineOutcome::NotFound => {}
            other => panic!("expected NotFound, got {other:?}"),
        }
    }
}
