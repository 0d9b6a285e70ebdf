use clipdeck_core::{
    folder::FolderRecord,
    ids::{SpaceId, WorkspaceId},
    membership::{MemberRecord, MembershipStore},
};

use crate::error::AppError;

/// The context a role is resolved against: a workspace, a space, or a
/// space pinned inside a workspace. Folder-level checks collapse into one of
/// these after the owning container has been looked up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleContext {
    pub workspace_id: Option<WorkspaceId>,
    pub space_id: Option<SpaceId>,
}

impl RoleContext {
    pub fn workspace(workspace_id: impl Into<WorkspaceId>) -> Self {
        Self {
            workspace_id: Some(workspace_id.into()),
            space_id: None,
        }
    }

    pub fn space(space_id: impl Into<SpaceId>) -> Self {
        Self {
            workspace_id: None,
            space_id: Some(space_id.into()),
        }
    }

    pub fn scoped(workspace_id: impl Into<WorkspaceId>, space_id: impl Into<SpaceId>) -> Self {
        Self {
            workspace_id: Some(workspace_id.into()),
            space_id: Some(space_id.into()),
        }
    }

    /// A folder inside a space is checked against that space; a library
    /// folder falls back to its workspace.
    pub fn for_folder(folder: &FolderRecord) -> Self {
        Self {
            workspace_id: Some(folder.workspace_id.clone()),
            space_id: folder.space_id.clone(),
        }
    }
}

/// Resolve the user's effective role in the given context. `Ok(None)` means
/// no membership at all — distinct from a membership whose role is too weak,
/// which is the guard's concern.
///
/// Pure over store state: no writes, no caching, so two consecutive calls
/// with no intervening writes agree.
pub async fn resolve_role(
    members: &MembershipStore,
    user_id: &str,
    ctx: &RoleContext,
) -> Result<Option<MemberRecord>, AppError> {
    let member = match (&ctx.workspace_id, &ctx.space_id) {
        (Some(workspace_id), Some(space_id)) => members
            .find_member_with_space_access(workspace_id.as_str(), user_id, space_id.as_str())
            .await
            .map_err(AppError::from_anyhow)?,
        (Some(workspace_id), None) => members
            .find_member(workspace_id.as_str(), user_id)
            .await
            .map_err(AppError::from_anyhow)?,
        (None, Some(space_id)) => members
            .find_member_by_space(space_id.as_str(), user_id)
            .await
            .map_err(AppError::from_anyhow)?,
        (None, None) => None,
    };

    Ok(member)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{add_member, create_space, create_user, create_workspace, setup_state};
    use clipdeck_core::membership::MemberRole;

    #[tokio::test]
    async fn workspace_context_resolves_member_role() {
        let (_dir, _db, state) = setup_state().await;
        let owner = create_user(&state, "owner@example.com").await;
        let viewer = create_user(&state, "viewer@example.com").await;
        let workspace = create_workspace(&state, &owner, "Team").await;
        add_member(&state, &workspace, &viewer, MemberRole::Viewer).await;

        let ctx = RoleContext::workspace(workspace.id.clone());
        let resolved = resolve_role(&state.membership_store, viewer.id.as_str(), &ctx)
            .await
            .expect("resolve");
        assert_eq!(resolved.map(|m| m.role), Some(MemberRole::Viewer));

        let stranger = create_user(&state, "stranger@example.com").await;
        let resolved = resolve_role(&state.membership_store, stranger.id.as_str(), &ctx)
            .await
            .expect("resolve");
        assert!(resolved.is_none());
    }

    #[tokio::test]
    async fn scoped_context_requires_a_space_grant() {
        let (_dir, _db, state) = setup_state().await;
        let owner = create_user(&state, "owner@example.com").await;
        let admin = create_user(&state, "admin@example.com").await;
        let workspace = create_workspace(&state, &owner, "Team").await;
        add_member(&state, &workspace, &admin, MemberRole::Admin).await;

        // space granted to the owner only
        let space = create_space(&state, &workspace, "Clips", &[&owner]).await;

        // workspace admin without a grant resolves to no role in the space
        let scoped = RoleContext::scoped(workspace.id.clone(), space.id.clone());
        let resolved = resolve_role(&state.membership_store, admin.id.as_str(), &scoped)
            .await
            .expect("resolve");
        assert!(resolved.is_none());

        let resolved = resolve_role(&state.membership_store, owner.id.as_str(), &scoped)
            .await
            .expect("resolve");
        assert_eq!(resolved.map(|m| m.role), Some(MemberRole::Admin));
    }

    #[tokio::test]
    async fn space_only_context_resolves_through_its_workspace() {
        let (_dir, _db, state) = setup_state().await;
        let owner = create_user(&state, "owner@example.com").await;
        let workspace = create_workspace(&state, &owner, "Team").await;
        let space = create_space(&state, &workspace, "Clips", &[&owner]).await;

        let ctx = RoleContext::space(space.id.clone());
        let resolved = resolve_role(&state.membership_store, owner.id.as_str(), &ctx)
            .await
            .expect("resolve");
        assert_eq!(
            resolved.map(|m| m.workspace_id),
            Some(workspace.id.clone())
        );
    }

    #[tokio::test]
    async fn empty_context_resolves_to_nothing() {
        let (_dir, _db, state) = setup_state().await;
        let user = create_user(&state, "anyone@example.com").await;

        let ctx = RoleContext {
            workspace_id: None,
            space_id: None,
        };
        let resolved = resolve_role(&state.membership_store, user.id.as_str(), &ctx)
            .await
            .expect("resolve");
        assert!(resolved.is_none());
    }

    #[tokio::test]
    async fn resolution_is_stable_without_intervening_writes() {
        let (_dir, _db, state) = setup_state().await;
        let owner = create_user(&state, "owner@example.com").await;
        let workspace = create_workspace(&state, &owner, "Team").await;

        let ctx = RoleContext::workspace(workspace.id.clone());
        let first = resolve_role(&state.membership_store, owner.id.as_str(), &ctx)
            .await
            .expect("resolve")
            .map(|m| m.role);
        let second = resolve_role(&state.membership_store, owner.id.as_str(), &ctx)
            .await
            .expect("resolve")
            .map(|m| m.role);
        assert_eq!(first, second);
    }
}
