use clipdeck_core::{
    folder::{FolderRecord, FolderStore},
    ids::{SpaceId, WorkspaceId},
    membership::{MemberRecord, MemberRole},
    space::SpaceStore,
};
use serde::Deserialize;

use crate::{
    access::{
        guard::{CONTENT_ROLES, require_role},
        resolver::RoleContext,
    },
    error::AppError,
    state::AppState,
};

/// Result of a folder-anchored permission check: the folder's identifying
/// fields travel back to the caller for follow-up boundary comparisons.
#[derive(Debug)]
pub struct FolderAccess {
    pub folder: FolderRecord,
    pub member: MemberRecord,
}

/// Result of a container-anchored permission check.
#[derive(Debug)]
pub struct ScopeAccess {
    pub workspace_id: WorkspaceId,
    pub space_id: Option<SpaceId>,
    pub member: MemberRecord,
}

/// One end of a share operation, as supplied by the caller.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareSource {
    pub workspace_id: Option<String>,
    pub space_id: Option<String>,
    pub folder_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareDestination {
    pub space_id: Option<String>,
    pub folder_id: Option<String>,
}

/// Load the folder's owning (workspace, space?) pair — the context every
/// folder-anchored check runs against.
pub async fn resolve_folder_context(
    folders: &FolderStore,
    folder_id: &str,
) -> Result<FolderRecord, AppError> {
    folders
        .find_by_id(folder_id)
        .await
        .map_err(AppError::from_anyhow)?
        .ok_or_else(|| AppError::folder_not_found(folder_id))
}

/// Translate "can this user act on folder X" into a context-identified guard
/// call. Library folders (no space) are still gated by workspace role; they
/// are private to members, not to the world.
pub async fn check_folder_permission(
    state: &AppState,
    user_id: &str,
    folder_id: &str,
    allowed: &[MemberRole],
) -> Result<FolderAccess, AppError> {
    let folder = resolve_folder_context(&state.folder_store, folder_id).await?;
    let ctx = RoleContext::for_folder(&folder);
    let member = require_role(&state.membership_store, user_id, &ctx, allowed).await?;

    Ok(FolderAccess { folder, member })
}

/// Permission check for operations not anchored to an existing folder, such
/// as creating one at the root of a space. A space referenced outside its
/// own workspace reads as absent.
pub async fn check_workspace_or_space_permission(
    state: &AppState,
    user_id: &str,
    workspace_id: Option<&str>,
    space_id: Option<&str>,
    allowed: &[MemberRole],
) -> Result<ScopeAccess, AppError> {
    match (workspace_id, space_id) {
        (None, None) => Err(AppError::bad_request("workspaceId or spaceId is required")),
        (_, Some(space_id)) => {
            let space = state
                .space_store
                .find_by_id(space_id)
                .await
                .map_err(AppError::from_anyhow)?
                .ok_or_else(|| AppError::space_not_found(space_id))?;

            if let Some(workspace_id) = workspace_id {
                if space.workspace_id.as_str() != workspace_id {
                    return Err(AppError::space_not_found(space_id));
                }
            }

            let ctx = RoleContext::scoped(space.workspace_id.clone(), space.id.clone());
            let member = require_role(&state.membership_store, user_id, &ctx, allowed).await?;

            Ok(ScopeAccess {
                workspace_id: space.workspace_id,
                space_id: Some(space.id),
                member,
            })
        }
        (Some(workspace_id), None) => {
            let ctx = RoleContext::workspace(workspace_id);
            let member = require_role(&state.membership_store, user_id, &ctx, allowed).await?;

            Ok(ScopeAccess {
                workspace_id: WorkspaceId::from(workspace_id),
                space_id: None,
                member,
            })
        }
    }
}

/// The cross-boundary invariant: whenever an operation names a source and a
/// destination, their workspaces must match. Runs in addition to role
/// checks, never instead of them.
pub fn ensure_same_workspace(
    source_workspace_id: &str,
    target_workspace_id: &str,
) -> Result<(), AppError> {
    if source_workspace_id == target_workspace_id {
        Ok(())
    } else {
        Err(AppError::cross_workspace(
            source_workspace_id,
            target_workspace_id,
        ))
    }
}

/// Share gate: {ADMIN, EDITOR} on both ends, and both ends inside the same
/// workspace. The boundary comparison fires before the destination role
/// check so a cross-workspace attempt is reported as such regardless of the
/// caller's standing over there.
pub async fn check_share_permission(
    state: &AppState,
    user_id: &str,
    source: &ShareSource,
    destination: &ShareDestination,
) -> Result<(), AppError> {
    let source_workspace_id = match &source.folder_id {
        Some(folder_id) => {
            let access = check_folder_permission(state, user_id, folder_id, CONTENT_ROLES).await?;
            access.folder.workspace_id
        }
        None => {
            let access = check_workspace_or_space_permission(
                state,
                user_id,
                source.workspace_id.as_deref(),
                source.space_id.as_deref(),
                CONTENT_ROLES,
            )
            .await?;
            access.workspace_id
        }
    };

    if let Some(folder_id) = &destination.folder_id {
        let folder = resolve_folder_context(&state.folder_store, folder_id).await?;
        ensure_same_workspace(source_workspace_id.as_str(), folder.workspace_id.as_str())?;

        let ctx = RoleContext::for_folder(&folder);
        require_role(&state.membership_store, user_id, &ctx, CONTENT_ROLES).await?;
        return Ok(());
    }

    if let Some(space_id) = &destination.space_id {
        let space = state
            .space_store
            .find_by_id(space_id)
            .await
            .map_err(AppError::from_anyhow)?
            .ok_or_else(|| AppError::space_not_found(space_id))?;
        ensure_same_workspace(source_workspace_id.as_str(), space.workspace_id.as_str())?;

        let ctx = RoleContext::scoped(space.workspace_id, space.id);
        require_role(&state.membership_store, user_id, &ctx, CONTENT_ROLES).await?;
        return Ok(());
    }

    Err(AppError::bad_request(
        "share destination requires a folderId or spaceId",
    ))
}

pub(crate) async fn find_space_in_workspace(
    spaces: &SpaceStore,
    space_id: &str,
) -> Result<clipdeck_core::space::SpaceRecord, AppError> {
    spaces
        .find_by_id(space_id)
        .await
        .map_err(AppError::from_anyhow)?
        .ok_or_else(|| AppError::space_not_found(space_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::guard::ADMIN_ONLY;
    use crate::test_support::{add_member, create_space, create_user, create_workspace, setup_state};
    use axum::http::StatusCode;

    #[tokio::test]
    async fn workspace_admin_without_space_grant_is_not_found() {
        let (_dir, _db, state) = setup_state().await;
        let owner = create_user(&state, "owner@example.com").await;
        let admin = create_user(&state, "admin@example.com").await;
        let workspace = create_workspace(&state, &owner, "Team").await;
        add_member(&state, &workspace, &admin, clipdeck_core::membership::MemberRole::Admin).await;

        let space = create_space(&state, &workspace, "Private", &[&owner]).await;
        let folder = state
            .folder_store
            .create(workspace.id.as_str(), Some(space.id.as_str()), None, "clip")
            .await
            .expect("create folder");

        // admin of the workspace, but never provisioned into the space
        let err = check_folder_permission(&state, admin.id.as_str(), folder.id.as_str(), ADMIN_ONLY)
            .await
            .expect_err("unprovisioned admin must fail");
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(err.name(), "MEMBERSHIP_NOT_FOUND");

        let access = check_folder_permission(&state, owner.id.as_str(), folder.id.as_str(), ADMIN_ONLY)
            .await
            .expect("granted owner passes");
        assert_eq!(access.folder.id, folder.id);
    }

    #[tokio::test]
    async fn library_folders_still_require_workspace_role() {
        let (_dir, _db, state) = setup_state().await;
        let owner = create_user(&state, "owner@example.com").await;
        let stranger = create_user(&state, "stranger@example.com").await;
        let workspace = create_workspace(&state, &owner, "Team").await;

        let folder = state
            .folder_store
            .create(workspace.id.as_str(), None, None, "library")
            .await
            .expect("create folder");

        let err = check_folder_permission(
            &state,
            stranger.id.as_str(),
            folder.id.as_str(),
            CONTENT_ROLES,
        )
        .await
        .expect_err("non-member must fail");
        assert_eq!(err.status(), StatusCode::NOT_FOUND);

        check_folder_permission(&state, owner.id.as_str(), folder.id.as_str(), CONTENT_ROLES)
            .await
            .expect("member passes");
    }

    #[tokio::test]
    async fn missing_folder_is_not_found() {
        let (_dir, _db, state) = setup_state().await;
        let user = create_user(&state, "user@example.com").await;

        let err = check_folder_permission(&state, user.id.as_str(), "no-such-folder", ADMIN_ONLY)
            .await
            .expect_err("missing folder");
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(err.name(), "FOLDER_NOT_FOUND");
    }

    #[tokio::test]
    async fn container_check_requires_some_container() {
        let (_dir, _db, state) = setup_state().await;
        let user = create_user(&state, "user@example.com").await;

        let err =
            check_workspace_or_space_permission(&state, user.id.as_str(), None, None, ADMIN_ONLY)
                .await
                .expect_err("no container");
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn space_outside_named_workspace_reads_as_absent() {
        let (_dir, _db, state) = setup_state().await;
        let owner = create_user(&state, "owner@example.com").await;
        let workspace_a = create_workspace(&state, &owner, "A").await;
        let workspace_b = create_workspace(&state, &owner, "B").await;
        let space_b = create_space(&state, &workspace_b, "B Space", &[&owner]).await;

        let err = check_workspace_or_space_permission(
            &state,
            owner.id.as_str(),
            Some(workspace_a.id.as_str()),
            Some(space_b.id.as_str()),
            ADMIN_ONLY,
        )
        .await
        .expect_err("foreign space");
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(err.name(), "SPACE_NOT_FOUND");
    }

    #[tokio::test]
    async fn sharing_across_workspaces_is_forbidden_regardless_of_roles() {
        let (_dir, _db, state) = setup_state().await;
        let owner = create_user(&state, "owner@example.com").await;

        // the same user owns (and is ADMIN in) both workspaces
        let workspace_a = create_workspace(&state, &owner, "A").await;
        let workspace_b = create_workspace(&state, &owner, "B").await;
        let space_b = create_space(&state, &workspace_b, "B Space", &[&owner]).await;

        let folder_a = state
            .folder_store
            .create(workspace_a.id.as_str(), None, None, "clip")
            .await
            .expect("create folder");

        let source = ShareSource {
            folder_id: Some(folder_a.id.as_str().to_owned()),
            ..ShareSource::default()
        };
        let destination = ShareDestination {
            space_id: Some(space_b.id.as_str().to_owned()),
            folder_id: None,
        };

        let err = check_share_permission(&state, owner.id.as_str(), &source, &destination)
            .await
            .expect_err("cross-workspace share");
        assert_eq!(err.status(), StatusCode::FORBIDDEN);
        assert_eq!(err.name(), "CROSS_WORKSPACE_FORBIDDEN");
    }

    #[tokio::test]
    async fn sharing_within_a_workspace_checks_both_ends() {
        let (_dir, _db, state) = setup_state().await;
        let owner = create_user(&state, "owner@example.com").await;
        let editor = create_user(&state, "editor@example.com").await;
        let workspace = create_workspace(&state, &owner, "Team").await;
        add_member(
            &state,
            &workspace,
            &editor,
            clipdeck_core::membership::MemberRole::Editor,
        )
        .await;

        let source_space = create_space(&state, &workspace, "Source", &[&owner, &editor]).await;
        let dest_space = create_space(&state, &workspace, "Dest", &[&owner]).await;

        let folder = state
            .folder_store
            .create(
                workspace.id.as_str(),
                Some(source_space.id.as_str()),
                None,
                "clip",
            )
            .await
            .expect("create folder");

        let source = ShareSource {
            folder_id: Some(folder.id.as_str().to_owned()),
            ..ShareSource::default()
        };
        let destination = ShareDestination {
            space_id: Some(dest_space.id.as_str().to_owned()),
            folder_id: None,
        };

        // editor can read the source but has no grant in the destination
        let err = check_share_permission(&state, editor.id.as_str(), &source, &destination)
            .await
            .expect_err("no destination grant");
        assert_eq!(err.status(), StatusCode::NOT_FOUND);

        check_share_permission(&state, owner.id.as_str(), &source, &destination)
            .await
            .expect("owner has both ends");
    }

    #[tokio::test]
    async fn share_destination_must_be_identified() {
        let (_dir, _db, state) = setup_state().await;
        let owner = create_user(&state, "owner@example.com").await;
        let workspace = create_workspace(&state, &owner, "Team").await;
        let folder = state
            .folder_store
            .create(workspace.id.as_str(), None, None, "clip")
            .await
            .expect("create folder");

        let source = ShareSource {
            folder_id: Some(folder.id.as_str().to_owned()),
            ..ShareSource::default()
        };

        let err = check_share_permission(
            &state,
            owner.id.as_str(),
            &source,
            &ShareDestination::default(),
        )
        .await
        .expect_err("empty destination");
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }
}
