use clipdeck_core::folder::{FolderPlacement, FolderRecord};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::{
    access::{
        guard::{ADMIN_ONLY, CONTENT_ROLES, require_role, validate_membership},
        hierarchy::{
            check_folder_permission, check_workspace_or_space_permission, ensure_same_workspace,
            find_space_in_workspace, resolve_folder_context,
        },
        resolver::RoleContext,
    },
    error::AppError,
    socket::{
        broadcast::{FOLDER_CREATED, FOLDER_DELETED, FOLDER_MOVED, FOLDER_RENAMED},
        rooms::RoomScope,
    },
    state::AppState,
};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateFolderParams {
    pub workspace_id: String,
    #[serde(default)]
    pub parent_folder_id: Option<String>,
    #[serde(default)]
    pub space_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MoveDestination {
    Folder { id: String },
    Space { id: String },
    Workspace { id: String },
}

fn folder_event_payload(folder: &FolderRecord) -> serde_json::Value {
    json!({
        "id": folder.id,
        "name": folder.name,
        "workspaceId": folder.workspace_id,
        "spaceId": folder.space_id,
    })
}

pub async fn list_folders(
    state: &AppState,
    user_id: &str,
    workspace_id: &str,
    parent_folder_id: Option<&str>,
    space_id: Option<&str>,
) -> Result<Vec<FolderRecord>, AppError> {
    let ctx = match space_id {
        Some(space_id) => RoleContext::scoped(workspace_id, space_id),
        None => RoleContext::workspace(workspace_id),
    };
    validate_membership(&state.membership_store, user_id, &ctx).await?;

    state
        .folder_store
        .list_children(workspace_id, parent_folder_id, space_id)
        .await
        .map_err(AppError::from_anyhow)
}

/// Create a folder under a parent, at the root of a space, or in the
/// caller's workspace library. The new folder carries exactly one container
/// pointer.
pub async fn create_folder(
    state: &AppState,
    user_id: &str,
    params: CreateFolderParams,
) -> Result<FolderRecord, AppError> {
    if params.parent_folder_id.is_some() && params.space_id.is_some() {
        return Err(AppError::bad_request(
            "a folder lives under a parent folder or at a space root, not both",
        ));
    }

    let name = params.name.as_deref().unwrap_or_default();

    let folder = if let Some(parent_id) = &params.parent_folder_id {
        let parent = check_folder_permission(state, user_id, parent_id, CONTENT_ROLES).await?;
        ensure_same_workspace(
            parent.folder.workspace_id.as_str(),
            params.workspace_id.as_str(),
        )?;

        state
            .folder_store
            .create(
                parent.folder.workspace_id.as_str(),
                None,
                Some(parent_id.as_str()),
                name,
            )
            .await
            .map_err(AppError::from_anyhow)?
    } else if let Some(space_id) = &params.space_id {
        let scope = check_workspace_or_space_permission(
            state,
            user_id,
            Some(params.workspace_id.as_str()),
            Some(space_id.as_str()),
            CONTENT_ROLES,
        )
        .await?;

        state
            .folder_store
            .create(scope.workspace_id.as_str(), Some(space_id.as_str()), None, name)
            .await
            .map_err(AppError::from_anyhow)?
    } else {
        let ctx = RoleContext::workspace(params.workspace_id.as_str());
        require_role(&state.membership_store, user_id, &ctx, CONTENT_ROLES).await?;

        state
            .folder_store
            .create(params.workspace_id.as_str(), None, None, name)
            .await
            .map_err(AppError::from_anyhow)?
    };

    info!(folder_id = %folder.id, workspace_id = %folder.workspace_id, "folder created");

    state
        .broadcaster
        .to_scope(
            &RoomScope::for_folder_container(&folder),
            FOLDER_CREATED,
            folder_event_payload(&folder),
        )
        .await;

    Ok(folder)
}

pub async fn rename_folder(
    state: &AppState,
    user_id: &str,
    folder_id: &str,
    new_name: &str,
) -> Result<FolderRecord, AppError> {
    let new_name = new_name.trim();
    if new_name.is_empty() {
        return Err(AppError::bad_request("folder name must not be empty"));
    }

    let access = check_folder_permission(state, user_id, folder_id, CONTENT_ROLES).await?;

    let renamed = state
        .folder_store
        .rename(folder_id, new_name)
        .await
        .map_err(AppError::from_anyhow)?;
    if !renamed {
        return Err(AppError::folder_not_found(folder_id));
    }

    let folder = FolderRecord {
        name: new_name.to_owned(),
        ..access.folder
    };

    // the event carries the committed state; watchers of the folder and of
    // its container both care about the new name
    let payload = folder_event_payload(&folder);
    state
        .broadcaster
        .to_scope(&RoomScope::for_folder(&folder), FOLDER_RENAMED, payload.clone())
        .await;
    state
        .broadcaster
        .to_scope(
            &RoomScope::for_folder_container(&folder),
            FOLDER_RENAMED,
            payload,
        )
        .await;

    Ok(folder)
}

/// Delete a folder and its whole subtree. Destructive, so ADMIN only.
pub async fn delete_folder(
    state: &AppState,
    user_id: &str,
    folder_id: &str,
) -> Result<u64, AppError> {
    let access = check_folder_permission(state, user_id, folder_id, ADMIN_ONLY).await?;

    let removed = state
        .folder_store
        .delete_subtree(folder_id)
        .await
        .map_err(AppError::from_anyhow)?;

    info!(folder_id, removed, "folder subtree deleted");

    let payload = folder_event_payload(&access.folder);
    state
        .broadcaster
        .to_scope(
            &RoomScope::for_folder(&access.folder),
            FOLDER_DELETED,
            payload.clone(),
        )
        .await;
    state
        .broadcaster
        .to_scope(
            &RoomScope::for_folder_container(&access.folder),
            FOLDER_DELETED,
            payload,
        )
        .await;

    Ok(removed)
}

/// Re-anchor a folder under another folder, into a space, or at the
/// workspace root. ADMIN on the source always; destination checks depend on
/// its kind; the workspace boundary is enforced on every path.
pub async fn move_folder(
    state: &AppState,
    user_id: &str,
    folder_id: &str,
    destination: &MoveDestination,
) -> Result<FolderRecord, AppError> {
    let source = check_folder_permission(state, user_id, folder_id, ADMIN_ONLY).await?;
    let source_workspace_id = source.folder.workspace_id.clone();

    let placement = match destination {
        MoveDestination::Workspace { id } => {
            ensure_same_workspace(source_workspace_id.as_str(), id)?;
            FolderPlacement::WorkspaceRoot
        }
        MoveDestination::Folder { id } => {
            if id == folder_id {
                return Err(AppError::folder_cycle());
            }

            let dest = check_folder_permission(state, user_id, id, ADMIN_ONLY).await?;
            ensure_same_workspace(
                source_workspace_id.as_str(),
                dest.folder.workspace_id.as_str(),
            )?;

            let descends = state
                .folder_store
                .is_in_subtree(folder_id, id)
                .await
                .map_err(AppError::from_anyhow)?;
            if descends {
                return Err(AppError::folder_cycle());
            }

            FolderPlacement::Parent(dest.folder.id)
        }
        MoveDestination::Space { id } => {
            let space = find_space_in_workspace(&state.space_store, id).await?;
            ensure_same_workspace(source_workspace_id.as_str(), space.workspace_id.as_str())?;

            let ctx = RoleContext::scoped(space.workspace_id.clone(), space.id.clone());
            require_role(&state.membership_store, user_id, &ctx, ADMIN_ONLY).await?;

            FolderPlacement::Space(space.id)
        }
    };

    let moved = state
        .folder_store
        .set_placement(folder_id, &placement)
        .await
        .map_err(AppError::from_anyhow)?;
    if !moved {
        return Err(AppError::folder_not_found(folder_id));
    }

    let old_container = RoomScope::for_folder_container(&source.folder);
    let folder = FolderRecord {
        parent_folder_id: match &placement {
            FolderPlacement::Parent(parent_id) => Some(parent_id.clone()),
            _ => None,
        },
        space_id: match &placement {
            FolderPlacement::Space(space_id) => Some(space_id.clone()),
            _ => None,
        },
        ..source.folder
    };

    info!(folder_id, "folder moved");

    // both the old and the new container see the move
    let payload = json!({
        "id": folder.id,
        "name": folder.name,
        "workspaceId": folder.workspace_id,
        "spaceId": folder.space_id,
        "parentFolderId": folder.parent_folder_id,
    });
    state
        .broadcaster
        .to_scope(&old_container, FOLDER_MOVED, payload.clone())
        .await;
    state
        .broadcaster
        .to_scope(&RoomScope::for_folder_container(&folder), FOLDER_MOVED, payload)
        .await;

    Ok(folder)
}

/// Breadcrumb chain, root first. Any workspace member may read it.
pub async fn folder_ancestors(
    state: &AppState,
    user_id: &str,
    folder_id: &str,
) -> Result<Vec<FolderRecord>, AppError> {
    let folder = resolve_folder_context(&state.folder_store, folder_id).await?;

    let ctx = RoleContext::workspace(folder.workspace_id.clone());
    validate_membership(&state.membership_store, user_id, &ctx).await?;

    state
        .folder_store
        .ancestors(folder_id)
        .await
        .map_err(AppError::from_anyhow)
}
