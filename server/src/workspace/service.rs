use clipdeck_core::{
    invite::InviteRecord,
    membership::MemberRole,
    user::UserRecord,
    workspace::{ProvisionedWorkspace, UserWorkspace, WorkspaceRecord, WorkspaceType},
};
use serde::Serialize;
use serde_json::json;
use tracing::info;

use crate::{
    access::{
        guard::{ADMIN_ONLY, require_role, validate_membership},
        resolver::{RoleContext, resolve_role},
    },
    error::AppError,
    invitation,
    socket::broadcast::WORKSPACE_CREATED,
    state::AppState,
};

/// Provision a freshly verified account: the user record, their personal
/// workspace and default space come up together, then the owner's live
/// sessions hear about the new workspace.
pub async fn provision_user(
    state: &AppState,
    user_id: &str,
    email: &str,
    display_name: Option<&str>,
) -> Result<ProvisionedWorkspace, AppError> {
    invitation::service::validate_email(email)?;

    let provisioned = state
        .workspace_store
        .provision_personal(user_id, email, display_name)
        .await
        .map_err(AppError::from_anyhow)?;

    info!(
        user_id,
        workspace_id = %provisioned.workspace.id,
        "provisioned personal workspace"
    );

    state
        .broadcaster
        .to_user(
            user_id,
            WORKSPACE_CREATED,
            json!({
                "workspaceId": provisioned.workspace.id,
                "name": provisioned.workspace.name,
            }),
        )
        .await;

    Ok(provisioned)
}

/// Explicit workspace creation, bounded by the owner's subscription limit.
/// Initial members are invited by email after the creation transaction
/// commits.
pub async fn create_workspace(
    state: &AppState,
    owner: &UserRecord,
    name: &str,
    invite_emails: &[String],
) -> Result<(WorkspaceRecord, Vec<InviteRecord>), AppError> {
    let owned = state
        .workspace_store
        .count_owned_by(owner.id.as_str())
        .await
        .map_err(AppError::from_anyhow)?;
    if owned >= owner.max_workspaces {
        return Err(AppError::forbidden("Maximum workspace limit reached."));
    }

    for email in invite_emails {
        invitation::service::validate_email(email)?;
    }

    let workspace = state
        .workspace_store
        .create(owner.id.as_str(), name, WorkspaceType::Public)
        .await
        .map_err(AppError::from_anyhow)?;

    let invites = if invite_emails.is_empty() {
        Vec::new()
    } else {
        invitation::service::create_invites(
            state,
            owner.id.as_str(),
            workspace.id.as_str(),
            invite_emails,
            MemberRole::Editor,
        )
        .await?
        .invites
    };

    state
        .broadcaster
        .to_user(
            owner.id.as_str(),
            WORKSPACE_CREATED,
            json!({
                "workspaceId": workspace.id,
                "name": workspace.name,
            }),
        )
        .await;

    Ok((workspace, invites))
}

pub async fn list_workspaces(
    state: &AppState,
    user_id: &str,
) -> Result<Vec<UserWorkspace>, AppError> {
    state
        .workspace_store
        .list_for_user(user_id)
        .await
        .map_err(AppError::from_anyhow)
}

/// Fetch a workspace the caller belongs to. Non-members get the same
/// not-found answer whether or not the workspace exists.
pub async fn get_workspace(
    state: &AppState,
    user_id: &str,
    workspace_id: &str,
) -> Result<WorkspaceRecord, AppError> {
    let ctx = RoleContext::workspace(workspace_id);
    validate_membership(&state.membership_store, user_id, &ctx).await?;

    state
        .workspace_store
        .find_by_id(workspace_id)
        .await
        .map_err(AppError::from_anyhow)?
        .ok_or_else(|| AppError::workspace_not_found(workspace_id))
}

pub async fn rename_workspace(
    state: &AppState,
    user_id: &str,
    workspace_id: &str,
    name: &str,
) -> Result<WorkspaceRecord, AppError> {
    let ctx = RoleContext::workspace(workspace_id);
    require_role(&state.membership_store, user_id, &ctx, ADMIN_ONLY).await?;

    let updated = state
        .workspace_store
        .update_name(workspace_id, name)
        .await
        .map_err(AppError::from_anyhow)?;
    if !updated {
        return Err(AppError::workspace_not_found(workspace_id));
    }

    state
        .workspace_store
        .find_by_id(workspace_id)
        .await
        .map_err(AppError::from_anyhow)?
        .ok_or_else(|| AppError::workspace_not_found(workspace_id))
}

/// Deleting a workspace is reserved for its owner, not merely any ADMIN.
pub async fn delete_workspace(
    state: &AppState,
    user_id: &str,
    workspace_id: &str,
) -> Result<(), AppError> {
    let ctx = RoleContext::workspace(workspace_id);
    require_role(&state.membership_store, user_id, &ctx, ADMIN_ONLY).await?;

    let workspace = state
        .workspace_store
        .find_by_id(workspace_id)
        .await
        .map_err(AppError::from_anyhow)?
        .ok_or_else(|| AppError::workspace_not_found(workspace_id))?;

    if workspace.owner_id.as_str() != user_id {
        return Err(AppError::owner_required(
            "Only the workspace owner can delete it.",
        ));
    }

    state
        .workspace_store
        .delete(workspace_id)
        .await
        .map_err(AppError::from_anyhow)?;

    info!(workspace_id, "workspace deleted");
    Ok(())
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectedContext {
    pub selected_workspace: Option<String>,
    pub selected_space: Option<String>,
    pub selected_folder: Option<String>,
}

/// Resolve the workspace/space/folder the client should focus, preferring
/// explicit hints the caller can actually access and falling back to the
/// stored selection, then to the first workspace the user owns.
pub async fn selected_context(
    state: &AppState,
    user: &UserRecord,
    workspace_id: Option<&str>,
    space_id: Option<&str>,
    folder_id: Option<&str>,
) -> Result<SelectedContext, AppError> {
    if let Some(space_id) = space_id {
        let ctx = RoleContext::space(space_id);
        if let Some(member) = resolve_role(&state.membership_store, user.id.as_str(), &ctx).await? {
            let workspace_id = member.workspace_id.as_str().to_owned();
            let folder = resolve_selected_folder(state, &workspace_id, folder_id).await?;
            return Ok(SelectedContext {
                selected_workspace: Some(workspace_id),
                selected_space: Some(space_id.to_owned()),
                selected_folder: folder,
            });
        }
    }

    if let Some(workspace_id) = workspace_id {
        let ctx = RoleContext::workspace(workspace_id);
        if resolve_role(&state.membership_store, user.id.as_str(), &ctx)
            .await?
            .is_some()
        {
            let folder = resolve_selected_folder(state, workspace_id, folder_id).await?;
            return Ok(SelectedContext {
                selected_workspace: Some(workspace_id.to_owned()),
                selected_space: None,
                selected_folder: folder,
            });
        }
    }

    if let Some(selected) = &user.selected_workspace_id {
        return Ok(SelectedContext {
            selected_workspace: Some(selected.as_str().to_owned()),
            selected_space: None,
            selected_folder: None,
        });
    }

    let owned_first = state
        .workspace_store
        .list_for_user(user.id.as_str())
        .await
        .map_err(AppError::from_anyhow)?
        .into_iter()
        .find(|entry| entry.owned)
        .map(|entry| entry.workspace.id.as_str().to_owned());

    Ok(SelectedContext {
        selected_workspace: owned_first,
        selected_space: None,
        selected_folder: None,
    })
}

async fn resolve_selected_folder(
    state: &AppState,
    workspace_id: &str,
    folder_id: Option<&str>,
) -> Result<Option<String>, AppError> {
    let Some(folder_id) = folder_id else {
        return Ok(None);
    };

    let folder = state
        .folder_store
        .find_by_id(folder_id)
        .await
        .map_err(AppError::from_anyhow)?;

    Ok(folder
        .filter(|folder| folder.workspace_id.as_str() == workspace_id)
        .map(|folder| folder.id.as_str().to_owned()))
}
