use clipdeck_core::space::{SpaceMember, SpaceRecord, SpaceType};
use serde::Deserialize;
use tracing::info;

use crate::{
    access::{
        guard::{ADMIN_ONLY, CONTENT_ROLES, require_role, validate_membership},
        hierarchy::find_space_in_workspace,
        resolver::RoleContext,
    },
    error::AppError,
    state::AppState,
};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSpaceParams {
    pub workspace_id: String,
    pub name: String,
    #[serde(default)]
    pub space_type: Option<SpaceType>,
    /// Workspace members (by user id) granted into the space at creation.
    #[serde(default)]
    pub members: Vec<String>,
}

/// Create a space and provision the listed members plus the creator into it.
pub async fn create_space(
    state: &AppState,
    user_id: &str,
    params: CreateSpaceParams,
) -> Result<SpaceRecord, AppError> {
    if params.name.trim().is_empty() {
        return Err(AppError::bad_request("space name must not be empty"));
    }

    let ctx = RoleContext::workspace(params.workspace_id.as_str());
    require_role(&state.membership_store, user_id, &ctx, CONTENT_ROLES).await?;

    let mut granted = params.members.clone();
    if !granted.iter().any(|id| id.as_str() == user_id) {
        granted.push(user_id.to_owned());
    }

    let space = state
        .space_store
        .create_with_grants(
            params.workspace_id.as_str(),
            params.name.trim(),
            params.space_type.unwrap_or(SpaceType::Custom),
            &granted,
        )
        .await
        .map_err(AppError::from_anyhow)?;

    info!(space_id = %space.id, workspace_id = %space.workspace_id, "space created");
    Ok(space)
}

/// Spaces the caller has been granted into within the workspace.
pub async fn list_spaces(
    state: &AppState,
    user_id: &str,
    workspace_id: &str,
) -> Result<Vec<SpaceRecord>, AppError> {
    let ctx = RoleContext::workspace(workspace_id);
    validate_membership(&state.membership_store, user_id, &ctx).await?;

    state
        .space_store
        .list_for_member(workspace_id, user_id)
        .await
        .map_err(AppError::from_anyhow)
}

pub async fn get_space(
    state: &AppState,
    user_id: &str,
    space_id: &str,
) -> Result<SpaceRecord, AppError> {
    let ctx = RoleContext::space(space_id);
    validate_membership(&state.membership_store, user_id, &ctx).await?;

    find_space_in_workspace(&state.space_store, space_id).await
}

pub async fn update_space(
    state: &AppState,
    user_id: &str,
    space_id: &str,
    name: Option<&str>,
    space_type: Option<SpaceType>,
) -> Result<SpaceRecord, AppError> {
    let ctx = RoleContext::space(space_id);
    require_role(&state.membership_store, user_id, &ctx, CONTENT_ROLES).await?;

    state
        .space_store
        .update(space_id, name.map(str::trim), space_type)
        .await
        .map_err(AppError::from_anyhow)?;

    find_space_in_workspace(&state.space_store, space_id).await
}

pub async fn delete_space(
    state: &AppState,
    user_id: &str,
    space_id: &str,
) -> Result<(), AppError> {
    let ctx = RoleContext::space(space_id);
    require_role(&state.membership_store, user_id, &ctx, ADMIN_ONLY).await?;

    let deleted = state
        .space_store
        .delete(space_id)
        .await
        .map_err(AppError::from_anyhow)?;
    if !deleted {
        return Err(AppError::space_not_found(space_id));
    }

    info!(space_id, "space deleted");
    Ok(())
}

pub async fn list_space_members(
    state: &AppState,
    user_id: &str,
    space_id: &str,
) -> Result<Vec<SpaceMember>, AppError> {
    let ctx = RoleContext::space(space_id);
    validate_membership(&state.membership_store, user_id, &ctx).await?;

    state
        .space_store
        .list_space_members(space_id)
        .await
        .map_err(AppError::from_anyhow)
}

/// Grant a workspace member into a space. Workspace ADMIN only; the target
/// must already be a member of the workspace. Re-granting is a no-op.
pub async fn add_member_to_space(
    state: &AppState,
    caller_user_id: &str,
    space_id: &str,
    target_user_id: &str,
) -> Result<(), AppError> {
    let space = find_space_in_workspace(&state.space_store, space_id).await?;

    let ctx = RoleContext::workspace(space.workspace_id.clone());
    require_role(&state.membership_store, caller_user_id, &ctx, ADMIN_ONLY).await?;

    let target = state
        .membership_store
        .find_member(space.workspace_id.as_str(), target_user_id)
        .await
        .map_err(AppError::from_anyhow)?
        .ok_or_else(|| {
            AppError::bad_request(
                "User is not in this workspace. Add them to the workspace before adding to the space.",
            )
        })?;

    state
        .membership_store
        .grant_space(target.id.as_str(), space_id)
        .await
        .map_err(AppError::from_anyhow)?;

    Ok(())
}

/// Revoke a member's grant. The workspace owner keeps access to every space.
pub async fn remove_member_from_space(
    state: &AppState,
    caller_user_id: &str,
    space_id: &str,
    target_user_id: &str,
) -> Result<(), AppError> {
    let space = find_space_in_workspace(&state.space_store, space_id).await?;

    let ctx = RoleContext::workspace(space.workspace_id.clone());
    require_role(&state.membership_store, caller_user_id, &ctx, ADMIN_ONLY).await?;

    let workspace = state
        .workspace_store
        .find_by_id(space.workspace_id.as_str())
        .await
        .map_err(AppError::from_anyhow)?
        .ok_or_else(|| AppError::workspace_not_found(space.workspace_id.as_str()))?;

    if workspace.owner_id.as_str() == target_user_id {
        return Err(AppError::owner_required(
            "The workspace owner cannot be removed from a space.",
        ));
    }

    let target = state
        .membership_store
        .find_member(space.workspace_id.as_str(), target_user_id)
        .await
        .map_err(AppError::from_anyhow)?
        .ok_or_else(|| AppError::bad_request("User is not in this workspace."))?;

    state
        .membership_store
        .revoke_space(target.id.as_str(), space_id)
        .await
        .map_err(AppError::from_anyhow)?;

    Ok(())
}
