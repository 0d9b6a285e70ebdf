use clipdeck_core::{
    membership::{MemberRecord, MemberRole, MemberWithUser},
    workspace::WorkspaceRecord,
};

use crate::{
    access::{
        guard::{ADMIN_ONLY, require_role, validate_membership},
        resolver::RoleContext,
    },
    error::AppError,
    state::AppState,
};

pub async fn list_members(
    state: &AppState,
    user_id: &str,
    workspace_id: &str,
) -> Result<Vec<MemberWithUser>, AppError> {
    let ctx = RoleContext::workspace(workspace_id);
    validate_membership(&state.membership_store, user_id, &ctx).await?;

    state
        .membership_store
        .list_members(workspace_id)
        .await
        .map_err(AppError::from_anyhow)
}

async fn load_workspace(state: &AppState, workspace_id: &str) -> Result<WorkspaceRecord, AppError> {
    state
        .workspace_store
        .find_by_id(workspace_id)
        .await
        .map_err(AppError::from_anyhow)?
        .ok_or_else(|| AppError::workspace_not_found(workspace_id))
}

async fn load_target_member(
    state: &AppState,
    workspace_id: &str,
    member_id: &str,
) -> Result<MemberRecord, AppError> {
    let member = state
        .membership_store
        .find_member_by_id(member_id)
        .await
        .map_err(AppError::from_anyhow)?;

    member
        .filter(|member| member.workspace_id.as_str() == workspace_id)
        .ok_or_else(|| AppError::not_found("Member not found in this workspace."))
}

/// Change another member's role. ADMIN-gated, with two structural rules on
/// top: nobody edits their own role, and touching a co-ADMIN is reserved
/// for the workspace owner. The write is conditional on the role the caller
/// just observed.
pub async fn update_member_role(
    state: &AppState,
    caller_user_id: &str,
    workspace_id: &str,
    member_id: &str,
    new_role: MemberRole,
) -> Result<(), AppError> {
    let ctx = RoleContext::workspace(workspace_id);
    let caller = require_role(&state.membership_store, caller_user_id, &ctx, ADMIN_ONLY).await?;

    let target = load_target_member(state, workspace_id, member_id).await?;

    if target.id == caller.id {
        return Err(AppError::forbidden("Admins cannot change their own role."));
    }

    if target.role == MemberRole::Admin {
        let workspace = load_workspace(state, workspace_id).await?;
        if workspace.owner_id.as_str() != caller_user_id {
            return Err(AppError::owner_required(
                "Only the workspace owner can change an admin's role.",
            ));
        }
    }

    let updated = state
        .membership_store
        .update_member_role_checked(member_id, target.role, new_role)
        .await
        .map_err(AppError::from_anyhow)?;
    if !updated {
        return Err(AppError::conflict(
            "Member role changed concurrently, retry.",
        ));
    }

    Ok(())
}

/// Remove a member. The owner's record is untouchable; co-ADMINs fall only
/// to the owner; self-removal goes through leave instead.
pub async fn remove_member(
    state: &AppState,
    caller_user_id: &str,
    workspace_id: &str,
    member_id: &str,
) -> Result<(), AppError> {
    let ctx = RoleContext::workspace(workspace_id);
    let caller = require_role(&state.membership_store, caller_user_id, &ctx, ADMIN_ONLY).await?;

    let target = load_target_member(state, workspace_id, member_id).await?;
    let workspace = load_workspace(state, workspace_id).await?;

    if target.user_id == workspace.owner_id {
        return Err(AppError::owner_required(
            "The workspace owner cannot be removed.",
        ));
    }

    if target.id == caller.id {
        return Err(AppError::bad_request(
            "Use leave to remove yourself from a workspace.",
        ));
    }

    if target.role == MemberRole::Admin && workspace.owner_id.as_str() != caller_user_id {
        return Err(AppError::owner_required(
            "Only the workspace owner can remove an admin.",
        ));
    }

    state
        .membership_store
        .remove_member(member_id)
        .await
        .map_err(AppError::from_anyhow)?;

    Ok(())
}

pub async fn leave_workspace(
    state: &AppState,
    user_id: &str,
    workspace_id: &str,
) -> Result<(), AppError> {
    let ctx = RoleContext::workspace(workspace_id);
    validate_membership(&state.membership_store, user_id, &ctx).await?;

    let workspace = load_workspace(state, workspace_id).await?;
    if workspace.owner_id.as_str() == user_id {
        return Err(AppError::bad_request("The workspace owner cannot leave."));
    }

    state
        .membership_store
        .remove_member_by_user(workspace_id, user_id)
        .await
        .map_err(AppError::from_anyhow)?;

    Ok(())
}
