use clipdeck_core::membership::{MemberRecord, MemberRole, MembershipStore};

use crate::{
    access::resolver::{RoleContext, resolve_role},
    error::AppError,
};

/// Mutating content operations: create, rename, share.
pub const CONTENT_ROLES: &[MemberRole] = &[MemberRole::Admin, MemberRole::Editor];

/// Destructive and administrative operations: delete, move, member
/// management.
pub const ADMIN_ONLY: &[MemberRole] = &[MemberRole::Admin];

/// Pass/fail gate over the role resolver. Absence of any membership is a
/// not-found condition; a membership whose role falls outside `allowed` is
/// forbidden. The two must stay distinguishable for callers.
pub async fn require_role(
    members: &MembershipStore,
    user_id: &str,
    ctx: &RoleContext,
    allowed: &[MemberRole],
) -> Result<MemberRecord, AppError> {
    let member = resolve_role(members, user_id, ctx)
        .await?
        .ok_or_else(AppError::not_a_member)?;

    if allowed.contains(&member.role) {
        Ok(member)
    } else {
        Err(AppError::insufficient_role())
    }
}

/// Read-path gate: any role suffices, the user just has to be provisioned
/// into the context at all.
pub async fn validate_membership(
    members: &MembershipStore,
    user_id: &str,
    ctx: &RoleContext,
) -> Result<MemberRecord, AppError> {
    resolve_role(members, user_id, ctx)
        .await?
        .ok_or_else(AppError::not_a_member)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{add_member, create_user, create_workspace, setup_state};
    use axum::http::StatusCode;

    #[tokio::test]
    async fn guard_succeeds_exactly_when_role_is_allowed() {
        let (_dir, _db, state) = setup_state().await;
        let owner = create_user(&state, "owner@example.com").await;
        let editor = create_user(&state, "editor@example.com").await;
        let viewer = create_user(&state, "viewer@example.com").await;
        let workspace = create_workspace(&state, &owner, "Team").await;
        add_member(&state, &workspace, &editor, MemberRole::Editor).await;
        add_member(&state, &workspace, &viewer, MemberRole::Viewer).await;

        let ctx = RoleContext::workspace(workspace.id.clone());

        for (user, role, content_ok, admin_ok) in [
            (&owner, MemberRole::Admin, true, true),
            (&editor, MemberRole::Editor, true, false),
            (&viewer, MemberRole::Viewer, false, false),
        ] {
            let content = require_role(
                &state.membership_store,
                user.id.as_str(),
                &ctx,
                CONTENT_ROLES,
            )
            .await;
            assert_eq!(content.is_ok(), content_ok, "content gate for {role}");
            if let Ok(member) = &content {
                assert_eq!(member.role, role);
            }

            let admin =
                require_role(&state.membership_store, user.id.as_str(), &ctx, ADMIN_ONLY).await;
            assert_eq!(admin.is_ok(), admin_ok, "admin gate for {role}");
        }
    }

    #[tokio::test]
    async fn insufficient_role_and_missing_membership_are_distinct_failures() {
        let (_dir, _db, state) = setup_state().await;
        let owner = create_user(&state, "owner@example.com").await;
        let viewer = create_user(&state, "viewer@example.com").await;
        let stranger = create_user(&state, "stranger@example.com").await;
        let workspace = create_workspace(&state, &owner, "Team").await;
        add_member(&state, &workspace, &viewer, MemberRole::Viewer).await;

        let ctx = RoleContext::workspace(workspace.id.clone());

        let err = require_role(
            &state.membership_store,
            viewer.id.as_str(),
            &ctx,
            CONTENT_ROLES,
        )
        .await
        .expect_err("viewer must be rejected");
        assert_eq!(err.status(), StatusCode::FORBIDDEN);

        let err = require_role(
            &state.membership_store,
            stranger.id.as_str(),
            &ctx,
            CONTENT_ROLES,
        )
        .await
        .expect_err("stranger must be rejected");
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn membership_validation_accepts_any_role() {
        let (_dir, _db, state) = setup_state().await;
        let owner = create_user(&state, "owner@example.com").await;
        let viewer = create_user(&state, "viewer@example.com").await;
        let workspace = create_workspace(&state, &owner, "Team").await;
        add_member(&state, &workspace, &viewer, MemberRole::Viewer).await;

        let ctx = RoleContext::workspace(workspace.id.clone());
        let member = validate_membership(&state.membership_store, viewer.id.as_str(), &ctx)
            .await
            .expect("viewer can read");
        assert_eq!(member.role, MemberRole::Viewer);
    }
}
