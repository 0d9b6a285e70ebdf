use std::collections::HashMap;

use clipdeck_core::{
    invite::{AcceptOutcome, DeclineOutcome, InviteRecord, InviteTarget},
    membership::MemberRole,
};
use serde::Serialize;
use tracing::info;

use crate::{
    access::{
        guard::{ADMIN_ONLY, require_role},
        resolver::RoleContext,
    },
    error::AppError,
    state::AppState,
};

pub(crate) fn validate_email(email: &str) -> Result<(), AppError> {
    let trimmed = email.trim();
    let valid = trimmed
        .split_once('@')
        .map(|(local, domain)| {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.')
        })
        .unwrap_or(false);

    if valid {
        Ok(())
    } else {
        Err(AppError::bad_request(format!(
            "invalid email address: {trimmed}"
        )))
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedInvites {
    #[serde(skip)]
    pub invites: Vec<InviteRecord>,
    pub invited_count: usize,
    /// Links the notification edge hands to receivers; present only when a
    /// base URL is configured.
    pub invite_urls: Vec<String>,
}

/// Invite a batch of emails into a workspace. Only the workspace owner may
/// invite; existing members and already-pending invites are skipped, and
/// the owner's member quota is enforced against members plus fresh invites.
pub async fn create_invites(
    state: &AppState,
    sender_user_id: &str,
    workspace_id: &str,
    emails: &[String],
    role: MemberRole,
) -> Result<CreatedInvites, AppError> {
    let workspace = state
        .workspace_store
        .find_by_id(workspace_id)
        .await
        .map_err(AppError::from_anyhow)?
        .ok_or_else(AppError::not_a_member)?;

    if workspace.owner_id.as_str() != sender_user_id {
        return Err(AppError::owner_required(
            "Only the workspace owner can invite members.",
        ));
    }

    for email in emails {
        validate_email(email)?;
    }

    let sender = state
        .user_store
        .find_by_id(sender_user_id)
        .await
        .map_err(AppError::from_anyhow)?
        .ok_or_else(|| AppError::unauthorized("sender no longer exists"))?;

    let member_count = state
        .membership_store
        .count_members(workspace_id)
        .await
        .map_err(AppError::from_anyhow)?;
    if member_count + emails.len() as i64 > sender.max_members {
        return Err(AppError::forbidden("Maximum member limit reached."));
    }

    let registered: HashMap<String, _> = state
        .user_store
        .find_by_emails(emails)
        .await
        .map_err(AppError::from_anyhow)?
        .into_iter()
        .map(|user| (user.email.clone(), user.id))
        .collect();

    let targets: Vec<InviteTarget> = emails
        .iter()
        .map(|email| InviteTarget {
            email: email.trim().to_owned(),
            user_id: registered.get(email.trim()).cloned(),
        })
        .collect();

    let invites = state
        .invite_store
        .create_pending_batch(workspace_id, sender_user_id, role, &targets)
        .await
        .map_err(AppError::from_anyhow)?;

    info!(
        workspace_id,
        invited = invites.len(),
        skipped = targets.len() - invites.len(),
        "invitations created"
    );

    let invite_urls = match &state.invite_link_base {
        Some(base) => invites
            .iter()
            .map(|invite| format!("{base}?token={}", invite.id))
            .collect(),
        None => Vec::new(),
    };

    Ok(CreatedInvites {
        invited_count: invites.len(),
        invite_urls,
        invites,
    })
}

pub async fn accept_invite(state: &AppState, token: &str) -> Result<InviteRecord, AppError> {
    if token.trim().is_empty() {
        return Err(AppError::bad_request("token is required"));
    }

    let outcome = state
        .invite_store
        .accept(token)
        .await
        .map_err(AppError::from_anyhow)?;

    match outcome {
        AcceptOutcome::Accepted { invite, member } => {
            info!(
                workspace_id = %invite.workspace_id,
                user_id = %member.user_id,
                "invitation accepted"
            );
            Ok(invite)
        }
        AcceptOutcome::AlreadyMember => Err(AppError::already_member()),
        AcceptOutcome::AlreadyResolved(_) => Err(AppError::invite_already_resolved()),
        AcceptOutcome::ReceiverUnregistered => Err(AppError::not_found(
            "No account exists for the invited email yet. Sign up first.",
        )),
        AcceptOutcome::NotFound => Err(AppError::invite_not_found()),
    }
}

pub async fn decline_invite(state: &AppState, token: &str) -> Result<InviteRecord, AppError> {
    if token.trim().is_empty() {
        return Err(AppError::bad_request("token is required"));
    }

    let outcome = state
        .invite_store
        .decline(token)
        .await
        .map_err(AppError::from_anyhow)?;

    match outcome {
        DeclineOutcome::Declined(invite) => Ok(invite),
        DeclineOutcome::AlreadyResolved(_) => Err(AppError::invite_already_resolved()),
        DeclineOutcome::NotFound => Err(AppError::invite_not_found()),
    }
}

/// Audit listing of a workspace's invites, for its admins.
pub async fn list_invites(
    state: &AppState,
    user_id: &str,
    workspace_id: &str,
) -> Result<Vec<InviteRecord>, AppError> {
    let ctx = RoleContext::workspace(workspace_id);
    require_role(&state.membership_store, user_id, &ctx, ADMIN_ONLY).await?;

    state
        .invite_store
        .list_for_workspace(workspace_id)
        .await
        .map_err(AppError::from_anyhow)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{add_member, create_user, create_workspace, setup_state};
    use axum::http::StatusCode;

    #[test]
    fn email_validation_rejects_junk() {
        assert!(validate_email("person@example.com").is_ok());
        assert!(validate_email("  padded@example.com ").is_ok());
        assert!(validate_email("bare").is_err());
        assert!(validate_email("@example.com").is_err());
        assert!(validate_email("user@nodot").is_err());
        assert!(validate_email("").is_err());
    }

    #[tokio::test]
    async fn only_the_owner_can_invite() {
        let (_dir, _db, state) = setup_state().await;
        let owner = create_user(&state, "owner@example.com").await;
        let admin = create_user(&state, "admin@example.com").await;
        let workspace = create_workspace(&state, &owner, "Team").await;
        add_member(
            &state,
            &workspace,
            &admin,
            clipdeck_core::membership::MemberRole::Admin,
        )
        .await;

        let err = create_invites(
            &state,
            admin.id.as_str(),
            workspace.id.as_str(),
            &["new@example.com".to_owned()],
            MemberRole::Editor,
        )
        .await
        .expect_err("co-admin cannot invite");
        assert_eq!(err.status(), StatusCode::FORBIDDEN);
        assert_eq!(err.name(), "OWNER_REQUIRED");
    }

    #[tokio::test]
    async fn inviting_twice_creates_one_pending_invite() {
        let (_dir, _db, state) = setup_state().await;
        let owner = create_user(&state, "owner@example.com").await;
        let workspace = create_workspace(&state, &owner, "Team").await;
        let emails = vec!["guest@example.com".to_owned()];

        let first = create_invites(
            &state,
            owner.id.as_str(),
            workspace.id.as_str(),
            &emails,
            MemberRole::Editor,
        )
        .await
        .expect("first");
        assert_eq!(first.invited_count, 1);

        let second = create_invites(
            &state,
            owner.id.as_str(),
            workspace.id.as_str(),
            &emails,
            MemberRole::Editor,
        )
        .await
        .expect("second");
        assert_eq!(second.invited_count, 0);

        let listed = list_invites(&state, owner.id.as_str(), workspace.id.as_str())
            .await
            .expect("list");
        assert_eq!(listed.len(), 1);
    }

    #[tokio::test]
    async fn accept_then_reaccept_maps_to_conflict() {
        let (_dir, _db, state) = setup_state().await;
        let owner = create_user(&state, "owner@example.com").await;
        let guest = create_user(&state, "guest@example.com").await;
        let workspace = create_workspace(&state, &owner, "Team").await;

        let created = create_invites(
            &state,
            owner.id.as_str(),
            workspace.id.as_str(),
            &[guest.email.clone()],
            MemberRole::Editor,
        )
        .await
        .expect("invite");
        let token = created.invites[0].id.as_str().to_owned();

        let accepted = accept_invite(&state, &token).await.expect("accept");
        assert_eq!(
            accepted.status,
            clipdeck_core::invite::InviteStatus::Accepted
        );

        let err = accept_invite(&state, &token)
            .await
            .expect_err("second accept");
        assert_eq!(err.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn invite_urls_are_built_from_the_configured_base() {
        let (_dir, _db, mut state) = setup_state().await;
        state.invite_link_base = Some("https://app.example.com/invites".to_owned());

        let owner = create_user(&state, "owner@example.com").await;
        let workspace = create_workspace(&state, &owner, "Team").await;

        let created = create_invites(
            &state,
            owner.id.as_str(),
            workspace.id.as_str(),
            &["guest@example.com".to_owned()],
            MemberRole::Editor,
        )
        .await
        .expect("invite");

        assert_eq!(created.invite_urls.len(), 1);
        assert!(
            created.invite_urls[0]
                .starts_with("https://app.example.com/invites?token=")
        );
    }

    #[tokio::test]
    async fn member_quota_limits_invitations() {
        let (_dir, _db, state) = setup_state().await;
        let owner = create_user(&state, "owner@example.com").await;
        let workspace = create_workspace(&state, &owner, "Team").await;

        let too_many: Vec<String> = (0..owner.max_members)
            .map(|idx| format!("guest{idx}@example.com"))
            .collect();

        let err = create_invites(
            &state,
            owner.id.as_str(),
            workspace.id.as_str(),
            &too_many,
            MemberRole::Editor,
        )
        .await
        .expect_err("quota exceeded");
        assert_eq!(err.status(), StatusCode::FORBIDDEN);
    }
}
