use axum::{
    Json,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use clipdeck_core::{
    invite::{InviteRecord, InviteStatus},
    membership::MemberRole,
};
use serde::{Deserialize, Serialize};

use crate::{
    auth::authenticate_request,
    error::AppError,
    invitation::service as invitation_service,
    state::AppState,
};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct InviteResponse {
    id: String,
    workspace_id: String,
    sender_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    receiver_id: Option<String>,
    receiver_email: String,
    role: MemberRole,
    status: InviteStatus,
    created_at: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    resolved_at: Option<i64>,
}

impl From<&InviteRecord> for InviteResponse {
    fn from(invite: &InviteRecord) -> Self {
        Self {
            id: invite.id.as_str().to_owned(),
            workspace_id: invite.workspace_id.as_str().to_owned(),
            sender_id: invite.sender_id.as_str().to_owned(),
            receiver_id: invite.receiver_id.as_ref().map(|id| id.as_str().to_owned()),
            receiver_email: invite.receiver_email.clone(),
            role: invite.role,
            status: invite.status,
            created_at: invite.created_at,
            resolved_at: invite.resolved_at,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreateInvitesRequest {
    emails: Vec<String>,
    #[serde(default)]
    role: Option<MemberRole>,
}

pub(crate) async fn create_invites_handler(
    State(state): State<AppState>,
    Path(workspace_id): Path<String>,
    headers: HeaderMap,
    Json(payload): Json<CreateInvitesRequest>,
) -> Result<Response, AppError> {
    if payload.emails.is_empty() {
        return Err(AppError::bad_request("at least one email is required"));
    }

    let auth = authenticate_request(&state, &headers).await?;

    let created = invitation_service::create_invites(
        &state,
        auth.user_id(),
        &workspace_id,
        &payload.emails,
        payload.role.unwrap_or(MemberRole::Editor),
    )
    .await?;

    Ok((StatusCode::CREATED, Json(created)).into_response())
}

pub(crate) async fn list_invites_handler(
    State(state): State<AppState>,
    Path(workspace_id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<Vec<InviteResponse>>, AppError> {
    let auth = authenticate_request(&state, &headers).await?;

    let invites =
        invitation_service::list_invites(&state, auth.user_id(), &workspace_id).await?;
    Ok(Json(invites.iter().map(InviteResponse::from).collect()))
}

pub(crate) async fn accept_invite_handler(
    State(state): State<AppState>,
    Path(token): Path<String>,
    headers: HeaderMap,
) -> Result<Json<InviteResponse>, AppError> {
    // acceptance itself is keyed by the invite token; the bearer credential
    // still has to be valid to reach this surface
    authenticate_request(&state, &headers).await?;

    let invite = invitation_service::accept_invite(&state, &token).await?;
    Ok(Json(InviteResponse::from(&invite)))
}

pub(crate) async fn decline_invite_handler(
    State(state): State<AppState>,
    Path(token): Path<String>,
    headers: HeaderMap,
) -> Result<Json<InviteResponse>, AppError> {
    authenticate_request(&state, &headers).await?;

    let invite = invitation_service::decline_invite(&state, &token).await?;
    Ok(Json(InviteResponse::from(&invite)))
}
