use axum::{
    Json,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use clipdeck_core::{
    membership::{MemberRole, MemberWithUser},
    workspace::{UserWorkspace, WorkspaceRecord},
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{
    auth::authenticate_request,
    error::AppError,
    state::AppState,
    workspace::{members, service as workspace_service},
};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WorkspaceResponse {
    id: String,
    name: String,
    owner_id: String,
    workspace_type: clipdeck_core::workspace::WorkspaceType,
    created_at: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    owned: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<MemberRole>,
}

impl From<&WorkspaceRecord> for WorkspaceResponse {
    fn from(workspace: &WorkspaceRecord) -> Self {
        Self {
            id: workspace.id.as_str().to_owned(),
            name: workspace.name.clone(),
            owner_id: workspace.owner_id.as_str().to_owned(),
            workspace_type: workspace.workspace_type,
            created_at: workspace.created_at,
            owned: None,
            role: None,
        }
    }
}

impl From<&UserWorkspace> for WorkspaceResponse {
    fn from(entry: &UserWorkspace) -> Self {
        Self {
            owned: Some(entry.owned),
            role: Some(entry.role),
            ..Self::from(&entry.workspace)
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct MemberResponse {
    member_id: String,
    user_id: String,
    role: MemberRole,
    email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    created_at: i64,
}

impl From<&MemberWithUser> for MemberResponse {
    fn from(member: &MemberWithUser) -> Self {
        Self {
            member_id: member.member_id.as_str().to_owned(),
            user_id: member.user_id.as_str().to_owned(),
            role: member.role,
            email: member.email.clone(),
            name: member.name.clone(),
            created_at: member.created_at,
        }
    }
}

pub(crate) async fn list_workspaces_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<WorkspaceResponse>>, AppError> {
    let auth = authenticate_request(&state, &headers).await?;

    let workspaces = workspace_service::list_workspaces(&state, auth.user_id()).await?;
    Ok(Json(workspaces.iter().map(WorkspaceResponse::from).collect()))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreateWorkspaceRequest {
    name: String,
    #[serde(default)]
    members: Vec<String>,
}

pub(crate) async fn create_workspace_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<CreateWorkspaceRequest>,
) -> Result<Response, AppError> {
    if payload.name.trim().is_empty() {
        return Err(AppError::bad_request("workspace name must not be empty"));
    }

    let auth = authenticate_request(&state, &headers).await?;

    let (workspace, invites) =
        workspace_service::create_workspace(&state, &auth.user, &payload.name, &payload.members)
            .await?;

    let body = json!({
        "workspace": WorkspaceResponse::from(&workspace),
        "invitedCount": invites.len(),
    });

    Ok((StatusCode::CREATED, Json(body)).into_response())
}

pub(crate) async fn get_workspace_handler(
    State(state): State<AppState>,
    Path(workspace_id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<WorkspaceResponse>, AppError> {
    let auth = authenticate_request(&state, &headers).await?;

    let workspace = workspace_service::get_workspace(&state, auth.user_id(), &workspace_id).await?;
    Ok(Json(WorkspaceResponse::from(&workspace)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RenameWorkspaceRequest {
    name: String,
}

pub(crate) async fn rename_workspace_handler(
    State(state): State<AppState>,
    Path(workspace_id): Path<String>,
    headers: HeaderMap,
    Json(payload): Json<RenameWorkspaceRequest>,
) -> Result<Json<WorkspaceResponse>, AppError> {
    let auth = authenticate_request(&state, &headers).await?;

    let workspace =
        workspace_service::rename_workspace(&state, auth.user_id(), &workspace_id, &payload.name)
            .await?;
    Ok(Json(WorkspaceResponse::from(&workspace)))
}

pub(crate) async fn delete_workspace_handler(
    State(state): State<AppState>,
    Path(workspace_id): Path<String>,
    headers: HeaderMap,
) -> Result<StatusCode, AppError> {
    let auth = authenticate_request(&state, &headers).await?;

    workspace_service::delete_workspace(&state, auth.user_id(), &workspace_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SelectedContextQuery {
    #[serde(default)]
    workspace_id: Option<String>,
    #[serde(default)]
    space_id: Option<String>,
    #[serde(default)]
    folder_id: Option<String>,
}

pub(crate) async fn selected_context_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<SelectedContextQuery>,
) -> Result<Json<workspace_service::SelectedContext>, AppError> {
    let auth = authenticate_request(&state, &headers).await?;

    let selection = workspace_service::selected_context(
        &state,
        &auth.user,
        query.workspace_id.as_deref(),
        query.space_id.as_deref(),
        query.folder_id.as_deref(),
    )
    .await?;

    Ok(Json(selection))
}

pub(crate) async fn list_members_handler(
    State(state): State<AppState>,
    Path(workspace_id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<Vec<MemberResponse>>, AppError> {
    let auth = authenticate_request(&state, &headers).await?;

    let listed = members::list_members(&state, auth.user_id(), &workspace_id).await?;
    Ok(Json(listed.iter().map(MemberResponse::from).collect()))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct UpdateMemberRoleRequest {
    role: MemberRole,
}

pub(crate) async fn update_member_role_handler(
    State(state): State<AppState>,
    Path((workspace_id, member_id)): Path<(String, String)>,
    headers: HeaderMap,
    Json(payload): Json<UpdateMemberRoleRequest>,
) -> Result<StatusCode, AppError> {
    let auth = authenticate_request(&state, &headers).await?;

    members::update_member_role(
        &state,
        auth.user_id(),
        &workspace_id,
        &member_id,
        payload.role,
    )
    .await?;

    Ok(StatusCode::NO_CONTENT)
}

pub(crate) async fn remove_member_handler(
    State(state): State<AppState>,
    Path((workspace_id, member_id)): Path<(String, String)>,
    headers: HeaderMap,
) -> Result<StatusCode, AppError> {
    let auth = authenticate_request(&state, &headers).await?;

    members::remove_member(&state, auth.user_id(), &workspace_id, &member_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub(crate) async fn leave_workspace_handler(
    State(state): State<AppState>,
    Path(workspace_id): Path<String>,
    headers: HeaderMap,
) -> Result<StatusCode, AppError> {
    let auth = authenticate_request(&state, &headers).await?;

    members::leave_workspace(&state, auth.user_id(), &workspace_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
