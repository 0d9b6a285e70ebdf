use axum::{
    Json,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use clipdeck_core::space::{SpaceMember, SpaceRecord, SpaceType};
use serde::{Deserialize, Serialize};

use crate::{
    auth::authenticate_request,
    error::AppError,
    space::service::{self as space_service, CreateSpaceParams},
    state::AppState,
};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SpaceResponse {
    id: String,
    workspace_id: String,
    name: String,
    space_type: SpaceType,
    created_at: i64,
}

impl From<&SpaceRecord> for SpaceResponse {
    fn from(space: &SpaceRecord) -> Self {
        Self {
            id: space.id.as_str().to_owned(),
            workspace_id: space.workspace_id.as_str().to_owned(),
            name: space.name.clone(),
            space_type: space.space_type,
            created_at: space.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SpaceMemberResponse {
    member_id: String,
    user_id: String,
    role: clipdeck_core::membership::MemberRole,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
}

impl From<&SpaceMember> for SpaceMemberResponse {
    fn from(member: &SpaceMember) -> Self {
        Self {
            member_id: member.member_id.as_str().to_owned(),
            user_id: member.user_id.as_str().to_owned(),
            role: member.role,
            name: member.name.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ListSpacesQuery {
    workspace_id: String,
}

pub(crate) async fn list_spaces_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<ListSpacesQuery>,
) -> Result<Json<Vec<SpaceResponse>>, AppError> {
    let auth = authenticate_request(&state, &headers).await?;

    let spaces = space_service::list_spaces(&state, auth.user_id(), &query.workspace_id).await?;
    Ok(Json(spaces.iter().map(SpaceResponse::from).collect()))
}

pub(crate) async fn create_space_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<CreateSpaceParams>,
) -> Result<Response, AppError> {
    let auth = authenticate_request(&state, &headers).await?;

    let space = space_service::create_space(&state, auth.user_id(), payload).await?;
    Ok((StatusCode::CREATED, Json(SpaceResponse::from(&space))).into_response())
}

pub(crate) async fn get_space_handler(
    State(state): State<AppState>,
    Path(space_id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<SpaceResponse>, AppError> {
    let auth = authenticate_request(&state, &headers).await?;

    let space = space_service::get_space(&state, auth.user_id(), &space_id).await?;
    Ok(Json(SpaceResponse::from(&space)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct UpdateSpaceRequest {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    space_type: Option<SpaceType>,
}

pub(crate) async fn update_space_handler(
    State(state): State<AppState>,
    Path(space_id): Path<String>,
    headers: HeaderMap,
    Json(payload): Json<UpdateSpaceRequest>,
) -> Result<Json<SpaceResponse>, AppError> {
    let auth = authenticate_request(&state, &headers).await?;

    let space = space_service::update_space(
        &state,
        auth.user_id(),
        &space_id,
        payload.name.as_deref(),
        payload.space_type,
    )
    .await?;

    Ok(Json(SpaceResponse::from(&space)))
}

pub(crate) async fn delete_space_handler(
    State(state): State<AppState>,
    Path(space_id): Path<String>,
    headers: HeaderMap,
) -> Result<StatusCode, AppError> {
    let auth = authenticate_request(&state, &headers).await?;

    space_service::delete_space(&state, auth.user_id(), &space_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub(crate) async fn list_space_members_handler(
    State(state): State<AppState>,
    Path(space_id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<Vec<SpaceMemberResponse>>, AppError> {
    let auth = authenticate_request(&state, &headers).await?;

    let members = space_service::list_space_members(&state, auth.user_id(), &space_id).await?;
    Ok(Json(members.iter().map(SpaceMemberResponse::from).collect()))
}

pub(crate) async fn add_space_member_handler(
    State(state): State<AppState>,
    Path((space_id, user_id)): Path<(String, String)>,
    headers: HeaderMap,
) -> Result<StatusCode, AppError> {
    let auth = authenticate_request(&state, &headers).await?;

    space_service::add_member_to_space(&state, auth.user_id(), &space_id, &user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub(crate) async fn remove_space_member_handler(
    State(state): State<AppState>,
    Path((space_id, user_id)): Path<(String, String)>,
    headers: HeaderMap,
) -> Result<StatusCode, AppError> {
    let auth = authenticate_request(&state, &headers).await?;

    space_service::remove_member_from_space(&state, auth.user_id(), &space_id, &user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
