use axum::{
    Json,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use clipdeck_core::folder::FolderRecord;
use serde::{Deserialize, Serialize};

use crate::{
    auth::authenticate_request,
    error::AppError,
    folder::service::{
        self as folder_service, CreateFolderParams, MoveDestination,
    },
    state::AppState,
};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct FolderResponse {
    id: String,
    name: String,
    workspace_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    space_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    parent_folder_id: Option<String>,
    created_at: i64,
}

impl From<&FolderRecord> for FolderResponse {
    fn from(folder: &FolderRecord) -> Self {
        Self {
            id: folder.id.as_str().to_owned(),
            name: folder.name.clone(),
            workspace_id: folder.workspace_id.as_str().to_owned(),
            space_id: folder.space_id.as_ref().map(|id| id.as_str().to_owned()),
            parent_folder_id: folder
                .parent_folder_id
                .as_ref()
                .map(|id| id.as_str().to_owned()),
            created_at: folder.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ListFoldersQuery {
    workspace_id: String,
    #[serde(default)]
    parent_folder_id: Option<String>,
    #[serde(default)]
    space_id: Option<String>,
}

pub(crate) async fn list_folders_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<ListFoldersQuery>,
) -> Result<Json<Vec<FolderResponse>>, AppError> {
    let auth = authenticate_request(&state, &headers).await?;

    let folders = folder_service::list_folders(
        &state,
        auth.user_id(),
        &query.workspace_id,
        query.parent_folder_id.as_deref(),
        query.space_id.as_deref(),
    )
    .await?;

    Ok(Json(folders.iter().map(FolderResponse::from).collect()))
}

pub(crate) async fn create_folder_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<CreateFolderParams>,
) -> Result<Response, AppError> {
    let auth = authenticate_request(&state, &headers).await?;

    let folder = folder_service::create_folder(&state, auth.user_id(), payload).await?;

    Ok((StatusCode::CREATED, Json(FolderResponse::from(&folder))).into_response())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RenameFolderRequest {
    name: String,
}

pub(crate) async fn rename_folder_handler(
    State(state): State<AppState>,
    Path(folder_id): Path<String>,
    headers: HeaderMap,
    Json(payload): Json<RenameFolderRequest>,
) -> Result<Json<FolderResponse>, AppError> {
    let auth = authenticate_request(&state, &headers).await?;

    let folder =
        folder_service::rename_folder(&state, auth.user_id(), &folder_id, &payload.name).await?;

    Ok(Json(FolderResponse::from(&folder)))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct DeleteFolderResponse {
    removed: u64,
}

pub(crate) async fn delete_folder_handler(
    State(state): State<AppState>,
    Path(folder_id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<DeleteFolderResponse>, AppError> {
    let auth = authenticate_request(&state, &headers).await?;

    let removed = folder_service::delete_folder(&state, auth.user_id(), &folder_id).await?;

    Ok(Json(DeleteFolderResponse { removed }))
}

pub(crate) async fn move_folder_handler(
    State(state): State<AppState>,
    Path(folder_id): Path<String>,
    headers: HeaderMap,
    Json(destination): Json<MoveDestination>,
) -> Result<Json<FolderResponse>, AppError> {
    let auth = authenticate_request(&state, &headers).await?;

    let folder =
        folder_service::move_folder(&state, auth.user_id(), &folder_id, &destination).await?;

    Ok(Json(FolderResponse::from(&folder)))
}

pub(crate) async fn folder_ancestors_handler(
    State(state): State<AppState>,
    Path(folder_id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<Vec<FolderResponse>>, AppError> {
    let auth = authenticate_request(&state, &headers).await?;

    let chain = folder_service::folder_ancestors(&state, auth.user_id(), &folder_id).await?;

    Ok(Json(chain.iter().map(FolderResponse::from).collect()))
}
