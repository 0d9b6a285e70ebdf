use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use crate::{error::AppError, state::AppState, workspace::service as workspace_service};

/// Called by the account system once an identity is verified; idempotent on
/// the user id.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ProvisionUserRequest {
    user_id: String,
    email: String,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ProvisionUserResponse {
    workspace_id: String,
    workspace_name: String,
    default_space_id: String,
}

pub(crate) async fn provision_user_handler(
    State(state): State<AppState>,
    Json(payload): Json<ProvisionUserRequest>,
) -> Result<Response, AppError> {
    if payload.user_id.trim().is_empty() {
        return Err(AppError::bad_request("userId must not be empty"));
    }

    let provisioned = workspace_service::provision_user(
        &state,
        payload.user_id.trim(),
        payload.email.trim(),
        payload.name.as_deref(),
    )
    .await?;

    let response = ProvisionUserResponse {
        workspace_id: provisioned.workspace.id.as_str().to_owned(),
        workspace_name: provisioned.workspace.name.clone(),
        default_space_id: provisioned.default_space.id.as_str().to_owned(),
    };

    Ok((StatusCode::CREATED, Json(response)).into_response())
}
