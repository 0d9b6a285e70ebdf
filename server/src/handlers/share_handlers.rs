use axum::{Json, extract::State, http::HeaderMap};
use serde::{Deserialize, Serialize};

use crate::{
    access::hierarchy::{ShareDestination, ShareSource, check_share_permission},
    auth::authenticate_request,
    error::AppError,
    state::AppState,
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SharePermissionRequest {
    source: ShareSource,
    destination: ShareDestination,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SharePermissionResponse {
    permission: &'static str,
}

pub(crate) async fn share_permission_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<SharePermissionRequest>,
) -> Result<Json<SharePermissionResponse>, AppError> {
    let auth = authenticate_request(&state, &headers).await?;

    check_share_permission(
        &state,
        auth.user_id(),
        &payload.source,
        &payload.destination,
    )
    .await?;

    Ok(Json(SharePermissionResponse {
        permission: "granted",
    }))
}
