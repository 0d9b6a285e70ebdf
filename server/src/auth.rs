use axum::http::{HeaderMap, header::AUTHORIZATION};

use crate::{error::AppError, state::AppState, types::AuthenticatedSession};

const ACCESS_TOKEN_HEADER: &str = "x-access-token";

/// Resolve the caller's identity from a bearer credential. The token layer
/// is the trust boundary; everything downstream receives a verified user.
pub async fn authenticate_request(
    state: &AppState,
    headers: &HeaderMap,
) -> Result<AuthenticatedSession, AppError> {
    let Some(token) = bearer_token(headers) else {
        return Err(AppError::unauthorized("missing access token"));
    };

    let record = state
        .access_token_store
        .find_active_by_token(&token)
        .await
        .map_err(AppError::from_anyhow)?
        .ok_or_else(|| AppError::unauthorized("invalid or expired access token"))?;

    let user = state
        .user_store
        .find_by_id(record.user_id.as_str())
        .await
        .map_err(AppError::from_anyhow)?
        .ok_or_else(|| AppError::unauthorized("token user no longer exists"))?;

    Ok(AuthenticatedSession { user })
}

pub(crate) fn bearer_token(headers: &HeaderMap) -> Option<String> {
    if let Some(value) = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok()) {
        if let Some(token) = normalize_bearer(value) {
            return Some(token);
        }
    }

    headers
        .get(ACCESS_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(normalize_bearer)
}

pub(crate) fn normalize_bearer(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }

    if trimmed.len() > 7 && trimmed[0..7].eq_ignore_ascii_case("bearer ") {
        let token = trimmed[7..].trim();
        if token.is_empty() {
            None
        } else {
            Some(token.to_owned())
        }
    } else {
        Some(trimmed.to_owned())
    }
}
