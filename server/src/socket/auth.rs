use std::{str, sync::Arc};

use axum::http::header::AUTHORIZATION;
use serde_json::Value as JsonValue;
use socketioxide::adapter::Adapter;
use socketioxide::handler::{ConnectMiddleware, Value};
use tracing::{info, warn};

use crate::{
    auth::normalize_bearer,
    error::AppError,
    socket::{
        rooms::user_room,
        types::{SocketRequestContext, SocketUserContext},
    },
    state::AppState,
    types::AuthenticatedSession,
};

/// Connection gate: a socket is either authenticated before it finishes the
/// handshake or it is rejected — no room join and no presence entry happens
/// for an anonymous connection.
#[derive(Clone)]
pub(crate) struct SocketAuthMiddleware {
    state: Arc<AppState>,
}

impl SocketAuthMiddleware {
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }

    fn token_from_payload(auth: Option<&Value>, query: Option<&str>) -> Option<String> {
        if let Some(value) = auth {
            if let Some(as_str) = value.as_str() {
                if let Some(token) = Self::parse_handshake_token(as_str.as_ref()) {
                    return Some(token);
                }
            } else if let Some(bytes) = value.as_bytes() {
                if let Ok(text) = str::from_utf8(bytes.as_ref()) {
                    if let Some(token) = Self::parse_handshake_token(text) {
                        return Some(token);
                    }
                }
            }
        }

        query.and_then(Self::parse_handshake_token)
    }

    /// Accepts the shapes clients actually send: a JSON object with a token
    /// field, a bare token string, or query-style `token=...` pairs.
    fn parse_handshake_token(payload: &str) -> Option<String> {
        let trimmed = payload.trim();
        if trimmed.is_empty() {
            return None;
        }

        if let Ok(json) = serde_json::from_str::<JsonValue>(trimmed) {
            return match json {
                JsonValue::Object(map) => ["token", "accessToken", "authorization"]
                    .iter()
                    .find_map(|key| map.get(*key))
                    .and_then(|value| value.as_str())
                    .and_then(normalize_bearer),
                JsonValue::String(inner) => normalize_bearer(&inner),
                _ => None,
            };
        }

        if trimmed.contains('=') {
            for pair in trimmed.split('&') {
                let mut iter = pair.splitn(2, '=');
                let key = iter.next().unwrap_or_default();
                let value = iter.next().unwrap_or_default();
                if key.eq_ignore_ascii_case("token") || key.eq_ignore_ascii_case("access_token") {
                    if let Some(token) = normalize_bearer(value) {
                        return Some(token);
                    }
                }
            }
            return None;
        }

        normalize_bearer(trimmed)
    }

    fn format_error(error: AppError, request_id: Option<&str>) -> String {
        let (status, payload) = error.into_payload();
        match serde_json::to_string(&serde_json::json!({
            "status": status.as_u16(),
            "code": payload.code,
            "type": payload.error_type,
            "name": payload.name,
            "message": payload.message,
            "requestId": request_id,
        })) {
            Ok(serialized) => serialized,
            Err(err) => {
                warn!(?err, "failed to serialize websocket auth error");
                payload.message
            }
        }
    }

    async fn authenticate(&self, token: &str) -> Result<AuthenticatedSession, AppError> {
        let record = self
            .state
            .access_token_store
            .find_active_by_token(token)
            .await
            .map_err(AppError::from_anyhow)?
            .ok_or_else(|| AppError::unauthorized("invalid or expired access token"))?;

        let user = self
            .state
            .user_store
            .find_by_id(record.user_id.as_str())
            .await
            .map_err(AppError::from_anyhow)?
            .ok_or_else(|| AppError::unauthorized("token user no longer exists"))?;

        Ok(AuthenticatedSession { user })
    }
}

impl<A> ConnectMiddleware<A, ()> for SocketAuthMiddleware
where
    A: Adapter + 'static,
{
    fn call<'a>(
        &'a self,
        socket: Arc<socketioxide::socket::Socket<A>>,
        auth: &'a Option<Value>,
    ) -> impl futures_util::Future<
        Output = Result<(), Box<dyn std::fmt::Display + std::marker::Send + 'static>>,
    > + std::marker::Send {
        let state = self.state.clone();
        let middleware = self.clone();

        Box::pin(async move {
            let parts = socket.req_parts();

            let request_id_header = parts
                .headers
                .get("x-request-id")
                .and_then(|value| value.to_str().ok());
            let request_context = SocketRequestContext::new(request_id_header);

            let header_token = parts
                .headers
                .get(AUTHORIZATION)
                .or_else(|| parts.headers.get("x-access-token"))
                .and_then(|value| value.to_str().ok())
                .and_then(normalize_bearer);

            let token = header_token
                .or_else(|| Self::token_from_payload(auth.as_ref(), parts.uri.query()));

            let Some(token) = token else {
                let formatted = Self::format_error(
                    AppError::unauthorized("missing access token"),
                    Some(&request_context.request_id),
                );
                return Err(Box::new(formatted) as Box<dyn std::fmt::Display + Send>);
            };

            let session = match middleware.authenticate(&token).await {
                Ok(session) => session,
                Err(err) => {
                    warn!(error = %err, "socket authentication refused");
                    let formatted = Self::format_error(err, Some(&request_context.request_id));
                    return Err(Box::new(formatted) as Box<dyn std::fmt::Display + Send>);
                }
            };

            let socket_ref = socketioxide::extract::SocketRef::from(socket.clone());
            let user_context = SocketUserContext::new(&session);
            let user_id = user_context.user_id.clone();

            socket_ref.extensions.insert(request_context.clone());
            socket_ref.extensions.insert(state.clone());
            socket_ref.extensions.insert(user_context);

            socket_ref.join(user_room(&user_id));
            state.presence.connect(&user_id, &socket_ref.id.to_string());

            info!(
                request_id = %request_context.request_id,
                user_id = %user_id,
                socket_id = %socket_ref.id,
                "socket authenticated"
            );

            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handshake_token_accepts_json_payloads() {
        let payload = serde_json::json!({ "token": "Bearer cd_abc" }).to_string();
        assert_eq!(
            SocketAuthMiddleware::parse_handshake_token(&payload),
            Some("cd_abc".to_owned())
        );

        let alt = serde_json::json!({ "accessToken": "cd_xyz" }).to_string();
        assert_eq!(
            SocketAuthMiddleware::parse_handshake_token(&alt),
            Some("cd_xyz".to_owned())
        );
    }

    #[test]
    fn handshake_token_accepts_query_pairs_and_bare_strings() {
        assert_eq!(
            SocketAuthMiddleware::parse_handshake_token("token=cd_abc&foo=bar"),
            Some("cd_abc".to_owned())
        );
        assert_eq!(
            SocketAuthMiddleware::parse_handshake_token("cd_raw"),
            Some("cd_raw".to_owned())
        );
        assert_eq!(SocketAuthMiddleware::parse_handshake_token("   "), None);
        assert_eq!(SocketAuthMiddleware::parse_handshake_token("foo=bar"), None);
    }

    #[test]
    fn auth_errors_serialize_with_request_id() {
        let serialized = SocketAuthMiddleware::format_error(
            AppError::unauthorized("missing access token"),
            Some("req-1"),
        );
        let json: serde_json::Value = serde_json::from_str(&serialized).expect("valid json");
        assert_eq!(json["status"], 401);
        assert_eq!(json["message"], "missing access token");
        assert_eq!(json["requestId"], "req-1");
    }
}
