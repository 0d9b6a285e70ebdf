use std::fmt;

use serde::Serialize;
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::{
    error::{AppError, UserFriendlyPayload},
    types::{AuthenticatedSession, SessionUser},
};

/// Identity attached to a socket for its whole lifetime, set by the connect
/// middleware after authentication succeeds.
#[derive(Clone)]
pub struct SocketUserContext {
    pub user_id: String,
    pub user: SessionUser,
}

impl SocketUserContext {
    pub fn new(session: &AuthenticatedSession) -> Self {
        Self {
            user_id: session.user_id().to_owned(),
            user: session.session_user(),
        }
    }
}

#[derive(Clone)]
pub struct SocketRequestContext {
    pub request_id: String,
}

impl SocketRequestContext {
    pub fn new(request_id: Option<&str>) -> Self {
        let id = request_id
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
            .map(|value| value.to_string())
            .unwrap_or_else(|| format!("ws-{}", Uuid::new_v4().simple()));

        Self { request_id: id }
    }
}

#[derive(Serialize)]
#[serde(untagged)]
pub enum SocketAck<T> {
    Data { data: T },
    Error { error: SocketAckError },
}

impl<T> SocketAck<T> {
    pub fn ok(data: T) -> Self {
        SocketAck::Data { data }
    }

    pub fn from_error(error: AppError, request_id: Option<&str>) -> Self {
        SocketAck::Error {
            error: SocketAckError::from_app_error(error, request_id),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SocketAckError {
    pub status: u16,
    pub code: String,
    #[serde(rename = "type")]
    pub error_type: String,
    pub name: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<JsonValue>,
    #[serde(rename = "requestId", skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

impl SocketAckError {
    pub fn from_app_error(error: AppError, request_id: Option<&str>) -> Self {
        let (status, payload) = error.into_payload();
        Self::from_payload(payload, status.as_u16(), request_id)
    }

    fn from_payload(payload: UserFriendlyPayload, status: u16, request_id: Option<&str>) -> Self {
        Self {
            status,
            code: payload.code,
            error_type: payload.error_type,
            name: payload.name,
            message: payload.message,
            data: payload.data,
            request_id: request_id.map(|id| id.to_string()),
        }
    }
}

impl fmt::Display for SocketAckError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}
