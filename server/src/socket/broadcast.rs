use std::sync::Arc;

use once_cell::sync::OnceCell;
use serde_json::Value as JsonValue;
use socketioxide::SocketIo;
use tracing::{debug, warn};

use super::{
    presence::PresenceRegistry,
    rooms::{RoomScope, user_room},
};

pub const FOLDER_CREATED: &str = "folder:created";
pub const FOLDER_RENAMED: &str = "folder:renamed";
pub const FOLDER_DELETED: &str = "folder:deleted";
pub const FOLDER_MOVED: &str = "folder:moved";
pub const WORKSPACE_CREATED: &str = "workspace:created";

/// Emission half of the routing layer. Delivery is best-effort and
/// at-most-once per connected client: a room with no listeners, a user with
/// no live sessions, or a transport hiccup is a no-op, never an operation
/// failure.
#[derive(Clone)]
pub struct Broadcaster {
    socket_io: Arc<OnceCell<Arc<SocketIo>>>,
    presence: Arc<PresenceRegistry>,
}

impl Broadcaster {
    pub fn new(socket_io: Arc<OnceCell<Arc<SocketIo>>>, presence: Arc<PresenceRegistry>) -> Self {
        Self {
            socket_io,
            presence,
        }
    }

    pub(crate) fn socket_io(&self) -> &OnceCell<Arc<SocketIo>> {
        &self.socket_io
    }

    pub async fn to_scope(&self, scope: &RoomScope, event: &str, payload: JsonValue) {
        let Some(room) = scope.room_id() else {
            warn!(event, "dropping broadcast with an empty scope");
            return;
        };

        self.emit_to_room(room, event, payload).await;
    }

    /// User-targeted emission. The presence registry decides whether anyone
    /// is listening; offline users miss the event and re-fetch on reconnect.
    pub async fn to_user(&self, user_id: &str, event: &str, payload: JsonValue) {
        if !self.presence.is_online(user_id) {
            debug!(user_id, event, "no live sessions, dropping user event");
            return;
        }

        self.emit_to_room(user_room(user_id), event, payload).await;
    }

    async fn emit_to_room(&self, room: String, event: &str, payload: JsonValue) {
        let Some(io) = self.socket_io.get() else {
            debug!(room, event, "socket transport not attached, dropping event");
            return;
        };

        let Some(ns) = io.of("/") else {
            warn!(room, event, "default namespace missing");
            return;
        };

        if let Err(err) = ns.to(room.clone()).emit(event, &payload).await {
            warn!(?err, room, event, "failed to emit broadcast");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Emitting to a user with zero live connections returns normally; no
    /// transport is even consulted.
    #[tokio::test]
    async fn offline_user_emission_is_a_silent_no_op() {
        let presence = Arc::new(PresenceRegistry::new());
        let broadcaster = Broadcaster::new(Arc::new(OnceCell::new()), presence);

        broadcaster
            .to_user("nobody", WORKSPACE_CREATED, serde_json::json!({}))
            .await;
    }

    #[tokio::test]
    async fn empty_scope_emission_is_a_silent_no_op() {
        let presence = Arc::new(PresenceRegistry::new());
        let broadcaster = Broadcaster::new(Arc::new(OnceCell::new()), presence);

        broadcaster
            .to_scope(&RoomScope::default(), FOLDER_CREATED, serde_json::json!({}))
            .await;
    }

    /// Before the socket layer is attached, a populated presence entry still
    /// must not error out of an emit.
    #[tokio::test]
    async fn online_user_without_transport_drops_quietly() {
        let presence = Arc::new(PresenceRegistry::new());
        presence.connect("u-1", "conn-a");
        let broadcaster = Broadcaster::new(Arc::new(OnceCell::new()), presence);

        broadcaster
            .to_user("u-1", WORKSPACE_CREATED, serde_json::json!({"workspaceId": "w"}))
            .await;
    }
}
