use std::sync::Arc;

use serde::{Deserialize, Serialize};
use socketioxide::{
    SocketIo,
    extract::{AckSender, Data, Extension, SocketRef},
    handler::ConnectHandler,
};
use tracing::{debug, info, warn};

use crate::{
    access::{guard::validate_membership, hierarchy::resolve_folder_context, resolver::RoleContext},
    error::AppError,
    socket::{
        ack::{ack_error, ack_ok},
        auth::SocketAuthMiddleware,
        rooms::RoomScope,
        types::{SocketRequestContext, SocketUserContext},
    },
    state::AppState,
};

pub(crate) fn register_namespace(io: &SocketIo, state: Arc<AppState>) {
    let middleware = SocketAuthMiddleware::new(state);
    let _ = io.ns("/", on_connect.with(middleware));
}

async fn on_connect(socket: SocketRef) {
    socket.on("watch", handle_watch);
    socket.on("unwatch", handle_unwatch);
    socket.on_disconnect(handle_disconnect);
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WatchRequest {
    #[serde(default)]
    folder_id: Option<String>,
    #[serde(default)]
    space_id: Option<String>,
    #[serde(default)]
    workspace_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WatchResponse {
    room: String,
    success: bool,
}

/// Resolve the requested scope and prove the caller may observe it before
/// the join. Authorization happens here, at subscription time; emission
/// later fans out to whoever made it into the room.
async fn resolve_watch_scope(
    state: &AppState,
    user_id: &str,
    payload: &WatchRequest,
) -> Result<RoomScope, AppError> {
    if let Some(folder_id) = &payload.folder_id {
        let folder = resolve_folder_context(&state.folder_store, folder_id).await?;
        let ctx = RoleContext::for_folder(&folder);
        validate_membership(&state.membership_store, user_id, &ctx).await?;
        return Ok(RoomScope::for_folder(&folder));
    }

    if let Some(space_id) = &payload.space_id {
        let ctx = RoleContext::space(space_id.as_str());
        validate_membership(&state.membership_store, user_id, &ctx).await?;
        return Ok(RoomScope::space(space_id.as_str()));
    }

    if let Some(workspace_id) = &payload.workspace_id {
        let ctx = RoleContext::workspace(workspace_id.as_str());
        validate_membership(&state.membership_store, user_id, &ctx).await?;
        return Ok(RoomScope::workspace(workspace_id.as_str()));
    }

    Err(AppError::bad_request(
        "watch requires a folderId, spaceId or workspaceId",
    ))
}

async fn handle_watch(
    socket: SocketRef,
    Data(payload): Data<WatchRequest>,
    ack: AckSender,
    Extension(user): Extension<SocketUserContext>,
    Extension(request): Extension<SocketRequestContext>,
    Extension(state): Extension<Arc<AppState>>,
) {
    let scope = match resolve_watch_scope(state.as_ref(), &user.user_id, &payload).await {
        Ok(scope) => scope,
        Err(err) => {
            warn!(
                request_id = %request.request_id,
                user_id = %user.user_id,
                error = %err,
                "socket watch denied"
            );
            ack_error::<WatchResponse>(ack, err, Some(&request.request_id));
            return;
        }
    };

    // scope resolution always yields a concrete room
    let Some(room) = scope.room_id() else {
        ack_error::<WatchResponse>(
            ack,
            AppError::bad_request("watch scope is empty"),
            Some(&request.request_id),
        );
        return;
    };

    socket.join(room.clone());
    info!(
        request_id = %request.request_id,
        user_id = %user.user_id,
        room = %room,
        "socket watch joined"
    );

    ack_ok(
        ack,
        WatchResponse {
            room,
            success: true,
        },
    );
}

async fn handle_unwatch(
    socket: SocketRef,
    Data(payload): Data<WatchRequest>,
    ack: AckSender,
    Extension(request): Extension<SocketRequestContext>,
) {
    let scope = RoomScope {
        folder_id: payload.folder_id.map(Into::into),
        space_id: payload.space_id.map(Into::into),
        workspace_id: payload.workspace_id.map(Into::into),
    };

    let Some(room) = scope.room_id() else {
        ack_error::<WatchResponse>(
            ack,
            AppError::bad_request("unwatch requires a folderId, spaceId or workspaceId"),
            Some(&request.request_id),
        );
        return;
    };

    socket.leave(room.clone());
    ack_ok(
        ack,
        WatchResponse {
            room,
            success: true,
        },
    );
}

async fn handle_disconnect(socket: SocketRef, Extension(state): Extension<Arc<AppState>>) {
    let connection_id = socket.id.to_string();
    if let Some(user_id) = state.presence.disconnect(&connection_id) {
        debug!(%user_id, %connection_id, "last session for user disconnected");
    } else {
        debug!(%connection_id, "socket disconnected");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{add_member, create_space, create_user, create_workspace, setup_state};
    use axum::http::StatusCode;
    use clipdeck_core::membership::MemberRole;

    #[tokio::test]
    async fn watch_scope_requires_membership_in_the_target() {
        let (_dir, _db, state) = setup_state().await;
        let owner = create_user(&state, "owner@example.com").await;
        let stranger = create_user(&state, "stranger@example.com").await;
        let workspace = create_workspace(&state, &owner, "Team").await;

        let request = WatchRequest {
            folder_id: None,
            space_id: None,
            workspace_id: Some(workspace.id.as_str().to_owned()),
        };

        let scope = resolve_watch_scope(&state, owner.id.as_str(), &request)
            .await
            .expect("member can watch");
        assert_eq!(
            scope.room_id().as_deref(),
            Some(format!("workspace:{}", workspace.id).as_str())
        );

        let err = resolve_watch_scope(&state, stranger.id.as_str(), &request)
            .await
            .expect_err("stranger cannot watch");
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn watching_a_folder_joins_its_own_room() {
        let (_dir, _db, state) = setup_state().await;
        let owner = create_user(&state, "owner@example.com").await;
        let viewer = create_user(&state, "viewer@example.com").await;
        let workspace = create_workspace(&state, &owner, "Team").await;
        add_member(&state, &workspace, &viewer, MemberRole::Viewer).await;
        let space = create_space(&state, &workspace, "Clips", &[&owner, &viewer]).await;

        let folder = state
            .folder_store
            .create(workspace.id.as_str(), Some(space.id.as_str()), None, "clip")
            .await
            .expect("create folder");

        let request = WatchRequest {
            folder_id: Some(folder.id.as_str().to_owned()),
            space_id: None,
            workspace_id: None,
        };

        let scope = resolve_watch_scope(&state, viewer.id.as_str(), &request)
            .await
            .expect("granted viewer watches");
        assert_eq!(
            scope.room_id().as_deref(),
            Some(format!("folder:{}", folder.id).as_str())
        );
    }

    #[tokio::test]
    async fn empty_watch_request_is_a_bad_request() {
        let (_dir, _db, state) = setup_state().await;
        let user = create_user(&state, "user@example.com").await;

        let err = resolve_watch_scope(
            &state,
            user.id.as_str(),
            &WatchRequest {
                folder_id: None,
                space_id: None,
                workspace_id: None,
            },
        )
        .await
        .expect_err("empty request");
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }
}
