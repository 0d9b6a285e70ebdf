use axum::{
    Router,
    http::Method,
    routing::{get, patch, post},
};
use tower_http::{
    cors::{AllowHeaders, AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    handlers::{
        folder_handlers::*, health_handlers::*, invite_handlers::*, share_handlers::*,
        space_handlers::*, user_handlers::*, workspace_handlers::*,
    },
    state::AppState,
};

pub fn build_router(state: AppState) -> Router {
    let (socket_layer, socket_io) = crate::socket::build_socket_layer(state.clone());
    state.attach_socket_io(socket_io);

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true);

    Router::new()
        .route("/", get(index_handler))
        .route("/health", get(health_handler))
        // Account provisioning
        .route("/api/users/provision", post(provision_user_handler))
        // Workspaces
        .route(
            "/api/workspaces",
            get(list_workspaces_handler).post(create_workspace_handler),
        )
        .route("/api/workspaces/selected", get(selected_context_handler))
        .route(
            "/api/workspaces/{workspace_id}",
            get(get_workspace_handler)
                .patch(rename_workspace_handler)
                .delete(delete_workspace_handler),
        )
        .route(
            "/api/workspaces/{workspace_id}/members",
            get(list_members_handler),
        )
        .route(
            "/api/workspaces/{workspace_id}/members/{member_id}",
            patch(update_member_role_handler).delete(remove_member_handler),
        )
        .route(
            "/api/workspaces/{workspace_id}/leave",
            post(leave_workspace_handler),
        )
        // Invitations
        .route(
            "/api/workspaces/{workspace_id}/invites",
            get(list_invites_handler).post(create_invites_handler),
        )
        .route("/api/invites/{token}/accept", post(accept_invite_handler))
        .route("/api/invites/{token}/decline", post(decline_invite_handler))
        // Spaces
        .route(
            "/api/spaces",
            get(list_spaces_handler).post(create_space_handler),
        )
        .route(
            "/api/spaces/{space_id}",
            get(get_space_handler)
                .patch(update_space_handler)
                .delete(delete_space_handler),
        )
        .route(
            "/api/spaces/{space_id}/members",
            get(list_space_members_handler),
        )
        .route(
            "/api/spaces/{space_id}/members/{user_id}",
            post(add_space_member_handler).delete(remove_space_member_handler),
        )
        // Folders
        .route(
            "/api/folders",
            get(list_folders_handler).post(create_folder_handler),
        )
        .route(
            "/api/folders/{folder_id}",
            patch(rename_folder_handler).delete(delete_folder_handler),
        )
        .route("/api/folders/{folder_id}/move", post(move_folder_handler))
        .route(
            "/api/folders/{folder_id}/ancestors",
            get(folder_ancestors_handler),
        )
        // Sharing
        .route("/api/share/permission", post(share_permission_handler))
        .layer(socket_layer)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
