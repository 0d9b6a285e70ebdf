use std::sync::Arc;

use once_cell::sync::OnceCell;
use socketioxide::SocketIo;

use clipdeck_core::{
    access_token::AccessTokenStore,
    config::AppConfig,
    db::Database,
    folder::FolderStore,
    invite::InviteStore,
    membership::MembershipStore,
    space::SpaceStore,
    user::UserStore,
    workspace::WorkspaceStore,
};

use crate::socket::{broadcast::Broadcaster, presence::PresenceRegistry};

#[derive(Clone)]
pub struct AppState {
    pub user_store: UserStore,
    pub workspace_store: WorkspaceStore,
    pub space_store: SpaceStore,
    pub folder_store: FolderStore,
    pub membership_store: MembershipStore,
    pub invite_store: InviteStore,
    pub access_token_store: AccessTokenStore,
    pub presence: Arc<PresenceRegistry>,
    pub broadcaster: Broadcaster,
    pub invite_link_base: Option<String>,
}

pub fn build_state(database: &Database, config: &AppConfig) -> AppState {
    let presence = Arc::new(PresenceRegistry::new());
    let socket_io: Arc<OnceCell<Arc<SocketIo>>> = Arc::new(OnceCell::new());
    let broadcaster = Broadcaster::new(socket_io, presence.clone());

    AppState {
        user_store: UserStore::new(database),
        workspace_store: WorkspaceStore::new(database),
        space_store: SpaceStore::new(database),
        folder_store: FolderStore::new(database),
        membership_store: MembershipStore::new(database),
        invite_store: InviteStore::new(database),
        access_token_store: AccessTokenStore::new(database),
        presence,
        broadcaster,
        invite_link_base: config.invite_link_base.clone(),
    }
}

impl AppState {
    /// Install the live socket handle once the layer has been built. Emits
    /// before this point are silently dropped.
    pub fn attach_socket_io(&self, io: Arc<SocketIo>) {
        let _ = self.broadcaster.socket_io().set(io);
    }
}
