pub mod ack;
pub mod auth;
pub mod broadcast;
pub mod events;
pub mod presence;
pub mod rooms;
pub mod types;

use std::sync::Arc;

use socketioxide::{SocketIo, layer::SocketIoLayer};

use crate::state::AppState;

pub(crate) fn build_socket_layer(state: AppState) -> (SocketIoLayer, Arc<SocketIo>) {
    let shared = Arc::new(state);
    let (layer, io) = SocketIo::builder()
        .with_state(shared.clone())
        .build_layer();
    events::register_namespace(&io, shared);
    (layer, Arc::new(io))
}
