use std::collections::HashSet;

use dashmap::DashMap;

/// Live mapping from authenticated user to their connected sessions. A user
/// can hold several simultaneous connections (tabs, devices); dropping one
/// leaves the rest untouched. Entries exist only between a successful
/// handshake and the matching disconnect — nothing survives a restart.
#[derive(Default)]
pub struct PresenceRegistry {
    users: DashMap<String, HashSet<String>>,
    connections: DashMap<String, String>,
}

impl PresenceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connect(&self, user_id: &str, connection_id: &str) {
        self.connections
            .insert(connection_id.to_owned(), user_id.to_owned());
        self.users
            .entry(user_id.to_owned())
            .or_default()
            .insert(connection_id.to_owned());
    }

    /// Remove one connection. Returns the owning user when this was their
    /// last live session.
    pub fn disconnect(&self, connection_id: &str) -> Option<String> {
        let (_, user_id) = self.connections.remove(connection_id)?;

        let mut last_session = false;
        if let Some(mut sessions) = self.users.get_mut(&user_id) {
            sessions.remove(connection_id);
            last_session = sessions.is_empty();
        }
        if last_session {
            self.users.remove(&user_id);
        }

        last_session.then_some(user_id)
    }

    pub fn is_online(&self, user_id: &str) -> bool {
        self.users
            .get(user_id)
            .map(|sessions| !sessions.is_empty())
            .unwrap_or(false)
    }

    pub fn sessions_for(&self, user_id: &str) -> Vec<String> {
        self.users
            .get(user_id)
            .map(|sessions| sessions.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }
}
