//! Which directory entry belongs to this client

use crate::directory::EntityKey;
use log::{info, warn};

/// Local player identity, assigned by the server once per session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum LocalIdentity {
    #[default]
    Unset,
    Assigned(String),
}

impl LocalIdentity {
    pub fn new() -> Self {
        Self::Unset
    }

    /// Records the server-chosen id. Returns false if one was already assigned.
    pub fn assign(&mut self, player_id: String) -> bool {
        match self {
            LocalIdentity::Unset => {
                info!("Assigned player ID: {}", player_id);
                *self = LocalIdentity::Assigned(player_id);
                true
            }
            LocalIdentity::Assigned(current) => {
                warn!(
                    "Ignoring player ID {} (already assigned {})",
                    player_id, current
                );
                false
            }
        }
    }

    /// Forgets the id so the next session can assign a fresh one.
    pub fn reset(&mut self) {
        *self = LocalIdentity::Unset;
    }

    pub fn get(&self) -> Option<&str> {
        match self {
            LocalIdentity::Unset => None,
            LocalIdentity::Assigned(id) => Some(id),
        }
    }

    pub fn is_assigned(&self) -> bool {
        self.get().is_some()
    }

    pub fn player_key(&self) -> Option<EntityKey> {
        self.get().map(EntityKey::player)
    }
}
