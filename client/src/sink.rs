//! Collaborator interface for whatever presents the synchronized world

use crate::directory::{Entity, EntityDirectory, EntityKey, EntityState};
use log::debug;
use tokio::sync::mpsc;

/// Receives directory mutations as they are applied.
///
/// Rendering and GUI layers implement this to allocate visuals on create,
/// move them on update and release them on removal.
pub trait EntitySink {
    fn on_entity_created(&mut self, key: &EntityKey, state: &EntityState);

    fn on_entity_updated(&mut self, key: &EntityKey, state: &EntityState);

    fn on_entity_removed(&mut self, key: &EntityKey);

    /// Called after every broadcast that contains the local player.
    fn on_local_player_changed(&mut self, entity: &Entity);

    /// Called on the fixed render cadence with read access to the directory.
    fn on_render_tick(&mut self, _directory: &EntityDirectory) {}
}

/// Owned copy of one sink notification.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncEvent {
    Created(EntityKey, EntityState),
    Updated(EntityKey, EntityState),
    Removed(EntityKey),
    LocalPlayerChanged(Entity),
}

impl EntitySink for Vec<SyncEvent> {
    fn on_entity_created(&mut self, key: &EntityKey, state: &EntityState) {
        self.push(SyncEvent::Created(key.clone(), state.clone()));
    }

    fn on_entity_updated(&mut self, key: &EntityKey, state: &EntityState) {
        self.push(SyncEvent::Updated(key.clone(), state.clone()));
    }

    fn on_entity_removed(&mut self, key: &EntityKey) {
        self.push(SyncEvent::Removed(key.clone()));
    }

    fn on_local_player_changed(&mut self, entity: &Entity) {
        self.push(SyncEvent::LocalPlayerChanged(entity.clone()));
    }
}

/// Forwards events to another task, e.g. a UI thread.
impl EntitySink for mpsc::UnboundedSender<SyncEvent> {
    fn on_entity_created(&mut self, key: &EntityKey, state: &EntityState) {
        forward(self, SyncEvent::Created(key.clone(), state.clone()));
    }

    fn on_entity_updated(&mut self, key: &EntityKey, state: &EntityState) {
        forward(self, SyncEvent::Updated(key.clone(), state.clone()));
    }

    fn on_entity_removed(&mut self, key: &EntityKey) {
        forward(self, SyncEvent::Removed(key.clone()));
    }

    fn on_local_player_changed(&mut self, entity: &Entity) {
        forward(self, SyncEvent::LocalPlayerChanged(entity.clone()));
    }
}

fn forward(sender: &mpsc::UnboundedSender<SyncEvent>, event: SyncEvent) {
    if sender.send(event).is_err() {
        debug!("Sync event receiver dropped");
    }
}
