use crate::directory::{Entity, EntityDirectory, EntityKey, EntityKind};
use crate::identity::LocalIdentity;
use crate::sink::EntitySink;
use log::{debug, info};
use shared::{ClientMessage, EntityData, ServerMessage, Snapshot};
use std::collections::HashSet;

/// Counts of operations produced by one broadcast.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub created: usize,
    pub updated: usize,
    pub removed: usize,
}

/// Client view of the world for one socket session.
///
/// The server is the single source of truth: every broadcast replaces the
/// directory's contents wholesale, creating, updating and pruning entities so
/// that its key set matches the broadcast exactly.
#[derive(Debug, Default)]
pub struct ClientGameState {
    pub directory: EntityDirectory,
    pub identity: LocalIdentity,
    next_generation: u64,
}

impl ClientGameState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn local_player(&self) -> Option<&Entity> {
        self.identity
            .player_key()
            .and_then(|key| self.directory.get(&key))
    }

    pub fn handle_server_message<S: EntitySink + ?Sized>(
        &mut self,
        message: ServerMessage,
        sink: &mut S,
    ) {
        match message {
            ServerMessage::AssignId { player_id } => {
                if self.identity.assign(player_id) {
                    if let Some(entity) = self.local_player() {
                        sink.on_local_player_changed(entity);
                    }
                }
            }
            ServerMessage::Broadcast(snapshot) => {
                let report = self.apply_broadcast(&snapshot, sink);
                debug!(
                    "Broadcast applied: {} created, {} updated, {} removed",
                    report.created, report.updated, report.removed
                );
            }
        }
    }

    pub fn apply_broadcast<S: EntitySink + ?Sized>(
        &mut self,
        snapshot: &Snapshot,
        sink: &mut S,
    ) -> ReconcileReport {
        let mut report = ReconcileReport::default();
        let entries = snapshot_entries(snapshot);
        let stale: Vec<EntityKey> = {
            let server_keys: HashSet<&EntityKey> = entries.iter().map(|(key, _)| key).collect();
            self.directory
                .keys()
                .filter(|key| !server_keys.contains(key))
                .cloned()
                .collect()
        };

        for key in stale {
            info!("Removing {} not in server state", key);
            self.directory.remove(&key);
            sink.on_entity_removed(&key);
            report.removed += 1;
        }

        for (key, data) in entries {
            if let Some(inner_id) = data.id.as_deref() {
                if inner_id != key.id {
                    debug!("{} carries mismatched id {}", key, inner_id);
                }
            }

            if let Some(entity) = self.directory.get_mut(&key) {
                entity.update(data);
                sink.on_entity_updated(&entity.key, &entity.state);
                report.updated += 1;
                continue;
            }

            info!("Creating new {}", key);
            self.next_generation += 1;
            let entity = Entity::new(key, self.next_generation, data);
            sink.on_entity_created(&entity.key, &entity.state);
            self.directory.insert(entity);
            report.created += 1;
        }

        if let Some(entity) = self.local_player() {
            sink.on_local_player_changed(entity);
        }

        report
    }

    /// Applies a shoot or reload intent to the local weapon ahead of the server.
    ///
    /// Returns true when the weapon changed. The next broadcast overwrites it.
    pub fn predict_action<S: EntitySink + ?Sized>(
        &mut self,
        message: &ClientMessage,
        sink: &mut S,
    ) -> bool {
        let Some(key) = self.identity.player_key() else {
            return false;
        };
        let Some(entity) = self.directory.get_mut(&key) else {
            return false;
        };
        let Some(weapon) = entity.state.weapon.as_mut() else {
            return false;
        };

        let changed = match message {
            ClientMessage::Shoot { .. } => weapon.shoot(),
            ClientMessage::Reload { .. } => weapon.reload() > 0,
            ClientMessage::Move { .. } | ClientMessage::Rotate { .. } => false,
        };

        if changed {
            sink.on_local_player_changed(entity);
        }
        changed
    }

    /// A new connection starts a new session with no identity.
    pub fn begin_session(&mut self) {
        self.identity.reset();
    }

    /// Drops every known entity, reporting each removal.
    pub fn end_session<S: EntitySink + ?Sized>(&mut self, sink: &mut S) {
        let removed = self.directory.drain_keys();
        if !removed.is_empty() {
            info!("Session ended, releasing {} entities", removed.len());
        }
        for key in removed {
            sink.on_entity_removed(&key);
        }
    }
}

fn snapshot_entries(snapshot: &Snapshot) -> Vec<(EntityKey, &EntityData)> {
    let players = snapshot
        .players
        .iter()
        .map(|(id, data)| (EntityKey::new(EntityKind::Player, id.clone()), data));
    let boxes = snapshot
        .boxes
        .iter()
        .map(|(id, data)| (EntityKey::new(EntityKind::Box, id.clone()), data));
    let projectiles = snapshot
        .projectiles
        .iter()
        .map(|(id, data)| (EntityKey::new(EntityKind::Projectile, id.clone()), data));

    players.chain(boxes).chain(projectiles).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::SyncEvent;
    use shared::WeaponData;
    use std::collections::BTreeSet;

    fn player(id: &str, health: f64, score: f64) -> EntityData {
        EntityData {
            id: Some(id.to_string()),
            x: Some(0.0),
            y: Some(0.0),
            angle: Some(0.0),
            health: Some(health),
            score: Some(score),
            ..Default::default()
        }
    }

    fn snapshot(players: &[(&str, EntityData)]) -> Snapshot {
        Snapshot {
            players: players
                .iter()
                .map(|(id, data)| (id.to_string(), data.clone()))
                .collect(),
            ..Default::default()
        }
    }

    fn keys(state: &ClientGameState) -> BTreeSet<String> {
        state.directory.keys().map(|key| key.to_string()).collect()
    }

    fn count(events: &[SyncEvent], pred: impl Fn(&SyncEvent) -> bool) -> usize {
        events.iter().filter(|event| pred(event)).count()
    }

    #[test]
    fn test_create_update_remove_scenario() {
        let mut state = ClientGameState::new();
        let mut events: Vec<SyncEvent> = Vec::new();
        let p1 = EntityKey::player("p1");

        state.apply_broadcast(&snapshot(&[("p1", player("p1", 100.0, 0.0))]), &mut events);
        state.apply_broadcast(
            &snapshot(&[
                ("p1", player("p1", 60.0, 10.0)),
                ("p2", player("p2", 100.0, 0.0)),
            ]),
            &mut events,
        );
        assert_eq!(state.directory.get(&p1).unwrap().state.health, 60);

        state.apply_broadcast(&snapshot(&[("p2", player("p2", 100.0, 0.0))]), &mut events);

        assert_eq!(keys(&state), BTreeSet::from(["player:p2".to_string()]));
        assert_eq!(
            count(&events, |e| matches!(e, SyncEvent::Created(k, _) if *k == p1)),
            1
        );
        assert_eq!(
            count(&events, |e| matches!(e, SyncEvent::Updated(k, _) if *k == p1)),
            1
        );
        assert_eq!(
            count(&events, |e| matches!(e, SyncEvent::Removed(k) if *k == p1)),
            1
        );
    }

    #[test]
    fn test_converges_to_last_broadcast() {
        let mut state = ClientGameState::new();
        let mut events: Vec<SyncEvent> = Vec::new();
        let broadcasts = [
            snapshot(&[("a", player("a", 100.0, 0.0)), ("b", player("b", 100.0, 0.0))]),
            snapshot(&[("c", player("c", 100.0, 0.0))]),
            snapshot(&[]),
            snapshot(&[("b", player("b", 50.0, 3.0)), ("d", player("d", 100.0, 0.0))]),
        ];

        for broadcast in &broadcasts {
            state.apply_broadcast(broadcast, &mut events);
            let expected: BTreeSet<String> = broadcast
                .players
                .keys()
                .map(|id| format!("player:{}", id))
                .collect();
            assert_eq!(keys(&state), expected);
        }
    }

    #[test]
    fn test_replay_is_idempotent() {
        let mut state = ClientGameState::new();
        let mut events: Vec<SyncEvent> = Vec::new();
        let last = snapshot(&[("a", player("a", 80.0, 2.0)), ("b", player("b", 40.0, 9.0))]);

        state.apply_broadcast(&last, &mut events);
        let before: Vec<Entity> = {
            let mut entities: Vec<Entity> = state.directory.iter().cloned().collect();
            entities.sort_by(|a, b| a.key.cmp(&b.key));
            entities
        };

        let report = state.apply_broadcast(&last, &mut events);
        let mut after: Vec<Entity> = state.directory.iter().cloned().collect();
        after.sort_by(|a, b| a.key.cmp(&b.key));

        assert_eq!(before, after);
        assert_eq!(
            report,
            ReconcileReport {
                created: 0,
                updated: 2,
                removed: 0
            }
        );
    }

    #[test]
    fn test_no_resurrection_without_reappearance() {
        let mut state = ClientGameState::new();
        let mut events: Vec<SyncEvent> = Vec::new();
        let a = EntityKey::player("a");

        state.apply_broadcast(&snapshot(&[("a", player("a", 100.0, 0.0))]), &mut events);
        let first_generation = state.directory.get(&a).unwrap().generation;

        state.apply_broadcast(&snapshot(&[]), &mut events);
        state.apply_broadcast(&snapshot(&[("b", player("b", 100.0, 0.0))]), &mut events);
        assert!(!state.directory.contains(&a));

        state.apply_broadcast(&snapshot(&[("a", player("a", 100.0, 0.0))]), &mut events);
        let entity = state.directory.get(&a).unwrap();
        assert_ne!(entity.generation, first_generation);
        assert_eq!(
            count(&events, |e| matches!(e, SyncEvent::Created(k, _) if *k == a)),
            2
        );
    }

    #[test]
    fn test_empty_broadcast_for_unknown_ids_is_noop() {
        let mut state = ClientGameState::new();
        let mut events: Vec<SyncEvent> = Vec::new();
        let report = state.apply_broadcast(&Snapshot::default(), &mut events);
        assert_eq!(report, ReconcileReport::default());
        assert!(events.is_empty());
    }

    #[test]
    fn test_update_preserves_generation() {
        let mut state = ClientGameState::new();
        let mut events: Vec<SyncEvent> = Vec::new();
        let a = EntityKey::player("a");

        state.apply_broadcast(&snapshot(&[("a", player("a", 100.0, 0.0))]), &mut events);
        let generation = state.directory.get(&a).unwrap().generation;
        for health in [90.0, 80.0, 70.0] {
            state.apply_broadcast(&snapshot(&[("a", player("a", health, 0.0))]), &mut events);
        }
        assert_eq!(state.directory.get(&a).unwrap().generation, generation);
    }

    #[test]
    fn test_kinds_are_separate_namespaces() {
        let mut state = ClientGameState::new();
        let mut events: Vec<SyncEvent> = Vec::new();
        let mut broadcast = snapshot(&[("x1", player("x1", 100.0, 0.0))]);
        broadcast.boxes.insert(
            "x1".to_string(),
            EntityData {
                health: Some(30.0),
                ..Default::default()
            },
        );
        broadcast
            .projectiles
            .insert("bullet".to_string(), EntityData::default());

        state.apply_broadcast(&broadcast, &mut events);
        assert_eq!(state.directory.len(), 3);
        assert_eq!(
            state
                .directory
                .get(&EntityKey::new(EntityKind::Box, "x1"))
                .unwrap()
                .state
                .health,
            30
        );

        broadcast.boxes.clear();
        state.apply_broadcast(&broadcast, &mut events);
        assert!(state.directory.contains(&EntityKey::player("x1")));
        assert!(!state
            .directory
            .contains(&EntityKey::new(EntityKind::Box, "x1")));
    }

    #[test]
    fn test_local_player_changed_only_when_assigned_and_present() {
        let mut state = ClientGameState::new();
        let mut events: Vec<SyncEvent> = Vec::new();
        let broadcast = snapshot(&[("me", player("me", 100.0, 0.0))]);

        state.apply_broadcast(&broadcast, &mut events);
        assert_eq!(
            count(&events, |e| matches!(e, SyncEvent::LocalPlayerChanged(_))),
            0
        );

        state.handle_server_message(
            ServerMessage::AssignId {
                player_id: "me".to_string(),
            },
            &mut events,
        );
        state.apply_broadcast(&broadcast, &mut events);
        assert_eq!(
            count(&events, |e| matches!(e, SyncEvent::LocalPlayerChanged(_))),
            2
        );

        state.apply_broadcast(&snapshot(&[]), &mut events);
        assert_eq!(
            count(&events, |e| matches!(e, SyncEvent::LocalPlayerChanged(_))),
            2
        );
    }

    #[test]
    fn test_second_assign_is_ignored() {
        let mut state = ClientGameState::new();
        let mut events: Vec<SyncEvent> = Vec::new();
        for id in ["first", "second"] {
            state.handle_server_message(
                ServerMessage::AssignId {
                    player_id: id.to_string(),
                },
                &mut events,
            );
        }
        assert_eq!(state.identity.get(), Some("first"));
    }

    #[test]
    fn test_predict_action_on_local_weapon() {
        let mut state = ClientGameState::new();
        let mut events: Vec<SyncEvent> = Vec::new();
        let mut me = player("me", 100.0, 0.0);
        me.current_weapon = Some(WeaponData {
            id: Some("w1".to_string()),
            name: Some("Rifle".to_string()),
            max_ammo: Some(30.0),
            current_ammo: Some(5.0),
            reserve_ammo: Some(10.0),
            ..Default::default()
        });

        let shoot = ClientMessage::Shoot {
            player_id: "me".to_string(),
        };
        let reload = ClientMessage::Reload {
            player_id: "me".to_string(),
        };

        state.apply_broadcast(&snapshot(&[("me", me.clone())]), &mut events);
        assert!(!state.predict_action(&shoot, &mut events));

        state.identity.assign("me".to_string());
        assert!(state.predict_action(&reload, &mut events));
        let weapon = state.local_player().unwrap().state.weapon.clone().unwrap();
        assert_eq!((weapon.current_ammo, weapon.reserve_ammo), (15, 0));

        assert!(state.predict_action(&shoot, &mut events));
        let weapon = state.local_player().unwrap().state.weapon.clone().unwrap();
        assert_eq!(weapon.current_ammo, 14);

        // The server stays authoritative.
        state.apply_broadcast(&snapshot(&[("me", me)]), &mut events);
        let weapon = state.local_player().unwrap().state.weapon.clone().unwrap();
        assert_eq!((weapon.current_ammo, weapon.reserve_ammo), (5, 10));
    }

    #[test]
    fn test_session_lifecycle() {
        let mut state = ClientGameState::new();
        let mut events: Vec<SyncEvent> = Vec::new();
        state.identity.assign("me".to_string());
        state.apply_broadcast(
            &snapshot(&[("me", player("me", 100.0, 0.0)), ("p2", player("p2", 100.0, 0.0))]),
            &mut events,
        );
        events.clear();

        state.end_session(&mut events);
        assert!(state.directory.is_empty());
        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|e| matches!(e, SyncEvent::Removed(_))));
        assert_eq!(state.identity.get(), Some("me"));

        state.begin_session();
        assert!(!state.identity.is_assigned());
    }
}
