//! Text player list, refreshed on the render tick

use crate::directory::{Entity, EntityDirectory, EntityKey, EntityKind, EntityState};
use crate::sink::EntitySink;
use log::info;
use std::collections::BTreeMap;

const ID_WIDTH: usize = 20;

pub fn format_player_row(id: &str, state: &EntityState) -> String {
    let short_id: String = id.chars().take(ID_WIDTH).collect();
    let position = state.position;
    format!(
        "ID: {} | X: {} | Y: {} | Z: {} | SCORE: {} | HEALTH: {}",
        short_id, position.x, position.y, position.z, state.score, state.health
    )
}

pub fn format_local_status(entity: &Entity) -> String {
    match &entity.state.weapon {
        Some(weapon) => format!(
            "HP: {} | {} {}/{}",
            entity.state.health, weapon.name, weapon.current_ammo, weapon.reserve_ammo
        ),
        None => format!("HP: {} | unarmed", entity.state.health),
    }
}

/// Headline for the player list: how many players are up, and what else is in play.
pub fn format_summary(directory: &EntityDirectory) -> String {
    let players = directory.of_kind(EntityKind::Player);
    let alive = players.iter().filter(|entity| entity.is_alive()).count();
    format!(
        "Players: {} ({} alive, {} boxes, {} projectiles)",
        players.len(),
        alive,
        directory.of_kind(EntityKind::Box).len(),
        directory.of_kind(EntityKind::Projectile).len()
    )
}

/// Keeps one row per player and logs the list when it changes.
#[derive(Debug, Default)]
pub struct Hud {
    rows: BTreeMap<String, String>,
    local_status: Option<String>,
    dirty: bool,
}

impl Hud {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rows(&self) -> impl Iterator<Item = &str> {
        self.rows.values().map(String::as_str)
    }

    pub fn local_status(&self) -> Option<&str> {
        self.local_status.as_deref()
    }

    fn set_row(&mut self, key: &EntityKey, state: &EntityState) {
        if key.kind != EntityKind::Player {
            return;
        }
        let row = format_player_row(&key.id, state);
        if self.rows.get(&key.id) != Some(&row) {
            self.rows.insert(key.id.clone(), row);
            self.dirty = true;
        }
    }
}

impl EntitySink for Hud {
    fn on_entity_created(&mut self, key: &EntityKey, state: &EntityState) {
        self.set_row(key, state);
    }

    fn on_entity_updated(&mut self, key: &EntityKey, state: &EntityState) {
        self.set_row(key, state);
    }

    fn on_entity_removed(&mut self, key: &EntityKey) {
        if key.kind == EntityKind::Player && self.rows.remove(&key.id).is_some() {
            self.dirty = true;
        }
    }

    fn on_local_player_changed(&mut self, entity: &Entity) {
        let status = format_local_status(entity);
        if self.local_status.as_ref() != Some(&status) {
            self.local_status = Some(status);
            self.dirty = true;
        }
    }

    fn on_render_tick(&mut self, directory: &EntityDirectory) {
        if !self.dirty {
            return;
        }
        self.dirty = false;

        info!("{}", format_summary(directory));
        for row in self.rows.values() {
            info!("  {}", row);
        }
        if let Some(status) = &self.local_status {
            info!("  You: {}", status);
        }
    }
}
