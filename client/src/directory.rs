//! Local mirror of the entities the server reports as alive

use shared::{to_count, EntityData, Weapon, WeaponData, DEFAULT_HEALTH};
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityKind {
    Player,
    Box,
    Projectile,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntityKind::Player => "player",
            EntityKind::Box => "box",
            EntityKind::Projectile => "projectile",
        };
        f.write_str(name)
    }
}

/// Identity of an entity. Kinds are separate namespaces.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityKey {
    pub kind: EntityKind,
    pub id: String,
}

impl EntityKey {
    pub fn new(kind: EntityKind, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
        }
    }

    pub fn player(id: impl Into<String>) -> Self {
        Self::new(EntityKind::Player, id)
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// Server-owned fields of an entity, rebuilt from every broadcast.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityState {
    pub position: Position,
    pub angle: f64,
    pub team: i32,
    pub health: u32,
    pub score: i64,
    pub weapon: Option<Weapon>,
}

impl EntityState {
    /// Missing fields take their defaults instead of keeping older values.
    pub fn from_data(data: &EntityData) -> Self {
        let mut state = Self {
            position: Position::default(),
            angle: 0.0,
            team: 0,
            health: DEFAULT_HEALTH,
            score: 0,
            weapon: data.current_weapon.as_ref().map(Weapon::from_data),
        };
        state.overwrite_scalars(data);
        state
    }

    fn overwrite_scalars(&mut self, data: &EntityData) {
        self.position = Position {
            x: data.x.unwrap_or(0.0),
            y: data.y.unwrap_or(0.0),
            z: data.z.unwrap_or(0.0),
        };
        self.angle = data.angle.unwrap_or(0.0);
        self.team = data.team.map(|team| team as i32).unwrap_or(0);
        self.health = data.health.map(to_count).unwrap_or(DEFAULT_HEALTH);
        self.score = data.score.map(|score| score as i64).unwrap_or(0);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    pub key: EntityKey,
    /// Changes only when the entity is created again after a removal.
    pub generation: u64,
    pub state: EntityState,
}

impl Entity {
    pub fn new(key: EntityKey, generation: u64, data: &EntityData) -> Self {
        Self {
            key,
            generation,
            state: EntityState::from_data(data),
        }
    }

    /// Overwrites the server-owned fields. Key and generation are kept.
    pub fn update(&mut self, data: &EntityData) {
        self.state.overwrite_scalars(data);

        match &data.current_weapon {
            Some(weapon_data) => {
                let replaced = self
                    .state
                    .weapon
                    .as_ref()
                    .map_or(true, |weapon| weapon.is_replaced_by(weapon_data));
                if replaced {
                    self.update_weapon(weapon_data);
                } else {
                    self.update_weapon_ammo(weapon_data);
                }
            }
            None => self.state.weapon = None,
        }
    }

    /// Replaces the attached weapon entirely.
    pub fn update_weapon(&mut self, data: &WeaponData) {
        self.state.weapon = Some(Weapon::from_data(data));
    }

    /// Refreshes ammo counters on the current weapon, keeping its stats.
    pub fn update_weapon_ammo(&mut self, data: &WeaponData) {
        if let Some(weapon) = self.state.weapon.as_mut() {
            let current = data.current_ammo.map(to_count).unwrap_or(0);
            let reserve = data.reserve_ammo.map(to_count).unwrap_or(0);
            weapon.update_ammo(current, reserve);
        }
    }

    pub fn is_alive(&self) -> bool {
        self.state.health > 0
    }
}

/// Keyed store of known entities. Insertion order is irrelevant.
#[derive(Debug, Default)]
pub struct EntityDirectory {
    entities: HashMap<EntityKey, Entity>,
}

impl EntityDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &EntityKey) -> Option<&Entity> {
        self.entities.get(key)
    }

    pub fn get_mut(&mut self, key: &EntityKey) -> Option<&mut Entity> {
        self.entities.get_mut(key)
    }

    pub fn contains(&self, key: &EntityKey) -> bool {
        self.entities.contains_key(key)
    }

    pub fn insert(&mut self, entity: Entity) -> Option<Entity> {
        self.entities.insert(entity.key.clone(), entity)
    }

    pub fn remove(&mut self, key: &EntityKey) -> Option<Entity> {
        self.entities.remove(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &EntityKey> {
        self.entities.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    /// Entities of one kind, sorted by id for stable output.
    pub fn of_kind(&self, kind: EntityKind) -> Vec<&Entity> {
        let mut entities: Vec<&Entity> = self
            .entities
            .values()
            .filter(|entity| entity.key.kind == kind)
            .collect();
        entities.sort_by(|a, b| a.key.id.cmp(&b.key.id));
        entities
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Removes every entity, returning the removed keys.
    pub fn drain_keys(&mut self) -> Vec<EntityKey> {
        self.entities.drain().map(|(key, _)| key).collect()
    }
}
