//! Weapon model shared by players and weapon-carrying boxes

use crate::{to_count, WeaponData};

#[derive(Debug, Clone, PartialEq)]
pub struct Weapon {
    pub id: String,
    pub name: String,
    pub damage: f64,
    pub bullet_speed: f64,
    pub range: f64,
    /// Milliseconds.
    pub reload_time: f64,
    pub rate_of_fire: f64,
    /// Magazine capacity
    pub max_ammo: u32,
    /// Rounds left in the magazine, never above `max_ammo`
    pub current_ammo: u32,
    pub reserve_ammo: u32,
}

impl Weapon {
    pub fn new(id: &str, name: &str, max_ammo: u32, current_ammo: u32, reserve_ammo: u32) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            damage: 0.0,
            bullet_speed: 0.0,
            range: 0.0,
            reload_time: 0.0,
            rate_of_fire: 0.0,
            max_ammo,
            current_ammo: current_ammo.min(max_ammo),
            reserve_ammo,
        }
    }

    /// Builds a weapon from server data, defaulting every missing field.
    pub fn from_data(data: &WeaponData) -> Self {
        let max_ammo = data.max_ammo.map(to_count).unwrap_or(0);
        Self {
            id: data.id.clone().unwrap_or_default(),
            name: data.name.clone().unwrap_or_default(),
            damage: data.damage.unwrap_or(0.0),
            bullet_speed: data.bullet_speed.unwrap_or(0.0),
            range: data.range.unwrap_or(0.0),
            reload_time: data.reload_time.unwrap_or(0.0),
            rate_of_fire: data.rate_of_fire.unwrap_or(0.0),
            max_ammo,
            current_ammo: data.current_ammo.map(to_count).unwrap_or(0).min(max_ammo),
            reserve_ammo: data.reserve_ammo.map(to_count).unwrap_or(0),
        }
    }

    /// True when `data` describes a different weapon than this one.
    pub fn is_replaced_by(&self, data: &WeaponData) -> bool {
        data.id.as_deref().unwrap_or_default() != self.id
            || data.name.as_deref().unwrap_or_default() != self.name
    }

    /// Overwrites the ammo counters. Applying the same values twice is a no-op.
    pub fn update_ammo(&mut self, current_ammo: u32, reserve_ammo: u32) {
        self.current_ammo = current_ammo.min(self.max_ammo);
        self.reserve_ammo = reserve_ammo;
    }

    pub fn total_ammo(&self) -> u64 {
        self.current_ammo as u64 + self.reserve_ammo as u64
    }

    /// Fires one round. Returns false when the magazine is empty.
    pub fn shoot(&mut self) -> bool {
        if self.current_ammo == 0 {
            return false;
        }
        self.current_ammo -= 1;
        true
    }

    /// Moves rounds from the reserve into the magazine. Returns the number moved.
    pub fn reload(&mut self) -> u32 {
        let needed = self.max_ammo.saturating_sub(self.current_ammo);
        let moved = needed.min(self.reserve_ammo);
        self.current_ammo += moved;
        self.reserve_ammo -= moved;
        moved
    }
}
