use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;

pub mod weapon;

pub use weapon::Weapon;

pub const LOCAL_SERVER_URL: &str = "ws://localhost:6969/game";
pub const DEPLOYED_SERVER_URL: &str = "wss://your-server.com/game";
pub const RECONNECT_DELAY_MS: u64 = 3000;
pub const DEFAULT_HEALTH: u32 = 100;

/// Movement keys the server recomputes velocity from.
pub const MOVEMENT_KEYS: [&str; 4] = ["w", "a", "s", "d"];

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("malformed server message: {0}")]
    Json(#[from] serde_json::Error),
}

/// Messages pushed by the server.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerMessage {
    AssignId { player_id: String },
    Broadcast(Snapshot),
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum TaggedMessage {
    AssignId {
        #[serde(rename = "playerId")]
        player_id: String,
    },
    Broadcast {
        entities: Snapshot,
    },
}

/// Older servers send the entity maps at the top level without a `type`.
#[derive(Deserialize)]
struct BareSnapshot {
    players: HashMap<String, EntityData>,
    #[serde(default)]
    boxes: HashMap<String, EntityData>,
    #[serde(default)]
    projectiles: HashMap<String, EntityData>,
}

impl ServerMessage {
    pub fn decode(text: &str) -> Result<Self, DecodeError> {
        let value: Value = serde_json::from_str(text)?;

        // Only a message without any `type` may be read as a bare snapshot.
        if value.get("type").is_some() {
            let message = match TaggedMessage::deserialize(value)? {
                TaggedMessage::AssignId { player_id } => ServerMessage::AssignId { player_id },
                TaggedMessage::Broadcast { entities } => ServerMessage::Broadcast(entities),
            };
            return Ok(message);
        }

        let bare = BareSnapshot::deserialize(value)?;
        Ok(ServerMessage::Broadcast(Snapshot {
            players: bare.players,
            boxes: bare.boxes,
            projectiles: bare.projectiles,
        }))
    }
}

/// Full set of live entities at one server tick, keyed by identity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub players: HashMap<String, EntityData>,
    #[serde(default)]
    pub boxes: HashMap<String, EntityData>,
    #[serde(default)]
    pub projectiles: HashMap<String, EntityData>,
}

impl Snapshot {
    pub fn len(&self) -> usize {
        self.players.len() + self.boxes.len() + self.projectiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Entity as it appears on the wire. Every field may be missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityData {
    pub id: Option<String>,
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub z: Option<f64>,
    pub angle: Option<f64>,
    pub team: Option<f64>,
    #[serde(alias = "hp")]
    pub health: Option<f64>,
    pub score: Option<f64>,
    #[serde(alias = "weapon")]
    pub current_weapon: Option<WeaponData>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeaponData {
    pub id: Option<String>,
    pub name: Option<String>,
    pub damage: Option<f64>,
    pub bullet_speed: Option<f64>,
    pub range: Option<f64>,
    pub reload_time: Option<f64>,
    pub rate_of_fire: Option<f64>,
    pub max_ammo: Option<f64>,
    pub current_ammo: Option<f64>,
    pub reserve_ammo: Option<f64>,
}

/// Client intents. The server treats each one independently.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ClientMessage {
    Move {
        keys: BTreeMap<String, bool>,
    },
    Rotate {
        angle: f64,
    },
    Shoot {
        #[serde(rename = "playerId")]
        player_id: String,
    },
    Reload {
        #[serde(rename = "playerId")]
        player_id: String,
    },
}

impl ClientMessage {
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Converts a wire number to a count, clamping negatives and NaN to zero.
pub fn to_count(value: f64) -> u32 {
    if value.is_finite() && value > 0.0 {
        value.round().min(u32::MAX as f64) as u32
    } else {
        0
    }
}
