//! Client input tracking and intent emission

use crate::directory::Position;
use log::debug;
use shared::{ClientMessage, MOVEMENT_KEYS};
use std::collections::BTreeMap;
use std::str::FromStr;
use thiserror::Error;

pub const RELOAD_KEY: &str = "r";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerButton {
    Primary,
    Secondary,
}

/// Raw events from whatever captures keyboard and pointer.
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    KeyDown(String),
    KeyUp(String),
    /// Pointer projected onto the ground plane, in world coordinates.
    PointerMove { x: f64, z: f64 },
    PointerDown(PointerButton),
}

#[derive(Debug, Error, PartialEq)]
pub enum InputParseError {
    #[error("empty input line")]
    Empty,
    #[error("unknown command `{0}`")]
    UnknownCommand(String),
    #[error("`{0}` needs an argument")]
    MissingArgument(&'static str),
    #[error("invalid coordinate `{0}`")]
    InvalidCoordinate(String),
}

/// Parses one line of the text input source, e.g. `press w` or `aim 3.5 -2`.
impl FromStr for InputEvent {
    type Err = InputParseError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let command = words.next().ok_or(InputParseError::Empty)?;

        match command.to_lowercase().as_str() {
            "press" | "down" => {
                let key = words.next().ok_or(InputParseError::MissingArgument("press"))?;
                Ok(InputEvent::KeyDown(key.to_lowercase()))
            }
            "release" | "up" => {
                let key = words
                    .next()
                    .ok_or(InputParseError::MissingArgument("release"))?;
                Ok(InputEvent::KeyUp(key.to_lowercase()))
            }
            "aim" => {
                let mut coordinate = || -> Result<f64, InputParseError> {
                    let word = words.next().ok_or(InputParseError::MissingArgument("aim"))?;
                    word.parse()
                        .map_err(|_| InputParseError::InvalidCoordinate(word.to_string()))
                };
                let x = coordinate()?;
                let z = coordinate()?;
                Ok(InputEvent::PointerMove { x, z })
            }
            "shoot" | "click" => Ok(InputEvent::PointerDown(PointerButton::Primary)),
            "reload" => Ok(InputEvent::KeyDown(RELOAD_KEY.to_string())),
            other => Err(InputParseError::UnknownCommand(other.to_string())),
        }
    }
}

/// Facing angle from the player towards the pointer, about the vertical axis.
pub fn aim_angle(player: Position, pointer_x: f64, pointer_z: f64) -> f64 {
    let dx = pointer_x - player.x;
    let dz = pointer_z - player.z;
    dx.atan2(dz)
}

/// Turns raw input into intent messages for the server.
///
/// Movement is sent as the full key map on every transition, never as a
/// delta, so the server can recompute velocity from any single message.
pub struct InputEmitter {
    keys: BTreeMap<String, bool>,
}

impl InputEmitter {
    pub fn new() -> Self {
        Self {
            keys: MOVEMENT_KEYS
                .iter()
                .map(|key| (key.to_string(), false))
                .collect(),
        }
    }

    pub fn keys(&self) -> &BTreeMap<String, bool> {
        &self.keys
    }

    /// Processes one input event.
    ///
    /// Key state is always tracked, but nothing is emitted until the local
    /// identity is known. Aiming additionally needs the local player's position.
    pub fn handle(
        &mut self,
        event: &InputEvent,
        player_id: Option<&str>,
        player_position: Option<Position>,
    ) -> Option<ClientMessage> {
        match event {
            InputEvent::KeyDown(key) if key == RELOAD_KEY => {
                player_id.map(|id| ClientMessage::Reload {
                    player_id: id.to_string(),
                })
            }
            InputEvent::KeyDown(key) => self.set_key(key, true, player_id),
            InputEvent::KeyUp(key) => self.set_key(key, false, player_id),
            InputEvent::PointerMove { x, z } => {
                player_id?;
                let position = player_position?;
                Some(ClientMessage::Rotate {
                    angle: aim_angle(position, *x, *z),
                })
            }
            InputEvent::PointerDown(PointerButton::Primary) => {
                player_id.map(|id| ClientMessage::Shoot {
                    player_id: id.to_string(),
                })
            }
            InputEvent::PointerDown(PointerButton::Secondary) => {
                debug!("Secondary pointer button has no action");
                None
            }
        }
    }

    fn set_key(
        &mut self,
        key: &str,
        pressed: bool,
        player_id: Option<&str>,
    ) -> Option<ClientMessage> {
        let state = self.keys.get_mut(key)?;
        if *state == pressed {
            return None;
        }
        *state = pressed;

        player_id?;
        Some(ClientMessage::Move {
            keys: self.keys.clone(),
        })
    }
}

impl Default for InputEmitter {
    fn default() -> Self {
        Self::new()
    }
}
