//! # Game Sync Client Library
//!
//! Client-side state synchronization for the multiplayer shooter. The server
//! is authoritative over every entity; this crate keeps a local mirror of what
//! the server reports, tells the presentation layer what changed, and sends
//! the local player's intents back over the same websocket.
//!
//! ## Architecture Overview
//!
//! ### Full-Snapshot Reconciliation
//! The server periodically broadcasts every live entity. Each broadcast is
//! treated as the complete truth: entities missing from it are removed, new
//! ones are created and known ones are overwritten in place. Lost or skipped
//! broadcasts are harmless because the next one carries everything again.
//!
//! ### Resilient Transport
//! The websocket reconnects forever after a fixed delay. Intents produced while
//! the link is down are queued and flushed in order once it comes back.
//!
//! ### Single Owner
//! One task owns the entity directory and local identity. The connection runs
//! in its own task and talks to the owner over channels, so there is no shared
//! mutable state.
//!
//! ## Module Organization
//!
//! ### Connection Module (`connection`)
//! - Websocket connect, reconnect and state tracking
//! - Outbound queue with FIFO flush on open
//! - In-order delivery of inbound payloads
//!
//! ### Directory Module (`directory`)
//! - Entity records keyed by kind and server id
//! - Defaulting of missing wire fields
//! - Weapon ammo refresh versus weapon replacement
//!
//! ### Game Module (`game`)
//! - Broadcast reconciliation against the directory
//! - Session boundaries and local prediction of shots and reloads
//!
//! ### Identity Module (`identity`)
//! - The server-assigned id of the local player
//!
//! ### Input Module (`input`)
//! - Key state tracking and movement/rotate/shoot/reload intents
//! - Text input parsing for the headless binary
//!
//! ### Sink and HUD Modules (`sink`, `hud`)
//! - Collaborator interface for rendering and GUI layers
//! - A text player list implementation
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use client::config::ClientConfig;
//! use client::hud::Hud;
//! use client::network::Client;
//! use tokio::sync::mpsc;
//!
//! # async fn demo() -> Result<(), client::error::ClientError> {
//! let (_input_tx, input_rx) = mpsc::channel(64);
//! let mut client = Client::new(ClientConfig::default(), Hud::new())?;
//! client.run(input_rx).await;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod connection;
pub mod directory;
pub mod error;
pub mod game;
pub mod hud;
pub mod identity;
pub mod input;
pub mod network;
pub mod sink;
