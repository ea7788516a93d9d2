//! Endpoint selection and client tunables

use crate::error::ClientError;
use clap::Parser;
use shared::{DEPLOYED_SERVER_URL, LOCAL_SERVER_URL, RECONNECT_DELAY_MS};
use std::time::Duration;

pub const RENDER_INTERVAL_MS: u64 = 1000;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Environment {
    #[default]
    Local,
    Deployed,
}

impl Environment {
    pub fn server_url(self) -> &'static str {
        match self {
            Environment::Local => LOCAL_SERVER_URL,
            Environment::Deployed => DEPLOYED_SERVER_URL,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub server_url: String,
    pub reconnect_delay: Duration,
    /// Cadence of the render tick handed to the sink.
    pub render_interval: Duration,
    /// Apply shoot/reload to the local weapon before the server confirms.
    pub prediction_enabled: bool,
}

impl ClientConfig {
    pub fn for_environment(environment: Environment) -> Self {
        Self {
            server_url: environment.server_url().to_string(),
            reconnect_delay: Duration::from_millis(RECONNECT_DELAY_MS),
            render_interval: Duration::from_millis(RENDER_INTERVAL_MS),
            prediction_enabled: true,
        }
    }

    pub fn validate(&self) -> Result<(), ClientError> {
        if !(self.server_url.starts_with("ws://") || self.server_url.starts_with("wss://")) {
            return Err(ClientError::InvalidUrl(self.server_url.clone()));
        }
        if self.reconnect_delay.is_zero() {
            return Err(ClientError::ZeroReconnectDelay);
        }
        if self.render_interval.is_zero() {
            return Err(ClientError::ZeroRenderInterval);
        }
        Ok(())
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::for_environment(Environment::Local)
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Server URL, overriding the environment default
    #[arg(short = 's', long)]
    pub server: Option<String>,

    /// Use the deployed server instead of localhost
    #[arg(short = 'd', long)]
    pub deployed: bool,

    /// Delay before reconnecting after the socket closes
    #[arg(short = 'r', long, default_value_t = RECONNECT_DELAY_MS)]
    pub reconnect_delay_ms: u64,

    /// How often the player list is refreshed
    #[arg(long, default_value_t = RENDER_INTERVAL_MS)]
    pub hud_interval_ms: u64,

    /// Wait for the server before showing shots and reloads
    #[arg(long)]
    pub no_prediction: bool,
}

impl From<Args> for ClientConfig {
    fn from(args: Args) -> Self {
        let environment = if args.deployed {
            Environment::Deployed
        } else {
            Environment::Local
        };

        Self {
            server_url: args
                .server
                .unwrap_or_else(|| environment.server_url().to_string()),
            reconnect_delay: Duration::from_millis(args.reconnect_delay_ms),
            render_interval: Duration::from_millis(args.hud_interval_ms),
            prediction_enabled: !args.no_prediction,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.server_url, "ws://localhost:6969/game");
        assert_eq!(config.reconnect_delay, Duration::from_millis(3000));
        assert!(config.prediction_enabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_args_select_environment() {
        let config = ClientConfig::from(Args::parse_from(["client", "--deployed"]));
        assert_eq!(config.server_url, DEPLOYED_SERVER_URL);

        let config = ClientConfig::from(Args::parse_from([
            "client",
            "--deployed",
            "--server",
            "ws://10.0.0.2:6969/game",
            "--reconnect-delay-ms",
            "250",
            "--no-prediction",
        ]));
        assert_eq!(config.server_url, "ws://10.0.0.2:6969/game");
        assert_eq!(config.reconnect_delay, Duration::from_millis(250));
        assert!(!config.prediction_enabled);
    }

    #[test]
    fn test_validate_rejects_bad_config() {
        let mut config = ClientConfig {
            server_url: "http://localhost:6969".to_string(),
            ..ClientConfig::default()
        };
        assert!(matches!(config.validate(), Err(ClientError::InvalidUrl(_))));

        config.server_url = LOCAL_SERVER_URL.to_string();
        config.reconnect_delay = Duration::ZERO;
        assert!(matches!(
            config.validate(),
            Err(ClientError::ZeroReconnectDelay)
        ));

        let config = ClientConfig::from(Args::parse_from([
            "client",
            "--server",
            "ws://127.0.0.1:9/game",
            "--hud-interval-ms",
            "0",
        ]));
        assert!(matches!(
            config.validate(),
            Err(ClientError::ZeroRenderInterval)
        ));
    }
}
