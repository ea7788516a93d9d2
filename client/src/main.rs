use clap::Parser;
use client::config::{Args, ClientConfig};
use client::hud::Hud;
use client::input::InputEvent;
use client::network::Client;
use log::{info, warn};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let config = ClientConfig::from(Args::parse());

    info!("Starting client...");
    info!("Connecting to: {}", config.server_url);
    if !config.prediction_enabled {
        info!("Local prediction disabled");
    }
    info!("Controls: press/release w|a|s|d, aim <x> <z>, shoot, reload");

    let (input_tx, input_rx) = mpsc::channel(64);
    tokio::spawn(read_input_lines(input_tx));

    let mut client = Client::new(config, Hud::new())?;

    tokio::select! {
        _ = client.run(input_rx) => {}
        result = tokio::signal::ctrl_c() => {
            result?;
            info!("Shutting down...");
        }
    }

    client.shutdown().await;
    Ok(())
}

/// Reads input commands from stdin, one per line.
async fn read_input_lines(input_tx: mpsc::Sender<InputEvent>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        match lines.next_line().await {
            Ok(Some(line)) if line.trim().is_empty() => continue,
            Ok(Some(line)) => match line.parse::<InputEvent>() {
                Ok(event) => {
                    if input_tx.send(event).await.is_err() {
                        break;
                    }
                }
                Err(e) => warn!("{}", e),
            },
            Ok(None) => break,
            Err(e) => {
                warn!("Failed to read input: {}", e);
                break;
            }
        }
    }
}
