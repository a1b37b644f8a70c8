//! iot-dimmer - command line entry point
//!
//! - `set`: send one intensity change and print the response
//! - `panel`: line-driven stand-in for the slider screen
//! - `relay`: run the cloud relay

use clap::{Parser, Subcommand};
use iot_dimmer::{
    config::DimmerConfig,
    logging::{init_logging, LogConfig},
    panel::parse_progress,
    ControlPanel, DimmerClient, DimmerError, RelayServer, ResponseDisplay, ResponseOrdering,
    Result,
};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

/// IoT dimmer control
#[derive(Parser, Debug)]
#[command(name = "iot-dimmer")]
#[command(about = "Control a remote dimmer or run its cloud relay")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Config file (TOML)
    #[arg(long, global = true, env = "DIMMER_CONFIG")]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    /// Control endpoint URL
    #[arg(long, global = true)]
    host: Option<String>,

    /// Shared secret
    #[arg(long, global = true)]
    token: Option<String>,

    /// Target device
    #[arg(long, global = true)]
    device: Option<String>,

    /// Request timeout (e.g. "5s"); none by default
    #[arg(long, global = true, value_parser = humantime_serde::re::humantime::parse_duration)]
    timeout: Option<Duration>,

    /// Show the response body instead of the status message
    #[arg(long, global = true)]
    show_body: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Send one intensity change
    Set {
        /// Intensity (sent as-is)
        #[arg(allow_negative_numbers = true)]
        intensity: i64,
    },
    /// Read slider releases from stdin, one value per line
    Panel {
        /// Ignore responses older than the last one shown
        #[arg(long)]
        latest_only: bool,
    },
    /// Run the relay server
    Relay {
        /// HTTP control listener
        #[arg(long)]
        http_bind: Option<SocketAddr>,

        /// Device feed listener
        #[arg(long)]
        device_bind: Option<SocketAddr>,

        /// Highest level that gets queued
        #[arg(long)]
        max_level: Option<i64>,
    },
}

impl Cli {
    /// Resolve config: file and env first, then flags
    fn resolve_config(&self) -> Result<DimmerConfig> {
        let mut config = DimmerConfig::load(self.config.as_deref())?;

        if let Some(host) = &self.host {
            config.client.host = host.clone();
        }
        if let Some(token) = &self.token {
            config.client.token = token.clone();
            config.relay.token = token.clone();
        }
        if let Some(device) = &self.device {
            config.client.device = device.clone();
        }
        if self.timeout.is_some() {
            config.client.timeout = self.timeout;
        }
        if self.show_body {
            config.client.response_display = ResponseDisplay::Body;
        }

        match &self.command {
            Command::Panel { latest_only: true } => {
                config.panel.ordering = ResponseOrdering::LatestIssued;
            }
            Command::Relay {
                http_bind,
                device_bind,
                max_level,
            } => {
                if let Some(bind) = http_bind {
                    config.relay.http_bind = *bind;
                }
                if let Some(bind) = device_bind {
                    config.relay.device_bind = *bind;
                }
                if let Some(level) = max_level {
                    config.relay.max_level = *level;
                }
            }
            _ => {}
        }

        config.validate()?;
        Ok(config)
    }
}

async fn run_set(config: &DimmerConfig, intensity: i64) -> Result<()> {
    let client = DimmerClient::new(&config.client)?;
    let result = client.submit(&config.client.host, intensity).await;
    println!("{result}");
    Ok(())
}

async fn run_panel(config: &DimmerConfig) -> Result<()> {
    let panel = ControlPanel::from_config(config)?;
    let mut responses = panel.subscribe();

    let printer = tokio::spawn(async move {
        while responses.changed().await.is_ok() {
            let text = responses.borrow_and_update().clone();
            println!("response: {text}");
        }
    });

    println!("value: {}", panel.value_text());
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut pending = Vec::new();

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match parse_progress(line) {
            Ok(progress) => {
                pending.push(panel.release(progress));
                println!("value: {}", panel.value_text());
            }
            Err(e) => warn!("Ignoring input: {e}"),
        }
    }

    for handle in pending {
        if let Err(e) = handle.await {
            warn!("Request task failed: {e}");
        }
    }
    drop(panel);
    let _ = printer.await;
    Ok(())
}

async fn run_relay(config: &DimmerConfig) -> Result<()> {
    let relay = RelayServer::start(config.relay.clone()).await?;
    info!("Control endpoint: {}", relay.control_url());
    info!("Press Ctrl+C to quit");

    let stop = relay.shutdown_token();
    tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            signal.map_err(|e| DimmerError::relay(format!("Cannot listen for Ctrl+C: {e}")))?;
            info!("Quit message received");
        }
        _ = stop.cancelled() => {}
    }

    relay.shutdown().await;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = cli.resolve_config()?;

    let log_config = LogConfig::from_settings(&config.logging)
        .with_env()
        .debug(cli.debug);
    init_logging(log_config)
        .map_err(|e| DimmerError::config(format!("Failed to initialize logging: {e}")))?;

    match &cli.command {
        Command::Set { intensity } => run_set(&config, *intensity).await,
        Command::Panel { .. } => run_panel(&config).await,
        Command::Relay { .. } => run_relay(&config).await,
    }
}
