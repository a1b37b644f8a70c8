//! Configuration management for the dimmer client and relay
//!
//! Values are resolved in three layers: built-in defaults, an optional TOML
//! file, then `DIMMER_*` environment variables. The CLI applies its own
//! flags on top of the result.

use crate::client::ResponseDisplay;
use crate::error::{DimmerError, Result};
use crate::panel::ResponseOrdering;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::{env, fs, time::Duration};

/// Shared secret the relay accepts out of the box
pub const DEFAULT_TOKEN: &str = "letmein";

/// Device the panel controls out of the box
pub const DEFAULT_DEVICE: &str = "device1";

/// Control endpoint the panel talks to out of the box
pub const DEFAULT_HOST: &str = "http://localhost:8080/iotdimmer";

/// Upper bound for `relay.max_level`; the control page links every level
pub const MAX_RELAY_LEVEL: i64 = 255;

/// Complete configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct DimmerConfig {
    /// Outbound client configuration
    pub client: ClientConfig,

    /// Control panel configuration
    pub panel: PanelConfig,

    /// Relay server configuration
    pub relay: RelayConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Outbound client configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL of the control endpoint; the query string is appended verbatim
    pub host: String,

    /// Shared secret sent as the `token` query parameter
    pub token: String,

    /// Target device sent as the `device` query parameter
    pub device: String,

    /// Request timeout; `None` leaves the platform socket default in place
    #[serde(with = "humantime_serde")]
    pub timeout: Option<Duration>,

    /// What a successful call resolves to
    pub response_display: ResponseDisplay,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            token: DEFAULT_TOKEN.to_string(),
            device: DEFAULT_DEVICE.to_string(),
            timeout: None,
            response_display: ResponseDisplay::default(),
        }
    }
}

/// Control panel configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PanelConfig {
    /// Slider maximum
    pub max: u32,

    /// How overlapping completions update the response label
    pub ordering: ResponseOrdering,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            max: 100,
            ordering: ResponseOrdering::default(),
        }
    }
}

/// Relay server configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RelayConfig {
    /// HTTP control listener
    pub http_bind: SocketAddr,

    /// Plain TCP listener for device subscribers
    pub device_bind: SocketAddr,

    /// Token a control request must carry
    pub token: String,

    /// Highest intensity level that gets queued
    pub max_level: i64,

    /// Dispatcher tick
    #[serde(with = "humantime_serde")]
    pub poll_interval: Duration,
}

impl RelayConfig {
    pub fn validate(&self) -> Result<()> {
        if !(0..=MAX_RELAY_LEVEL).contains(&self.max_level) {
            return Err(DimmerError::config(format!(
                "Relay max level must be between 0 and {MAX_RELAY_LEVEL}, got {}",
                self.max_level
            )));
        }

        if self.poll_interval.is_zero() {
            return Err(DimmerError::config("Poll interval must be greater than zero"));
        }

        if self.http_bind == self.device_bind && self.http_bind.port() != 0 {
            return Err(DimmerError::config(
                "HTTP and device listeners cannot share an address",
            ));
        }

        Ok(())
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            http_bind: SocketAddr::from(([0, 0, 0, 0], 8080)),
            device_bind: SocketAddr::from(([0, 0, 0, 0], 9000)),
            token: DEFAULT_TOKEN.to_string(),
            max_level: 7,
            poll_interval: Duration::from_millis(100),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset
    pub level: String,

    /// Optional log file (rotated daily)
    pub file: Option<PathBuf>,

    /// Log to stderr
    pub stderr: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
            stderr: true,
        }
    }
}

impl DimmerConfig {
    /// Default config file location (`<config dir>/iot-dimmer/config.toml`)
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("iot-dimmer").join("config.toml"))
    }

    /// Parse a TOML document; missing keys keep their defaults
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| DimmerError::config(format!("Invalid config file: {e}")))
    }

    /// Read a TOML config file
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| {
            DimmerError::config(format!("Cannot read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&text)
    }

    /// Resolve the full configuration.
    ///
    /// An explicit path must exist; the default path is used only if present.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => match Self::default_path().filter(|p| p.is_file()) {
                Some(path) => Self::from_file(&path)?,
                None => Self::default(),
            },
        };
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from environment variables on top of the defaults
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env()?;
        Ok(config)
    }

    /// Override fields from `DIMMER_*` environment variables
    pub fn apply_env(&mut self) -> Result<()> {
        if let Ok(host) = env::var("DIMMER_HOST") {
            self.client.host = host;
        }

        if let Ok(token) = env::var("DIMMER_TOKEN") {
            self.client.token = token.clone();
            self.relay.token = token;
        }

        if let Ok(device) = env::var("DIMMER_DEVICE") {
            self.client.device = device;
        }

        if let Ok(timeout) = env::var("DIMMER_TIMEOUT") {
            self.client.timeout = Some(
                humantime_serde::re::humantime::parse_duration(&timeout)
                    .map_err(|e| DimmerError::config(format!("Invalid DIMMER_TIMEOUT: {e}")))?,
            );
        }

        if let Ok(display) = env::var("DIMMER_RESPONSE_DISPLAY") {
            self.client.response_display = display.parse()?;
        }

        if let Ok(bind) = env::var("DIMMER_HTTP_BIND") {
            self.relay.http_bind = bind
                .parse()
                .map_err(|e| DimmerError::config(format!("Invalid DIMMER_HTTP_BIND: {e}")))?;
        }

        if let Ok(bind) = env::var("DIMMER_DEVICE_BIND") {
            self.relay.device_bind = bind
                .parse()
                .map_err(|e| DimmerError::config(format!("Invalid DIMMER_DEVICE_BIND: {e}")))?;
        }

        if let Ok(level) = env::var("DIMMER_MAX_LEVEL") {
            self.relay.max_level = level
                .parse()
                .map_err(|e| DimmerError::config(format!("Invalid DIMMER_MAX_LEVEL: {e}")))?;
        }

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.client.host.trim().is_empty() {
            return Err(DimmerError::config("Host cannot be empty"));
        }

        if self.client.token.is_empty() || self.relay.token.is_empty() {
            return Err(DimmerError::config("Token cannot be empty"));
        }

        if self.client.device.is_empty() {
            return Err(DimmerError::config("Device cannot be empty"));
        }

        if self.client.timeout.is_some_and(|t| t.is_zero()) {
            return Err(DimmerError::config("Timeout must be greater than zero"));
        }

        if self.panel.max == 0 {
            return Err(DimmerError::config("Slider maximum must be greater than zero"));
        }

        self.relay.validate()
    }
}
