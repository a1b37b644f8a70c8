//! Outbound client for the dimmer control endpoint
//!
//! One call is one `GET <host>?intensity=<n>&token=<t>&device=<d>`. The call
//! resolves to a single display string: the HTTP reason phrase on any
//! response (non-2xx included), or the failure text when no response arrived.

pub mod http_client;
pub mod request;

pub use http_client::{DimmerClient, PendingResult};
pub use request::DimmerRequest;

use crate::error::{DimmerError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// What a completed call resolves to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseDisplay {
    /// The HTTP reason phrase (e.g. "OK"); the body is read and dropped
    #[default]
    StatusMessage,
    /// The response body, lines concatenated
    Body,
}

impl FromStr for ResponseDisplay {
    type Err = DimmerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "status" | "status_message" => Ok(Self::StatusMessage),
            "body" => Ok(Self::Body),
            other => Err(DimmerError::config(format!(
                "Invalid response display '{other}'. Use 'status_message' or 'body'"
            ))),
        }
    }
}

impl fmt::Display for ResponseDisplay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StatusMessage => f.write_str("status_message"),
            Self::Body => f.write_str("body"),
        }
    }
}

/// Whether any call is currently outstanding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallState {
    Idle,
    InFlight,
}

/// Anything that can push an intensity change to a dimmer endpoint
#[async_trait]
pub trait IntensitySender: Send + Sync {
    /// Send one intensity change and resolve to the text to display
    async fn send_intensity(&self, host: &str, intensity: i64) -> String;
}

#[async_trait]
impl IntensitySender for DimmerClient {
    async fn send_intensity(&self, host: &str, intensity: i64) -> String {
        self.set_intensity_display(host, intensity).await
    }
}
