//! Control request construction

use crate::config::{DEFAULT_DEVICE, DEFAULT_TOKEN};
use crate::error::redact_token;
use std::fmt;

/// One intensity change addressed to one device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DimmerRequest {
    host: String,
    intensity: i64,
    token: String,
    device: String,
}

impl DimmerRequest {
    /// Request with the default token and device
    pub fn new(host: impl Into<String>, intensity: i64) -> Self {
        Self {
            host: host.into(),
            intensity,
            token: DEFAULT_TOKEN.to_string(),
            device: DEFAULT_DEVICE.to_string(),
        }
    }

    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = token.into();
        self
    }

    #[must_use]
    pub fn with_device(mut self, device: impl Into<String>) -> Self {
        self.device = device.into();
        self
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn intensity(&self) -> i64 {
        self.intensity
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn device(&self) -> &str {
        &self.device
    }

    /// `?intensity=..&token=..&device=..`, values inserted as-is
    pub fn query_string(&self) -> String {
        format!(
            "?intensity={}&token={}&device={}",
            self.intensity, self.token, self.device
        )
    }

    /// Host with the query string appended; the host is not parsed or normalized
    pub fn url(&self) -> String {
        format!("{}{}", self.host, self.query_string())
    }

    /// URL safe to write to logs
    pub fn redacted_url(&self) -> String {
        redact_token(&self.url(), &self.token)
    }
}

impl fmt::Display for DimmerRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.redacted_url())
    }
}
