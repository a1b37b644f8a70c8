//! Error types for the dimmer client and relay
//!
//! The client surfaces every transport failure as a single "request failed"
//! kind. Callers that only want something to display can use
//! [`DimmerError::display_text`]; callers that care can still match on the
//! variant or inspect the [`ErrorCode`].

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for dimmer operations
pub type Result<T> = std::result::Result<T, DimmerError>;

/// Error types for dimmer operations
#[derive(Error, Debug)]
pub enum DimmerError {
    /// The HTTP request could not be completed (DNS, refused, timeout, body read)
    #[error("{0}")]
    Request(#[from] reqwest::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input errors
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Relay server errors
    #[error("Relay error: {0}")]
    Relay(String),

    /// Generic I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic errors
    #[error("Generic error: {0}")]
    Generic(#[from] anyhow::Error),
}

/// Structured error code for machine-readable error handling
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // Connection errors (1000-1099)
    ConnectionTimeout,
    ConnectionRefused,
    RequestFailed,

    // Configuration errors (1200-1299)
    ConfigurationInvalid,

    // Data errors (1400-1499)
    InvalidInput,

    // Service errors (1600-1699)
    RelayFailure,

    // Internal errors (1900-1999)
    InternalError,
}

impl ErrorCode {
    /// Get numeric error code
    pub fn as_number(&self) -> u32 {
        match self {
            ErrorCode::ConnectionTimeout => 1001,
            ErrorCode::ConnectionRefused => 1002,
            ErrorCode::RequestFailed => 1003,
            ErrorCode::ConfigurationInvalid => 1201,
            ErrorCode::InvalidInput => 1401,
            ErrorCode::RelayFailure => 1601,
            ErrorCode::InternalError => 1901,
        }
    }

    /// Get error category
    pub fn category(&self) -> &'static str {
        match self.as_number() {
            1000..=1099 => "connection",
            1200..=1299 => "configuration",
            1400..=1499 => "data",
            1600..=1699 => "service",
            1900..=1999 => "internal",
            _ => "unknown",
        }
    }
}

impl DimmerError {
    /// Create a configuration error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input<S: Into<String>>(msg: S) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a relay server error
    pub fn relay<S: Into<String>>(msg: S) -> Self {
        Self::Relay(msg.into())
    }

    /// Map the error to a structured error code
    pub fn to_error_code(&self) -> ErrorCode {
        match self {
            DimmerError::Request(e) if e.is_timeout() => ErrorCode::ConnectionTimeout,
            DimmerError::Request(e) if e.is_connect() => ErrorCode::ConnectionRefused,
            DimmerError::Request(_) => ErrorCode::RequestFailed,
            DimmerError::Config(_) => ErrorCode::ConfigurationInvalid,
            DimmerError::InvalidInput(_) => ErrorCode::InvalidInput,
            DimmerError::Relay(_) => ErrorCode::RelayFailure,
            DimmerError::Io(_) | DimmerError::Generic(_) => ErrorCode::InternalError,
        }
    }

    /// Whether the failure happened while talking to the remote endpoint
    pub fn is_request_error(&self) -> bool {
        matches!(self, DimmerError::Request(_))
    }

    /// Text shown to the user in place of a status message.
    ///
    /// Never empty: a failure with no description falls back to the error code.
    pub fn display_text(&self) -> String {
        let text = self.to_string();
        if text.trim().is_empty() {
            format!("Request failed ({})", self.to_error_code().as_number())
        } else {
            text
        }
    }

    /// Error text with the shared-secret query value masked, for logs
    pub fn redacted(&self, token: &str) -> String {
        redact_token(&self.to_string(), token)
    }
}

/// Mask every occurrence of `token=<token>` in `text`
pub fn redact_token(text: &str, token: &str) -> String {
    if token.is_empty() {
        return text.to_string();
    }
    text.replace(&format!("token={token}"), "token=***")
}
