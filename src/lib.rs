//! Remote dimmer control
//!
//! This crate drives a network-controlled dimmer:
//!
//! - [`client::DimmerClient`] sends `GET <host>?intensity=<n>&token=<t>&device=<d>`
//!   off the caller's task and resolves to a display string
//! - [`panel::ControlPanel`] models the single slider screen that uses it
//! - [`relay::RelayServer`] is the cloud endpoint that queues levels and
//!   pushes them to devices over a plain TCP feed
//!
//! # Example
//!
//! ```no_run
//! use iot_dimmer::DimmerClient;
//!
//! # async fn run() -> iot_dimmer::Result<()> {
//! let client = DimmerClient::with_defaults()?;
//! let status = client.set_intensity("http://localhost:8080/iotdimmer", 40).await?;
//! println!("{status}");
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod logging;
pub mod panel;
pub mod relay;

// Re-export main types for convenience
pub use client::{DimmerClient, DimmerRequest, ResponseDisplay};
pub use config::DimmerConfig;
pub use error::{DimmerError, Result};
pub use panel::{ControlPanel, ResponseOrdering};
pub use relay::{RelayHandle, RelayServer};
