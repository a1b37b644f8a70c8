//! Cloud relay between control clients and dimmer devices
//!
//! Two listeners share one queue:
//! - the HTTP control endpoint stores the latest requested level per device
//! - the device feed accepts plain TCP subscribers
//!
//! A dispatcher pushes pending levels to every subscriber on a fixed tick
//! and clears them once at least one subscriber took the batch.

pub mod devices;
pub mod http;
pub mod queue;

pub use devices::DeviceHub;
pub use http::{RelayState, CONTROL_PATH};
pub use queue::{ControlQueue, ControlRequest};

use crate::config::RelayConfig;
use crate::error::{DimmerError, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Starts the relay
pub struct RelayServer;

impl RelayServer {
    /// Bind both listeners and spawn the serving tasks
    pub async fn start(config: RelayConfig) -> Result<RelayHandle> {
        config.validate()?;

        let http_listener = TcpListener::bind(config.http_bind).await.map_err(|e| {
            DimmerError::relay(format!("Cannot bind HTTP listener {}: {e}", config.http_bind))
        })?;
        let device_listener = TcpListener::bind(config.device_bind).await.map_err(|e| {
            DimmerError::relay(format!(
                "Cannot bind device listener {}: {e}",
                config.device_bind
            ))
        })?;

        let http_addr = http_listener.local_addr()?;
        let device_addr = device_listener.local_addr()?;

        let queue = Arc::new(ControlQueue::new());
        let hub = Arc::new(DeviceHub::new());
        let cancel = CancellationToken::new();

        let state = Arc::new(RelayState {
            queue: queue.clone(),
            token: config.token.clone(),
            max_level: config.max_level,
        });

        let http_task = {
            let cancel = cancel.clone();
            let app = http::router(state);
            tokio::spawn(async move {
                let shutdown = async move { cancel.cancelled().await };
                if let Err(e) = axum::serve(http_listener, app)
                    .with_graceful_shutdown(shutdown)
                    .await
                {
                    warn!("HTTP listener stopped: {e}");
                }
            })
        };

        let accept_task = tokio::spawn(accept_devices(
            device_listener,
            hub.clone(),
            cancel.clone(),
        ));

        let dispatch_task = tokio::spawn(dispatch_loop(
            queue.clone(),
            hub.clone(),
            config.token.clone(),
            config.poll_interval,
            cancel.clone(),
        ));

        info!("Listening for HTTP clients on {http_addr} and devices on {device_addr}");

        Ok(RelayHandle {
            http_addr,
            device_addr,
            queue,
            hub,
            cancel,
            tasks: vec![http_task, accept_task, dispatch_task],
        })
    }
}

/// Running relay
pub struct RelayHandle {
    http_addr: SocketAddr,
    device_addr: SocketAddr,
    queue: Arc<ControlQueue>,
    hub: Arc<DeviceHub>,
    cancel: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl RelayHandle {
    pub fn http_addr(&self) -> SocketAddr {
        self.http_addr
    }

    pub fn device_addr(&self) -> SocketAddr {
        self.device_addr
    }

    /// Control URL a client can use as its host
    pub fn control_url(&self) -> String {
        format!("http://{}{CONTROL_PATH}", self.http_addr)
    }

    pub fn queue(&self) -> &Arc<ControlQueue> {
        &self.queue
    }

    pub fn hub(&self) -> &Arc<DeviceHub> {
        &self.hub
    }

    /// Token that stops the relay when cancelled
    pub fn shutdown_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Stop all listeners and close device connections
    pub async fn shutdown(self) {
        info!("Shutting down relay");
        self.cancel.cancel();
        self.wait().await;
    }

    /// Wait until the relay has been stopped through its shutdown token
    pub async fn wait(self) {
        for task in self.tasks {
            if let Err(e) = task.await {
                warn!("Relay task ended abnormally: {e}");
            }
        }
        self.hub.close_all().await;
        info!("Shut down completed");
    }
}

async fn accept_devices(listener: TcpListener, hub: Arc<DeviceHub>, cancel: CancellationToken) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            accepted = listener.accept() => match accepted {
                Ok((stream, _)) => {
                    if let Err(e) = hub.register(stream).await {
                        warn!("Device connection: {e}");
                    }
                }
                Err(e) => warn!("Device connection: {e}"),
            },
        }
    }
}

async fn dispatch_loop(
    queue: Arc<ControlQueue>,
    hub: Arc<DeviceHub>,
    token: String,
    interval: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                dispatch_once(&queue, &hub, &token).await;
            }
        }
    }
}

/// Push every pending request to every subscriber once.
///
/// Returns the number of subscribers that received the batch; the delivered
/// requests are retired only when that number is non-zero.
pub async fn dispatch_once(queue: &ControlQueue, hub: &DeviceHub, token: &str) -> usize {
    let pending = queue.snapshot().await;
    if pending.is_empty() {
        return 0;
    }

    let lines: Vec<String> = pending.iter().map(|r| r.device_line(token)).collect();
    let delivered = hub.broadcast(&lines).await;

    if delivered > 0 {
        debug!("Clearing control requests cache");
        queue.retire(&pending).await;
    }
    delivered
}
