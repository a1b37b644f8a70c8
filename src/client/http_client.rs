//! HTTP implementation of the dimmer client
//!
//! Calls never run on the caller's task: [`DimmerClient::spawn_set_intensity`]
//! and [`DimmerClient::submit`] hand the request to a tokio worker and return
//! immediately. Overlapping calls are independent; nothing is deduplicated,
//! cancelled or retried.

use crate::client::{CallState, DimmerRequest, ResponseDisplay};
use crate::config::ClientConfig;
use crate::error::{redact_token, DimmerError, Result};
use hyper::ext::ReasonPhrase;
use reqwest::{Client, ClientBuilder, StatusCode};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// HTTP client for the dimmer control endpoint
#[derive(Debug, Clone)]
pub struct DimmerClient {
    /// HTTP client instance
    http: Client,

    /// Shared secret sent with every request
    token: String,

    /// Target device sent with every request
    device: String,

    /// What a successful call resolves to
    display: ResponseDisplay,

    /// Outstanding calls across all clones
    in_flight: Arc<AtomicUsize>,
}

impl DimmerClient {
    /// Create a new client from the `[client]` config section
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let mut builder = ClientBuilder::new()
            .user_agent(format!("iot-dimmer/{}", env!("CARGO_PKG_VERSION")));

        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }

        let http = builder.build()?;

        Ok(Self {
            http,
            token: config.token.clone(),
            device: config.device.clone(),
            display: config.response_display,
            in_flight: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Client with the stock token, device and no timeout
    pub fn with_defaults() -> Result<Self> {
        Self::new(&ClientConfig::default())
    }

    /// Build the request this client would send
    pub fn request(&self, host: &str, intensity: i64) -> DimmerRequest {
        DimmerRequest::new(host, intensity)
            .with_token(self.token.as_str())
            .with_device(self.device.as_str())
    }

    pub fn response_display(&self) -> ResponseDisplay {
        self.display
    }

    /// Number of calls that have not completed yet
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub fn state(&self) -> CallState {
        if self.in_flight() == 0 {
            CallState::Idle
        } else {
            CallState::InFlight
        }
    }

    /// Send one intensity change.
    ///
    /// Resolves to the reason phrase of whatever status came back, 4xx and
    /// 5xx included. Only transport failures are errors.
    pub async fn set_intensity(&self, host: &str, intensity: i64) -> Result<String> {
        let request = self.request(host, intensity);
        let _guard = InFlightGuard::enter(&self.in_flight);

        debug!("Sending request {request}");

        let response = self.http.get(request.url()).send().await?;
        let message = reason_phrase(response.status(), response.extensions().get());

        // The whole body is consumed before the status message is returned
        let raw = response.text().await?;
        let body = join_lines(&raw);

        let result = match self.display {
            ResponseDisplay::StatusMessage => {
                debug!(bytes = body.len(), "Discarding response body");
                message
            }
            ResponseDisplay::Body => body,
        };

        debug!("Response was {result}");
        Ok(result)
    }

    /// Same call, folded into the single display channel: failures become
    /// their description text
    pub async fn set_intensity_display(&self, host: &str, intensity: i64) -> String {
        match self.set_intensity(host, intensity).await {
            Ok(message) => message,
            Err(e) => {
                let code = e.to_error_code();
                debug!(
                    code = code.as_number(),
                    category = code.category(),
                    "Request failed: {}",
                    e.redacted(&self.token)
                );
                redact_token(&e.display_text(), &self.token)
            }
        }
    }

    /// Run the call on a worker and hand the display string to `callback`
    pub fn spawn_set_intensity<F>(&self, host: &str, intensity: i64, callback: F) -> JoinHandle<()>
    where
        F: FnOnce(String) + Send + 'static,
    {
        let client = self.clone();
        let host = host.to_string();
        tokio::spawn(async move {
            let result = client.set_intensity_display(&host, intensity).await;
            callback(result);
        })
    }

    /// Run the call on a worker; the returned handle resolves to the display string
    pub fn submit(&self, host: &str, intensity: i64) -> PendingResult {
        let client = self.clone();
        let host = host.to_string();
        PendingResult {
            handle: tokio::spawn(async move { client.set_intensity_display(&host, intensity).await }),
        }
    }
}

/// Reason phrase exactly as the server sent it, when it differs from the
/// registered one; otherwise [`status_message`]
pub fn reason_phrase(status: StatusCode, sent: Option<&ReasonPhrase>) -> String {
    match sent {
        Some(phrase) => String::from_utf8_lossy(phrase.as_bytes()).into_owned(),
        None => status_message(status),
    }
}

/// Reason phrase for a status code; unregistered codes fall back to the number
pub fn status_message(status: StatusCode) -> String {
    status
        .canonical_reason()
        .map(str::to_string)
        .unwrap_or_else(|| status.as_str().to_string())
}

/// A call running on a worker
#[derive(Debug)]
pub struct PendingResult {
    handle: JoinHandle<String>,
}

impl PendingResult {
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Future for PendingResult {
    type Output = String;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.handle).poll(cx) {
            Poll::Ready(Ok(text)) => Poll::Ready(text),
            Poll::Ready(Err(e)) => {
                warn!("Request worker did not complete: {e}");
                Poll::Ready(DimmerError::Generic(e.into()).display_text())
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

/// Body lines concatenated with no separator; `\r\n`, `\n` and a lone `\r`
/// all end a line
fn join_lines(raw: &str) -> String {
    raw.split(['\r', '\n']).collect()
}

struct InFlightGuard<'a>(&'a AtomicUsize);

impl<'a> InFlightGuard<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}
