//! Headless model of the dimmer control screen
//!
//! A slider, a label echoing its value and a label showing the last
//! response. Releasing the slider fires one background request; the
//! response label is rewritten when that request completes.

use crate::client::{DimmerClient, IntensitySender};
use crate::config::DimmerConfig;
use crate::error::{DimmerError, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

/// Shown while a request is outstanding
pub const PLEASE_WAIT: &str = "Please wait...";

/// How completions of overlapping requests update the response label
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseOrdering {
    /// Whichever request finishes last wins, even if it was issued first
    #[default]
    LastWriteWins,
    /// Completions older than the last applied one are dropped
    LatestIssued,
}

impl FromStr for ResponseOrdering {
    type Err = DimmerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "last_write_wins" | "last-write-wins" => Ok(Self::LastWriteWins),
            "latest_issued" | "latest-issued" => Ok(Self::LatestIssued),
            other => Err(DimmerError::config(format!(
                "Invalid response ordering '{other}'. Use 'last_write_wins' or 'latest_issued'"
            ))),
        }
    }
}

/// Seek bar: progress is always within `0..=max`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slider {
    progress: u32,
    max: u32,
}

impl Slider {
    pub fn new(max: u32) -> Self {
        Self { progress: 0, max }
    }

    pub fn progress(&self) -> u32 {
        self.progress
    }

    pub fn max(&self) -> u32 {
        self.max
    }

    /// Move the thumb; out-of-range values stick to the nearest end
    pub fn set_progress(&mut self, progress: i64) -> u32 {
        self.progress = progress.clamp(0, i64::from(self.max)) as u32;
        self.progress
    }
}

impl Default for Slider {
    fn default() -> Self {
        Self::new(100)
    }
}

#[derive(Debug)]
struct PanelState {
    slider: Slider,
    value_text: String,
    applied_seq: u64,
}

/// The control screen
#[derive(Clone)]
pub struct ControlPanel {
    sender: Arc<dyn IntensitySender>,
    host: String,
    ordering: ResponseOrdering,
    state: Arc<Mutex<PanelState>>,
    response: Arc<watch::Sender<String>>,
    issued: Arc<AtomicU64>,
}

impl ControlPanel {
    pub fn new(
        sender: Arc<dyn IntensitySender>,
        host: impl Into<String>,
        max: u32,
        ordering: ResponseOrdering,
    ) -> Self {
        let slider = Slider::new(max);
        let (response, _) = watch::channel(String::new());
        Self {
            sender,
            host: host.into(),
            ordering,
            state: Arc::new(Mutex::new(PanelState {
                slider,
                value_text: slider.progress().to_string(),
                applied_seq: 0,
            })),
            response: Arc::new(response),
            issued: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Panel wired to a real HTTP client
    pub fn from_config(config: &DimmerConfig) -> Result<Self> {
        let client = DimmerClient::new(&config.client)?;
        Ok(Self::new(
            Arc::new(client),
            config.client.host.clone(),
            config.panel.max,
            config.panel.ordering,
        ))
    }

    fn state(&self) -> MutexGuard<'_, PanelState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn progress(&self) -> u32 {
        self.state().slider.progress()
    }

    /// Text of the value label
    pub fn value_text(&self) -> String {
        self.state().value_text.clone()
    }

    /// Text of the response label
    pub fn response_text(&self) -> String {
        self.response.borrow().clone()
    }

    /// Receiver notified every time the response label changes
    pub fn subscribe(&self) -> watch::Receiver<String> {
        self.response.subscribe()
    }

    /// Thumb moved while the user is still touching it; nothing is sent
    pub fn drag(&self, progress: i64) -> u32 {
        self.state().slider.set_progress(progress)
    }

    /// Thumb released: echo the value, show the wait text, fire the request.
    ///
    /// Returns immediately; the handle completes once the response label
    /// has been updated (or the result was dropped as stale).
    pub fn release(&self, progress: i64) -> JoinHandle<()> {
        let value = {
            let mut state = self.state();
            let value = state.slider.set_progress(progress);
            state.value_text = value.to_string();
            value
        };
        self.response.send_replace(PLEASE_WAIT.to_string());

        let seq = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        let panel = self.clone();

        tokio::spawn(async move {
            let result = panel.sender.send_intensity(&panel.host, i64::from(value)).await;
            panel.apply(seq, result);
        })
    }

    fn apply(&self, seq: u64, result: String) {
        let mut state = self.state();
        if self.ordering == ResponseOrdering::LatestIssued && seq < state.applied_seq {
            debug!(seq, applied = state.applied_seq, "Ignoring stale response");
            return;
        }
        state.applied_seq = state.applied_seq.max(seq);
        self.response.send_replace(result);
    }
}

/// Slider position typed as text, e.g. one line of panel input
pub fn parse_progress(input: &str) -> Result<i64> {
    let input = input.trim();
    input
        .parse()
        .map_err(|_| DimmerError::invalid_input(format!("'{input}' is not a slider position")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::time::Duration;

    /// Answers `level <n>` after a per-intensity delay
    struct ScriptedSender;

    #[async_trait]
    impl IntensitySender for ScriptedSender {
        async fn send_intensity(&self, _host: &str, intensity: i64) -> String {
            let delay = if intensity < 50 { 150 } else { 10 };
            tokio::time::sleep(Duration::from_millis(delay)).await;
            format!("level {intensity}")
        }
    }

    fn panel(ordering: ResponseOrdering) -> ControlPanel {
        ControlPanel::new(Arc::new(ScriptedSender), "http://stub", 100, ordering)
    }

    #[test]
    fn test_slider_clamps() {
        let mut slider = Slider::default();
        assert_eq!(slider.set_progress(150), 100);
        assert_eq!(slider.set_progress(-3), 0);
        assert_eq!(slider.set_progress(42), 42);
        assert_eq!(slider.max(), 100);
    }

    #[test]
    fn test_ordering_parse() {
        assert_eq!(
            "latest-issued".parse::<ResponseOrdering>().unwrap(),
            ResponseOrdering::LatestIssued
        );
        assert!("fifo".parse::<ResponseOrdering>().is_err());
    }

    #[tokio::test]
    async fn test_initial_labels() {
        let panel = panel(ResponseOrdering::LastWriteWins);
        assert_eq!(panel.value_text(), "0");
        assert_eq!(panel.response_text(), "");
    }

    #[tokio::test]
    async fn test_drag_does_not_send() {
        let panel = panel(ResponseOrdering::LastWriteWins);
        assert_eq!(panel.drag(30), 30);
        assert_eq!(panel.value_text(), "0");
        assert_eq!(panel.response_text(), "");
    }

    #[tokio::test]
    async fn test_release_shows_wait_then_result() {
        let panel = panel(ResponseOrdering::LastWriteWins);
        let handle = panel.release(70);

        assert_eq!(panel.value_text(), "70");
        assert_eq!(panel.response_text(), PLEASE_WAIT);

        handle.await.unwrap();
        assert_eq!(panel.response_text(), "level 70");
    }

    #[tokio::test]
    async fn test_release_clamps_to_slider_range() {
        let panel = panel(ResponseOrdering::LastWriteWins);
        panel.release(400).await.unwrap();
        assert_eq!(panel.value_text(), "100");
        assert_eq!(panel.response_text(), "level 100");
    }

    #[tokio::test]
    async fn test_last_write_wins_lets_late_response_overwrite() {
        let panel = panel(ResponseOrdering::LastWriteWins);
        let slow = panel.release(10);
        let fast = panel.release(90);

        fast.await.unwrap();
        assert_eq!(panel.response_text(), "level 90");
        slow.await.unwrap();
        assert_eq!(panel.response_text(), "level 10");
    }

    #[tokio::test]
    async fn test_latest_issued_drops_stale_response() {
        let panel = panel(ResponseOrdering::LatestIssued);
        let slow = panel.release(10);
        let fast = panel.release(90);

        fast.await.unwrap();
        slow.await.unwrap();
        assert_eq!(panel.response_text(), "level 90");
        assert_eq!(panel.value_text(), "90");
    }

    #[tokio::test]
    async fn test_subscribe_sees_updates() {
        let panel = panel(ResponseOrdering::LastWriteWins);
        let mut rx = panel.subscribe();
        let handle = panel.release(80);
        handle.await.unwrap();

        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow_and_update(), "level 80");
    }

    #[test]
    fn test_parse_progress() {
        assert_eq!(parse_progress(" 42 ").unwrap(), 42);
        assert_eq!(parse_progress("-3").unwrap(), -3);

        let err = parse_progress("bright").unwrap_err();
        assert!(matches!(err, DimmerError::InvalidInput(_)));
        assert!(err.to_string().contains("'bright'"));
    }
}
