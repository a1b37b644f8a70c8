//! Pending control requests, one slot per device

use tokio::sync::Mutex;

/// Latest requested intensity for a device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlRequest {
    pub device: String,
    pub intensity: i64,
}

impl ControlRequest {
    /// Line sent to device subscribers: `{<token>: <device>=<intensity>}`
    pub fn device_line(&self, token: &str) -> String {
        format!("{{{token}: {}={}}}\n", self.device, self.intensity)
    }
}

/// Requests waiting to be pushed to devices, in arrival order.
///
/// A newer request for the same device replaces the older one in place.
#[derive(Debug, Default)]
pub struct ControlQueue {
    pending: Mutex<Vec<ControlRequest>>,
}

impl ControlQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store the request; returns the intensity it replaced, if any
    pub async fn upsert(&self, device: &str, intensity: i64) -> Option<i64> {
        let mut pending = self.pending.lock().await;
        match pending.iter_mut().find(|r| r.device == device) {
            Some(existing) => Some(std::mem::replace(&mut existing.intensity, intensity)),
            None => {
                pending.push(ControlRequest {
                    device: device.to_string(),
                    intensity,
                });
                None
            }
        }
    }

    pub async fn snapshot(&self) -> Vec<ControlRequest> {
        self.pending.lock().await.clone()
    }

    pub async fn get(&self, device: &str) -> Option<i64> {
        self.pending
            .lock()
            .await
            .iter()
            .find(|r| r.device == device)
            .map(|r| r.intensity)
    }

    pub async fn len(&self) -> usize {
        self.pending.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.pending.lock().await.is_empty()
    }

    /// Drop delivered requests, keeping any that were replaced since the snapshot
    pub async fn retire(&self, delivered: &[ControlRequest]) {
        self.pending
            .lock()
            .await
            .retain(|r| !delivered.contains(r));
    }
}
