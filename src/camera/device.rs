//! Capture device enumeration and hot-plug notifications.
//!
//! Architecture:
//! - `DeviceChangeHub` is embedded by a host; it keeps a list of subscribers
//!   and broadcasts each change via try_send (non-blocking)
//! - A full subscriber channel drops the notification; the subscriber
//!   re-enumerates anyway, so one pending notification is enough
//! - `DeviceEnumerator` holds the latest device snapshot, read-shared by
//!   every slot

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use flume::{Receiver, Sender};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use super::{CaptureDevice, LoadState, MediaHost};

/// Kind of hot-plug event reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DeviceChange {
    Connected,
    Disconnected,
    /// Access permission was granted or revoked.
    PermissionChanged,
}

/// A subscriber to device changes.
struct Subscriber {
    sender: Sender<DeviceChange>,
    /// Name for debugging.
    name: String,
    id: u64,
}

/// Broadcasts device-change notifications to registered subscribers.
pub struct DeviceChangeHub {
    subscribers: Arc<RwLock<Vec<Subscriber>>>,
    next_subscriber_id: AtomicU64,
}

/// Handle returned when subscribing. Dropping it unsubscribes.
pub struct DeviceChangeSubscription {
    receiver: Receiver<DeviceChange>,
    id: u64,
    /// `None` for a detached subscription that never fires.
    subscribers: Option<Arc<RwLock<Vec<Subscriber>>>>,
}

impl Drop for DeviceChangeSubscription {
    fn drop(&mut self) {
        if let Some(subscribers) = &self.subscribers {
            let mut subs = subscribers.write();
            subs.retain(|s| s.id != self.id);
            log::debug!(
                "[DEVICE_WATCH] Subscriber {} dropped, {} remaining",
                self.id,
                subs.len()
            );
        }
    }
}

impl DeviceChangeSubscription {
    /// Subscription for hosts without hot-plug support. Its channel is
    /// already closed, so a watcher ends immediately.
    pub fn detached() -> Self {
        let (_, receiver) = flume::bounded(1);
        Self {
            receiver,
            id: 0,
            subscribers: None,
        }
    }

    /// Try to receive a change without blocking.
    pub fn try_recv(&self) -> Option<DeviceChange> {
        self.receiver.try_recv().ok()
    }

    /// Wait for the next change. `None` once the hub is gone.
    pub async fn recv_async(&self) -> Option<DeviceChange> {
        self.receiver.recv_async().await.ok()
    }
}

impl DeviceChangeHub {
    pub fn new() -> Self {
        Self {
            subscribers: Arc::new(RwLock::new(Vec::new())),
            next_subscriber_id: AtomicU64::new(1),
        }
    }

    /// Register a subscriber.
    ///
    /// # Arguments
    /// * `name` - Name for debugging (e.g., "camera-session")
    /// * `buffer_size` - Pending notifications kept per subscriber
    pub fn subscribe(&self, name: &str, buffer_size: usize) -> DeviceChangeSubscription {
        let (sender, receiver) = flume::bounded(buffer_size.max(1));
        let id = self.next_subscriber_id.fetch_add(1, Ordering::SeqCst);

        self.subscribers.write().push(Subscriber {
            sender,
            name: name.to_string(),
            id,
        });
        log::debug!("[DEVICE_WATCH] New subscriber '{}' (id={})", name, id);

        DeviceChangeSubscription {
            receiver,
            id,
            subscribers: Some(Arc::clone(&self.subscribers)),
        }
    }

    /// Number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }

    /// Broadcast a change to all subscribers.
    pub fn notify(&self, change: DeviceChange) {
        let mut disconnected = Vec::new();
        {
            let subs = self.subscribers.read();
            for sub in subs.iter() {
                match sub.sender.try_send(change) {
                    Ok(()) => {},
                    Err(flume::TrySendError::Full(_)) => {
                        log::debug!(
                            "[DEVICE_WATCH] Subscriber '{}' has a pending change, coalescing",
                            sub.name
                        );
                    },
                    Err(flume::TrySendError::Disconnected(_)) => {
                        log::info!("[DEVICE_WATCH] Subscriber '{}' disconnected", sub.name);
                        disconnected.push(sub.id);
                    },
                }
            }
        }

        if !disconnected.is_empty() {
            self.subscribers
                .write()
                .retain(|s| !disconnected.contains(&s.id));
        }
    }
}

impl Default for DeviceChangeHub {
    fn default() -> Self {
        Self::new()
    }
}

/// Latest snapshot of capture devices.
pub struct DeviceEnumerator<H: MediaHost> {
    host: Arc<H>,
    devices: RwLock<Vec<CaptureDevice>>,
    state: RwLock<LoadState>,
}

impl<H: MediaHost> DeviceEnumerator<H> {
    pub fn new(host: Arc<H>) -> Self {
        Self {
            host,
            devices: RwLock::new(Vec::new()),
            state: RwLock::new(LoadState::Loading),
        }
    }

    /// Query the host and replace the snapshot.
    ///
    /// Never fails: a host error yields an empty list and an
    /// `Unavailable` state.
    pub async fn refresh(&self) -> Vec<CaptureDevice> {
        let (devices, state) = match self.host.enumerate_devices().await {
            Ok(devices) if devices.is_empty() => {
                log::warn!("[DEVICE_ENUM] No capture devices found");
                (devices, LoadState::unavailable("No camera found"))
            },
            Ok(devices) => {
                log::info!("[DEVICE_ENUM] {} capture device(s)", devices.len());
                (devices, LoadState::Ready)
            },
            Err(e) => {
                log::warn!("[DEVICE_ENUM] Enumeration failed: {}", e);
                (Vec::new(), LoadState::unavailable(e.to_string()))
            },
        };

        *self.devices.write() = devices.clone();
        *self.state.write() = state;
        devices
    }

    /// Current snapshot.
    pub fn devices(&self) -> Vec<CaptureDevice> {
        self.devices.read().clone()
    }

    pub fn len(&self) -> usize {
        self.devices.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.read().is_empty()
    }

    /// Outcome of the last refresh.
    pub fn state(&self) -> LoadState {
        self.state.read().clone()
    }

    pub fn find(&self, device_id: &str) -> Option<CaptureDevice> {
        self.devices
            .read()
            .iter()
            .find(|d| d.device_id == device_id)
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::mock::MockHost;

    #[test]
    fn test_hub_broadcast_and_unsubscribe() {
        let hub = DeviceChangeHub::new();
        let first = hub.subscribe("first", 4);
        let second = hub.subscribe("second", 4);
        assert_eq!(hub.subscriber_count(), 2);

        hub.notify(DeviceChange::Connected);
        assert_eq!(first.try_recv(), Some(DeviceChange::Connected));
        assert_eq!(second.try_recv(), Some(DeviceChange::Connected));

        drop(first);
        assert_eq!(hub.subscriber_count(), 1);

        hub.notify(DeviceChange::Disconnected);
        assert_eq!(second.try_recv(), Some(DeviceChange::Disconnected));
        assert_eq!(second.try_recv(), None);
    }

    #[test]
    fn test_hub_coalesces_when_full() {
        let hub = DeviceChangeHub::new();
        let sub = hub.subscribe("slow", 1);

        hub.notify(DeviceChange::Connected);
        hub.notify(DeviceChange::Disconnected);

        assert_eq!(sub.try_recv(), Some(DeviceChange::Connected));
        assert_eq!(sub.try_recv(), None);
        assert_eq!(hub.subscriber_count(), 1);
    }

    #[tokio::test]
    async fn test_detached_subscription_ends() {
        let sub = DeviceChangeSubscription::detached();
        assert_eq!(sub.recv_async().await, None);
    }

    #[tokio::test]
    async fn test_refresh_replaces_snapshot() {
        let host = Arc::new(MockHost::with_devices(&["cam1", "cam2"]));
        let enumerator = DeviceEnumerator::new(Arc::clone(&host));
        assert!(enumerator.state().is_loading());

        let devices = enumerator.refresh().await;
        assert_eq!(devices.len(), 2);
        assert_eq!(enumerator.state(), LoadState::Ready);
        assert!(enumerator.find("cam2").is_some());

        host.unplug("cam2");
        enumerator.refresh().await;
        assert_eq!(enumerator.len(), 1);
        assert!(enumerator.find("cam2").is_none());
    }

    #[tokio::test]
    async fn test_refresh_failure_is_empty_and_terminal() {
        let host = Arc::new(MockHost::with_devices(&["cam1"]));
        host.deny_access();
        let enumerator = DeviceEnumerator::new(host);

        let devices = enumerator.refresh().await;
        assert!(devices.is_empty());
        assert!(matches!(enumerator.state(), LoadState::Unavailable { .. }));
    }

    #[tokio::test]
    async fn test_refresh_no_devices() {
        let host = Arc::new(MockHost::with_devices(&[]));
        let enumerator = DeviceEnumerator::new(host);

        enumerator.refresh().await;
        assert!(enumerator.is_empty());
        assert_eq!(enumerator.state(), LoadState::unavailable("No camera found"));
    }
}
