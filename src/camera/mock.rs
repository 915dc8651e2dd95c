//! Recording media host for tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{CaptureDevice, DeviceChange, DeviceChangeHub, DeviceChangeSubscription, MediaHost};
use crate::error::{ClassMeetError, ClassMeetResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostCall {
    RequestAccess,
    Enumerate,
    Acquire(String),
    Release { device_id: String, stream_id: u64 },
}

#[derive(Debug, PartialEq, Eq)]
pub struct MockStream {
    pub id: u64,
    pub device_id: String,
}

pub struct MockHost {
    devices: Mutex<Vec<CaptureDevice>>,
    broken: Mutex<HashSet<String>>,
    delays: Mutex<HashMap<String, Duration>>,
    denied: AtomicBool,
    calls: Mutex<Vec<HostCall>>,
    live: Mutex<HashSet<u64>>,
    next_stream_id: AtomicU64,
    hub: DeviceChangeHub,
}

impl MockHost {
    pub fn with_devices(ids: &[&str]) -> Self {
        Self {
            devices: Mutex::new(ids.iter().map(|id| Self::device(id)).collect()),
            broken: Mutex::new(HashSet::new()),
            delays: Mutex::new(HashMap::new()),
            denied: AtomicBool::new(false),
            calls: Mutex::new(Vec::new()),
            live: Mutex::new(HashSet::new()),
            next_stream_id: AtomicU64::new(1),
            hub: DeviceChangeHub::new(),
        }
    }

    fn device(id: &str) -> CaptureDevice {
        CaptureDevice::new(id, format!("Device {}", id))
    }

    pub fn deny_access(&self) {
        self.denied.store(true, Ordering::SeqCst);
    }

    /// Make acquisitions of this device fail.
    pub fn break_device(&self, id: &str) {
        self.broken.lock().insert(id.to_string());
    }

    /// Make acquisitions of this device take `delay` before resolving.
    pub fn delay_device(&self, id: &str, delay: Duration) {
        self.delays.lock().insert(id.to_string(), delay);
    }

    pub fn plug(&self, id: &str) {
        self.devices.lock().push(Self::device(id));
        self.hub.notify(DeviceChange::Connected);
    }

    pub fn unplug(&self, id: &str) {
        self.devices.lock().retain(|d| d.device_id != id);
        self.hub.notify(DeviceChange::Disconnected);
    }

    pub fn calls(&self) -> Vec<HostCall> {
        self.calls.lock().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    pub fn acquire_count(&self) -> usize {
        self.count(|c| matches!(c, HostCall::Acquire(_)))
    }

    pub fn release_count(&self) -> usize {
        self.count(|c| matches!(c, HostCall::Release { .. }))
    }

    pub fn releases_of(&self, device_id: &str) -> usize {
        self.count(|c| matches!(c, HostCall::Release { device_id: d, .. } if d == device_id))
    }

    fn count(&self, pred: impl Fn(&HostCall) -> bool) -> usize {
        self.calls.lock().iter().filter(|c| pred(c)).count()
    }

    /// Streams acquired and not yet released.
    pub fn live_streams(&self) -> usize {
        self.live.lock().len()
    }

    pub fn subscriber_count(&self) -> usize {
        self.hub.subscriber_count()
    }
}

#[async_trait]
impl MediaHost for MockHost {
    type Stream = MockStream;

    async fn request_access(&self) -> ClassMeetResult<()> {
        self.calls.lock().push(HostCall::RequestAccess);
        if self.denied.load(Ordering::SeqCst) {
            return Err(ClassMeetError::PermissionDenied("camera blocked".to_string()));
        }
        Ok(())
    }

    async fn enumerate_devices(&self) -> ClassMeetResult<Vec<CaptureDevice>> {
        self.calls.lock().push(HostCall::Enumerate);
        if self.denied.load(Ordering::SeqCst) {
            return Err(ClassMeetError::PermissionDenied("camera blocked".to_string()));
        }
        Ok(self.devices.lock().clone())
    }

    async fn acquire_stream(&self, device_id: &str) -> ClassMeetResult<MockStream> {
        self.calls.lock().push(HostCall::Acquire(device_id.to_string()));

        let delay = self.delays.lock().get(device_id).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.denied.load(Ordering::SeqCst) {
            return Err(ClassMeetError::PermissionDenied("camera blocked".to_string()));
        }
        let present = self.devices.lock().iter().any(|d| d.device_id == device_id);
        if !present || self.broken.lock().contains(device_id) {
            return Err(ClassMeetError::device_unavailable(device_id));
        }

        let id = self.next_stream_id.fetch_add(1, Ordering::SeqCst);
        self.live.lock().insert(id);
        Ok(MockStream {
            id,
            device_id: device_id.to_string(),
        })
    }

    fn release_stream(&self, stream: &MockStream) {
        self.calls.lock().push(HostCall::Release {
            device_id: stream.device_id.clone(),
            stream_id: stream.id,
        });
        self.live.lock().remove(&stream.id);
    }

    fn subscribe_device_changes(&self) -> DeviceChangeSubscription {
        self.hub.subscribe("mock", 4)
    }
}
