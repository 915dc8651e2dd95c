//! Camera session manager.
//!
//! Centralizes the lifecycle of every camera tile:
//! - initialization (access prompt, enumeration, first tile)
//! - add / switch / swap / remove of tiles
//! - hot-plug refresh
//! - release of every stream on shutdown or drop
//!
//! Operations on one slot are serialized through that slot's async gate, so
//! a switch always finishes (old stream released, new one bound) before the
//! next operation on the slot looks at it. Different slots never wait on
//! each other. The registry lock is only held between awaits.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tokio::sync::Mutex as AsyncMutex;
use tokio_util::sync::CancellationToken;

use super::{
    layout, CaptureDevice, DeviceChangeSubscription, DeviceEnumerator, LayoutPlan, LoadState,
    MediaHost, Presentation, SlotId, SlotRegistry, SlotView, StreamLease,
};
use crate::config::{CameraViewConfig, DeviceReusePolicy};
use crate::error::{ClassMeetError, ClassMeetResult};

type SlotGate = Arc<AsyncMutex<()>>;

/// Owns the camera tiles of one call view.
pub struct CameraSessionManager<H: MediaHost> {
    host: Arc<H>,
    config: CameraViewConfig,
    devices: DeviceEnumerator<H>,
    registry: Mutex<SlotRegistry<H>>,
    gates: Mutex<HashMap<SlotId, SlotGate>>,
    state: RwLock<LoadState>,
    /// Hot-plug subscription; taken by the watch loop while it runs.
    device_changes: Mutex<Option<DeviceChangeSubscription>>,
}

impl<H: MediaHost> CameraSessionManager<H> {
    /// Create a manager. Registers for device changes immediately; nothing
    /// is acquired until [`initialize`](Self::initialize).
    pub fn new(host: Arc<H>, mut config: CameraViewConfig) -> Self {
        config.validate();
        let device_changes = host.subscribe_device_changes();
        Self {
            devices: DeviceEnumerator::new(Arc::clone(&host)),
            registry: Mutex::new(SlotRegistry::new(&config)),
            gates: Mutex::new(HashMap::new()),
            state: RwLock::new(LoadState::Loading),
            device_changes: Mutex::new(Some(device_changes)),
            host,
            config,
        }
    }

    pub fn config(&self) -> &CameraViewConfig {
        &self.config
    }

    pub fn state(&self) -> LoadState {
        self.state.read().clone()
    }

    /// Latest device snapshot.
    pub fn devices(&self) -> Vec<CaptureDevice> {
        self.devices.devices()
    }

    pub fn views(&self) -> Vec<SlotView> {
        self.registry.lock().views()
    }

    pub fn view(&self, id: SlotId) -> Option<SlotView> {
        self.registry.lock().view(id)
    }

    pub fn slot_count(&self) -> usize {
        self.registry.lock().len()
    }

    pub fn live_stream_count(&self) -> usize {
        self.registry.lock().live_stream_count()
    }

    /// Run `f` against the stream bound to slot `id` (e.g. to attach it to
    /// a video element).
    pub fn with_stream<R>(&self, id: SlotId, f: impl FnOnce(&H::Stream) -> R) -> Option<R> {
        self.registry.lock().with_stream(id, f)
    }

    /// Rendering plan for the current state.
    pub fn layout(&self) -> LayoutPlan {
        let views = self.views();
        layout::plan_layout(&views, self.devices.len(), self.config.max_slots)
    }

    /// Ask for access, enumerate, and bind the first device into a tile.
    ///
    /// Never fails: every failure lands in `LoadState::Unavailable`, which
    /// is terminal until a device change arrives.
    pub async fn initialize(&self) -> LoadState {
        self.set_state(LoadState::Loading);

        if let Err(e) = self.host.request_access().await {
            log::warn!("[CAMERA_SESSION] Camera access not granted: {}", e);
            return self.set_state(LoadState::unavailable(e.to_string()));
        }

        let devices = self.devices.refresh().await;
        let Some(first) = devices.first().cloned() else {
            return self.set_state(self.devices.state());
        };

        if !self.registry.lock().is_empty() {
            log::debug!("[CAMERA_SESSION] Already initialized, keeping existing views");
            return self.set_state(LoadState::Ready);
        }

        let lease = match StreamLease::acquire(&self.host, &first.device_id).await {
            Ok(lease) => lease,
            Err(e) => {
                log::warn!(
                    "[CAMERA_SESSION] Failed to open initial camera {}: {}",
                    first.device_id,
                    e
                );
                return self.set_state(LoadState::unavailable(e.to_string()));
            },
        };

        let inserted = self.registry.lock().insert(lease, Some(first.label));
        match inserted {
            Ok(id) => {
                self.open_gate(id);
                log::info!(
                    "[CAMERA_SESSION] Initialized with {} on slot {} ({} device(s))",
                    first.device_id,
                    id,
                    devices.len()
                );
            },
            Err(e) => log::debug!("[CAMERA_SESSION] Initial view not added: {}", e),
        }
        self.set_state(LoadState::Ready)
    }

    /// Add a tile on a device chosen by the reuse policy.
    ///
    /// At capacity this fails with `CapacityExceeded` before any host call,
    /// leaving the registry untouched.
    pub async fn add_camera(&self) -> ClassMeetResult<SlotId> {
        let in_use = {
            let registry = self.registry.lock();
            if registry.is_full() {
                log::debug!(
                    "[CAMERA_SESSION] Add rejected, {} of {} views in use",
                    registry.len(),
                    registry.max_slots()
                );
                return Err(ClassMeetError::CapacityExceeded {
                    max: registry.max_slots(),
                });
            }
            registry.devices_in_use()
        };

        let device = self
            .pick_device(&in_use)
            .ok_or_else(|| ClassMeetError::device_unavailable("no unused camera"))?;
        let lease = StreamLease::acquire(&self.host, &device.device_id).await?;
        let id = self.registry.lock().insert(lease, Some(device.label))?;
        self.open_gate(id);

        log::info!("[CAMERA_SESSION] Added slot {} on {}", id, device.device_id);
        Ok(id)
    }

    /// Rebind slot `id` to `device_id`.
    ///
    /// The new stream is acquired first; only once it is live is the old one
    /// released and replaced. A failed acquisition leaves the slot as it
    /// was. Switching to the device already bound does nothing.
    pub async fn switch_camera(&self, id: SlotId, device_id: &str) -> ClassMeetResult<()> {
        let gate = self.gate(id)?;
        let _turn = gate.lock().await;

        {
            let registry = self.registry.lock();
            let view = registry.view(id).ok_or_else(|| ClassMeetError::not_found(id))?;
            if view.device_id.as_deref() == Some(device_id) {
                log::debug!("[CAMERA_SESSION] Slot {} already on {}", id, device_id);
                return Ok(());
            }
            if registry.conflicts(device_id, Some(id)) {
                log::debug!(
                    "[CAMERA_SESSION] {} already shown in another view",
                    device_id
                );
                return Err(ClassMeetError::device_unavailable(device_id));
            }
        }

        let label = self.devices.find(device_id).map(|d| d.label);
        let lease = match StreamLease::acquire(&self.host, device_id).await {
            Ok(lease) => lease,
            Err(e) => {
                log::warn!(
                    "[CAMERA_SESSION] Switch of slot {} to {} failed: {}",
                    id,
                    device_id,
                    e
                );
                return Err(e);
            },
        };

        self.registry.lock().bind(id, lease, label)?;
        log::info!("[CAMERA_SESSION] Slot {} switched to {}", id, device_id);
        Ok(())
    }

    /// Remove slot `id`, releasing its stream.
    pub async fn remove_camera(&self, id: SlotId) -> ClassMeetResult<()> {
        let gate = self.gate(id)?;
        let _turn = gate.lock().await;

        {
            let mut registry = self.registry.lock();
            if self.config.keep_last_slot && registry.len() == 1 && registry.contains(id) {
                return Err(ClassMeetError::InvalidInput(
                    "the last camera view cannot be removed".to_string(),
                ));
            }
            registry.unbind(id)?;
        }
        self.gates.lock().remove(&id);

        log::info!("[CAMERA_SESSION] Removed slot {}", id);
        Ok(())
    }

    /// Set the presentation of a slot. No I/O.
    pub fn set_presentation(&self, id: SlotId, presentation: Presentation) -> ClassMeetResult<()> {
        self.registry.lock().set_presentation(id, presentation)
    }

    /// Maximize or restore a slot. No I/O.
    pub fn toggle_maximize(&self, id: SlotId) -> ClassMeetResult<Presentation> {
        self.registry.lock().toggle_maximize(id)
    }

    /// Exchange the streams of two slots without reopening any device.
    pub async fn swap_cameras(&self, a: SlotId, b: SlotId) -> ClassMeetResult<()> {
        if a == b {
            return match self.registry.lock().contains(a) {
                true => Ok(()),
                false => Err(ClassMeetError::not_found(a)),
            };
        }

        // Fixed lock order keeps two opposite swaps from deadlocking.
        let (low, high) = if a < b { (a, b) } else { (b, a) };
        let low_gate = self.gate(low)?;
        let high_gate = self.gate(high)?;
        let _low = low_gate.lock().await;
        let _high = high_gate.lock().await;

        self.registry.lock().swap(a, b)
    }

    /// Re-enumerate devices after a hot-plug or permission change.
    pub async fn refresh_devices(&self) -> Vec<CaptureDevice> {
        let devices = self.devices.refresh().await;
        let has_views = !self.registry.lock().is_empty();

        if !devices.is_empty() {
            self.set_state(LoadState::Ready);
        } else if !has_views {
            self.set_state(self.devices.state());
        }
        devices
    }

    /// Refresh devices on every hot-plug notification until `cancel` fires
    /// or the host stops sending.
    pub async fn watch_device_changes(&self, cancel: CancellationToken) {
        let Some(subscription) = self.device_changes.lock().take() else {
            log::warn!("[CAMERA_SESSION] Device watch already running");
            return;
        };

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                change = subscription.recv_async() => match change {
                    Some(change) => {
                        log::info!("[CAMERA_SESSION] Device change: {:?}", change);
                        self.refresh_devices().await;
                    },
                    None => {
                        log::debug!("[CAMERA_SESSION] Device change source closed");
                        break;
                    },
                },
            }
        }

        *self.device_changes.lock() = Some(subscription);
    }

    /// Release every stream and drop every tile. Returns the number of
    /// streams released.
    pub fn shutdown(&self) -> usize {
        let released = self.registry.lock().clear();
        self.gates.lock().clear();
        if released > 0 {
            log::info!("[CAMERA_SESSION] Shutdown released {} stream(s)", released);
        }
        released
    }

    fn pick_device(&self, in_use: &[String]) -> Option<CaptureDevice> {
        let devices = self.devices.devices();
        let unused = devices
            .iter()
            .find(|d| !in_use.contains(&d.device_id))
            .cloned();

        match self.config.reuse_policy {
            DeviceReusePolicy::Exclusive => unused,
            DeviceReusePolicy::Shared => unused.or_else(|| devices.first().cloned()),
        }
    }

    fn gate(&self, id: SlotId) -> ClassMeetResult<SlotGate> {
        self.gates
            .lock()
            .get(&id)
            .cloned()
            .ok_or_else(|| ClassMeetError::not_found(id))
    }

    fn open_gate(&self, id: SlotId) {
        self.gates.lock().insert(id, Arc::new(AsyncMutex::new(())));
    }

    fn set_state(&self, state: LoadState) -> LoadState {
        *self.state.write() = state.clone();
        state
    }
}

impl<H: MediaHost> Drop for CameraSessionManager<H> {
    fn drop(&mut self) {
        self.shutdown();
    }
}
