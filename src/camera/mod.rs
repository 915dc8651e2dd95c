//! Multi-camera session management.
//!
//! Owns the client-side state behind the in-call camera tiles:
//! - `DeviceEnumerator` keeps the latest capture device snapshot
//! - `SlotRegistry` maps view slots to exclusively owned stream leases
//! - `CameraSessionManager` sequences acquire/switch/swap/remove per slot
//! - `layout` turns slot state into a rendering plan
//!
//! All hardware access goes through the [`MediaHost`] trait, so the same
//! code runs against a browser bridge, a native backend, or a test mock.

mod device;
mod host;
mod lease;
pub mod layout;
mod registry;
mod session;

#[cfg(feature = "native-camera")]
mod native;

#[cfg(test)]
pub(crate) mod mock;

pub use device::{DeviceChange, DeviceChangeHub, DeviceChangeSubscription, DeviceEnumerator};
pub use host::MediaHost;
pub use layout::{plan_layout, LayoutPlan, TilePlan, TileSize};
pub use lease::StreamLease;
pub use registry::SlotRegistry;
pub use session::CameraSessionManager;

#[cfg(feature = "native-camera")]
pub use native::{CameraFrame, NativeCameraStream, NokhwaHost};

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// A capture device as reported by the host. Immutable snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "generated/")]
pub struct CaptureDevice {
    /// Host-assigned identifier, opaque to this crate.
    pub device_id: String,
    /// Human-readable name. May be empty before access is granted.
    pub label: String,
}

impl CaptureDevice {
    pub fn new(device_id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
            label: label.into(),
        }
    }

    /// Label to show in a device picker, with a short id-based fallback.
    pub fn menu_label(&self) -> String {
        if self.label.is_empty() {
            let short: String = self.device_id.chars().take(5).collect();
            format!("Camera {}", short)
        } else {
            self.label.clone()
        }
    }
}

/// Stable identifier of one camera tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[ts(export, export_to = "generated/")]
pub struct SlotId(pub u32);

impl std::fmt::Display for SlotId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Presentation attribute of a tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "generated/")]
pub enum Presentation {
    Maximized,
    #[default]
    Minimized,
}

/// Read-only snapshot of one slot, safe to hand to the UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "generated/")]
pub struct SlotView {
    pub slot_id: SlotId,
    /// Device backing the slot, `None` until a stream is bound.
    pub device_id: Option<String>,
    pub label: String,
    pub presentation: Presentation,
    /// Whether a live stream is bound.
    pub streaming: bool,
}

impl SlotView {
    pub fn is_maximized(&self) -> bool {
        self.presentation == Presentation::Maximized
    }
}

/// Loading state of the camera view as a whole.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "state", rename_all = "camelCase")]
#[ts(export, export_to = "generated/")]
pub enum LoadState {
    /// Waiting on the permission prompt or the first enumeration.
    Loading,
    /// Devices enumerated; tiles can be shown.
    Ready,
    /// Terminal failure (denied, no hardware). Not retried until the host
    /// reports a device change.
    Unavailable { reason: String },
}

impl LoadState {
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_menu_label_fallback() {
        let named = CaptureDevice::new("abcdef123", "FaceTime HD");
        assert_eq!(named.menu_label(), "FaceTime HD");

        let unnamed = CaptureDevice::new("abcdef123", "");
        assert_eq!(unnamed.menu_label(), "Camera abcde");
    }

    #[test]
    fn test_load_state_serialization() {
        let json = serde_json::to_string(&LoadState::unavailable("no camera")).unwrap();
        assert_eq!(json, r#"{"state":"unavailable","reason":"no camera"}"#);

        let json = serde_json::to_string(&LoadState::Ready).unwrap();
        assert_eq!(json, r#"{"state":"ready"}"#);
    }

    #[test]
    fn test_slot_view_serialization() {
        let view = SlotView {
            slot_id: SlotId(2),
            device_id: Some("cam1".to_string()),
            label: "Camera 2".to_string(),
            presentation: Presentation::Maximized,
            streaming: true,
        };
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["slotId"], 2);
        assert_eq!(json["presentation"], "maximized");
        assert!(view.is_maximized());
    }
}
