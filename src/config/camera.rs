//! Camera view configuration.
//!
//! One parameterized camera component replaces the product's separate
//! single, dual and multi camera widgets. The knobs below pick which of
//! those behaviors the session manager enforces.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Hard upper bound for simultaneously visible camera tiles.
pub const MAX_VIEW_SLOTS: usize = 3;

/// Whether one capture device may back more than one view slot.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, TS, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "generated/")]
pub enum DeviceReusePolicy {
    /// A device backs at most one slot.
    #[default]
    Exclusive,
    /// A device may back several slots. When every device is already in
    /// use, adding a view reuses the first enumerated device.
    Shared,
}

/// How maximize requests interact across slots.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, TS, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "generated/")]
pub enum FocusPolicy {
    /// Maximizing a slot minimizes every other slot.
    #[default]
    SingleMaximize,
    /// Slots maximize independently.
    None,
}

/// Settings for the camera session manager.
#[derive(Debug, Clone, Serialize, Deserialize, TS, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
#[ts(export, export_to = "generated/")]
pub struct CameraViewConfig {
    /// Maximum number of camera tiles (1-3).
    pub max_slots: usize,
    /// Device sharing rule between slots.
    pub reuse_policy: DeviceReusePolicy,
    /// Maximize interaction rule.
    pub focus_policy: FocusPolicy,
    /// Refuse to remove the only remaining tile (shutdown still clears it).
    pub keep_last_slot: bool,
}

impl Default for CameraViewConfig {
    fn default() -> Self {
        Self {
            max_slots: MAX_VIEW_SLOTS,
            reuse_policy: DeviceReusePolicy::default(),
            focus_policy: FocusPolicy::default(),
            keep_last_slot: true,
        }
    }
}

impl CameraViewConfig {
    /// Single-tile camera switcher.
    pub fn single() -> Self {
        Self {
            max_slots: 1,
            ..Self::default()
        }
    }

    /// Validate and clamp settings to acceptable ranges.
    pub fn validate(&mut self) {
        self.max_slots = self.max_slots.clamp(1, MAX_VIEW_SLOTS);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CameraViewConfig::default();
        assert_eq!(config.max_slots, 3);
        assert_eq!(config.reuse_policy, DeviceReusePolicy::Exclusive);
        assert_eq!(config.focus_policy, FocusPolicy::SingleMaximize);
        assert!(config.keep_last_slot);
    }

    #[test]
    fn test_config_validation() {
        let mut config = CameraViewConfig {
            max_slots: 0,
            ..Default::default()
        };
        config.validate();
        assert_eq!(config.max_slots, 1);

        config.max_slots = 12;
        config.validate();
        assert_eq!(config.max_slots, MAX_VIEW_SLOTS);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: CameraViewConfig =
            serde_json::from_str(r#"{"maxSlots":2,"reusePolicy":"shared"}"#).unwrap();
        assert_eq!(config.max_slots, 2);
        assert_eq!(config.reuse_policy, DeviceReusePolicy::Shared);
        assert_eq!(config.focus_policy, FocusPolicy::SingleMaximize);
        assert!(config.keep_last_slot);
    }
}
