//! Application configuration.
//!
//! Typed settings structs, owned by whoever builds the session objects and
//! passed in explicitly. Every struct has sane defaults and a `validate()`
//! that clamps out-of-range values, so a partial or hand-edited JSON file
//! still yields a usable configuration.
//!
//! ## Architecture
//!
//! - `CameraViewConfig`: slot cap, device reuse and maximize rules
//! - `MeetingConfig`: base URL for links, recording retention
//! - `CallListConfig`: batching for recording retrieval

pub mod camera;
pub mod meeting;

pub use camera::{CameraViewConfig, DeviceReusePolicy, FocusPolicy, MAX_VIEW_SLOTS};
pub use meeting::{CallListConfig, MeetingConfig};

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ClassMeetResult, ResultExt};

/// All settings in one document.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct ClassMeetConfig {
    pub camera: CameraViewConfig,
    pub meeting: MeetingConfig,
    pub calls: CallListConfig,
}

impl ClassMeetConfig {
    /// Validate every section.
    pub fn validate(&mut self) {
        self.camera.validate();
        self.meeting.validate();
        self.calls.validate();
    }

    /// Parse a JSON document, filling gaps with defaults.
    pub fn from_json(json: &str) -> ClassMeetResult<Self> {
        let mut config: Self = serde_json::from_str(json)?;
        config.validate();
        Ok(config)
    }

    /// Load from a file. A missing file yields the defaults.
    pub fn load(path: &Path) -> ClassMeetResult<Self> {
        if !path.exists() {
            log::debug!("[CONFIG] {:?} not found, using defaults", path);
            return Ok(Self::default());
        }
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {:?}", path))?;
        let config = Self::from_json(&json)?;
        log::debug!("[CONFIG] Loaded {:?}: {:?}", path, config);
        Ok(config)
    }

    /// Write the configuration as pretty JSON, creating parent directories.
    pub fn save(&self, path: &Path) -> ClassMeetResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

/// Per-user configuration directory (`<config dir>/classmeet`).
pub fn default_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("classmeet"))
}
