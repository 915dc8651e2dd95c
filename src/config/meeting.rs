//! Meeting and call list configuration.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Settings for scheduling meetings and building links.
#[derive(Debug, Clone, Serialize, Deserialize, TS, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
#[ts(export, export_to = "generated/")]
pub struct MeetingConfig {
    /// Public base URL of the web app, without trailing slash.
    pub base_url: String,
    /// Days a recorded meeting is kept before the SDK deletes it (1-365).
    pub retention_days: u32,
}

impl Default for MeetingConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            retention_days: 120,
        }
    }
}

impl MeetingConfig {
    /// Validate and clamp settings to acceptable ranges.
    pub fn validate(&mut self) {
        self.retention_days = self.retention_days.clamp(1, 365);
        while self.base_url.ends_with('/') {
            self.base_url.pop();
        }
    }
}

/// Rate limiting for recording retrieval across many calls.
#[derive(Debug, Clone, Serialize, Deserialize, TS, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
#[ts(export, export_to = "generated/")]
pub struct CallListConfig {
    /// Calls queried concurrently per batch (1-10).
    pub recording_batch_size: usize,
    /// Pause between batches in milliseconds (0-10000).
    pub batch_delay_ms: u64,
}

impl Default for CallListConfig {
    fn default() -> Self {
        Self {
            recording_batch_size: 3,
            batch_delay_ms: 1000,
        }
    }
}

impl CallListConfig {
    /// Validate and clamp settings to acceptable ranges.
    pub fn validate(&mut self) {
        self.recording_batch_size = self.recording_batch_size.clamp(1, 10);
        self.batch_delay_ms = self.batch_delay_ms.min(10_000);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let meeting = MeetingConfig::default();
        assert_eq!(meeting.retention_days, 120);

        let calls = CallListConfig::default();
        assert_eq!(calls.recording_batch_size, 3);
        assert_eq!(calls.batch_delay_ms, 1000);
    }

    #[test]
    fn test_validation() {
        let mut meeting = MeetingConfig {
            base_url: "https://class.example.edu//".to_string(),
            retention_days: 0,
        };
        meeting.validate();
        assert_eq!(meeting.base_url, "https://class.example.edu");
        assert_eq!(meeting.retention_days, 1);

        let mut calls = CallListConfig {
            recording_batch_size: 0,
            batch_delay_ms: 60_000,
        };
        calls.validate();
        assert_eq!(calls.recording_batch_size, 1);
        assert_eq!(calls.batch_delay_ms, 10_000);
    }
}
