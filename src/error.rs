//! Central error types for ClassMeet.
//!
//! Every fallible operation in the crate returns [`ClassMeetResult`].
//! Errors implement `Serialize` so the UI bridge can hand them to the
//! frontend as plain messages.

use serde::Serialize;
use thiserror::Error;

/// Main error type for ClassMeet operations.
#[derive(Error, Debug)]
pub enum ClassMeetError {
    /// The user or the host environment refused camera access.
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Capture device is busy, unplugged, or otherwise cannot be opened.
    #[error("Device unavailable: {device_id}")]
    DeviceUnavailable { device_id: String },

    /// Adding a view slot would exceed the configured maximum.
    #[error("Capacity exceeded: at most {max} camera views")]
    CapacityExceeded { max: usize },

    /// Operation targeted a slot id that is not (or no longer) registered.
    #[error("Camera view not found: {slot_id}")]
    NotFound { slot_id: String },

    /// Caller supplied a value the operation cannot accept (blank name, etc).
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The video SDK rejected a call operation.
    #[error("Video SDK error: {0}")]
    Sdk(String),

    /// Storage operation failed
    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

impl ClassMeetError {
    pub fn device_unavailable(device_id: impl Into<String>) -> Self {
        Self::DeviceUnavailable {
            device_id: device_id.into(),
        }
    }

    pub fn not_found(slot_id: impl ToString) -> Self {
        Self::NotFound {
            slot_id: slot_id.to_string(),
        }
    }

    /// Errors the UI treats as silent no-ops rather than user-facing faults.
    pub fn is_contract_violation(&self) -> bool {
        matches!(self, Self::CapacityExceeded { .. } | Self::NotFound { .. })
    }
}

/// Serialize as the error message string for the UI bridge.
impl Serialize for ClassMeetError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl From<String> for ClassMeetError {
    fn from(msg: String) -> Self {
        ClassMeetError::Other(msg)
    }
}

impl From<&str> for ClassMeetError {
    fn from(msg: &str) -> Self {
        ClassMeetError::Other(msg.to_string())
    }
}

/// Extension trait for adding context to Results.
///
/// # Example
/// ```ignore
/// use crate::error::{ClassMeetResult, ResultExt};
///
/// fn load() -> ClassMeetResult<String> {
///     std::fs::read_to_string("prefs.json").context("failed to read preferences")
/// }
/// ```
pub trait ResultExt<T> {
    /// Add context to an error, converting it to ClassMeetError::Other.
    fn context(self, msg: &str) -> ClassMeetResult<T>;

    /// Add context lazily (only evaluated on error).
    fn with_context<F: FnOnce() -> String>(self, f: F) -> ClassMeetResult<T>;
}

impl<T, E: std::fmt::Display> ResultExt<T> for Result<T, E> {
    fn context(self, msg: &str) -> ClassMeetResult<T> {
        self.map_err(|e| ClassMeetError::Other(format!("{}: {}", msg, e)))
    }

    fn with_context<F: FnOnce() -> String>(self, f: F) -> ClassMeetResult<T> {
        self.map_err(|e| ClassMeetError::Other(format!("{}: {}", f(), e)))
    }
}

/// Extension trait for adding context to Option types.
pub trait OptionExt<T> {
    /// Convert None to ClassMeetError::Other with the given message.
    fn context(self, msg: &str) -> ClassMeetResult<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn context(self, msg: &str) -> ClassMeetResult<T> {
        self.ok_or_else(|| ClassMeetError::Other(msg.to_string()))
    }
}

/// Type alias for Results using ClassMeetError.
pub type ClassMeetResult<T> = Result<T, ClassMeetError>;
