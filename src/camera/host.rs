//! Capability boundary to the capture environment.

use async_trait::async_trait;

use super::{CaptureDevice, DeviceChangeSubscription};
use crate::error::ClassMeetResult;

/// Media-device capability of the host (browser bridge, native backend,
/// test mock).
///
/// Acquisitions may stay pending for as long as the environment takes to
/// answer a permission prompt; callers never impose a timeout.
#[async_trait]
pub trait MediaHost: Send + Sync + 'static {
    /// Live capture session handle.
    type Stream: Send + Sync + 'static;

    /// Trigger the access prompt if the environment has one.
    async fn request_access(&self) -> ClassMeetResult<()> {
        Ok(())
    }

    /// List video capture devices. May fail with `PermissionDenied`.
    async fn enumerate_devices(&self) -> ClassMeetResult<Vec<CaptureDevice>>;

    /// Open a capture session on one device. May fail with
    /// `DeviceUnavailable` or `PermissionDenied`.
    async fn acquire_stream(&self, device_id: &str) -> ClassMeetResult<Self::Stream>;

    /// Stop a capture session. Idempotent and infallible.
    fn release_stream(&self, stream: &Self::Stream);

    /// Register for hot-plug notifications. Dropping the returned handle
    /// unregisters.
    fn subscribe_device_changes(&self) -> DeviceChangeSubscription;
}
