//! Scoped ownership of a live capture stream.

use std::fmt;
use std::sync::Arc;

use super::MediaHost;
use crate::error::ClassMeetResult;

/// An acquired stream that is released exactly once: on [`release`] or,
/// failing that, on drop. Moving a lease moves ownership of the hardware
/// handle; no code path can copy it.
///
/// [`release`]: StreamLease::release
pub struct StreamLease<H: MediaHost> {
    host: Arc<H>,
    device_id: String,
    stream: Option<H::Stream>,
}

impl<H: MediaHost> StreamLease<H> {
    /// Open a stream on `device_id`. Nothing is held on failure.
    pub async fn acquire(host: &Arc<H>, device_id: &str) -> ClassMeetResult<Self> {
        log::debug!("[STREAM] Acquiring {}", device_id);
        let stream = host.acquire_stream(device_id).await?;
        log::debug!("[STREAM] Acquired {}", device_id);
        Ok(Self {
            host: Arc::clone(host),
            device_id: device_id.to_string(),
            stream: Some(stream),
        })
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    /// The underlying stream, for attaching to a video element or encoder.
    pub fn stream(&self) -> Option<&H::Stream> {
        self.stream.as_ref()
    }

    /// Release now instead of at end of scope.
    pub fn release(mut self) {
        self.release_inner();
    }

    fn release_inner(&mut self) {
        if let Some(stream) = self.stream.take() {
            log::debug!("[STREAM] Releasing {}", self.device_id);
            self.host.release_stream(&stream);
        }
    }
}

impl<H: MediaHost> Drop for StreamLease<H> {
    fn drop(&mut self) {
        self.release_inner();
    }
}

impl<H: MediaHost> fmt::Debug for StreamLease<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamLease")
            .field("device_id", &self.device_id)
            .field("live", &self.stream.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::mock::MockHost;

    #[tokio::test]
    async fn test_release_once_explicit() {
        let host = Arc::new(MockHost::with_devices(&["cam1"]));
        let lease = StreamLease::acquire(&host, "cam1").await.unwrap();
        assert_eq!(host.live_streams(), 1);
        assert_eq!(lease.stream().map(|s| s.device_id.as_str()), Some("cam1"));

        lease.release();
        assert_eq!(host.live_streams(), 0);
        assert_eq!(host.release_count(), 1);
    }

    #[tokio::test]
    async fn test_release_on_drop() {
        let host = Arc::new(MockHost::with_devices(&["cam1"]));
        {
            let _lease = StreamLease::acquire(&host, "cam1").await.unwrap();
        }
        assert_eq!(host.live_streams(), 0);
        assert_eq!(host.release_count(), 1);
    }

    #[tokio::test]
    async fn test_failed_acquire_holds_nothing() {
        let host = Arc::new(MockHost::with_devices(&["cam1"]));
        host.break_device("cam1");

        let result = StreamLease::acquire(&host, "cam1").await;
        assert!(result.is_err());
        assert_eq!(host.live_streams(), 0);
        assert_eq!(host.release_count(), 0);
    }
}
