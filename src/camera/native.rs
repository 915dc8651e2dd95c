//! Native capture host backed by nokhwa.
//!
//! Each acquired stream owns a capture thread that polls the camera and
//! broadcasts frames to subscribers via `try_send`. Slow subscribers drop
//! frames independently. Releasing the stream signals the thread to close
//! the device; the join happens off the caller's thread, and the next
//! acquisition of the same device waits for it.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use async_trait::async_trait;
use flume::{Receiver, Sender};
use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{ApiBackend, CameraIndex, RequestedFormat, RequestedFormatType};
use nokhwa::Camera;
use parking_lot::{Mutex, RwLock};
use tokio::sync::oneshot;

use super::{CaptureDevice, DeviceChange, DeviceChangeHub, DeviceChangeSubscription, MediaHost};
use crate::error::{ClassMeetError, ClassMeetResult};

/// One decoded RGB frame.
#[derive(Clone)]
pub struct CameraFrame {
    pub data: Arc<Vec<u8>>,
    pub width: u32,
    pub height: u32,
    /// Monotonic per stream.
    pub frame_id: u64,
}

struct FrameSubscriber {
    sender: Sender<CameraFrame>,
    name: String,
    id: u64,
}

type FrameSubscribers = Arc<RwLock<Vec<FrameSubscriber>>>;

/// Receiving end of a frame subscription. Unsubscribes on drop.
pub struct FrameSubscription {
    pub receiver: Receiver<CameraFrame>,
    id: u64,
    subscribers: FrameSubscribers,
}

impl Drop for FrameSubscription {
    fn drop(&mut self) {
        self.subscribers.write().retain(|s| s.id != self.id);
    }
}

impl FrameSubscription {
    pub fn try_recv(&self) -> Option<CameraFrame> {
        self.receiver.try_recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<CameraFrame> {
        self.receiver.recv_timeout(timeout).ok()
    }
}

/// A running capture on one device.
pub struct NativeCameraStream {
    device_id: String,
    dimensions: (u32, u32),
    subscribers: FrameSubscribers,
    next_subscriber_id: AtomicU64,
    stop_signal: Arc<AtomicBool>,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl NativeCameraStream {
    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    /// Negotiated frame size.
    pub fn dimensions(&self) -> (u32, u32) {
        self.dimensions
    }

    pub fn is_running(&self) -> bool {
        !self.stop_signal.load(Ordering::SeqCst)
    }

    /// Receive frames. `buffer_size` frames are queued before dropping.
    pub fn subscribe(&self, name: &str, buffer_size: usize) -> FrameSubscription {
        let (sender, receiver) = flume::bounded(buffer_size);
        let id = self.next_subscriber_id.fetch_add(1, Ordering::SeqCst);
        self.subscribers.write().push(FrameSubscriber {
            sender,
            name: name.to_string(),
            id,
        });
        log::info!(
            "[NATIVE_CAMERA] New frame subscriber '{}' on {} (id={})",
            name,
            self.device_id,
            id
        );
        FrameSubscription {
            receiver,
            id,
            subscribers: Arc::clone(&self.subscribers),
        }
    }

    /// Tell the capture thread to exit and hand back its handle, if it
    /// has not been collected yet.
    fn signal_stop(&self) -> Option<JoinHandle<()>> {
        self.stop_signal.store(true, Ordering::SeqCst);
        self.thread.lock().take()
    }
}

impl Drop for NativeCameraStream {
    fn drop(&mut self) {
        if let Some(thread) = self.signal_stop() {
            let _ = thread.join();
        }
    }
}

/// [`MediaHost`] over the platform camera API.
///
/// nokhwa has no hot-plug callback, so device changes are fed in by the
/// embedding application through [`notify_device_change`].
///
/// [`notify_device_change`]: NokhwaHost::notify_device_change
pub struct NokhwaHost {
    backend: ApiBackend,
    changes: DeviceChangeHub,
    /// Capture threads still shutting down, by device id.
    closing: Mutex<HashMap<String, tokio::task::JoinHandle<()>>>,
}

impl Default for NokhwaHost {
    fn default() -> Self {
        Self::new()
    }
}

impl NokhwaHost {
    pub fn new() -> Self {
        Self {
            backend: ApiBackend::Auto,
            changes: DeviceChangeHub::new(),
            closing: Mutex::new(HashMap::new()),
        }
    }

    pub fn notify_device_change(&self, change: DeviceChange) {
        self.changes.notify(change);
    }
}

fn parse_index(device_id: &str) -> CameraIndex {
    match device_id.parse::<u32>() {
        Ok(index) => CameraIndex::Index(index),
        Err(_) => CameraIndex::String(device_id.to_string()),
    }
}

#[async_trait]
impl MediaHost for NokhwaHost {
    type Stream = NativeCameraStream;

    async fn enumerate_devices(&self) -> ClassMeetResult<Vec<CaptureDevice>> {
        let backend = self.backend;
        let infos = tokio::task::spawn_blocking(move || nokhwa::query(backend))
            .await
            .map_err(|e| ClassMeetError::Other(format!("Enumeration task failed: {}", e)))?
            .map_err(|e| ClassMeetError::Sdk(format!("Failed to query cameras: {}", e)))?;

        Ok(infos
            .into_iter()
            .map(|info| CaptureDevice::new(info.index().as_string(), info.human_name()))
            .collect())
    }

    async fn acquire_stream(&self, device_id: &str) -> ClassMeetResult<NativeCameraStream> {
        // The device must be closed before it can be opened again.
        let closing = self.closing.lock().remove(device_id);
        if let Some(closing) = closing {
            let _ = closing.await;
        }

        let index = parse_index(device_id);
        let subscribers: FrameSubscribers = Arc::new(RwLock::new(Vec::new()));
        let stop_signal = Arc::new(AtomicBool::new(false));
        let (opened_tx, opened_rx) = oneshot::channel();

        let thread = {
            let subscribers = Arc::clone(&subscribers);
            let stop_signal = Arc::clone(&stop_signal);
            std::thread::Builder::new()
                .name(format!("camera-{}", device_id))
                .spawn(move || capture_loop(index, subscribers, stop_signal, opened_tx))
                .map_err(|e| ClassMeetError::Other(format!("Failed to spawn capture thread: {}", e)))?
        };

        let dimensions = match opened_rx.await {
            Ok(Ok(dimensions)) => dimensions,
            Ok(Err(reason)) => {
                let _ = thread.join();
                log::warn!("[NATIVE_CAMERA] {} failed to open: {}", device_id, reason);
                return Err(ClassMeetError::device_unavailable(device_id));
            },
            Err(_) => {
                let _ = thread.join();
                return Err(ClassMeetError::device_unavailable(device_id));
            },
        };

        Ok(NativeCameraStream {
            device_id: device_id.to_string(),
            dimensions,
            subscribers,
            next_subscriber_id: AtomicU64::new(1),
            stop_signal,
            thread: Mutex::new(Some(thread)),
        })
    }

    /// Signals the capture thread and returns without waiting for it. The
    /// join runs on the blocking pool when a runtime is available.
    fn release_stream(&self, stream: &NativeCameraStream) {
        log::info!("[NATIVE_CAMERA] Releasing {}", stream.device_id);
        let Some(thread) = stream.signal_stop() else {
            return;
        };

        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                let closing = runtime.spawn_blocking(move || {
                    let _ = thread.join();
                });
                self.closing.lock().insert(stream.device_id.clone(), closing);
            },
            Err(_) => {
                let _ = thread.join();
            },
        }
    }

    fn subscribe_device_changes(&self) -> DeviceChangeSubscription {
        self.changes.subscribe("native-camera", 4)
    }
}

fn capture_loop(
    index: CameraIndex,
    subscribers: FrameSubscribers,
    stop_signal: Arc<AtomicBool>,
    opened: oneshot::Sender<Result<(u32, u32), String>>,
) {
    let requested =
        RequestedFormat::new::<RgbFormat>(RequestedFormatType::AbsoluteHighestFrameRate);
    let mut camera = match Camera::new(index.clone(), requested) {
        Ok(camera) => camera,
        Err(e) => {
            let _ = opened.send(Err(format!("Failed to create camera: {}", e)));
            return;
        },
    };
    if let Err(e) = camera.open_stream() {
        let _ = opened.send(Err(format!("Failed to open camera stream: {}", e)));
        return;
    }

    let resolution = camera.resolution();
    let (width, height) = (resolution.width(), resolution.height());
    log::info!(
        "[NATIVE_CAMERA] Camera {} opened: {}x{} format={:?}",
        index,
        width,
        height,
        camera.frame_format()
    );
    let _ = opened.send(Ok((width, height)));

    let mut frame_id: u64 = 0;
    while !stop_signal.load(Ordering::Relaxed) {
        let decoded = camera
            .frame()
            .and_then(|buffer| buffer.decode_image::<RgbFormat>());
        match decoded {
            Ok(image) => {
                frame_id += 1;
                let frame = CameraFrame {
                    width: image.width(),
                    height: image.height(),
                    data: Arc::new(image.into_raw()),
                    frame_id,
                };
                broadcast_frame(&subscribers, &frame);
            },
            Err(e) => {
                if frame_id == 0 {
                    log::error!("[NATIVE_CAMERA] Frame capture error: {}", e);
                }
                std::thread::sleep(Duration::from_millis(10));
            },
        }
    }

    let _ = camera.stop_stream();
    log::info!(
        "[NATIVE_CAMERA] Capture on {} stopped after {} frames",
        index,
        frame_id
    );
}

fn broadcast_frame(subscribers: &FrameSubscribers, frame: &CameraFrame) {
    let mut disconnected = Vec::new();
    for sub in subscribers.read().iter() {
        match sub.sender.try_send(frame.clone()) {
            Ok(()) | Err(flume::TrySendError::Full(_)) => {},
            Err(flume::TrySendError::Disconnected(_)) => {
                log::info!("[NATIVE_CAMERA] Subscriber '{}' disconnected", sub.name);
                disconnected.push(sub.id);
            },
        }
    }
    if !disconnected.is_empty() {
        subscribers.write().retain(|s| !disconnected.contains(&s.id));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_index() {
        assert_eq!(parse_index("0"), CameraIndex::Index(0));
        assert_eq!(
            parse_index("usb-123"),
            CameraIndex::String("usb-123".to_string())
        );
    }

    fn slow_exit_stream(device_id: &str, exited: Arc<AtomicBool>) -> NativeCameraStream {
        let stop_signal = Arc::new(AtomicBool::new(false));
        let thread = {
            let stop_signal = Arc::clone(&stop_signal);
            std::thread::spawn(move || {
                while !stop_signal.load(Ordering::SeqCst) {
                    std::thread::sleep(Duration::from_millis(5));
                }
                // Closing the device takes a while.
                std::thread::sleep(Duration::from_millis(200));
                exited.store(true, Ordering::SeqCst);
            })
        };
        NativeCameraStream {
            device_id: device_id.to_string(),
            dimensions: (640, 480),
            subscribers: Arc::new(RwLock::new(Vec::new())),
            next_subscriber_id: AtomicU64::new(1),
            stop_signal,
            thread: Mutex::new(Some(thread)),
        }
    }

    #[tokio::test]
    async fn test_release_does_not_wait_for_capture_thread() {
        let host = NokhwaHost::new();
        let exited = Arc::new(AtomicBool::new(false));
        let stream = slow_exit_stream("0", Arc::clone(&exited));

        let started = std::time::Instant::now();
        host.release_stream(&stream);
        assert!(started.elapsed() < Duration::from_millis(100));
        assert!(!stream.is_running());
        assert!(!exited.load(Ordering::SeqCst));

        let closing = host.closing.lock().remove("0").unwrap();
        closing.await.unwrap();
        assert!(exited.load(Ordering::SeqCst));

        // Second release and drop have nothing left to join.
        host.release_stream(&stream);
        assert!(host.closing.lock().is_empty());
        drop(stream);
    }

    #[test]
    fn test_drop_joins_capture_thread() {
        let exited = Arc::new(AtomicBool::new(false));
        drop(slow_exit_stream("1", Arc::clone(&exited)));
        assert!(exited.load(Ordering::SeqCst));
    }

    #[test]
    fn test_broadcast_drops_disconnected_subscribers() {
        let subscribers: FrameSubscribers = Arc::new(RwLock::new(Vec::new()));
        let (kept_tx, kept_rx) = flume::bounded(1);
        let (gone_tx, gone_rx) = flume::bounded(1);
        subscribers.write().push(FrameSubscriber {
            sender: kept_tx,
            name: "preview".to_string(),
            id: 1,
        });
        subscribers.write().push(FrameSubscriber {
            sender: gone_tx,
            name: "recording".to_string(),
            id: 2,
        });
        drop(gone_rx);

        let frame = CameraFrame {
            data: Arc::new(vec![0; 12]),
            width: 2,
            height: 2,
            frame_id: 1,
        };
        broadcast_frame(&subscribers, &frame);
        broadcast_frame(&subscribers, &frame);

        assert_eq!(subscribers.read().len(), 1);
        assert_eq!(kept_rx.try_recv().map(|f| f.frame_id).ok(), Some(1));
    }
}
