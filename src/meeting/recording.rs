//! Call recording state and user-facing notices.

use async_trait::async_trait;
use serde::Serialize;
use ts_rs::TS;

use crate::error::{ClassMeetError, ClassMeetResult};

/// Prefix shown in the window title while recording.
pub const RECORDING_MARKER: &str = "🔴 ";

/// Recording controls of the call SDK.
#[async_trait]
pub trait CallRecorder: Send + Sync {
    async fn start_recording(&self) -> ClassMeetResult<()>;
    async fn stop_recording(&self) -> ClassMeetResult<()>;
}

/// Short sine tone played on state changes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "generated/")]
pub struct NotificationCue {
    pub frequency_hz: u32,
    pub duration_ms: u32,
    pub gain: f32,
}

impl NotificationCue {
    pub const START: Self = Self {
        frequency_hz: 880,
        duration_ms: 200,
        gain: 0.1,
    };
    pub const STOP: Self = Self {
        frequency_hz: 440,
        duration_ms: 200,
        gain: 0.1,
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "generated/")]
pub enum NoticeVariant {
    Default,
    Destructive,
}

/// What the UI should show, play and say after a recording action.
#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "generated/")]
pub struct RecordingNotice {
    pub title: String,
    pub description: String,
    pub variant: NoticeVariant,
    /// Toast lifetime; `None` uses the UI default.
    pub duration_ms: Option<u32>,
    pub cue: Option<NotificationCue>,
    /// Phrase for speech synthesis.
    pub speech: Option<String>,
    /// Whether the title marker should be shown, if it changes.
    pub title_marker: Option<bool>,
}

impl RecordingNotice {
    fn started() -> Self {
        Self {
            title: "Recording Started".to_string(),
            description: "Your meeting is now being recorded".to_string(),
            variant: NoticeVariant::Default,
            duration_ms: Some(4000),
            cue: Some(NotificationCue::START),
            speech: Some("Recording started".to_string()),
            title_marker: Some(true),
        }
    }

    fn stopped() -> Self {
        Self {
            title: "Recording Stopped".to_string(),
            description: "Your recording has been saved".to_string(),
            variant: NoticeVariant::Default,
            duration_ms: Some(4000),
            cue: Some(NotificationCue::STOP),
            speech: Some("Recording stopped".to_string()),
            title_marker: Some(false),
        }
    }

    fn failed(title: &str, description: &str) -> Self {
        Self {
            title: title.to_string(),
            description: description.to_string(),
            variant: NoticeVariant::Destructive,
            duration_ms: None,
            cue: None,
            speech: None,
            title_marker: None,
        }
    }
}

/// A failed recording action together with the notice to show for it.
#[derive(Debug, thiserror::Error)]
#[error("{error}")]
pub struct RecordingFailure {
    #[source]
    pub error: ClassMeetError,
    pub notice: RecordingNotice,
}

/// Tracks whether the call is being recorded.
///
/// The SDK's own flag wins whenever it has reported one; the local echo
/// only covers the gap before the first report.
#[derive(Debug, Default)]
pub struct RecordingTracker {
    sdk_recording: Option<bool>,
    local_echo: bool,
}

impl RecordingTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_recording(&self) -> bool {
        self.sdk_recording.unwrap_or(self.local_echo)
    }

    /// Feed the SDK's "recording in progress" state.
    pub fn observe_sdk(&mut self, recording: bool) {
        if self.sdk_recording != Some(recording) {
            log::debug!("[RECORDING] SDK reports recording={}", recording);
        }
        self.sdk_recording = Some(recording);
        self.local_echo = recording;
    }

    pub async fn start<R: CallRecorder + ?Sized>(
        &mut self,
        recorder: &R,
    ) -> Result<RecordingNotice, RecordingFailure> {
        self.local_echo = true;
        match recorder.start_recording().await {
            Ok(()) => {
                log::info!("[RECORDING] Recording started");
                Ok(RecordingNotice::started())
            },
            Err(error) => {
                log::error!("[RECORDING] Failed to start recording: {}", error);
                self.local_echo = false;
                Err(RecordingFailure {
                    error,
                    notice: RecordingNotice::failed(
                        "Recording Failed",
                        "Failed to start recording. Please try again.",
                    ),
                })
            },
        }
    }

    pub async fn stop<R: CallRecorder + ?Sized>(
        &mut self,
        recorder: &R,
    ) -> Result<RecordingNotice, RecordingFailure> {
        match recorder.stop_recording().await {
            Ok(()) => {
                self.local_echo = false;
                log::info!("[RECORDING] Recording stopped");
                Ok(RecordingNotice::stopped())
            },
            Err(error) => {
                log::error!("[RECORDING] Failed to stop recording: {}", error);
                Err(RecordingFailure {
                    error,
                    notice: RecordingNotice::failed(
                        "Error",
                        "Failed to stop recording. Please try again.",
                    ),
                })
            },
        }
    }

    /// Start when idle, stop when recording.
    pub async fn toggle<R: CallRecorder + ?Sized>(
        &mut self,
        recorder: &R,
    ) -> Result<RecordingNotice, RecordingFailure> {
        if self.is_recording() {
            self.stop(recorder).await
        } else {
            self.start(recorder).await
        }
    }
}

/// Add or strip the recording marker. Applying either way twice is the
/// same as applying it once.
pub fn decorate_title(title: &str, recording: bool) -> String {
    let bare = title.trim_start_matches(RECORDING_MARKER);
    if recording {
        format!("{}{}", RECORDING_MARKER, bare)
    } else {
        bare.to_string()
    }
}
