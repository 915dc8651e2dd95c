//! Meeting services around the call SDK: preferences, recording state,
//! call lists, personal rooms, scheduling and the pre-join setup.
//!
//! The SDK itself stays behind the [`CallRecorder`], [`CallDirectory`] and
//! [`CallSession`] traits.

mod calls;
mod prefs;
mod recording;
mod room;
mod setup;

pub use calls::{
    call_title, fetch_recordings, partition_calls, recording_title, CallDirectory, CallPartition,
    CallRecording, CallSummary,
};
pub use prefs::{JsonFileStore, KeyValueStore, MemoryStore, Preferences};
pub use recording::{
    decorate_title, CallRecorder, NoticeVariant, NotificationCue, RecordingFailure,
    RecordingNotice, RecordingTracker, RECORDING_MARKER,
};
pub use room::{
    meeting_link, schedule_meeting, CallCustomData, CallRequest, MeetingDraft, MeetingType,
    PersonalRoom,
};
pub use setup::{apply_device_toggle, join, resolve_display_name, CallSession, JoinGate};
