//! Client core for a classroom video-meeting app.
//!
//! - [`camera`]: device enumeration, multi-camera session lifecycle and
//!   tile layout
//! - [`meeting`]: preferences, recording state, call lists, personal rooms
//!   and the pre-join setup
//! - [`config`], [`error`], [`logging`]: shared plumbing
//!
//! Platform media and the call SDK are reached only through traits
//! ([`camera::MediaHost`], [`meeting::CallRecorder`], ...), so everything
//! here runs against in-memory fakes in tests.

pub mod camera;
pub mod config;
pub mod error;
pub mod logging;
pub mod meeting;

pub use camera::CameraSessionManager;
pub use config::ClassMeetConfig;
pub use error::{ClassMeetError, ClassMeetResult};
