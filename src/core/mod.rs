//! Core types shared by every part of portable-sync.
//!
//! - [`error`]: the [`SyncError`] taxonomy and user-facing [`ErrorContext`]
//! - [`events`]: the log/progress/state callback contract between the update
//!   pipeline and its front-end

pub mod error;
pub mod events;

pub use error::{ErrorContext, FsResultExt, SyncError, user_friendly_error};
pub use events::{
    EventSink, FanOut, LogFile, NullSink, RecordingSink, UpdateEvent, UpdateState,
};
