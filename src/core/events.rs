//! Events the update pipeline emits toward its front-end.
//!
//! The core never renders anything. It reports log lines, download progress,
//! and state transitions through an [`EventSink`], and the presentation layer
//! decides how (and on which thread) to show them.

use chrono::Local;
use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::warn;

/// Timestamp format prefixed to every persisted log line.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Lifecycle of an [`UpdateOrchestrator`](crate::update::UpdateOrchestrator).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateState {
    /// Nothing running.
    Idle,
    /// Resolving latest versions and reading markers.
    CheckingVersions,
    /// Both components match their latest versions.
    UpToDate,
    /// At least one component is stale.
    UpdateAvailable,
    /// The update sequence is running.
    Updating,
    /// The update sequence completed and markers were written.
    Succeeded,
    /// The update sequence aborted on an error.
    Failed,
    /// The update sequence was cancelled.
    Cancelled,
}

impl fmt::Display for UpdateState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::CheckingVersions => "checking versions",
            Self::UpToDate => "up to date",
            Self::UpdateAvailable => "update available",
            Self::Updating => "updating",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

/// A single notification from the update pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateEvent {
    /// A human-readable activity line.
    Log(String),
    /// Download progress of the current transfer, in percent.
    Progress(u8),
    /// A download started; `total` is `None` when the size is unknown.
    DownloadStarted {
        /// What is being downloaded.
        label: String,
        /// Size in bytes, when the server reported one.
        total: Option<u64>,
    },
    /// The orchestrator moved to a new state.
    State(UpdateState),
}

/// Receiver of [`UpdateEvent`]s.
///
/// Implementations must be cheap; they are called inline from the pipeline.
pub trait EventSink: Send + Sync {
    /// Handles one event.
    fn emit(&self, event: UpdateEvent);
}

impl<F> EventSink for F
where
    F: Fn(UpdateEvent) + Send + Sync,
{
    fn emit(&self, event: UpdateEvent) {
        self(event);
    }
}

/// Sink that drops every event.
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: UpdateEvent) {}
}

/// Sink that records every event, used by tests and headless callers.
#[derive(Default, Clone)]
pub struct RecordingSink {
    events: Arc<Mutex<Vec<UpdateEvent>>>,
}

impl RecordingSink {
    /// Creates an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of all recorded events.
    pub fn events(&self) -> Vec<UpdateEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// Returns only the progress percentages, in order.
    pub fn progress(&self) -> Vec<u8> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                UpdateEvent::Progress(p) => Some(p),
                _ => None,
            })
            .collect()
    }

    /// Returns only the state transitions, in order.
    pub fn states(&self) -> Vec<UpdateState> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                UpdateEvent::State(s) => Some(s),
                _ => None,
            })
            .collect()
    }

    /// Returns only the log lines, in order.
    pub fn logs(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                UpdateEvent::Log(line) => Some(line),
                _ => None,
            })
            .collect()
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: UpdateEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

/// Appends every [`UpdateEvent::Log`] line to a file, timestamped.
///
/// Failures to write are reported through `tracing` and otherwise ignored; the
/// log file is a side channel and never fails an update.
pub struct LogFile {
    path: PathBuf,
    lock: Mutex<()>,
}

impl LogFile {
    /// Creates a sink appending to `path`. The file is created on first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// The file lines are appended to.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one timestamped line.
    pub fn append(&self, message: &str) {
        let _guard = self.lock.lock();
        let line = format_log_line(&Local::now().format(TIMESTAMP_FORMAT).to_string(), message);
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            let _ = std::fs::create_dir_all(parent);
        }
        let result = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .and_then(|mut file| writeln!(file, "{line}"));
        if let Err(e) = result {
            warn!("Failed to append to log file {}: {}", self.path.display(), e);
        }
    }
}

impl EventSink for LogFile {
    fn emit(&self, event: UpdateEvent) {
        if let UpdateEvent::Log(message) = event {
            self.append(&message);
        }
    }
}

/// Forwards every event to each inner sink in order.
pub struct FanOut {
    sinks: Vec<Arc<dyn EventSink>>,
}

impl FanOut {
    /// Creates a fan-out over `sinks`.
    pub fn new(sinks: Vec<Arc<dyn EventSink>>) -> Self {
        Self { sinks }
    }
}

impl EventSink for FanOut {
    fn emit(&self, event: UpdateEvent) {
        for sink in &self.sinks {
            sink.emit(event.clone());
        }
    }
}

fn format_log_line(timestamp: &str, message: &str) -> String {
    format!("{timestamp} {message}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_format_log_line() {
        assert_eq!(format_log_line("2024-01-02 03:04:05", "hello"), "2024-01-02 03:04:05 hello");
    }

    #[test]
    fn test_log_file_appends_timestamped_lines() {
        let temp = TempDir::new().unwrap();
        let log = LogFile::new(temp.path().join("update.log"));

        log.emit(UpdateEvent::Log("first".to_string()));
        log.emit(UpdateEvent::Progress(50));
        log.emit(UpdateEvent::Log("second".to_string()));

        let content = std::fs::read_to_string(log.path()).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with(" first"));
        assert!(lines[1].ends_with(" second"));

        // "YYYY-MM-DD HH:MM:SS " prefix
        let prefix = &lines[0][..20];
        assert!(chrono::NaiveDateTime::parse_from_str(prefix.trim_end(), TIMESTAMP_FORMAT).is_ok());
    }

    #[test]
    fn test_recording_sink_filters() {
        let sink = RecordingSink::new();
        sink.emit(UpdateEvent::State(UpdateState::Updating));
        sink.emit(UpdateEvent::Progress(10));
        sink.emit(UpdateEvent::Log("x".to_string()));

        assert_eq!(sink.states(), vec![UpdateState::Updating]);
        assert_eq!(sink.progress(), vec![10]);
        assert_eq!(sink.logs(), vec!["x".to_string()]);
    }

    #[test]
    fn test_fan_out_and_closure_sink() {
        let recorder = RecordingSink::new();
        let counter = Arc::new(Mutex::new(0));
        let counter_clone = counter.clone();
        let closure = move |_event: UpdateEvent| {
            *counter_clone.lock().unwrap() += 1;
        };

        let fan = FanOut::new(vec![Arc::new(recorder.clone()), Arc::new(closure)]);
        fan.emit(UpdateEvent::Progress(1));
        fan.emit(UpdateEvent::Progress(2));

        assert_eq!(recorder.progress(), vec![1, 2]);
        assert_eq!(*counter.lock().unwrap(), 2);
    }
}
