//! Terminal rendering of update events.
//!
//! Wraps `indicatif` with consistent styling. Progress bars are hidden when the
//! `PORTABLE_SYNC_NO_PROGRESS` environment variable is set, which keeps output
//! clean in scripts and CI.
//!
//! # Examples
//!
//! ```rust,no_run
//! use portable_sync::utils::progress::ProgressBar;
//!
//! let progress = ProgressBar::new(100);
//! progress.set_message("Downloading");
//! progress.set_position(42);
//! progress.finish_and_clear();
//! ```

use crate::constants::NO_PROGRESS_ENV_VAR;
use crate::core::{EventSink, UpdateEvent, UpdateState};
use colored::Colorize;
use indicatif::{ProgressBar as IndicatifBar, ProgressStyle as IndicatifStyle};
use std::sync::Mutex;
use std::time::Duration;

fn is_progress_disabled() -> bool {
    std::env::var(NO_PROGRESS_ENV_VAR).is_ok()
}

/// A progress bar with consistent styling.
#[derive(Clone)]
pub struct ProgressBar {
    inner: IndicatifBar,
}

impl ProgressBar {
    /// Creates a bar tracking `len` units, hidden when progress is disabled.
    pub fn new(len: u64) -> Self {
        let bar = if is_progress_disabled() {
            IndicatifBar::hidden()
        } else {
            let bar = IndicatifBar::new(len);
            bar.set_style(default_style());
            bar
        };
        Self { inner: bar }
    }

    /// Creates a spinner for work of unknown size.
    pub fn new_spinner() -> Self {
        let bar = if is_progress_disabled() {
            IndicatifBar::hidden()
        } else {
            let bar = IndicatifBar::new_spinner();
            bar.set_style(spinner_style());
            bar.enable_steady_tick(Duration::from_millis(100));
            bar
        };
        Self { inner: bar }
    }

    /// Creates a bar that never draws.
    pub fn hidden() -> Self {
        Self {
            inner: IndicatifBar::hidden(),
        }
    }

    pub fn set_message(&self, msg: impl Into<String>) {
        self.inner.set_message(msg.into());
    }

    pub fn set_position(&self, pos: u64) {
        self.inner.set_position(pos);
    }

    pub fn position(&self) -> u64 {
        self.inner.position()
    }

    /// Prints a line above the bar without corrupting it.
    pub fn println(&self, line: impl AsRef<str>) {
        if self.inner.is_hidden() {
            println!("{}", line.as_ref());
        } else {
            self.inner.println(line.as_ref());
        }
    }

    pub fn finish_and_clear(&self) {
        self.inner.finish_and_clear();
    }
}

fn default_style() -> IndicatifStyle {
    IndicatifStyle::default_bar()
        .template("{msg:.bold} [{bar:40.cyan/blue}] {pos}%")
        .unwrap_or_else(|_| IndicatifStyle::default_bar())
        .progress_chars("━╸━")
}

fn spinner_style() -> IndicatifStyle {
    IndicatifStyle::default_spinner()
        .template("{spinner:.cyan} {msg}")
        .unwrap_or_else(|_| IndicatifStyle::default_spinner())
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"])
}

/// [`EventSink`] that renders update events in the terminal.
///
/// Log lines are printed, each download gets its own bar (or a spinner when
/// the size is unknown), and terminal states finish whatever bar is active.
pub struct TerminalRenderer {
    current: Mutex<Option<ProgressBar>>,
    quiet: bool,
    show_progress: bool,
}

impl TerminalRenderer {
    /// Creates a renderer. With `quiet`, log lines and bars are suppressed.
    pub fn new(quiet: bool) -> Self {
        Self {
            current: Mutex::new(None),
            quiet,
            show_progress: !quiet,
        }
    }

    /// Enables or disables progress bars, e.g. for `--no-progress`.
    #[must_use]
    pub fn with_progress(mut self, enabled: bool) -> Self {
        self.show_progress = enabled && !self.quiet;
        self
    }

    fn finish_current(&self) {
        if let Ok(mut current) = self.current.lock()
            && let Some(bar) = current.take()
        {
            bar.finish_and_clear();
        }
    }
}

impl EventSink for TerminalRenderer {
    fn emit(&self, event: UpdateEvent) {
        match event {
            UpdateEvent::Log(line) => {
                if self.quiet {
                    return;
                }
                let active = self.current.lock().ok().and_then(|c| c.clone());
                match active {
                    Some(bar) => bar.println(&line),
                    None => println!("{line}"),
                }
            }
            UpdateEvent::DownloadStarted { label, total } => {
                self.finish_current();
                let bar = match total {
                    _ if !self.show_progress => ProgressBar::hidden(),
                    Some(_) => ProgressBar::new(100),
                    None => ProgressBar::new_spinner(),
                };
                bar.set_message(label);
                if let Ok(mut current) = self.current.lock() {
                    *current = Some(bar);
                }
            }
            UpdateEvent::Progress(percent) => {
                let finished = match self.current.lock() {
                    Ok(current) => match current.as_ref() {
                        // The downloader resets to 0 once a transfer completes
                        Some(bar) if percent == 0 && bar.position() > 0 => true,
                        Some(bar) => {
                            bar.set_position(u64::from(percent));
                            false
                        }
                        None => false,
                    },
                    Err(_) => false,
                };
                if finished {
                    self.finish_current();
                }
            }
            UpdateEvent::State(state) => match state {
                UpdateState::Succeeded => {
                    self.finish_current();
                    if !self.quiet {
                        println!("{}", "Update completed successfully".green());
                    }
                }
                UpdateState::Failed => {
                    self.finish_current();
                }
                UpdateState::Cancelled => {
                    self.finish_current();
                    if !self.quiet {
                        println!("{}", "Update cancelled".yellow());
                    }
                }
                _ => {}
            },
        }
    }
}
