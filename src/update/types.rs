//! Data types shared across the update pipeline.

use colored::Colorize;
use serde::Serialize;
use std::fmt;

/// One of the two independently versioned pieces of the installation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Component {
    /// The main application build.
    Desktop,
    /// The portable-packaging wrapper.
    Portable,
}

impl Component {
    /// Both components, in update order.
    pub const ALL: [Self; 2] = [Self::Desktop, Self::Portable];

    /// Stable identifier used in logs and machine-readable output.
    pub const fn id(self) -> &'static str {
        match self {
            Self::Desktop => "desktop",
            Self::Portable => "portable",
        }
    }

    /// Human-readable name.
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Desktop => "Desktop build",
            Self::Portable => "Portable wrapper",
        }
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// The resolved latest release of one component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseInfo {
    /// Version string as published upstream.
    pub version: String,
    /// Where the artifact for this version is downloaded from.
    pub download_url: String,
}

/// Whether one component needs updating. Recomputed on every check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpdateDecision {
    pub component: Component,
    pub update_needed: bool,
    /// Installed version, `None` when never installed.
    pub current_version: Option<String>,
    pub latest_version: String,
}

impl UpdateDecision {
    /// Compares an installed marker against the latest version.
    ///
    /// Plain string inequality; a missing marker is always stale.
    pub fn evaluate(component: Component, current: Option<String>, latest: &str) -> Self {
        let update_needed = current.as_deref() != Some(latest);
        Self {
            component,
            update_needed,
            current_version: current,
            latest_version: latest.to_string(),
        }
    }

    /// One-line summary for terminal output.
    pub fn summary(&self) -> String {
        let current = self.current_version.as_deref().unwrap_or("not installed");
        if self.update_needed {
            format!(
                "{:<17} {} -> {}",
                self.component.display_name(),
                current.yellow(),
                self.latest_version.green()
            )
        } else {
            format!(
                "{:<17} {} (up to date)",
                self.component.display_name(),
                current.green()
            )
        }
    }
}

/// Outcome of a staleness check over both components.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StalenessReport {
    pub desktop: UpdateDecision,
    pub portable: UpdateDecision,
}

impl StalenessReport {
    /// Whether either component needs updating.
    pub fn any_stale(&self) -> bool {
        self.desktop.update_needed || self.portable.update_needed
    }

    pub fn decisions(&self) -> [&UpdateDecision; 2] {
        [&self.desktop, &self.portable]
    }
}
