//! A throwaway installation wired to a stub upstream.

use super::fake_tool;
use super::http_stub::{StubResponse, StubServer};
use crate::config::UpdaterConfig;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Release name of the portable wrapper asset served by the stub.
pub const PORTABLE_ASSET_NAME: &str = "stormhen-portable-win64.7z";

/// What the stub upstream publishes.
#[derive(Debug, Clone)]
pub struct Upstream {
    pub desktop_version: String,
    pub portable_tag: String,
    /// Entries of the portable wrapper archive.
    pub portable_entries: Vec<(String, String)>,
    /// Entries of the desktop build archive. The payload lives under `core/`.
    pub desktop_entries: Vec<(String, String)>,
}

impl Default for Upstream {
    fn default() -> Self {
        Self {
            desktop_version: "128.0.1".to_string(),
            portable_tag: "v3.2.0".to_string(),
            portable_entries: entries(&[("StormhenPortable.ini", "[Launch]")]),
            desktop_entries: entries(&[
                ("setup.exe", "installer stub"),
                ("core/stormhen.exe", "desktop 128.0.1"),
                ("core/defaults/pref/channel-prefs.js", "pref(\"app.update.channel\", \"release\");"),
            ]),
        }
    }
}

impl Upstream {
    pub fn with_versions(desktop: &str, portable: &str) -> Self {
        Self {
            desktop_version: desktop.to_string(),
            portable_tag: portable.to_string(),
            ..Self::default()
        }
    }

    pub fn with_desktop_entries(mut self, list: &[(&str, &str)]) -> Self {
        self.desktop_entries = entries(list);
        self
    }
}

/// Temporary base directory plus a stub server publishing an [`Upstream`].
pub struct TestInstallation {
    pub temp: TempDir,
    pub server: StubServer,
    pub config: UpdaterConfig,
}

impl TestInstallation {
    /// Starts the stub and installs the fake archive tool.
    pub async fn start(upstream: Upstream) -> Self {
        let installation = Self::start_without_tool(upstream).await;
        fake_tool::install(&installation.config.base_dir);
        installation
    }

    /// Starts the stub without provisioning the archive tool; the stub serves it
    /// at the configured tool URL.
    pub async fn start_without_tool(upstream: Upstream) -> Self {
        let temp = TempDir::new().expect("create temp dir");
        let base_dir = temp.path().join("base");
        std::fs::create_dir_all(&base_dir).expect("create base dir");

        // Routes carry absolute URLs, so they are added once the port is known
        let server = StubServer::start(Vec::<(String, StubResponse)>::new()).await;
        for (path, response) in routes(&server.base_url(), &upstream) {
            server.route(path, response);
        }

        let mut config = UpdaterConfig::with_base_dir(&base_dir);
        config.temp_dir = Some(temp.path().join("tmp"));
        config.tool_path = base_dir.join(fake_tool::TOOL_NAME);
        config.tool_url = server.url("/tools/7zr.exe");
        config.desktop_latest_url = server.url("/stormhen/latest");
        config.desktop_download_url_template = server.url("/pub/releases/{version}/win64/setup.exe");
        config.github_api_base = server.base_url();
        config.use_system_proxy = false;
        config.request_timeout_secs = 30;

        Self { temp, server, config }
    }

    pub fn base_dir(&self) -> &Path {
        &self.config.base_dir
    }

    pub fn payload_dir(&self) -> PathBuf {
        self.config.payload_dir()
    }

    pub fn desktop_marker(&self) -> Option<String> {
        std::fs::read_to_string(self.config.desktop_marker_path()).ok()
    }

    pub fn portable_marker(&self) -> Option<String> {
        std::fs::read_to_string(self.config.portable_marker_path()).ok()
    }

    pub fn write_markers(&self, desktop: &str, portable: &str) {
        std::fs::write(self.config.desktop_marker_path(), desktop).expect("write desktop marker");
        std::fs::write(self.config.portable_marker_path(), portable).expect("write portable marker");
    }

    /// Files left in the download directory.
    pub fn downloads(&self) -> Vec<String> {
        std::fs::read_dir(self.config.temp_dir())
            .map(|entries| {
                entries
                    .filter_map(Result::ok)
                    .filter(|e| e.path().is_file())
                    .map(|e| e.file_name().to_string_lossy().into_owned())
                    .collect()
            })
            .unwrap_or_default()
    }
}

fn routes(base: &str, upstream: &Upstream) -> Vec<(String, StubResponse)> {
    let release = serde_json::json!({
        "tag_name": upstream.portable_tag,
        "assets": [
            {
                "name": "stormhen-portable-linux64.tar.xz",
                "browser_download_url": format!("{base}/download/stormhen-portable-linux64.tar.xz"),
            },
            {
                "name": PORTABLE_ASSET_NAME,
                "browser_download_url": format!("{base}/download/{PORTABLE_ASSET_NAME}"),
            },
        ],
    });

    vec![
        (
            "/stormhen/latest".to_string(),
            StubResponse::redirect(&format!(
                "{base}/pub/releases/{}/win64/en-US/Setup.exe",
                upstream.desktop_version
            )),
        ),
        (
            "/repos/stormhen-portable/stormhen-portable/releases/latest".to_string(),
            StubResponse::json(&release.to_string()),
        ),
        (
            format!("/download/{PORTABLE_ASSET_NAME}"),
            StubResponse::ok(archive(&upstream.portable_entries)),
        ),
        (
            format!("/pub/releases/{}/win64/setup.exe", upstream.desktop_version),
            StubResponse::ok(archive(&upstream.desktop_entries)),
        ),
        ("/tools/7zr.exe".to_string(), StubResponse::ok(fake_tool::script())),
    ]
}

fn archive(list: &[(String, String)]) -> Vec<u8> {
    let borrowed: Vec<(&str, &str)> = list.iter().map(|(p, c)| (p.as_str(), c.as_str())).collect();
    fake_tool::archive_bytes(&borrowed)
}

fn entries(list: &[(&str, &str)]) -> Vec<(String, String)> {
    list.iter().map(|(p, c)| ((*p).to_string(), (*c).to_string())).collect()
}
