//! Stand-in for the archive extraction tool.
//!
//! Archives are plain text, one `relative/path=content` entry per line. The
//! fake tool is a POSIX shell script accepting the real tool's
//! `x <archive> -o<dir> -y` arguments and writing each entry under `<dir>`.

use std::path::{Path, PathBuf};

const EXTRACT_SCRIPT: &str = r#"#!/bin/sh
archive="$2"
out="${3#-o}"
mkdir -p "$out" || exit 2
while IFS='=' read -r p c || [ -n "$p" ]; do
  [ -z "$p" ] && continue
  mkdir -p "$out/$(dirname "$p")" || exit 2
  printf '%s' "$c" > "$out/$p" || exit 2
done < "$archive" || exit 2
echo "Extracting archive: $archive"
echo "Everything is Ok"
"#;

const FAILING_SCRIPT: &str = r#"#!/bin/sh
echo "Extracting archive: $2"
echo "ERROR: Data Error : $2" >&2
exit 2
"#;

/// Name the fake tool is installed under.
pub const TOOL_NAME: &str = "7zr.exe";

/// Installs a working fake tool in `dir` and returns its path.
pub fn install(dir: &Path) -> PathBuf {
    write_script(&dir.join(TOOL_NAME), EXTRACT_SCRIPT)
}

/// Installs a fake tool that always fails with a nonzero exit code.
pub fn install_failing(dir: &Path) -> PathBuf {
    write_script(&dir.join(TOOL_NAME), FAILING_SCRIPT)
}

/// Contents of the fake tool, for serving it over HTTP.
pub fn script() -> &'static str {
    EXTRACT_SCRIPT
}

/// Renders `(path, content)` entries in the fake archive format.
pub fn archive_bytes(entries: &[(&str, &str)]) -> Vec<u8> {
    entries.iter().map(|(path, content)| format!("{path}={content}\n")).collect::<String>().into_bytes()
}

/// Writes a fake archive to `path`.
pub fn write_archive(path: &Path, entries: &[(&str, &str)]) {
    std::fs::write(path, archive_bytes(entries)).expect("write fake archive");
}

fn write_script(path: &Path, script: &str) -> PathBuf {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("create tool directory");
    }
    std::fs::write(path, script).expect("write fake tool");
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).expect("chmod fake tool");
    }
    path.to_path_buf()
}
