//! Sidecar store — per-item processing history.
//!
//! The sidecar of `<dir>/<name>.eml` lives next to it at
//! `<dir>/<name>.eml.emailbot.yaml`. There is no index; the path is a pure
//! function of the item path.
//!
//! Writes serialize the full document in memory, write it to a `.tmp`
//! sibling (mode `0600`) and `rename` it over the sidecar, so a concurrent
//! reader sees either the old or the new document, never a truncated one.

use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::{io_err, SidecarError};
use crate::types::SidecarData;

/// Literal suffix appended to an item path to name its sidecar.
pub const SIDECAR_SUFFIX: &str = ".emailbot.yaml";

/// `<item>.emailbot.yaml` — pure, no I/O.
pub fn sidecar_path(item: &Path) -> PathBuf {
    append_to_path(item, SIDECAR_SUFFIX)
}

fn tmp_path(sidecar: &Path) -> PathBuf {
    append_to_path(sidecar, ".tmp")
}

fn append_to_path(path: &Path, suffix: &str) -> PathBuf {
    let mut s: OsString = path.as_os_str().to_owned();
    s.push(suffix);
    PathBuf::from(s)
}

/// Load the sidecar of `item`.
///
/// Returns empty data if the sidecar does not exist (or is blank), and
/// [`SidecarError::Parse`] if it exists but is malformed.
pub fn load(item: &Path) -> Result<SidecarData, SidecarError> {
    let path = sidecar_path(item);
    let contents = match std::fs::read_to_string(&path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(SidecarData::default()),
        Err(e) => return Err(io_err(path, e)),
    };
    if contents.trim().is_empty() {
        return Ok(SidecarData::default());
    }
    serde_yaml::from_str(&contents).map_err(|e| SidecarError::Parse { path, source: e })
}

/// Replace the sidecar of `item` with `data`.
pub fn save(item: &Path, data: &SidecarData) -> Result<(), SidecarError> {
    let path = sidecar_path(item);
    let tmp = tmp_path(&path);

    let yaml = serde_yaml::to_string(data)?;
    std::fs::write(&tmp, yaml).map_err(|e| io_err(&tmp, e))?;
    let committed = set_file_permissions(&tmp)
        .and_then(|()| std::fs::rename(&tmp, &path).map_err(|e| io_err(&path, e)));
    if committed.is_err() {
        let _ = std::fs::remove_file(&tmp);
    }
    committed
}

#[cfg(unix)]
fn set_file_permissions(path: &Path) -> Result<(), SidecarError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
        .map_err(|e| io_err(path, e))
}
#[cfg(not(unix))]
fn set_file_permissions(_path: &Path) -> Result<(), SidecarError> {
    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
