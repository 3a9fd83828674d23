//! JSON persistence helpers shared by the queue, dead-letter and metrics files.
//!
//! Writes go to a temp file in the target's directory and are renamed over
//! the target, so readers only ever see the old or the new file. Reads treat
//! a missing or unparsable file as empty state.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{MemsyncError, Result};

static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Temp path next to `path` (same filesystem, so the rename is atomic).
fn tmp_path_for(path: &Path) -> PathBuf {
    let seq = TMP_COUNTER.fetch_add(1, Ordering::Relaxed);
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tmp_name = format!(".{name}.tmp-{}-{seq}", std::process::id());
    match path.parent() {
        Some(parent) => parent.join(tmp_name),
        None => PathBuf::from(tmp_name),
    }
}

/// Serialize `value` and atomically replace `path` with it.
pub fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let data = serde_json::to_vec_pretty(value)?;
    write_bytes_atomic(path, &data)
}

pub(crate) fn write_bytes_atomic(path: &Path, data: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .map_err(|err| MemsyncError::io(format!("failed to create {}", parent.display()), err))?;
    }

    let tmp_path = tmp_path_for(path);
    let write_tmp = || -> std::io::Result<()> {
        let mut file = fs::File::create(&tmp_path)?;
        file.write_all(data)?;
        file.sync_data()?;
        fs::rename(&tmp_path, path)
    };

    write_tmp().map_err(|err| {
        let _ = fs::remove_file(&tmp_path);
        MemsyncError::io(format!("failed to write {}", path.display()), err)
    })
}

/// Read `path` as JSON, falling back to `T::default()` when the file is
/// absent, unreadable, or corrupt.
///
/// The files are a local cache in front of the backend, so availability wins
/// over strict durability here.
pub fn read_json_or_default<T: DeserializeOwned + Default>(path: &Path) -> T {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return T::default(),
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "unreadable state file, starting fresh");
            return T::default();
        }
    };

    match serde_json::from_slice(&bytes) {
        Ok(value) => value,
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "corrupt state file, starting fresh");
            T::default()
        }
    }
}
