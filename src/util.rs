//! File helpers shared by the file-backed store, roster and outbox.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{OutbreakError, Result};

/// Maximum file size that can be read into memory (10 MB).
///
/// Record sets, rosters and outboxes stay far below this for a single
/// community. Anything larger is treated as damaged input.
pub const MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Read a file into a string, refusing files over [`MAX_FILE_SIZE`].
pub fn read_to_string_limited(path: &Path) -> Result<String> {
    read_to_string_with_limit(path, MAX_FILE_SIZE)
}

/// Read a file into a string with a custom size limit.
pub fn read_to_string_with_limit(path: &Path, max_size: u64) -> Result<String> {
    let metadata = fs::metadata(path).map_err(|e| OutbreakError::storage(path, e))?;

    let size = metadata.len();
    if size > max_size {
        return Err(OutbreakError::corrupt_store(
            path,
            format!("file is too large ({} bytes, max {} bytes)", size, max_size),
        ));
    }

    fs::read_to_string(path).map_err(|e| OutbreakError::storage(path, e))
}

/// Path of a per-community file, e.g. `<dir>/<community>.records.json`.
///
/// Bytes outside `[A-Za-z0-9-]` in the community id are written as `_xx`
/// (lowercase hex), so an id can never escape `dir` and distinct ids never
/// share a file.
pub fn community_file(dir: &Path, community: &str, suffix: &str) -> PathBuf {
    let mut stem = String::with_capacity(community.len());
    for byte in community.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' {
            stem.push(char::from(byte));
        } else {
            stem.push_str(&format!("_{:02x}", byte));
        }
    }
    dir.join(format!("{}.{}", stem, suffix))
}

/// Temp file used while writing `path`.
pub fn temp_path_for(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{}.tmp", name))
}

/// Replace `path` with `contents` via temp file, fsync and rename.
///
/// Readers see either the old file or the new one, never a partial write.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| OutbreakError::storage(parent, e))?;
        }
    }

    let temp_path = temp_path_for(path);
    {
        let mut file =
            fs::File::create(&temp_path).map_err(|e| OutbreakError::storage(&temp_path, e))?;
        file.write_all(contents)
            .map_err(|e| OutbreakError::storage(&temp_path, e))?;
        file.sync_all()
            .map_err(|e| OutbreakError::storage(&temp_path, e))?;
    }

    fs::rename(&temp_path, path).map_err(|e| OutbreakError::storage(path, e))?;
    Ok(())
}

/// Serialize `value` as pretty JSON and write it atomically.
pub fn write_json_atomic<T: serde::Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    write_atomic(path, json.as_bytes())
}
