//! Flat JSON snapshot files.
//!
//! A snapshot is a single JSON object mapping strings to strings, written
//! pretty-printed with sorted keys. Writes go to a sibling temp file that is
//! renamed over the target, so a crash mid-write leaves the previous
//! snapshot intact.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use super::CacheError;

/// Read a snapshot, treating any failure as an empty map.
///
/// A missing file is the normal cold-start case and is logged at debug;
/// unreadable or corrupt files are logged as warnings.
#[must_use]
pub fn read_snapshot(path: &Path) -> BTreeMap<String, String> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            log::debug!("No cache snapshot at {}, starting empty", path.display());
            return BTreeMap::new();
        }
        Err(e) => {
            log::warn!("Failed to read cache {}: {}", path.display(), e);
            return BTreeMap::new();
        }
    };

    match serde_json::from_str(&content) {
        Ok(map) => map,
        Err(e) => {
            log::warn!(
                "Cache {} is corrupted ({}), starting empty",
                path.display(),
                e
            );
            BTreeMap::new()
        }
    }
}

/// Write a snapshot, replacing the previous file atomically.
///
/// # Errors
///
/// Returns [`CacheError::Serialize`] if encoding fails and
/// [`CacheError::Write`] if the temp file cannot be written or renamed.
pub fn write_snapshot(path: &Path, entries: &BTreeMap<String, String>) -> Result<(), CacheError> {
    let json = serde_json::to_string_pretty(entries)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| CacheError::Write {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let tmp = temp_path(path);
    let write_tmp = || -> std::io::Result<()> {
        let mut file = fs::File::create(&tmp)?;
        file.write_all(json.as_bytes())?;
        file.sync_all()
    };
    if let Err(source) = write_tmp() {
        let _ = fs::remove_file(&tmp);
        return Err(CacheError::Write { path: tmp, source });
    }

    fs::rename(&tmp, path).map_err(|source| {
        let _ = fs::remove_file(&tmp);
        CacheError::Write {
            path: path.to_path_buf(),
            source,
        }
    })?;

    log::trace!("Wrote {} cache entries to {}", entries.len(), path.display());
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "cache.json".into());
    name.push(".tmp");
    path.with_file_name(name)
}
