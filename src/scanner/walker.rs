//! Image folder listing built on walkdir.
//!
//! # Overview
//!
//! Image folders are flat: only the direct children of a folder are
//! considered, and only those whose extension is one of
//! [`IMAGE_EXTENSIONS`] (case-insensitive). Children are returned sorted by
//! file name so scans and index sweeps visit files in a deterministic order.
//!
//! Symlinks are followed when checking whether a child is a regular file,
//! so a link to an image counts as an image.

use std::path::Path;
use std::time::SystemTime;

use walkdir::WalkDir;

use super::{FileEntry, ScanError};

/// Recognized image extensions, lowercase and without the leading dot.
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "bmp", "webp"];

/// Whether `path` carries a recognized image extension.
#[must_use]
pub fn is_image_path(path: &Path) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .map(|ext| {
            let ext = ext.to_lowercase();
            IMAGE_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

/// List the image files directly inside `folder`.
///
/// Entries that vanish or cannot be stat'ed mid-listing are logged and
/// skipped; only a folder that cannot be opened at all is an error.
///
/// # Errors
///
/// Returns [`ScanError::NotFound`] if the folder does not exist,
/// [`ScanError::NotADirectory`] if it is a file, and
/// [`ScanError::PermissionDenied`] / [`ScanError::Io`] if it cannot be read.
pub fn list_images(folder: &Path) -> Result<Vec<FileEntry>, ScanError> {
    let meta = std::fs::metadata(folder).map_err(|e| classify(folder, e))?;
    if !meta.is_dir() {
        return Err(ScanError::NotADirectory(folder.to_path_buf()));
    }
    // Probe readability up front so an unreadable folder is an error, not an empty list.
    std::fs::read_dir(folder).map_err(|e| classify(folder, e))?;

    let walk = WalkDir::new(folder)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name();

    let mut images = Vec::new();
    for entry in walk {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                log::warn!("Skipping unreadable entry in {}: {}", folder.display(), e);
                continue;
            }
        };

        let path = entry.path();
        if !is_image_path(path) {
            log::trace!("Skipping non-image: {}", path.display());
            continue;
        }

        let metadata = match std::fs::metadata(path) {
            Ok(m) => m,
            Err(e) => {
                log::debug!("Cannot stat {} (may have been deleted): {}", path.display(), e);
                continue;
            }
        };
        if !metadata.is_file() {
            continue;
        }

        let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
        images.push(FileEntry::new(path.to_path_buf(), metadata.len(), modified));
    }

    log::debug!("Found {} images in {}", images.len(), folder.display());
    Ok(images)
}

fn classify(path: &Path, error: std::io::Error) -> ScanError {
    use std::io::ErrorKind;

    match error.kind() {
        ErrorKind::NotFound => ScanError::NotFound(path.to_path_buf()),
        ErrorKind::PermissionDenied => {
            log::warn!("Permission denied: {}", path.display());
            ScanError::PermissionDenied(path.to_path_buf())
        }
        _ => ScanError::Io {
            path: path.to_path_buf(),
            source: error,
        },
    }
}
