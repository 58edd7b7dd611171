//! Scanner module for image discovery and content hashing.
//!
//! This module provides functionality for:
//! - Listing recognized image files inside the configured folders
//! - SHA-256 content hashing with a metadata-keyed memo cache
//!
//! # Architecture
//!
//! The scanner is divided into submodules:
//! - [`walker`]: Folder listing and image extension filtering
//! - [`hasher`]: Streaming SHA-256 hashing and the [`ContentHasher`] front
//!
//! # Example
//!
//! ```no_run
//! use sample_annotator::scanner::list_images;
//! use std::path::Path;
//!
//! for entry in list_images(Path::new("sample_images")).unwrap() {
//!     println!("{}: {} bytes", entry.path.display(), entry.size);
//! }
//! ```

pub mod hasher;
pub mod walker;

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

// Re-export main types
pub use hasher::{cache_key, hash_file, ContentHasher, FIRST_CHUNK_SIZE, READ_CHUNK_SIZE};
pub use walker::{is_image_path, list_images, IMAGE_EXTENSIONS};

/// Lowercase hexadecimal SHA-256 digest identifying an image by content.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentHash(String);

impl ContentHash {
    /// Length of a hex encoded SHA-256 digest.
    pub const HEX_LEN: usize = 64;

    /// Wrap a digest string without validation.
    ///
    /// Used for values that come out of our own cache files, which may
    /// legitimately hold anything the hasher once produced.
    #[must_use]
    pub fn new_unchecked(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }

    /// The hex string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ContentHash {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for ContentHash {
    type Err = HashError;

    /// Parse a user-supplied hash, normalizing to lowercase.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.len() != Self::HEX_LEN || !s.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(HashError::InvalidDigest(s.to_string()));
        }
        Ok(Self(s.to_ascii_lowercase()))
    }
}

/// Metadata for a discovered image file.
#[derive(Debug, Clone)]
pub struct FileEntry {
    /// Path to the file, as built from the folder it was found in
    pub path: PathBuf,
    /// File size in bytes
    pub size: u64,
    /// Last modification time
    pub modified: SystemTime,
}

impl FileEntry {
    /// Create a new FileEntry.
    #[must_use]
    pub fn new(path: PathBuf, size: u64, modified: SystemTime) -> Self {
        Self {
            path,
            size,
            modified,
        }
    }

    /// The final path component, lossily converted.
    #[must_use]
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Errors that can occur while listing an image folder.
#[derive(thiserror::Error, Debug)]
pub enum ScanError {
    /// Permission was denied when accessing a file or directory.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// The specified path was not found.
    #[error("Path not found: {0}")]
    NotFound(PathBuf),

    /// The specified path is not a directory.
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// An I/O error occurred while accessing a file.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

/// Errors that can occur during file hashing.
#[derive(thiserror::Error, Debug)]
pub enum HashError {
    /// The specified file was not found.
    #[error("File not found: {0}")]
    NotFound(PathBuf),

    /// The path exists but is not a regular file.
    #[error("Not a file: {0}")]
    NotAFile(PathBuf),

    /// Permission was denied when reading the file.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// A string could not be parsed as a SHA-256 hex digest.
    #[error("Invalid content hash: '{0}'")]
    InvalidDigest(String),

    /// An I/O error occurred while reading the file.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

impl HashError {
    /// Classify an I/O error raised while touching `path`.
    pub(crate) fn from_io(path: &Path, error: std::io::Error) -> Self {
        use std::io::ErrorKind;

        match error.kind() {
            ErrorKind::NotFound => Self::NotFound(path.to_path_buf()),
            ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            _ => Self::Io {
                path: path.to_path_buf(),
                source: error,
            },
        }
    }
}
