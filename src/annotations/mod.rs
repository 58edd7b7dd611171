//! Annotation store.
//!
//! Each annotated image gets one JSON file named after its
//! [`ImageIdentity`]: `annotation_<hash>.json` for content-addressed images
//! and `annotation_file_<name>.json` for images addressed by file name.
//!
//! # Lifecycle
//!
//! * **Save** creates the file, or replaces its payload while keeping
//!   `reviewCount` and `lastReviewed`.
//! * **Review** increments `reviewCount` and stamps `lastReviewed`.
//! * Nothing is ever deleted.
//!
//! # Architecture
//!
//! * [`data`]: Identity and record types.
//! * [`io`]: [`AnnotationStore`], the folder-backed store.

pub mod data;
pub mod io;

use std::path::PathBuf;

pub use data::{AnnotationRecord, ImageIdentity, IMAGE_HASH_FIELD, IMAGE_NAME_FIELD};
pub use io::{AnnotationStore, SavedAnnotation};

/// Errors raised by the annotation store.
#[derive(thiserror::Error, Debug)]
pub enum AnnotationError {
    /// `imageHash` or `imageName` could not be turned into a file name.
    #[error("Invalid image identity: '{0}'")]
    InvalidIdentity(String),

    /// An annotation file could not be read or written.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// File involved
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// An annotation file is not a valid record.
    #[error("Invalid annotation {path}: {source}")]
    Parse {
        /// File involved
        path: PathBuf,
        /// The underlying JSON error
        #[source]
        source: serde_json::Error,
    },
}
