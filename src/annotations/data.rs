//! Data structures for annotation records.

use std::fmt;
use std::path::Path;
use std::sync::OnceLock;

use chrono::Local;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::AnnotationError;
use crate::scanner::ContentHash;

/// Payload field carrying the content hash of the annotated image.
pub const IMAGE_HASH_FIELD: &str = "imageHash";

/// Payload field carrying the file name of the annotated image.
pub const IMAGE_NAME_FIELD: &str = "imageName";

/// The key an annotation is stored under.
///
/// Hash identities survive renames; filename identities are for images that
/// were never hashed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ImageIdentity {
    /// Addressed by content hash.
    Hash(ContentHash),
    /// Addressed by sanitized file name.
    Filename(String),
}

impl ImageIdentity {
    /// Build a filename identity from a user-supplied name.
    ///
    /// Directory components are dropped and every character outside
    /// `[A-Za-z0-9._-]` becomes `_`.
    ///
    /// # Errors
    ///
    /// Returns [`AnnotationError::InvalidIdentity`] if nothing usable is left.
    pub fn from_filename(name: &str) -> Result<Self, AnnotationError> {
        let base = Path::new(name.trim())
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let sanitized = unsafe_chars().replace_all(&base, "_").into_owned();

        if sanitized.is_empty() || sanitized.chars().all(|c| c == '.') {
            return Err(AnnotationError::InvalidIdentity(name.to_string()));
        }
        Ok(Self::Filename(sanitized))
    }

    /// Build a hash identity from a user-supplied digest string.
    ///
    /// # Errors
    ///
    /// Returns [`AnnotationError::InvalidIdentity`] if `hash` is not a
    /// SHA-256 hex digest.
    pub fn from_hash_str(hash: &str) -> Result<Self, AnnotationError> {
        hash.parse()
            .map(Self::Hash)
            .map_err(|_| AnnotationError::InvalidIdentity(hash.to_string()))
    }

    /// Annotation file name for this identity.
    #[must_use]
    pub fn file_name(&self) -> String {
        match self {
            Self::Hash(hash) => format!("annotation_{hash}.json"),
            Self::Filename(name) => format!("annotation_file_{name}.json"),
        }
    }
}

impl fmt::Display for ImageIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hash(hash) => write!(f, "hash {hash}"),
            Self::Filename(name) => write!(f, "file {name}"),
        }
    }
}

fn unsafe_chars() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^A-Za-z0-9._-]").expect("static pattern is valid"))
}

/// One stored annotation.
///
/// Every field the client sends is kept verbatim in `payload`; only the
/// review bookkeeping is typed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationRecord {
    /// Client payload (labels, regions, image reference, ...).
    #[serde(flatten)]
    pub payload: Map<String, Value>,
    /// Number of times the annotation was opened for review.
    #[serde(rename = "reviewCount", default)]
    pub review_count: u64,
    /// Local timestamp of the last review.
    #[serde(
        rename = "lastReviewed",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub last_reviewed: Option<String>,
}

impl AnnotationRecord {
    /// Wrap a client payload in a fresh, never reviewed record.
    #[must_use]
    pub fn new(payload: Map<String, Value>) -> Self {
        Self {
            payload,
            review_count: 0,
            last_reviewed: None,
        }
    }

    /// Parse a client JSON document.
    ///
    /// # Errors
    ///
    /// Fails if `value` is not an object or its `reviewCount` is not a
    /// non-negative integer.
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }

    /// The identity this record should be stored under, if it names one.
    ///
    /// `imageHash` wins over `imageName`.
    ///
    /// # Errors
    ///
    /// Returns [`AnnotationError::InvalidIdentity`] if the named field is
    /// present but unusable.
    pub fn identity(&self) -> Result<Option<ImageIdentity>, AnnotationError> {
        if let Some(hash) = self.payload.get(IMAGE_HASH_FIELD).and_then(non_empty_str) {
            return ImageIdentity::from_hash_str(hash).map(Some);
        }
        if let Some(name) = self.payload.get(IMAGE_NAME_FIELD).and_then(non_empty_str) {
            return ImageIdentity::from_filename(name).map(Some);
        }
        Ok(None)
    }

    /// Count one review and stamp the time.
    pub fn mark_reviewed(&mut self) {
        self.review_count += 1;
        self.last_reviewed = Some(review_timestamp());
    }
}

fn non_empty_str(value: &Value) -> Option<&str> {
    value.as_str().filter(|s| !s.is_empty())
}

/// ISO-8601 local time with microseconds, e.g. `2024-05-01T13:37:00.123456`.
#[must_use]
pub fn review_timestamp() -> String {
    Local::now().format("%Y-%m-%dT%H:%M:%S%.6f").to_string()
}
