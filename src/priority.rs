//! Ordering images by how much they need annotation work.

use serde::Serialize;

use crate::annotations::{AnnotationStore, ImageIdentity};
use crate::scanner::ContentHash;

/// Annotation priority of an image; smaller sorts first.
///
/// Unannotated images come first, then annotated ones by ascending review
/// count, then images whose hash could not be computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Priority {
    /// No annotation exists yet.
    Unannotated,
    /// Annotated and reviewed `review_count` times.
    Annotated { review_count: u64 },
    /// The image could not be hashed.
    HashUnavailable,
}

/// Priority of an image given its hash.
///
/// An annotation that cannot be read counts as missing.
#[must_use]
pub fn image_priority(hash: Option<&ContentHash>, store: &AnnotationStore) -> Priority {
    let Some(hash) = hash else {
        return Priority::HashUnavailable;
    };

    match store.get(&ImageIdentity::Hash(hash.clone())) {
        Ok(Some(record)) => Priority::Annotated {
            review_count: record.review_count,
        },
        Ok(None) => Priority::Unannotated,
        Err(e) => {
            log::debug!("Treating unreadable annotation as missing: {}", e);
            Priority::Unannotated
        }
    }
}
