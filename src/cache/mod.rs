//! Hash index caches.
//!
//! Two independent string maps remember hashing work across runs:
//!
//! * the **computation cache** maps `filename_mtime_size` to a content hash,
//!   so an unchanged file is never re-read;
//! * the **path cache** maps a content hash to the path it was last seen at.
//!
//! # Architecture
//!
//! * [`snapshot`]: Reading and atomically writing flat JSON snapshot files.
//! * [`store`]: [`KvCache`], the locked in-memory map with load/save lifecycle.
//!
//! # Cache Invalidation
//!
//! Computation entries are keyed by file name, modification time and size.
//! If any of these change the key changes, so stale entries are simply never
//! hit again. A rewrite that preserves all three is not detected.
//!
//! Path entries carry no validity information at all; readers must re-hash
//! the path before trusting it (see [`crate::locator`]).

pub mod snapshot;
pub mod store;

use std::path::{Path, PathBuf};
use std::sync::Arc;

pub use store::KvCache;

/// File name of the computation cache snapshot.
pub const HASH_CACHE_FILE: &str = "image_hash_cache.json";

/// File name of the hash-to-path cache snapshot.
pub const PATH_CACHE_FILE: &str = "hash_to_path_cache.json";

/// Errors raised while persisting a cache.
#[derive(thiserror::Error, Debug)]
pub enum CacheError {
    /// The snapshot could not be encoded.
    #[error("Failed to serialize cache: {0}")]
    Serialize(#[from] serde_json::Error),

    /// The snapshot could not be written.
    #[error("Failed to write cache {path}: {source}")]
    Write {
        /// File being written
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

/// Result alias for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// Both caches, opened from one directory.
#[derive(Debug, Clone)]
pub struct HashIndex {
    /// `filename_mtime_size` → hash
    pub computed: Arc<KvCache>,
    /// hash → last known path
    pub paths: Arc<KvCache>,
}

impl HashIndex {
    /// Load both snapshots from `dir`.
    #[must_use]
    pub fn open(dir: &Path) -> Self {
        Self {
            computed: Arc::new(KvCache::load(&dir.join(HASH_CACHE_FILE))),
            paths: Arc::new(KvCache::load(&dir.join(PATH_CACHE_FILE))),
        }
    }
}
