//! SHA-256 content hasher with metadata-keyed memoization.
//!
//! # Overview
//!
//! [`hash_file`] streams a file through SHA-256: a first read of up to
//! [`FIRST_CHUNK_SIZE`] bytes, then [`READ_CHUNK_SIZE`] chunks until EOF.
//! The result is the plain SHA-256 of the whole file, the same value
//! `sha256sum` prints.
//!
//! [`ContentHasher`] puts the computation cache in front of that. Its key is
//! built by [`cache_key`] from the file name, modification time and size, so
//! a file that has not been touched is answered without opening it.

use std::fs::{File, Metadata};
use std::io::{ErrorKind, Read};
use std::path::Path;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use sha2::{Digest, Sha256};

use super::{ContentHash, HashError};
use crate::cache::KvCache;

/// Size of the first read (64 KiB).
pub const FIRST_CHUNK_SIZE: usize = 64 * 1024;

/// Size of every following read (4 KiB).
pub const READ_CHUNK_SIZE: usize = 4 * 1024;

/// Hash the full contents of `path`.
///
/// # Errors
///
/// Returns [`HashError::NotFound`], [`HashError::NotAFile`],
/// [`HashError::PermissionDenied`] or [`HashError::Io`].
pub fn hash_file(path: &Path) -> Result<ContentHash, HashError> {
    let metadata = std::fs::metadata(path).map_err(|e| HashError::from_io(path, e))?;
    if !metadata.is_file() {
        return Err(HashError::NotAFile(path.to_path_buf()));
    }

    let mut file = File::open(path).map_err(|e| HashError::from_io(path, e))?;
    let mut digest = Sha256::new();

    let mut first = vec![0u8; FIRST_CHUNK_SIZE];
    let filled = fill(&mut file, &mut first).map_err(|e| HashError::from_io(path, e))?;
    digest.update(&first[..filled]);

    if filled == FIRST_CHUNK_SIZE {
        let mut chunk = [0u8; READ_CHUNK_SIZE];
        loop {
            let n = match file.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(HashError::from_io(path, e)),
            };
            digest.update(&chunk[..n]);
        }
    }

    Ok(ContentHash::new_unchecked(format!("{:x}", digest.finalize())))
}

/// Read until `buf` is full or EOF, returning the number of bytes read.
fn fill(reader: &mut impl Read, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// Build the computation cache key `"<filename>_<mtime>_<size>"`.
///
/// The mtime is seconds since the Unix epoch as a float; whole seconds keep
/// a trailing `.0` (e.g. `cat.jpg_1700000000.0_2048`).
#[must_use]
pub fn cache_key(path: &Path, metadata: &Metadata) -> String {
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mtime = metadata.modified().unwrap_or(UNIX_EPOCH);
    format!("{}_{}_{}", filename, format_mtime(mtime), metadata.len())
}

fn format_mtime(mtime: SystemTime) -> String {
    let secs = match mtime.duration_since(UNIX_EPOCH) {
        Ok(d) => d.as_secs_f64(),
        Err(e) => -e.duration().as_secs_f64(),
    };
    let mut rendered = secs.to_string();
    if !rendered.contains('.') {
        rendered.push_str(".0");
    }
    rendered
}

/// Content hasher backed by the computation cache.
#[derive(Debug, Clone)]
pub struct ContentHasher {
    computed: Arc<KvCache>,
}

impl ContentHasher {
    #[must_use]
    pub fn new(computed: Arc<KvCache>) -> Self {
        Self { computed }
    }

    /// Hash `path`, consulting and feeding the computation cache when
    /// `use_cache` is set.
    ///
    /// Returns `None` when the file cannot be stat'ed or read; the error is
    /// logged. Callers treat `None` as "hash unavailable".
    pub fn compute(&self, path: &Path, use_cache: bool) -> Option<ContentHash> {
        let metadata = match std::fs::metadata(path) {
            Ok(m) => m,
            Err(e) => {
                log::debug!("Cannot stat {}: {}", path.display(), e);
                return None;
            }
        };
        let key = cache_key(path, &metadata);

        if use_cache {
            if let Some(hit) = self.computed.get(&key) {
                log::trace!("Hash cache hit: {}", path.display());
                return Some(ContentHash::new_unchecked(hit));
            }
            log::trace!("Hash cache miss: {}", path.display());
        }

        let hash = match hash_file(path) {
            Ok(hash) => hash,
            Err(e) => {
                log::warn!("Failed to hash {}: {}", path.display(), e);
                return None;
            }
        };

        if use_cache {
            if let Err(e) = self.computed.put_and_save(key, hash.as_str()) {
                log::warn!("Failed to update hash cache for {}: {}", path.display(), e);
            }
        }

        Some(hash)
    }

    /// The computation cache this hasher writes to.
    #[must_use]
    pub fn cache(&self) -> &Arc<KvCache> {
        &self.computed
    }
}
