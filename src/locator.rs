//! Resolving content hashes back to files on disk.
//!
//! The path cache is treated as a hint. [`ImageLocator::resolve`] re-hashes
//! a cached path before returning it and drops the entry when the content
//! no longer matches; on any miss it scans the image folders in order and
//! records the first file whose hash matches.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::cache::KvCache;
use crate::scanner::{list_images, ContentHash, ContentHasher};

/// Finds the file currently holding a given content hash.
#[derive(Debug, Clone)]
pub struct ImageLocator {
    hasher: ContentHasher,
    paths: Arc<KvCache>,
    folders: Vec<PathBuf>,
}

impl ImageLocator {
    /// Create a locator scanning `folders` in the given order.
    #[must_use]
    pub fn new(hasher: ContentHasher, paths: Arc<KvCache>, folders: Vec<PathBuf>) -> Self {
        Self {
            hasher,
            paths,
            folders,
        }
    }

    /// Folders searched by the fallback scan, in search order.
    #[must_use]
    pub fn folders(&self) -> &[PathBuf] {
        &self.folders
    }

    /// Resolve `hash` to a verified path.
    ///
    /// A cached path is returned only if it still hashes to `hash`. A cached
    /// path whose content changed is evicted before falling back to a scan.
    pub fn resolve(&self, hash: &ContentHash) -> Option<PathBuf> {
        if let Some(cached) = self.paths.get(hash.as_str()) {
            let candidate = PathBuf::from(&cached);
            if candidate.is_file() {
                if self.hasher.compute(&candidate, true).as_ref() == Some(hash) {
                    log::debug!("Path cache hit for {}: {}", hash, candidate.display());
                    return Some(candidate);
                }
                log::debug!(
                    "Cached path {} no longer matches {}, evicting",
                    candidate.display(),
                    hash
                );
                if let Err(e) = self.paths.remove_and_save(hash.as_str()) {
                    log::warn!("Failed to persist path cache eviction: {}", e);
                }
            } else {
                log::debug!("Cached path {} is gone, rescanning", candidate.display());
            }
        }

        self.scan(hash)
    }

    /// Trust an existing cached path without re-hashing, otherwise scan.
    ///
    /// Cheaper than [`ImageLocator::resolve`]; used to warm the path cache
    /// where a wrong answer is harmless.
    pub fn lookup(&self, hash: &ContentHash) -> Option<PathBuf> {
        if let Some(cached) = self.paths.get(hash.as_str()) {
            let candidate = PathBuf::from(cached);
            if candidate.is_file() {
                return Some(candidate);
            }
        }
        self.scan(hash)
    }

    /// Scan every folder for a file hashing to `hash`.
    fn scan(&self, hash: &ContentHash) -> Option<PathBuf> {
        log::debug!("Scanning image folders for {}", hash);
        for folder in &self.folders {
            let images = match list_images(folder) {
                Ok(images) => images,
                Err(e) => {
                    log::debug!("Skipping folder {}: {}", folder.display(), e);
                    continue;
                }
            };

            for image in images {
                if self.hasher.compute(&image.path, true).as_ref() == Some(hash) {
                    self.remember(hash, &image.path);
                    return Some(image.path);
                }
            }
        }
        log::debug!("No image found for {}", hash);
        None
    }

    /// Record `hash → path` in the path cache and persist it.
    pub fn remember(&self, hash: &ContentHash, path: &Path) {
        let value = path.to_string_lossy();
        if let Err(e) = self.paths.put_and_save(hash.as_str(), value.as_ref()) {
            log::warn!("Failed to update path cache for {}: {}", path.display(), e);
        }
    }
}
