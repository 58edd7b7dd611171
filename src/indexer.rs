//! One-shot background sweep that pre-populates the path cache.
//!
//! At startup every image in the configured folders whose path is not yet
//! known to the path cache is hashed and recorded. The sweep runs on its own
//! thread so callers are not blocked, and the path cache is written once at
//! the end rather than per file.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread::JoinHandle;

use serde::Serialize;

use crate::cache::KvCache;
use crate::progress::ProgressCallback;
use crate::scanner::{list_images, ContentHasher};

/// Outcome of one index sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IndexReport {
    /// New `hash → path` entries recorded
    pub indexed: usize,
    /// Images skipped because their path or hash was already known
    pub already_known: usize,
    /// Images whose hash could not be computed
    pub unreadable: usize,
    /// Folders that could not be listed
    pub folders_skipped: usize,
}

/// Walks the image folders and fills the path cache.
#[derive(Clone)]
pub struct BackgroundIndexer {
    hasher: ContentHasher,
    paths: Arc<KvCache>,
    folders: Vec<PathBuf>,
    progress: Option<Arc<dyn ProgressCallback>>,
}

impl std::fmt::Debug for BackgroundIndexer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackgroundIndexer")
            .field("folders", &self.folders)
            .field("progress", &self.progress.as_ref().map(|_| "<callback>"))
            .finish_non_exhaustive()
    }
}

impl BackgroundIndexer {
    #[must_use]
    pub fn new(hasher: ContentHasher, paths: Arc<KvCache>, folders: Vec<PathBuf>) -> Self {
        Self {
            hasher,
            paths,
            folders,
            progress: None,
        }
    }

    /// Report per-file progress to `callback`.
    #[must_use]
    pub fn with_progress_callback(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress = Some(callback);
        self
    }

    /// Start the sweep on a dedicated thread.
    ///
    /// The returned handle may be dropped; the sweep keeps running.
    ///
    /// # Errors
    ///
    /// Returns an error if the OS refuses to spawn the thread.
    pub fn spawn(self) -> std::io::Result<IndexerHandle> {
        let handle = std::thread::Builder::new()
            .name("image-indexer".to_string())
            .spawn(move || self.run())?;
        Ok(IndexerHandle { handle })
    }

    /// Run the sweep on the current thread.
    pub fn run(&self) -> IndexReport {
        log::info!("Indexing images...");
        let mut report = IndexReport::default();
        let known_paths: HashSet<String> = self.paths.snapshot().into_values().collect();

        for folder in &self.folders {
            let images = match list_images(folder) {
                Ok(images) => images,
                Err(e) => {
                    log::warn!("Error indexing {}: {}", folder.display(), e);
                    report.folders_skipped += 1;
                    continue;
                }
            };

            if let Some(ref progress) = self.progress {
                progress.on_phase_start(&folder.to_string_lossy(), images.len());
            }

            for (i, image) in images.iter().enumerate() {
                let path = image.path.to_string_lossy();
                if let Some(ref progress) = self.progress {
                    progress.on_progress(i + 1, &path);
                }

                if known_paths.contains(path.as_ref()) {
                    report.already_known += 1;
                    continue;
                }

                let Some(hash) = self.hasher.compute(&image.path, true) else {
                    report.unreadable += 1;
                    continue;
                };

                if self.paths.contains_key(hash.as_str()) {
                    report.already_known += 1;
                } else {
                    self.paths.put(hash.as_str(), path.as_ref());
                    report.indexed += 1;
                }
            }

            if let Some(ref progress) = self.progress {
                progress.on_phase_end(&folder.to_string_lossy());
            }
        }

        if report.indexed > 0 {
            if let Err(e) = self.paths.save() {
                log::warn!("Failed to save path cache after indexing: {}", e);
            }
            log::info!("{} images indexed", report.indexed);
        } else {
            log::info!("No new images to index");
        }

        report
    }
}

/// Handle to a running background sweep.
#[derive(Debug)]
pub struct IndexerHandle {
    handle: JoinHandle<IndexReport>,
}

impl IndexerHandle {
    /// Whether the sweep has finished.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the sweep. Returns `None` if the indexer thread panicked.
    pub fn join(self) -> Option<IndexReport> {
        self.handle.join().ok()
    }
}
