//! The image catalog: one handle over configuration, caches, locator and
//! annotation store.
//!
//! # Overview
//!
//! [`Catalog::open`] creates the configured folders, loads both hash caches
//! from the parent of the annotations folder and wires the components
//! together. The core operations are
//!
//! * [`Catalog::compute_hash`]: hash a path through the computation cache
//! * [`Catalog::resolve_by_hash`]: find the file currently holding a hash
//! * [`Catalog::start_background_index`]: fire-and-forget index sweep
//!
//! The remaining methods are the higher-level flows the CLI exposes.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::annotations::{
    AnnotationError, AnnotationRecord, AnnotationStore, ImageIdentity, SavedAnnotation,
};
use crate::cache::HashIndex;
use crate::cli::FolderArg;
use crate::config::Config;
use crate::indexer::{BackgroundIndexer, IndexerHandle};
use crate::locator::ImageLocator;
use crate::priority::{image_priority, Priority};
use crate::scanner::{list_images, ContentHash, ContentHasher, ScanError};

/// Errors raised by catalog operations.
#[derive(thiserror::Error, Debug)]
pub enum CatalogError {
    /// A folder or file could not be created or copied.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path involved
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The requested file does not exist.
    #[error("File not found: {0}")]
    NotFound(PathBuf),

    /// The requested path is not a regular file.
    #[error("Not a file: {0}")]
    NotAFile(PathBuf),

    /// The file exists but its hash could not be computed.
    #[error("Hash could not be computed for {0}")]
    HashUnavailable(PathBuf),

    /// An upload exceeded the configured limit.
    #[error("{path} is {size} bytes, larger than the {limit} byte upload limit")]
    TooLarge {
        /// Rejected file
        path: PathBuf,
        /// Its size
        size: u64,
        /// Configured limit
        limit: u64,
    },

    /// A path has no usable file name.
    #[error("No file name in {0}")]
    InvalidFileName(PathBuf),

    /// An image folder could not be listed.
    #[error(transparent)]
    Scan(#[from] ScanError),

    /// The annotation store failed.
    #[error(transparent)]
    Annotation(#[from] AnnotationError),
}

/// Outcome of looking an image up by hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageLookup {
    /// The image was found.
    Found(PathBuf),
    /// An annotation exists but no file currently holds the hash; the image
    /// was probably deleted or moved out of the image folders.
    AnnotationWithoutImage,
    /// Nothing is known about the hash.
    Unknown,
}

/// A file hashed by name inside an image folder.
#[derive(Debug, Clone, Serialize)]
pub struct FileHash {
    pub filename: String,
    pub folder: String,
    pub filepath: PathBuf,
    pub hash: ContentHash,
}

/// One row of an image listing.
#[derive(Debug, Clone, Serialize)]
pub struct ImageInfo {
    pub filename: String,
    pub hash: Option<ContentHash>,
    pub path: PathBuf,
    pub size: u64,
}

/// Result of an upload.
#[derive(Debug, Clone, Serialize)]
pub struct Upload {
    pub path: PathBuf,
    pub hash: Option<ContentHash>,
}

/// The image picked for the next annotation round.
#[derive(Debug, Clone, Serialize)]
pub struct NextImage {
    pub path: PathBuf,
    pub hash: Option<ContentHash>,
    pub priority: Priority,
}

/// Handle over every catalog component.
#[derive(Debug)]
pub struct Catalog {
    config: Config,
    index: HashIndex,
    hasher: ContentHasher,
    locator: ImageLocator,
    annotations: AnnotationStore,
}

impl Catalog {
    /// Open the catalog described by `config`, creating its folders.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Io`] if a folder cannot be created. Cache
    /// problems never fail here; unreadable caches start empty.
    pub fn open(config: Config) -> Result<Self, CatalogError> {
        config.ensure_folders().map_err(|source| CatalogError::Io {
            path: config.annotations_folder.clone(),
            source,
        })?;

        let index = HashIndex::open(&config.cache_dir());
        let hasher = ContentHasher::new(index.computed.clone());
        let locator = ImageLocator::new(hasher.clone(), index.paths.clone(), config.image_folders());
        let annotations = AnnotationStore::new(config.annotations_folder.clone());

        log::debug!(
            "Catalog opened: {} computed hashes, {} known paths",
            index.computed.len(),
            index.paths.len()
        );

        Ok(Self {
            config,
            index,
            hasher,
            locator,
            annotations,
        })
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    #[must_use]
    pub fn index(&self) -> &HashIndex {
        &self.index
    }

    #[must_use]
    pub fn locator(&self) -> &ImageLocator {
        &self.locator
    }

    #[must_use]
    pub fn annotations(&self) -> &AnnotationStore {
        &self.annotations
    }

    /// Hash `path` through the computation cache. `None` means the hash is
    /// unavailable.
    pub fn compute_hash(&self, path: &Path) -> Option<ContentHash> {
        self.hasher.compute(path, true)
    }

    /// Hash `path`, optionally bypassing the computation cache entirely.
    pub fn compute_hash_with(&self, path: &Path, use_cache: bool) -> Option<ContentHash> {
        self.hasher.compute(path, use_cache)
    }

    /// Resolve a hash to a verified path.
    pub fn resolve_by_hash(&self, hash: &ContentHash) -> Option<PathBuf> {
        self.locator.resolve(hash)
    }

    /// An indexer over this catalog's folders and caches.
    #[must_use]
    pub fn indexer(&self) -> BackgroundIndexer {
        BackgroundIndexer::new(
            self.hasher.clone(),
            self.index.paths.clone(),
            self.config.image_folders(),
        )
    }

    /// Start the index sweep in the background.
    ///
    /// # Errors
    ///
    /// Returns an error only if the thread cannot be spawned.
    pub fn start_background_index(&self) -> std::io::Result<IndexerHandle> {
        self.indexer().spawn()
    }

    /// Resolve a hash, telling "annotated but missing" apart from "unknown".
    pub fn image_by_hash(&self, hash: &ContentHash) -> ImageLookup {
        if let Some(path) = self.resolve_by_hash(hash) {
            return ImageLookup::Found(path);
        }
        if self.annotations.exists(&ImageIdentity::Hash(hash.clone())) {
            ImageLookup::AnnotationWithoutImage
        } else {
            ImageLookup::Unknown
        }
    }

    /// Hash a file given by name inside one of the image folders.
    ///
    /// # Errors
    ///
    /// [`CatalogError::NotFound`], [`CatalogError::NotAFile`] or
    /// [`CatalogError::HashUnavailable`].
    pub fn file_hash(&self, filename: &str, folder: FolderArg) -> Result<FileHash, CatalogError> {
        let filepath = self.config.folder(folder).join(filename);
        if !filepath.exists() {
            return Err(CatalogError::NotFound(filepath));
        }
        if !filepath.is_file() {
            return Err(CatalogError::NotAFile(filepath));
        }

        let hash = self
            .compute_hash(&filepath)
            .ok_or_else(|| CatalogError::HashUnavailable(filepath.clone()))?;

        Ok(FileHash {
            filename: filename.to_string(),
            folder: folder.to_string(),
            filepath,
            hash,
        })
    }

    /// List a folder's images with their hashes.
    ///
    /// # Errors
    ///
    /// Fails if the folder cannot be listed.
    pub fn list_images(&self, folder: FolderArg) -> Result<Vec<ImageInfo>, CatalogError> {
        let images = list_images(self.config.folder(folder))?;
        Ok(images
            .into_iter()
            .map(|entry| ImageInfo {
                filename: entry.file_name(),
                hash: self.compute_hash(&entry.path),
                size: entry.size,
                path: entry.path,
            })
            .collect())
    }

    /// Copy `source` into the uploads folder, hash it and record where it
    /// lives. A file of the same name in the uploads folder is replaced.
    ///
    /// # Errors
    ///
    /// Fails if the source is missing or too large, or the copy fails.
    pub fn upload(&self, source: &Path, max_size: Option<u64>) -> Result<Upload, CatalogError> {
        let metadata = fs::metadata(source).map_err(|_| CatalogError::NotFound(source.to_path_buf()))?;
        if !metadata.is_file() {
            return Err(CatalogError::NotAFile(source.to_path_buf()));
        }

        let limit = max_size.unwrap_or(self.config.max_upload_size);
        if metadata.len() > limit {
            return Err(CatalogError::TooLarge {
                path: source.to_path_buf(),
                size: metadata.len(),
                limit,
            });
        }

        let filename = source
            .file_name()
            .filter(|n| !n.is_empty())
            .ok_or_else(|| CatalogError::InvalidFileName(source.to_path_buf()))?;
        let target = self.config.uploads_folder.join(filename);

        if is_same_file(source, &target) {
            log::info!("{} is already in the uploads folder", target.display());
        } else {
            fs::copy(source, &target).map_err(|e| CatalogError::Io {
                path: target.clone(),
                source: e,
            })?;
            log::info!("Uploaded {} to {}", source.display(), target.display());
        }

        let hash = self.compute_hash(&target);
        if let Some(ref hash) = hash {
            self.locator.remember(hash, &target);
        }

        Ok(Upload { path: target, hash })
    }

    /// Pick the sample image most in need of annotation and record its
    /// location. Ties go to the first image in name order.
    ///
    /// # Errors
    ///
    /// Fails if the sample folder cannot be listed.
    pub fn next_image(&self) -> Result<Option<NextImage>, CatalogError> {
        let images = list_images(&self.config.sample_images_folder)?;

        let best = images
            .into_iter()
            .map(|entry| {
                let hash = self.compute_hash(&entry.path);
                let priority = image_priority(hash.as_ref(), &self.annotations);
                NextImage {
                    path: entry.path,
                    hash,
                    priority,
                }
            })
            .min_by(|a, b| a.priority.cmp(&b.priority));

        if let Some(NextImage {
            ref path,
            hash: Some(ref hash),
            ..
        }) = best
        {
            self.locator.remember(hash, path);
        }
        Ok(best)
    }

    /// Save an annotation under the identity its payload names.
    ///
    /// # Errors
    ///
    /// See [`AnnotationStore::save`].
    pub fn save_annotation(&self, record: AnnotationRecord) -> Result<SavedAnnotation, CatalogError> {
        Ok(self.annotations.save(record)?)
    }

    /// Open the annotation for `hash` for review and warm the path cache for
    /// its image.
    ///
    /// # Errors
    ///
    /// See [`AnnotationStore::open_for_review`].
    pub fn review_annotation(
        &self,
        hash: &ContentHash,
    ) -> Result<Option<AnnotationRecord>, CatalogError> {
        let identity = ImageIdentity::Hash(hash.clone());
        if !self.annotations.exists(&identity) {
            return Ok(None);
        }
        if self.locator.lookup(hash).is_none() {
            log::debug!("Annotated image {} is not on disk", hash);
        }
        Ok(self.annotations.open_for_review(&identity)?)
    }

    /// Every stored annotation.
    ///
    /// # Errors
    ///
    /// Fails if the annotations folder cannot be listed.
    pub fn list_annotations(&self) -> Result<Vec<AnnotationRecord>, CatalogError> {
        Ok(self.annotations.list()?)
    }
}

/// `fs::copy` onto the source itself truncates it to zero bytes.
fn is_same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}
