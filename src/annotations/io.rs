//! Reading and writing annotation files.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use chrono::Local;

use super::data::{AnnotationRecord, ImageIdentity};
use super::AnnotationError;

/// Where a save landed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedAnnotation {
    /// Identity used, or `None` for a timestamp-named file
    pub identity: Option<ImageIdentity>,
    /// File written
    pub path: PathBuf,
}

/// Folder of `annotation_*.json` files, one per image identity.
///
/// Saves and reviews of the same store are serialized by an internal lock
/// so concurrent reviewers never lose a `reviewCount` increment.
#[derive(Debug)]
pub struct AnnotationStore {
    folder: PathBuf,
    lock: Mutex<()>,
}

impl AnnotationStore {
    #[must_use]
    pub fn new(folder: impl Into<PathBuf>) -> Self {
        Self {
            folder: folder.into(),
            lock: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn folder(&self) -> &Path {
        &self.folder
    }

    /// File an identity's annotation lives in.
    #[must_use]
    pub fn path_for(&self, identity: &ImageIdentity) -> PathBuf {
        self.folder.join(identity.file_name())
    }

    /// Whether an annotation exists for `identity`.
    #[must_use]
    pub fn exists(&self, identity: &ImageIdentity) -> bool {
        self.path_for(identity).is_file()
    }

    /// Save a record under the identity its payload names.
    ///
    /// Records without `imageHash` or `imageName` go to a timestamped file.
    ///
    /// # Errors
    ///
    /// Fails on an unusable identity field, an unreadable existing record or
    /// a write error.
    pub fn save(&self, record: AnnotationRecord) -> Result<SavedAnnotation, AnnotationError> {
        match record.identity()? {
            Some(identity) => self.save_as(&identity, record),
            None => {
                let name = format!("annotation_{}.json", Local::now().format("%Y%m%d_%H%M%S"));
                let path = self.folder.join(name);
                let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
                write_record(&path, &record)?;
                log::info!("Saved annotation {}", path.display());
                Ok(SavedAnnotation {
                    identity: None,
                    path,
                })
            }
        }
    }

    /// Save a record under `identity`, replacing any previous annotation but
    /// keeping its review bookkeeping.
    ///
    /// # Errors
    ///
    /// Fails if an existing record cannot be read or the file cannot be
    /// written.
    pub fn save_as(
        &self,
        identity: &ImageIdentity,
        mut record: AnnotationRecord,
    ) -> Result<SavedAnnotation, AnnotationError> {
        let path = self.path_for(identity);
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(existing) = read_record(&path)? {
            record.review_count = existing.review_count;
            record.last_reviewed = existing.last_reviewed;
        }
        write_record(&path, &record)?;
        log::info!("Saved annotation for {}", identity);

        Ok(SavedAnnotation {
            identity: Some(identity.clone()),
            path,
        })
    }

    /// Read a record without counting a review.
    ///
    /// # Errors
    ///
    /// Fails if the file exists but cannot be read or parsed.
    pub fn get(&self, identity: &ImageIdentity) -> Result<Option<AnnotationRecord>, AnnotationError> {
        read_record(&self.path_for(identity))
    }

    /// Open a record for review: bump `reviewCount`, stamp `lastReviewed`,
    /// persist and return the updated record.
    ///
    /// # Errors
    ///
    /// Fails if the file exists but cannot be read, parsed or rewritten.
    pub fn open_for_review(
        &self,
        identity: &ImageIdentity,
    ) -> Result<Option<AnnotationRecord>, AnnotationError> {
        let path = self.path_for(identity);
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);

        let Some(mut record) = read_record(&path)? else {
            return Ok(None);
        };
        record.mark_reviewed();
        write_record(&path, &record)?;
        log::debug!(
            "Reviewed {} ({} reviews)",
            identity,
            record.review_count
        );
        Ok(Some(record))
    }

    /// Every readable record in the folder, in file name order.
    ///
    /// Files that fail to parse are logged and skipped.
    ///
    /// # Errors
    ///
    /// Fails only if the folder itself cannot be listed.
    pub fn list(&self) -> Result<Vec<AnnotationRecord>, AnnotationError> {
        let entries = fs::read_dir(&self.folder).map_err(|source| AnnotationError::Io {
            path: self.folder.clone(),
            source,
        })?;

        let mut paths: Vec<PathBuf> = entries
            .filter_map(Result::ok)
            .map(|e| e.path())
            .filter(|p| p.extension().is_some_and(|ext| ext == "json") && p.is_file())
            .collect();
        paths.sort();

        let mut records = Vec::with_capacity(paths.len());
        for path in paths {
            match read_record(&path) {
                Ok(Some(record)) => records.push(record),
                Ok(None) => {}
                Err(e) => log::warn!("Skipping annotation: {}", e),
            }
        }
        Ok(records)
    }
}

fn read_record(path: &Path) -> Result<Option<AnnotationRecord>, AnnotationError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(AnnotationError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    serde_json::from_str(&content)
        .map(Some)
        .map_err(|source| AnnotationError::Parse {
            path: path.to_path_buf(),
            source,
        })
}

fn write_record(path: &Path, record: &AnnotationRecord) -> Result<(), AnnotationError> {
    let json = serde_json::to_string_pretty(record).map_err(|source| AnnotationError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    fs::write(path, json).map_err(|source| AnnotationError::Io {
        path: path.to_path_buf(),
        source,
    })
}
