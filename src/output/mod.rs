//! Rendering command results as text or JSON.
//!
//! Every result type implements [`Render`]: `Serialize` gives the JSON form
//! and [`Render::write_text`] the human-readable one. [`emit`] picks between
//! them according to `--output`.
//!
//! # Example
//!
//! ```
//! use sample_annotator::cli::OutputFormat;
//! use sample_annotator::output::{emit, HashReport};
//! use std::path::PathBuf;
//!
//! let hash = "a".repeat(64).parse().unwrap();
//! let report = HashReport::new(PathBuf::from("cat.jpg"), hash);
//!
//! let mut out = Vec::new();
//! emit(&report, OutputFormat::Json, &mut out).unwrap();
//! assert!(String::from_utf8(out).unwrap().contains("/api/image/"));
//! ```

pub mod json;
pub mod text;

use std::io::Write;
use std::path::PathBuf;

use serde::Serialize;

use crate::annotations::{AnnotationRecord, SavedAnnotation};
use crate::catalog::{FileHash, ImageInfo, ImageLookup, NextImage, Upload};
use crate::cli::OutputFormat;
use crate::indexer::IndexReport;
use crate::scanner::ContentHash;

pub use json::write_json;

/// URL under which an image is served by content hash.
#[must_use]
pub fn image_url(hash: &ContentHash) -> String {
    format!("/api/image/{hash}")
}

/// A command result that can be printed in either output format.
pub trait Render: Serialize {
    /// Write the human-readable form.
    ///
    /// # Errors
    ///
    /// Returns any error from the writer.
    fn write_text(&self, writer: &mut dyn Write) -> std::io::Result<()>;
}

/// Errors that can occur while printing results.
#[derive(thiserror::Error, Debug)]
pub enum OutputError {
    /// JSON serialization error
    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error during writing
    #[error("I/O error while writing output: {0}")]
    Io(#[from] std::io::Error),
}

/// Print `value` in `format`.
///
/// # Errors
///
/// Returns an error if serialization or writing fails.
pub fn emit<T: Render + ?Sized>(
    value: &T,
    format: OutputFormat,
    writer: &mut dyn Write,
) -> Result<(), OutputError> {
    match format {
        OutputFormat::Json => write_json(value, writer),
        OutputFormat::Text => Ok(value.write_text(writer)?),
    }
}

/// Result of hashing one file.
#[derive(Debug, Clone, Serialize)]
pub struct HashReport {
    pub path: PathBuf,
    pub hash: ContentHash,
    pub url: String,
}

impl HashReport {
    #[must_use]
    pub fn new(path: PathBuf, hash: ContentHash) -> Self {
        let url = image_url(&hash);
        Self { path, hash, url }
    }
}

/// How a hash lookup ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolveStatus {
    Found,
    AnnotationWithoutImage,
    Unknown,
}

/// Result of resolving a hash to a file.
#[derive(Debug, Clone, Serialize)]
pub struct ResolveReport {
    pub hash: ContentHash,
    pub status: ResolveStatus,
    pub path: Option<PathBuf>,
}

impl ResolveReport {
    #[must_use]
    pub fn new(hash: ContentHash, lookup: ImageLookup) -> Self {
        let (status, path) = match lookup {
            ImageLookup::Found(path) => (ResolveStatus::Found, Some(path)),
            ImageLookup::AnnotationWithoutImage => (ResolveStatus::AnnotationWithoutImage, None),
            ImageLookup::Unknown => (ResolveStatus::Unknown, None),
        };
        Self { hash, status, path }
    }

    #[must_use]
    pub fn is_found(&self) -> bool {
        self.status == ResolveStatus::Found
    }
}

/// The images of one folder.
#[derive(Debug, Clone, Serialize)]
pub struct ImageListing {
    pub folder: String,
    pub images: Vec<ImageInfo>,
}

/// Where an annotation was written.
#[derive(Debug, Clone, Serialize)]
pub struct SavedReport {
    pub identity: Option<String>,
    pub path: PathBuf,
}

impl From<SavedAnnotation> for SavedReport {
    fn from(saved: SavedAnnotation) -> Self {
        Self {
            identity: saved.identity.map(|id| id.to_string()),
            path: saved.path,
        }
    }
}

/// Every stored annotation.
#[derive(Debug, Clone, Serialize)]
pub struct AnnotationListing {
    pub annotations: Vec<AnnotationRecord>,
}

impl Render for HashReport {
    fn write_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        writeln!(w, "{}  {}", self.hash, self.path.display())?;
        writeln!(w, "url: {}", self.url)
    }
}

impl Render for FileHash {
    fn write_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        writeln!(w, "{}  {}/{}", self.hash, self.folder, self.filename)?;
        writeln!(w, "url: {}", image_url(&self.hash))
    }
}

impl Render for ResolveReport {
    fn write_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        match (self.status, &self.path) {
            (ResolveStatus::Found, Some(path)) => writeln!(w, "{}", path.display()),
            (ResolveStatus::AnnotationWithoutImage, _) => writeln!(
                w,
                "Image {} has an annotation but no file; it may have been deleted or moved",
                self.hash
            ),
            _ => writeln!(w, "Image {} not found", self.hash),
        }
    }
}

impl Render for IndexReport {
    fn write_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        text::write_index_report(self, w)
    }
}

impl Render for ImageListing {
    fn write_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        text::write_image_listing(self, w)
    }
}

impl Render for Upload {
    fn write_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        match &self.hash {
            Some(hash) => writeln!(w, "{}  {}", hash, self.path.display()),
            None => writeln!(w, "{}  {}", text::NO_HASH, self.path.display()),
        }
    }
}

impl Render for Option<NextImage> {
    fn write_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        match self {
            Some(next) => text::write_next_image(next, w),
            None => writeln!(w, "No images to annotate"),
        }
    }
}

impl Render for SavedReport {
    fn write_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        writeln!(w, "Saved {}", self.path.display())
    }
}

impl Render for AnnotationRecord {
    fn write_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        json::write_json_text(self, w)
    }
}

impl Render for AnnotationListing {
    fn write_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        text::write_annotation_listing(self, w)
    }
}
