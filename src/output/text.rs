//! Human-readable output.

use std::io::Write;

use bytesize::ByteSize;

use super::{AnnotationListing, ImageListing};
use crate::catalog::NextImage;
use crate::indexer::IndexReport;
use crate::priority::Priority;

/// Placeholder printed where a hash could not be computed.
pub const NO_HASH: &str = "<unavailable>";

pub(super) fn write_index_report(report: &IndexReport, w: &mut dyn Write) -> std::io::Result<()> {
    if report.indexed == 0 {
        writeln!(w, "No new images to index")?;
    } else {
        writeln!(w, "{} images indexed", report.indexed)?;
    }
    if report.already_known > 0 {
        writeln!(w, "{} already known", report.already_known)?;
    }
    if report.unreadable > 0 {
        writeln!(w, "{} could not be hashed", report.unreadable)?;
    }
    if report.folders_skipped > 0 {
        writeln!(w, "{} folders skipped", report.folders_skipped)?;
    }
    Ok(())
}

pub(super) fn write_image_listing(listing: &ImageListing, w: &mut dyn Write) -> std::io::Result<()> {
    if listing.images.is_empty() {
        return writeln!(w, "No images in {}", listing.folder);
    }

    let total: u64 = listing.images.iter().map(|i| i.size).sum();
    for image in &listing.images {
        let hash = image.hash.as_ref().map_or(NO_HASH, |h| h.as_str());
        writeln!(
            w,
            "{:<64}  {:>10}  {}",
            hash,
            ByteSize::b(image.size).to_string(),
            image.filename
        )?;
    }
    writeln!(
        w,
        "{} images, {} in {}",
        listing.images.len(),
        ByteSize::b(total),
        listing.folder
    )
}

pub(super) fn write_next_image(next: &NextImage, w: &mut dyn Write) -> std::io::Result<()> {
    let state = match next.priority {
        Priority::Unannotated => "not annotated".to_string(),
        Priority::Annotated { review_count } => format!("annotated, reviewed {review_count} times"),
        Priority::HashUnavailable => "hash unavailable".to_string(),
    };
    writeln!(w, "{} ({})", next.path.display(), state)?;
    if let Some(hash) = &next.hash {
        writeln!(w, "url: {}", super::image_url(hash))?;
    }
    Ok(())
}

pub(super) fn write_annotation_listing(
    listing: &AnnotationListing,
    w: &mut dyn Write,
) -> std::io::Result<()> {
    if listing.annotations.is_empty() {
        return writeln!(w, "No annotations");
    }
    for record in &listing.annotations {
        let identity = match record.identity() {
            Ok(Some(id)) => id.to_string(),
            _ => "(no image)".to_string(),
        };
        writeln!(w, "{:<64}  reviews: {}", identity, record.review_count)?;
    }
    Ok(())
}
