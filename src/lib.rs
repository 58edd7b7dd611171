//! Sample Annotator - content-addressed image catalog
//!
//! Images are identified by the SHA-256 of their bytes, so annotations keep
//! pointing at the right picture when files are renamed or moved between
//! the sample and upload folders. Two persistent caches make that cheap:
//! one remembers computed hashes, the other where each hash was last seen.

pub mod annotations;
pub mod cache;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod error;
pub mod indexer;
pub mod locator;
pub mod logging;
pub mod output;
pub mod priority;
pub mod progress;
pub mod scanner;

use std::fs;
use std::io::{Read, Write};
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::annotations::{AnnotationRecord, ImageIdentity};
use crate::catalog::{Catalog, CatalogError};
use crate::cli::{AnnotationCommand, Cli, Commands, OutputFormat};
use crate::config::Config;
use crate::error::ExitCode;
use crate::indexer::IndexerHandle;
use crate::output::{
    emit, AnnotationListing, HashReport, ImageListing, Render, ResolveReport, SavedReport,
};
use crate::progress::Progress;
use crate::scanner::{hash_file, ContentHash};

/// Run a parsed command line, printing results to stdout.
///
/// Logging is not initialized here; the binary does that first.
///
/// # Errors
///
/// Returns any error that should end the process with a non-zero code.
pub fn run_app(cli: Cli) -> Result<ExitCode> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    run_app_with_writer(cli, &mut out)
}

/// Run a parsed command line, printing results to `out`.
///
/// # Errors
///
/// See [`run_app`].
pub fn run_app_with_writer(cli: Cli, out: &mut dyn Write) -> Result<ExitCode> {
    let config = load_config(&cli)?;
    let catalog = Catalog::open(config).context("Failed to open image catalog")?;

    let indexer = if catalog.config().background_index && wants_background_index(&cli.command) {
        match catalog.start_background_index() {
            Ok(handle) => Some(handle),
            Err(e) => {
                log::warn!("Failed to start background indexer: {}", e);
                None
            }
        }
    } else {
        None
    };

    let code = dispatch(&cli, &catalog, out);
    finish_indexer(indexer);
    code
}

fn load_config(cli: &Cli) -> Result<Config> {
    let overrides = cli.overrides();
    if let Some(path) = &cli.config {
        return Config::try_load(Some(path.as_path()), &overrides)
            .with_context(|| format!("Failed to load config from {}", path.display()));
    }

    let default_path = Config::default_path().filter(|p| p.is_file());
    Ok(Config::load(default_path.as_deref(), &overrides))
}

/// Commands that look images up by hash benefit from a warm path cache.
fn wants_background_index(command: &Commands) -> bool {
    matches!(
        command,
        Commands::Resolve(_) | Commands::Next | Commands::Annotation(AnnotationCommand::Show { .. })
    )
}

/// Let a running sweep finish so its results reach disk before exit.
fn finish_indexer(handle: Option<IndexerHandle>) {
    let Some(handle) = handle else { return };
    if !handle.is_finished() {
        log::debug!("Waiting for background indexer");
    }
    if handle.join().is_none() {
        log::warn!("Background indexer panicked");
    }
}

fn dispatch(cli: &Cli, catalog: &Catalog, out: &mut dyn Write) -> Result<ExitCode> {
    let format = cli.output;

    match &cli.command {
        Commands::Hash(args) => {
            check_file(&args.path)?;
            let hash = if args.no_cache {
                hash_file(&args.path)
                    .with_context(|| format!("Failed to hash {}", args.path.display()))?
            } else {
                catalog
                    .compute_hash(&args.path)
                    .ok_or_else(|| CatalogError::HashUnavailable(args.path.clone()))?
            };
            print(&HashReport::new(args.path.clone(), hash), format, out)?;
        }
        Commands::FileHash(args) => {
            let result = catalog.file_hash(&args.filename, args.folder)?;
            print(&result, format, out)?;
        }
        Commands::Resolve(args) => {
            let hash = parse_hash(&args.hash)?;
            let report = ResolveReport::new(hash.clone(), catalog.image_by_hash(&hash));
            print(&report, format, out)?;
            if !report.is_found() {
                return Ok(ExitCode::NotFound);
            }
        }
        Commands::Index => {
            let quiet = cli.quiet || format == OutputFormat::Json;
            let report = catalog
                .indexer()
                .with_progress_callback(Arc::new(Progress::new(quiet)))
                .run();
            print(&report, format, out)?;
        }
        Commands::List(args) => {
            let listing = ImageListing {
                folder: args.folder.to_string(),
                images: catalog.list_images(args.folder)?,
            };
            print(&listing, format, out)?;
        }
        Commands::Upload(args) => {
            let upload = catalog.upload(&args.path, args.max_size)?;
            print(&upload, format, out)?;
        }
        Commands::Next => {
            let next = catalog.next_image()?;
            print(&next, format, out)?;
        }
        Commands::Annotation(AnnotationCommand::Save { file }) => {
            let record = read_annotation(file)?;
            let saved = catalog.save_annotation(record)?;
            print(&SavedReport::from(saved), format, out)?;
        }
        Commands::Annotation(AnnotationCommand::Show { hash }) => {
            let hash = parse_hash(hash)?;
            let Some(record) = catalog.review_annotation(&hash)? else {
                let identity = ImageIdentity::Hash(hash);
                return Err(CatalogError::NotFound(catalog.annotations().path_for(&identity)))
                    .context("No annotation for image");
            };
            print(&record, format, out)?;
        }
        Commands::Annotation(AnnotationCommand::List) => {
            let listing = AnnotationListing {
                annotations: catalog.list_annotations()?,
            };
            print(&listing, format, out)?;
        }
    }

    Ok(ExitCode::Success)
}

fn print<T: Render + ?Sized>(value: &T, format: OutputFormat, out: &mut dyn Write) -> Result<()> {
    emit(value, format, out).context("Failed to write output")
}

fn parse_hash(hex: &str) -> Result<ContentHash> {
    hex.parse::<ContentHash>()
        .with_context(|| format!("Invalid image hash '{hex}'"))
}

fn check_file(path: &Path) -> Result<(), CatalogError> {
    match fs::metadata(path) {
        Ok(m) if m.is_file() => Ok(()),
        Ok(_) => Err(CatalogError::NotAFile(path.to_path_buf())),
        Err(_) => Err(CatalogError::NotFound(path.to_path_buf())),
    }
}

/// Read an annotation document from `path`, or stdin for `-`.
fn read_annotation(path: &Path) -> Result<AnnotationRecord> {
    let text = if path == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read annotation from stdin")?;
        buf
    } else {
        fs::read_to_string(path)
            .with_context(|| format!("Failed to read annotation from {}", path.display()))?
    };

    let value: serde_json::Value =
        serde_json::from_str(&text).context("Annotation is not valid JSON")?;
    AnnotationRecord::from_value(value).context("Annotation must be a JSON object")
}
