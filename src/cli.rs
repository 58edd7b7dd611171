//! Command-line interface definitions for sample-annotator.
//!
//! Global options (verbosity, config, folder overrides, output format) come
//! first, followed by one subcommand per catalog operation.
//!
//! # Example
//!
//! ```bash
//! # Hash an image and print its lookup URL
//! sample-annotator hash sample_images/cat.jpg
//!
//! # Find the file currently holding a hash
//! sample-annotator resolve 3a7bd3e2360a3d29eea436fcfb7e44c735d117c42d1c1835420b6b9942dd4f1b
//!
//! # Index everything up front, with debug logging
//! sample-annotator -v index
//!
//! # Open an annotation for review, as JSON
//! sample-annotator --output json annotation show <HASH>
//! ```

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::config::ConfigOverrides;

/// Content-addressed sample image catalog with annotation storage.
///
/// Images are identified by the SHA-256 of their bytes, so annotations
/// follow an image through renames and moves.
#[derive(Debug, Parser)]
#[command(name = "sample-annotator")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity level (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Report errors as JSON on stderr
    #[arg(long, global = true)]
    pub json_errors: bool,

    /// Output format for command results
    #[arg(short, long, value_enum, global = true, default_value = "text")]
    pub output: OutputFormat,

    /// Path to a TOML config file
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Override the uploads folder
    #[arg(long, value_name = "DIR", global = true)]
    pub uploads: Option<PathBuf>,

    /// Override the sample images folder
    #[arg(long, value_name = "DIR", global = true)]
    pub samples: Option<PathBuf>,

    /// Override the annotations folder (hash caches live in its parent)
    #[arg(long, value_name = "DIR", global = true)]
    pub annotations: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Folder overrides to layer over the config file.
    #[must_use]
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            uploads_folder: self.uploads.clone(),
            sample_images_folder: self.samples.clone(),
            annotations_folder: self.annotations.clone(),
        }
    }
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Compute the content hash of an image file
    Hash(HashArgs),
    /// Compute the hash of a named file inside an image folder
    FileHash(FileHashArgs),
    /// Find the image file holding a content hash
    Resolve(ResolveArgs),
    /// Hash every image and record where it lives
    Index,
    /// List the images in a folder with their hashes
    List(ListArgs),
    /// Copy an image into the uploads folder and index it
    Upload(UploadArgs),
    /// Pick the image most in need of annotation
    Next,
    /// Save, review or list annotations
    #[command(subcommand)]
    Annotation(AnnotationCommand),
}

/// Arguments for the hash subcommand.
#[derive(Debug, Args)]
pub struct HashArgs {
    /// Image file to hash
    #[arg(value_name = "PATH")]
    pub path: PathBuf,

    /// Bypass the hash cache (neither read nor written)
    #[arg(long)]
    pub no_cache: bool,
}

/// Arguments for the file-hash subcommand.
#[derive(Debug, Args)]
pub struct FileHashArgs {
    /// File name inside the folder
    #[arg(value_name = "FILENAME")]
    pub filename: String,

    /// Folder to look in
    #[arg(long, value_enum, default_value = "samples")]
    pub folder: FolderArg,
}

/// Arguments for the resolve subcommand.
#[derive(Debug, Args)]
pub struct ResolveArgs {
    /// SHA-256 hex digest
    #[arg(value_name = "HASH")]
    pub hash: String,
}

/// Arguments for the list subcommand.
#[derive(Debug, Args)]
pub struct ListArgs {
    /// Folder to list
    #[arg(long, value_enum, default_value = "samples")]
    pub folder: FolderArg,
}

/// Arguments for the upload subcommand.
#[derive(Debug, Args)]
pub struct UploadArgs {
    /// Image file to upload
    #[arg(value_name = "PATH")]
    pub path: PathBuf,

    /// Largest accepted file (e.g., 16MiB). Defaults to the configured limit.
    ///
    /// Supports suffixes: B, KB, KiB, MB, MiB, GB, GiB, TB, TiB
    #[arg(long, value_name = "SIZE", value_parser = parse_size)]
    pub max_size: Option<u64>,
}

/// Annotation subcommands.
#[derive(Debug, Subcommand)]
pub enum AnnotationCommand {
    /// Save an annotation from a JSON file (`-` for stdin)
    Save {
        /// JSON document with `imageHash` or `imageName`
        #[arg(value_name = "JSON_FILE")]
        file: PathBuf,
    },
    /// Open an annotation for review (increments its review count)
    Show {
        /// Content hash of the annotated image
        #[arg(value_name = "HASH")]
        hash: String,
    },
    /// Print every stored annotation
    List,
}

/// Image folder selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FolderArg {
    /// The sample images folder
    Samples,
    /// The uploads folder
    Uploads,
}

impl std::fmt::Display for FolderArg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FolderArg::Samples => write!(f, "sample_images"),
            FolderArg::Uploads => write!(f, "uploads"),
        }
    }
}

/// Output format for command results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text
    Text,
    /// JSON for scripting
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

/// Parse a human-readable size string into bytes.
///
/// Supports suffixes: B, KB, KiB, MB, MiB, GB, GiB, TB, TiB
/// Case-insensitive. Numbers without suffix are treated as bytes.
///
/// # Examples
///
/// ```
/// use sample_annotator::cli::parse_size;
///
/// assert_eq!(parse_size("1024").unwrap(), 1024);
/// assert_eq!(parse_size("1KB").unwrap(), 1000);
/// assert_eq!(parse_size("16MiB").unwrap(), 16 * 1_048_576);
/// ```
/// # Errors
///
/// Returns an error if the string is empty, contains an invalid number,
/// a negative number, or an unknown size suffix.
pub fn parse_size(s: &str) -> Result<u64, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("Size cannot be empty".to_string());
    }
    if s.starts_with('-') {
        return Err("Size cannot be negative".to_string());
    }

    let (num_str, suffix) = match s.find(|c: char| !c.is_ascii_digit() && c != '.') {
        Some(idx) => (&s[..idx], s[idx..].trim().to_uppercase()),
        None => (s, String::new()),
    };

    let num: f64 = num_str
        .parse()
        .map_err(|_| format!("Invalid number: '{num_str}'"))?;

    let multiplier: u64 = match suffix.as_str() {
        "" | "B" => 1,
        "KB" | "K" => 1_000,
        "KIB" => 1_024,
        "MB" | "M" => 1_000_000,
        "MIB" => 1_048_576,
        "GB" | "G" => 1_000_000_000,
        "GIB" => 1_073_741_824,
        "TB" | "T" => 1_000_000_000_000,
        "TIB" => 1_099_511_627_776,
        _ => return Err(format!("Unknown size suffix: '{suffix}'")),
    };

    Ok((num * multiplier as f64) as u64)
}
