//! Application configuration management.
//!
//! Settings are layered with figment, lowest priority first:
//!
//! 1. Built-in defaults ([`Config::default`])
//! 2. TOML config file (`--config`, or the platform config dir)
//! 3. `SAMPLE_ANNOTATOR_*` environment variables
//! 4. Command-line overrides ([`ConfigOverrides`])

use std::fs;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::cli::FolderArg;

/// Prefix of environment variables read into the configuration.
pub const ENV_PREFIX: &str = "SAMPLE_ANNOTATOR_";

/// Default upload size limit (16 MiB).
pub const DEFAULT_MAX_UPLOAD_SIZE: u64 = 16 * 1024 * 1024;

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Folder uploaded images are copied into.
    pub uploads_folder: PathBuf,
    /// Folder of sample images to annotate.
    pub sample_images_folder: PathBuf,
    /// Folder of annotation files. The hash caches live in its parent.
    pub annotations_folder: PathBuf,
    /// Largest accepted upload, in bytes.
    pub max_upload_size: u64,
    /// Start the background index sweep when the catalog opens.
    pub background_index: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            uploads_folder: PathBuf::from("uploads"),
            sample_images_folder: PathBuf::from("sample_images"),
            annotations_folder: PathBuf::from("annotations"),
            max_upload_size: DEFAULT_MAX_UPLOAD_SIZE,
            background_index: true,
        }
    }
}

/// Values given on the command line; `None` leaves lower layers in charge.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ConfigOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uploads_folder: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample_images_folder: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annotations_folder: Option<PathBuf>,
}

impl Config {
    /// Build the figment for `path` without extracting it.
    #[must_use]
    pub fn figment(path: Option<&Path>, overrides: &ConfigOverrides) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        if let Some(path) = path {
            figment = figment.merge(Toml::file(path));
        }
        figment
            .merge(Env::prefixed(ENV_PREFIX))
            .merge(Serialized::defaults(overrides))
    }

    /// Load the configuration, reporting any layer that fails to parse.
    ///
    /// A missing config file is not an error.
    ///
    /// # Errors
    ///
    /// Returns the figment error for malformed TOML or mistyped values.
    pub fn try_load(path: Option<&Path>, overrides: &ConfigOverrides) -> Result<Self, figment::Error> {
        Self::figment(path, overrides).extract()
    }

    /// Load the configuration, falling back to defaults plus overrides on
    /// any error.
    #[must_use]
    pub fn load(path: Option<&Path>, overrides: &ConfigOverrides) -> Self {
        match Self::try_load(path, overrides) {
            Ok(config) => config,
            Err(e) => {
                log::warn!("Failed to load config, using defaults: {}", e);
                Figment::from(Serialized::defaults(Config::default()))
                    .merge(Serialized::defaults(overrides))
                    .extract()
                    .unwrap_or_default()
            }
        }
    }

    /// Load from an explicit TOML file, ignoring CLI overrides.
    #[must_use]
    pub fn load_from_path(path: impl AsRef<Path>) -> Self {
        Self::load(Some(path.as_ref()), &ConfigOverrides::default())
    }

    /// Platform-specific default config file location.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("com", "sample-annotator", "sample-annotator")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Image folders in search order: samples first, then uploads.
    #[must_use]
    pub fn image_folders(&self) -> Vec<PathBuf> {
        vec![self.sample_images_folder.clone(), self.uploads_folder.clone()]
    }

    /// Folder selected by a CLI folder argument.
    #[must_use]
    pub fn folder(&self, folder: FolderArg) -> &Path {
        match folder {
            FolderArg::Samples => &self.sample_images_folder,
            FolderArg::Uploads => &self.uploads_folder,
        }
    }

    /// Directory holding the two hash cache snapshots: the parent of the
    /// annotations folder.
    #[must_use]
    pub fn cache_dir(&self) -> PathBuf {
        match self.annotations_folder.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            Some(_) => PathBuf::from("."),
            None => self.annotations_folder.join(".."),
        }
    }

    /// Create the uploads, samples and annotations folders if missing.
    ///
    /// # Errors
    ///
    /// Returns the first I/O error encountered.
    pub fn ensure_folders(&self) -> std::io::Result<()> {
        for folder in [
            &self.uploads_folder,
            &self.annotations_folder,
            &self.sample_images_folder,
        ] {
            fs::create_dir_all(folder)?;
        }
        Ok(())
    }

    /// Rebase every relative folder onto `root`.
    #[must_use]
    pub fn rooted_at(mut self, root: &Path) -> Self {
        for folder in [
            &mut self.uploads_folder,
            &mut self.sample_images_folder,
            &mut self.annotations_folder,
        ] {
            if folder.is_relative() {
                *folder = root.join(&*folder);
            }
        }
        self
    }
}
