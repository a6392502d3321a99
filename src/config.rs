//! Configuration file handling.
//!
//! Settings come from an optional `smartspoon.toml`. Every field has a
//! default, so a missing file or a partial file is fine; command-line flags
//! override whatever is loaded here.

use crate::error::{Error, Result};
use crate::food::{ImageLimits, DEFAULT_MAX_IMAGE_DIMENSION, DEFAULT_MAX_UPLOAD_BYTES};
use crate::ingest::DEFAULT_CSV_PATH;
use crate::survey::DEFAULT_AGE_BIN_WIDTH;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Config file looked up in the working directory when none is given
pub const DEFAULT_CONFIG_FILE: &str = "smartspoon.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub ingest: IngestConfig,

    #[serde(default)]
    pub analysis: AnalysisConfig,

    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite database file.
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self { path: default_db_path() }
    }
}

fn default_db_path() -> PathBuf {
    crate::db::Database::db_path()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Survey CSV loaded by `smartspoon load` when no path is given.
    #[serde(default = "default_csv_path")]
    pub csv_path: PathBuf,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self { csv_path: default_csv_path() }
    }
}

fn default_csv_path() -> PathBuf {
    PathBuf::from(DEFAULT_CSV_PATH)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Age histogram bin width in years.
    #[serde(default = "default_age_bin_width")]
    pub age_bin_width: u32,

    /// Largest accepted food photo in bytes.
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: u64,

    /// Largest decoded image width or height in pixels.
    #[serde(default = "default_max_image_dimension")]
    pub max_image_dimension: u32,
}

impl AnalysisConfig {
    pub fn image_limits(&self) -> ImageLimits {
        ImageLimits {
            max_bytes: self.max_upload_bytes,
            max_dimension: self.max_image_dimension,
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            age_bin_width: default_age_bin_width(),
            max_upload_bytes: default_max_upload_bytes(),
            max_image_dimension: default_max_image_dimension(),
        }
    }
}

fn default_age_bin_width() -> u32 {
    DEFAULT_AGE_BIN_WIDTH
}

fn default_max_upload_bytes() -> u64 {
    DEFAULT_MAX_UPLOAD_BYTES
}

fn default_max_image_dimension() -> u32 {
    DEFAULT_MAX_IMAGE_DIMENSION
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    /// Open the API index in a browser on start.
    #[serde(default)]
    pub open_browser: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            open_browser: false,
        }
    }
}

fn default_port() -> u16 {
    3001
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read {}: {}", path.display(), e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse {}: {}", path.display(), e)))?;

        config.validate()?;
        debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    /// Load `path` if given, else `smartspoon.toml` if present, else defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load(p),
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    Self::load(default_path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.analysis.age_bin_width == 0 {
            return Err(Error::Config("analysis.age_bin_width must be at least 1".to_string()));
        }
        if self.analysis.max_upload_bytes == 0 {
            return Err(Error::Config("analysis.max_upload_bytes must be at least 1".to_string()));
        }
        if self.analysis.max_image_dimension == 0 {
            return Err(Error::Config("analysis.max_image_dimension must be at least 1".to_string()));
        }
        Ok(())
    }

    /// Default configuration as TOML, for `smartspoon config`.
    pub fn default_toml() -> String {
        toml::to_string_pretty(&Self::default()).unwrap_or_default()
    }
}
