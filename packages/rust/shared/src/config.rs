//! Application configuration for filmcatalog.
//!
//! User config lives at `~/.filmcatalog/filmcatalog.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{CatalogError, Result};
use crate::types::{ImageMode, SeasonRange};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "filmcatalog.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".filmcatalog";

// ---------------------------------------------------------------------------
// Config structs (matching filmcatalog.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Where season records come from and how they are ingested.
    #[serde(default)]
    pub catalog: CatalogConfig,

    /// Persistence of the loaded catalog.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Map framing.
    #[serde(default)]
    pub map: MapConfig,
}

/// `[catalog]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Directory holding `season<N>.json` files and images.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// First season index to load.
    #[serde(default = "default_first_season")]
    pub first_season: u32,

    /// Last season index to load (inclusive).
    #[serde(default = "default_last_season")]
    pub last_season: u32,

    /// Image resolution mode.
    #[serde(default)]
    pub image_mode: ImageMode,

    /// Seasons staged concurrently during a reload.
    #[serde(default = "default_resolve_concurrency")]
    pub resolve_concurrency: u32,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            first_season: default_first_season(),
            last_season: default_last_season(),
            image_mode: ImageMode::default(),
            resolve_concurrency: default_resolve_concurrency(),
        }
    }
}

fn default_data_dir() -> String {
    "data".into()
}
fn default_first_season() -> u32 {
    1
}
fn default_last_season() -> u32 {
    5
}
fn default_resolve_concurrency() -> u32 {
    4
}

/// `[storage]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Mirror each reload into the database.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Database file path (`~/` is expanded).
    #[serde(default = "default_db_path")]
    pub db_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            db_path: default_db_path(),
        }
    }
}

fn default_true() -> bool {
    true
}
fn default_db_path() -> String {
    "~/.filmcatalog/catalog.db".into()
}

/// `[map]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapConfig {
    /// Smallest span (degrees) a framed region may have on either axis.
    #[serde(default = "default_min_span")]
    pub min_span: f64,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            min_span: default_min_span(),
        }
    }
}

fn default_min_span() -> f64 {
    0.01
}

// ---------------------------------------------------------------------------
// Ingest config (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime ingest configuration, merged from config file + CLI flags.
#[derive(Debug, Clone)]
pub struct IngestConfig {
    /// Season indices to load.
    pub seasons: SeasonRange,
    /// Image resolution mode.
    pub image_mode: ImageMode,
    /// Maximum seasons staged at once.
    pub resolve_concurrency: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            seasons: SeasonRange::default(),
            image_mode: ImageMode::default(),
            resolve_concurrency: default_resolve_concurrency() as usize,
        }
    }
}

impl TryFrom<&AppConfig> for IngestConfig {
    type Error = CatalogError;

    fn try_from(config: &AppConfig) -> Result<Self> {
        Ok(Self {
            seasons: SeasonRange::new(config.catalog.first_season, config.catalog.last_season)?,
            image_mode: config.catalog.image_mode,
            resolve_concurrency: config.catalog.resolve_concurrency.max(1) as usize,
        })
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.filmcatalog/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| CatalogError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.filmcatalog/filmcatalog.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Expand a leading `~/` to the user's home directory.
pub fn expand_home(path: &str) -> Result<PathBuf> {
    match path.strip_prefix("~/") {
        Some(rest) => {
            let home = dirs::home_dir()
                .ok_or_else(|| CatalogError::config("could not determine home directory"))?;
            Ok(home.join(rest))
        }
        None => Ok(PathBuf::from(path)),
    }
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| CatalogError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| CatalogError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| CatalogError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| CatalogError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| CatalogError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}
