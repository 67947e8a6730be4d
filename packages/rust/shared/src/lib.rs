//! Shared types, error model, and configuration for filmcatalog.
//!
//! This crate is the foundation depended on by all other filmcatalog crates.
//! It provides:
//! - [`CatalogError`], the unified error type
//! - Entity value types ([`Season`], [`Episode`], [`Location`], [`Coordinate`])
//! - The per-season source record schema ([`SeasonRecord`] and friends)
//! - Configuration ([`AppConfig`], [`IngestConfig`], config loading)

pub mod config;
pub mod error;
pub mod record;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, CatalogConfig, IngestConfig, MapConfig, StorageConfig, config_dir,
    config_file_path, expand_home, init_config, load_config, load_config_from,
};
pub use error::{CatalogError, Result};
pub use record::{
    CoordinateRecord, EpisodeRecord, LocationRecord, RECORD_EXTENSION, SeasonRecord,
    season_record_name,
};
pub use types::{
    Coordinate, Episode, ImageMode, Location, LocationImage, MAX_SEASON_INDEX, PLACEHOLDER_IMAGE,
    Season, SeasonRange,
};
