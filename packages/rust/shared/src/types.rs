//! Core domain value types for the filming catalog.
//!
//! These are the attribute payloads of the content graph entities. Identity
//! and relationships live in the graph itself (`filmcatalog-core`); the types
//! here carry only values, so they compare and serialize by value.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{CatalogError, Result};

/// Image identifier presented whenever a location's image cannot be resolved.
pub const PLACEHOLDER_IMAGE: &str = "sosf-1.jpg";

// ---------------------------------------------------------------------------
// Coordinate
// ---------------------------------------------------------------------------

/// A geographic coordinate in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Whether both axes are finite and inside the WGS84 ranges.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.6}, {:.6})", self.latitude, self.longitude)
    }
}

// ---------------------------------------------------------------------------
// Entities
// ---------------------------------------------------------------------------

/// One season of the show.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Season {
    pub air_date: String,
    pub title: String,
    /// Kept as the source's label; not guaranteed to be numeric.
    pub total_episodes: String,
    pub season_number: u32,
}

/// One episode within a season.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Episode {
    pub air_date: String,
    pub description: String,
    pub guest_stars: String,
    /// `0` means the episode has no number (suppresses the "Episode N:" prefix).
    pub episode_number: u32,
    pub title: String,
    /// Banded number (1000s for season 1, 2000s for season 2, ...).
    pub season_episode_number: u32,
}

impl Episode {
    /// Whether this episode carries a display number.
    pub fn is_numbered(&self) -> bool {
        self.episode_number != 0
    }
}

/// A filming location seen in an episode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub info: String,
    pub coordinate: Coordinate,
    pub image: LocationImage,
    pub title: String,
    /// Zero-padded by convention and compared lexically.
    pub time_code: String,
}

// ---------------------------------------------------------------------------
// LocationImage
// ---------------------------------------------------------------------------

/// The image attached to a location.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum LocationImage {
    /// Bytes resolved from the asset store.
    Embedded { filename: String, bytes: Vec<u8> },
    /// A filename or URL handed through to presentation.
    Reference(String),
    /// Resolution failed.
    Placeholder,
}

impl LocationImage {
    /// The identifier presentation uses to pick an image.
    pub fn identifier(&self) -> &str {
        match self {
            Self::Embedded { filename, .. } => filename,
            Self::Reference(reference) => reference,
            Self::Placeholder => PLACEHOLDER_IMAGE,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self, Self::Placeholder)
    }

    /// Embedded payload, if any.
    pub fn bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Embedded { bytes, .. } => Some(bytes),
            _ => None,
        }
    }
}

// Payloads can be large; keep debug output readable.
impl fmt::Debug for LocationImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Embedded { filename, bytes } => f
                .debug_struct("Embedded")
                .field("filename", filename)
                .field("len", &bytes.len())
                .finish(),
            Self::Reference(reference) => f.debug_tuple("Reference").field(reference).finish(),
            Self::Placeholder => f.write_str("Placeholder"),
        }
    }
}

// ---------------------------------------------------------------------------
// ImageMode
// ---------------------------------------------------------------------------

/// How location images are resolved during ingestion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageMode {
    /// Load the image bytes from the asset store.
    #[default]
    Embedded,
    /// Carry the filename or URL forward for presentation to fetch.
    Referenced,
}

impl fmt::Display for ImageMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Embedded => write!(f, "embedded"),
            Self::Referenced => write!(f, "referenced"),
        }
    }
}

impl FromStr for ImageMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "embedded" => Ok(Self::Embedded),
            "referenced" => Ok(Self::Referenced),
            other => Err(format!(
                "unknown image mode '{other}': expected 'embedded' or 'referenced'"
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// SeasonRange
// ---------------------------------------------------------------------------

/// Highest season index a [`SeasonRange`] may name.
pub const MAX_SEASON_INDEX: u32 = u16::MAX as u32;

/// Inclusive range of season indices to ingest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SeasonRange {
    first: u32,
    last: u32,
}

impl SeasonRange {
    pub fn new(first: u32, last: u32) -> Result<Self> {
        if first > last {
            return Err(CatalogError::config(format!(
                "season range {first}..={last} is empty: first season must not exceed last"
            )));
        }
        if last > MAX_SEASON_INDEX {
            return Err(CatalogError::config(format!(
                "season range {first}..={last} exceeds the highest season index {MAX_SEASON_INDEX}"
            )));
        }
        Ok(Self { first, last })
    }

    pub fn first(&self) -> u32 {
        self.first
    }

    pub fn last(&self) -> u32 {
        self.last
    }

    pub fn len(&self) -> usize {
        (self.last - self.first) as usize + 1
    }

    // A validated range always holds at least one index.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Season indices in ascending order.
    pub fn iter(&self) -> std::ops::RangeInclusive<u32> {
        self.first..=self.last
    }
}

impl Default for SeasonRange {
    fn default() -> Self {
        Self { first: 1, last: 5 }
    }
}

impl fmt::Display for SeasonRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..={}", self.first, self.last)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coordinate_validation() {
        assert!(Coordinate::new(37.7749, -122.4194).is_valid());
        assert!(Coordinate::new(90.0, 180.0).is_valid());
        assert!(!Coordinate::new(91.0, 0.0).is_valid());
        assert!(!Coordinate::new(0.0, -180.5).is_valid());
        assert!(!Coordinate::new(f64::NAN, 0.0).is_valid());
    }

    #[test]
    fn image_identifier_falls_back_to_placeholder() {
        assert_eq!(LocationImage::Placeholder.identifier(), PLACEHOLDER_IMAGE);
        assert_eq!(
            LocationImage::Reference("https://img.example.com/a.jpg".into()).identifier(),
            "https://img.example.com/a.jpg"
        );
        let embedded = LocationImage::Embedded {
            filename: "coit.jpg".into(),
            bytes: vec![1, 2, 3],
        };
        assert_eq!(embedded.identifier(), "coit.jpg");
        assert_eq!(embedded.bytes(), Some(&[1u8, 2, 3][..]));
        assert!(format!("{embedded:?}").contains("len: 3"));
    }

    #[test]
    fn image_mode_parses_case_insensitively() {
        assert_eq!("Embedded".parse::<ImageMode>(), Ok(ImageMode::Embedded));
        assert_eq!("referenced".parse::<ImageMode>(), Ok(ImageMode::Referenced));
        assert!("remote".parse::<ImageMode>().is_err());
    }

    #[test]
    fn season_range_bounds() {
        let range = SeasonRange::default();
        assert_eq!(range.iter().collect::<Vec<_>>(), vec![1, 2, 3, 4, 5]);
        assert_eq!(range.len(), 5);

        let single = SeasonRange::new(3, 3).expect("single season range");
        assert_eq!(single.iter().collect::<Vec<_>>(), vec![3]);

        assert!(SeasonRange::new(4, 2).is_err());
        assert!(SeasonRange::new(1, 4_000_000_000).is_err());
        let widest = SeasonRange::new(1, MAX_SEASON_INDEX).expect("widest range");
        assert_eq!(widest.len(), MAX_SEASON_INDEX as usize);
    }

    #[test]
    fn unnumbered_episode_sentinel() {
        let episode = Episode {
            air_date: "September 16, 1972".into(),
            description: String::new(),
            guest_stars: String::new(),
            episode_number: 0,
            title: "Pilot".into(),
            season_episode_number: 1000,
        };
        assert!(!episode.is_numbered());
    }
}
