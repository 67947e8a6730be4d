//! Source record schema: the JSON shape of one bundled season file.
//!
//! Field names follow the bundled files (`camelCase`). Every field is required
//! except an episode's `locations` array, which defaults to empty.

use serde::{Deserialize, Serialize};

use crate::error::{CatalogError, Result};
use crate::types::{Coordinate, Episode, Season};

/// Extension of the season record files.
pub const RECORD_EXTENSION: &str = "json";

/// Resource base name of the record for season index `n` (`season<N>`).
pub fn season_record_name(n: u32) -> String {
    format!("season{n}")
}

/// Top-level record of a season file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeasonRecord {
    pub season_number: u32,
    pub season_air_date: String,
    pub title: String,
    pub total_episodes: String,
    pub episodes: Vec<EpisodeRecord>,
}

/// One entry of a season's `episodes` array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EpisodeRecord {
    pub episode_number: u32,
    pub episode_title: String,
    pub episode_air_date: String,
    pub episode_description: String,
    pub episode_guest_stars: String,
    pub season_episode_number: u32,
    #[serde(default)]
    pub locations: Vec<LocationRecord>,
}

/// One entry of an episode's `locations` array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationRecord {
    pub location_title: String,
    pub location_info: String,
    pub time_code: String,
    pub filming_location: CoordinateRecord,
    pub image_filename: String,
}

/// `filmingLocation` object.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CoordinateRecord {
    pub latitude: f64,
    pub longitude: f64,
}

impl SeasonRecord {
    /// Decode a season record; `resource` names the file in error messages.
    pub fn from_json(resource: &str, bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(|e| CatalogError::decode(resource, e.to_string()))
    }

    /// Build the normalized season value.
    pub fn to_season(&self) -> Season {
        Season {
            air_date: self.season_air_date.trim().to_string(),
            title: self.title.trim().to_string(),
            total_episodes: self.total_episodes.trim().to_string(),
            season_number: self.season_number,
        }
    }

    /// Total location records across all episodes.
    pub fn location_count(&self) -> usize {
        self.episodes.iter().map(|e| e.locations.len()).sum()
    }
}

impl EpisodeRecord {
    /// Build the normalized episode value.
    pub fn to_episode(&self) -> Episode {
        Episode {
            air_date: self.episode_air_date.trim().to_string(),
            description: self.episode_description.trim().to_string(),
            guest_stars: self.episode_guest_stars.trim().to_string(),
            episode_number: self.episode_number,
            title: self.episode_title.trim().to_string(),
            season_episode_number: self.season_episode_number,
        }
    }
}

impl LocationRecord {
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(
            self.filming_location.latitude,
            self.filming_location.longitude,
        )
    }

    /// Validate the parts of a location the schema cannot express.
    pub fn validate(&self) -> Result<()> {
        let coordinate = self.coordinate();
        if !coordinate.is_valid() {
            return Err(CatalogError::validation(format!(
                "location '{}' has out-of-range coordinate {coordinate}",
                self.location_title.trim()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEASON_JSON: &str = r#"{
        "seasonNumber": 2,
        "seasonAirDate": " 1973-1974 ",
        "title": "Season Two",
        "totalEpisodes": "23",
        "episodes": [
            {
                "episodeNumber": 1,
                "episodeTitle": "The Stamp Collector",
                "episodeAirDate": "September 13, 1973",
                "episodeDescription": "A killer targets women.",
                "episodeGuestStars": "Ed Nelson",
                "seasonEpisodeNumber": 2001,
                "locations": [
                    {
                        "locationTitle": "Coit Tower",
                        "locationInfo": "Telegraph Hill",
                        "timeCode": "00:04:12",
                        "filmingLocation": { "latitude": 37.8024, "longitude": -122.4058 },
                        "imageFilename": "coit-tower.jpg"
                    }
                ]
            },
            {
                "episodeNumber": 2,
                "episodeTitle": "Harem",
                "episodeAirDate": "September 20, 1973",
                "episodeDescription": "",
                "episodeGuestStars": "",
                "seasonEpisodeNumber": 2002
            }
        ]
    }"#;

    #[test]
    fn decodes_nested_record() {
        let record = SeasonRecord::from_json("season2.json", SEASON_JSON.as_bytes())
            .expect("decode season record");
        assert_eq!(record.season_number, 2);
        assert_eq!(record.episodes.len(), 2);
        assert_eq!(record.location_count(), 1);
        assert_eq!(record.episodes[0].locations[0].location_title, "Coit Tower");
    }

    #[test]
    fn missing_locations_defaults_to_empty() {
        let record = SeasonRecord::from_json("season2.json", SEASON_JSON.as_bytes())
            .expect("decode season record");
        assert!(record.episodes[1].locations.is_empty());
    }

    #[test]
    fn normalization_trims_labels() {
        let record = SeasonRecord::from_json("season2.json", SEASON_JSON.as_bytes())
            .expect("decode season record");
        let season = record.to_season();
        assert_eq!(season.air_date, "1973-1974");
        assert_eq!(season.total_episodes, "23");
    }

    #[test]
    fn missing_required_field_is_decode_error() {
        let err = SeasonRecord::from_json("season4.json", br#"{"seasonNumber": 4}"#)
            .expect_err("incomplete record must fail");
        let msg = err.to_string();
        assert!(msg.starts_with("decode error in season4.json"), "{msg}");
    }

    #[test]
    fn out_of_range_coordinate_fails_validation() {
        let record = LocationRecord {
            location_title: "Nowhere".into(),
            location_info: String::new(),
            time_code: "00:00:01".into(),
            filming_location: CoordinateRecord {
                latitude: 137.0,
                longitude: -122.0,
            },
            image_filename: String::new(),
        };
        assert!(record.validate().is_err());
    }

    #[test]
    fn record_names_follow_season_index() {
        assert_eq!(season_record_name(3), "season3");
    }
}
