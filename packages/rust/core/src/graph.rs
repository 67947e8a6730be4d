//! In-memory content graph: seasons own episodes, episodes own locations.
//!
//! Entities live in three arenas. Ownership is expressed by the id lists a
//! parent keeps (`Season -> [EpisodeId]`, `Episode -> [LocationId]`); upward
//! navigation uses plain back-reference ids. Nothing holds a pointer to
//! anything else, so there is no cycle to break when the graph is cleared.
//!
//! Every id carries the epoch of the graph that minted it. [`ContentGraph::clear_all`]
//! bumps the epoch, so ids handed out before a reload resolve to nothing
//! afterwards instead of aliasing new entities.

use std::fmt;

use serde::Serialize;
use sha2::{Digest, Sha256};

use filmcatalog_shared::{CatalogError, Episode, Location, LocationImage, Result, Season};

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name {
            epoch: u32,
            slot: u32,
        }

        impl $name {
            /// Arena slot within the minting epoch.
            pub fn slot(&self) -> u32 {
                self.slot
            }

            pub fn epoch(&self) -> u32 {
                self.epoch
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, ":{}.{}"), self.epoch, self.slot)
            }
        }
    };
}

entity_id!(
    /// Handle to a [`Season`] in a [`ContentGraph`].
    SeasonId,
    "season"
);
entity_id!(
    /// Handle to an [`Episode`] in a [`ContentGraph`].
    EpisodeId,
    "episode"
);
entity_id!(
    /// Handle to a [`Location`] in a [`ContentGraph`].
    LocationId,
    "location"
);

#[derive(Debug, Clone)]
struct SeasonNode {
    value: Season,
    episodes: Vec<EpisodeId>,
}

#[derive(Debug, Clone)]
struct EpisodeNode {
    value: Episode,
    season: SeasonId,
    locations: Vec<LocationId>,
}

#[derive(Debug, Clone)]
struct LocationNode {
    value: Location,
    episode: EpisodeId,
}

/// The Season → Episode → Location entity set.
#[derive(Debug, Clone, Default)]
pub struct ContentGraph {
    epoch: u32,
    seasons: Vec<SeasonNode>,
    episodes: Vec<EpisodeNode>,
    locations: Vec<LocationNode>,
}

impl ContentGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current generation; bumped by every [`clear_all`](Self::clear_all).
    pub fn epoch(&self) -> u32 {
        self.epoch
    }

    // -----------------------------------------------------------------------
    // Mutation
    // -----------------------------------------------------------------------

    /// Insert a season with no episodes.
    pub fn add_season(&mut self, season: Season) -> SeasonId {
        let id = SeasonId {
            epoch: self.epoch,
            slot: self.seasons.len() as u32,
        };
        self.seasons.push(SeasonNode {
            value: season,
            episodes: Vec::new(),
        });
        id
    }

    /// Insert an episode owned by `season`, linking both directions.
    pub fn add_episode(&mut self, season: SeasonId, episode: Episode) -> Result<EpisodeId> {
        let slot = self.season_slot(season).ok_or_else(|| {
            CatalogError::validation(format!("cannot add episode: unknown parent {season}"))
        })?;
        let id = EpisodeId {
            epoch: self.epoch,
            slot: self.episodes.len() as u32,
        };
        self.episodes.push(EpisodeNode {
            value: episode,
            season,
            locations: Vec::new(),
        });
        self.seasons[slot].episodes.push(id);
        Ok(id)
    }

    /// Insert a location owned by `episode`, linking both directions.
    pub fn add_location(&mut self, episode: EpisodeId, location: Location) -> Result<LocationId> {
        let slot = self.episode_slot(episode).ok_or_else(|| {
            CatalogError::validation(format!("cannot add location: unknown parent {episode}"))
        })?;
        let id = LocationId {
            epoch: self.epoch,
            slot: self.locations.len() as u32,
        };
        self.locations.push(LocationNode {
            value: location,
            episode,
        });
        self.episodes[slot].locations.push(id);
        Ok(id)
    }

    /// Remove every entity. Owned arenas go first: locations, episodes, seasons.
    pub fn clear_all(&mut self) {
        if self.is_empty() {
            return;
        }
        self.locations.clear();
        self.episodes.clear();
        self.seasons.clear();
        self.epoch = self.epoch.wrapping_add(1);
    }

    // -----------------------------------------------------------------------
    // Structural accessors
    // -----------------------------------------------------------------------

    pub fn season(&self, id: SeasonId) -> Option<&Season> {
        self.season_slot(id).map(|slot| &self.seasons[slot].value)
    }

    pub fn episode(&self, id: EpisodeId) -> Option<&Episode> {
        self.episode_slot(id).map(|slot| &self.episodes[slot].value)
    }

    pub fn location(&self, id: LocationId) -> Option<&Location> {
        self.location_slot(id).map(|slot| &self.locations[slot].value)
    }

    /// Season ids in insertion order.
    pub fn season_ids(&self) -> impl Iterator<Item = SeasonId> + '_ {
        (0..self.seasons.len() as u32).map(|slot| SeasonId {
            epoch: self.epoch,
            slot,
        })
    }

    /// Episodes owned by `season`, in insertion order. Empty for unknown ids.
    pub fn episode_ids(&self, season: SeasonId) -> &[EpisodeId] {
        self.season_slot(season)
            .map(|slot| self.seasons[slot].episodes.as_slice())
            .unwrap_or_default()
    }

    /// Locations owned by `episode`, in insertion order. Empty for unknown ids.
    pub fn location_ids(&self, episode: EpisodeId) -> &[LocationId] {
        self.episode_slot(episode)
            .map(|slot| self.episodes[slot].locations.as_slice())
            .unwrap_or_default()
    }

    /// Owning season of an episode.
    pub fn season_of(&self, episode: EpisodeId) -> Option<SeasonId> {
        self.episode_slot(episode)
            .map(|slot| self.episodes[slot].season)
    }

    /// Owning episode of a location.
    pub fn episode_of(&self, location: LocationId) -> Option<EpisodeId> {
        self.location_slot(location)
            .map(|slot| self.locations[slot].episode)
    }

    pub fn season_count(&self) -> usize {
        self.seasons.len()
    }

    pub fn episode_count(&self) -> usize {
        self.episodes.len()
    }

    pub fn location_count(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seasons.is_empty() && self.episodes.is_empty() && self.locations.is_empty()
    }

    fn season_slot(&self, id: SeasonId) -> Option<usize> {
        (id.epoch == self.epoch && (id.slot as usize) < self.seasons.len())
            .then_some(id.slot as usize)
    }

    fn episode_slot(&self, id: EpisodeId) -> Option<usize> {
        (id.epoch == self.epoch && (id.slot as usize) < self.episodes.len())
            .then_some(id.slot as usize)
    }

    fn location_slot(&self, id: LocationId) -> Option<usize> {
        (id.epoch == self.epoch && (id.slot as usize) < self.locations.len())
            .then_some(id.slot as usize)
    }

    // -----------------------------------------------------------------------
    // Snapshots
    // -----------------------------------------------------------------------

    /// Value-only copy of the graph in insertion order, without ids.
    pub fn snapshot(&self) -> CatalogSnapshot {
        let seasons = self
            .seasons
            .iter()
            .map(|season| SeasonSnapshot {
                season: season.value.clone(),
                episodes: season
                    .episodes
                    .iter()
                    .map(|&episode_id| {
                        let node = &self.episodes[episode_id.slot as usize];
                        EpisodeSnapshot {
                            episode: node.value.clone(),
                            locations: node
                                .locations
                                .iter()
                                .map(|&location_id| {
                                    self.locations[location_id.slot as usize].value.clone()
                                })
                                .collect(),
                        }
                    })
                    .collect(),
            })
            .collect();
        CatalogSnapshot { seasons }
    }

    /// SHA-256 over every value in the graph, hierarchy included.
    ///
    /// Two graphs with equal [`snapshot`](Self::snapshot)s have equal fingerprints.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for season in &self.seasons {
            hasher.update(b"S");
            hasher.update(season.value.season_number.to_le_bytes());
            feed(&mut hasher, &season.value.title);
            feed(&mut hasher, &season.value.air_date);
            feed(&mut hasher, &season.value.total_episodes);
            for episode_id in &season.episodes {
                let episode = &self.episodes[episode_id.slot as usize];
                hasher.update(b"E");
                hasher.update(episode.value.episode_number.to_le_bytes());
                hasher.update(episode.value.season_episode_number.to_le_bytes());
                feed(&mut hasher, &episode.value.title);
                feed(&mut hasher, &episode.value.air_date);
                feed(&mut hasher, &episode.value.description);
                feed(&mut hasher, &episode.value.guest_stars);
                for location_id in &episode.locations {
                    let location = &self.locations[location_id.slot as usize].value;
                    hasher.update(b"L");
                    feed(&mut hasher, &location.title);
                    feed(&mut hasher, &location.info);
                    feed(&mut hasher, &location.time_code);
                    hasher.update(location.coordinate.latitude.to_bits().to_le_bytes());
                    hasher.update(location.coordinate.longitude.to_bits().to_le_bytes());
                    match &location.image {
                        LocationImage::Embedded { filename, bytes } => {
                            hasher.update(b"e");
                            feed(&mut hasher, filename);
                            hasher.update((bytes.len() as u64).to_le_bytes());
                            hasher.update(bytes);
                        }
                        LocationImage::Reference(reference) => {
                            hasher.update(b"r");
                            feed(&mut hasher, reference);
                        }
                        LocationImage::Placeholder => hasher.update(b"p"),
                    }
                }
            }
        }
        format!("{:x}", hasher.finalize())
    }
}

/// Length-prefixed so adjacent fields cannot run together.
fn feed(hasher: &mut Sha256, value: &str) {
    hasher.update((value.len() as u64).to_le_bytes());
    hasher.update(value.as_bytes());
}

/// Value-only view of a whole graph.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatalogSnapshot {
    pub seasons: Vec<SeasonSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeasonSnapshot {
    pub season: Season,
    pub episodes: Vec<EpisodeSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EpisodeSnapshot {
    pub episode: Episode,
    pub locations: Vec<Location>,
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use filmcatalog_shared::Coordinate;

    pub(crate) fn season(number: u32) -> Season {
        Season {
            air_date: format!("197{number}"),
            title: format!("Season {number}"),
            total_episodes: "24".into(),
            season_number: number,
        }
    }

    pub(crate) fn episode(number: u32, banded: u32) -> Episode {
        Episode {
            air_date: "September 16, 1972".into(),
            description: String::new(),
            guest_stars: String::new(),
            episode_number: number,
            title: format!("Episode {number}"),
            season_episode_number: banded,
        }
    }

    pub(crate) fn location(title: &str, time_code: &str, lat: f64, lon: f64) -> Location {
        Location {
            info: String::new(),
            coordinate: Coordinate::new(lat, lon),
            image: LocationImage::Placeholder,
            title: title.into(),
            time_code: time_code.into(),
        }
    }

    #[test]
    fn links_both_directions() {
        let mut graph = ContentGraph::new();
        let s = graph.add_season(season(1));
        let e = graph.add_episode(s, episode(1, 1001)).expect("add episode");
        let l = graph
            .add_location(e, location("Coit Tower", "00:01:00", 37.80, -122.40))
            .expect("add location");

        assert_eq!(graph.episode_ids(s), &[e]);
        assert_eq!(graph.location_ids(e), &[l]);
        assert_eq!(graph.season_of(e), Some(s));
        assert_eq!(graph.episode_of(l), Some(e));
        assert_eq!(graph.location(l).map(|l| l.title.as_str()), Some("Coit Tower"));
    }

    #[test]
    fn rejects_unknown_parent() {
        let mut graph = ContentGraph::new();
        let s = graph.add_season(season(1));
        graph.clear_all();
        assert!(graph.add_episode(s, episode(1, 1001)).is_err());
        assert!(graph.is_empty());
    }

    #[test]
    fn clear_all_cascades_and_invalidates_ids() {
        let mut graph = ContentGraph::new();
        let s = graph.add_season(season(1));
        let e = graph.add_episode(s, episode(1, 1001)).unwrap();
        let l = graph
            .add_location(e, location("Lombard Street", "00:02:00", 37.80, -122.42))
            .unwrap();

        graph.clear_all();
        assert!(graph.is_empty());
        assert_eq!(graph.season_count(), 0);
        assert_eq!(graph.episode_count(), 0);
        assert_eq!(graph.location_count(), 0);
        assert!(graph.season(s).is_none());
        assert!(graph.episode_of(l).is_none());

        // Slot 0 is reused but the stale id does not alias it.
        let fresh = graph.add_season(season(2));
        assert_eq!(fresh.slot(), s.slot());
        assert!(graph.season(s).is_none());
        assert_eq!(graph.season(fresh).map(|s| s.season_number), Some(2));
    }

    #[test]
    fn clear_all_on_empty_graph_is_noop() {
        let mut graph = ContentGraph::new();
        graph.clear_all();
        assert!(graph.is_empty());
        assert_eq!(graph.epoch(), 0);
    }

    #[test]
    fn snapshot_ignores_ids() {
        let build = |graph: &mut ContentGraph| {
            let s = graph.add_season(season(3));
            let e = graph.add_episode(s, episode(2, 3002)).unwrap();
            graph
                .add_location(e, location("Ferry Building", "00:10:00", 37.79, -122.39))
                .unwrap();
        };

        let mut first = ContentGraph::new();
        build(&mut first);

        let mut second = ContentGraph::new();
        build(&mut second);
        second.clear_all();
        build(&mut second);

        assert_ne!(first.epoch(), second.epoch());
        assert_eq!(first.snapshot(), second.snapshot());
        assert_eq!(first.fingerprint(), second.fingerprint());
    }

    #[test]
    fn fingerprint_tracks_values() {
        let mut graph = ContentGraph::new();
        let s = graph.add_season(season(1));
        let e = graph.add_episode(s, episode(1, 1001)).unwrap();
        let before = graph.fingerprint();
        graph
            .add_location(e, location("Alcatraz", "00:20:00", 37.83, -122.42))
            .unwrap();
        assert_ne!(before, graph.fingerprint());
        assert_eq!(before.len(), 64);
    }

    #[test]
    fn id_display_includes_epoch() {
        let mut graph = ContentGraph::new();
        graph.add_season(season(1));
        graph.clear_all();
        let s = graph.add_season(season(1));
        assert_eq!(s.to_string(), "season:1.0");
    }
}
