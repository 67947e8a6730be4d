//! Read-only views over a [`ContentGraph`]: listings, scopes, parents, categories.
//!
//! Nothing here mutates the graph or caches results. Unknown or stale ids
//! produce empty listings and `None` lookups, never errors.

use std::fmt;

use serde::Serialize;

use filmcatalog_shared::{Episode, Location, Season};

use crate::graph::{ContentGraph, EpisodeId, LocationId, SeasonId};

// ---------------------------------------------------------------------------
// Listings
// ---------------------------------------------------------------------------

/// All seasons, ascending by season number.
pub fn list_seasons(graph: &ContentGraph) -> Vec<(SeasonId, &Season)> {
    let mut seasons: Vec<_> = graph
        .season_ids()
        .filter_map(|id| graph.season(id).map(|season| (id, season)))
        .collect();
    seasons.sort_by_key(|(_, season)| season.season_number);
    seasons
}

/// A season's episodes, ascending by episode number.
///
/// The sort is stable, so equal numbers keep source order.
pub fn list_episodes(graph: &ContentGraph, season: SeasonId) -> Vec<(EpisodeId, &Episode)> {
    let mut episodes = episodes_in_source_order(graph, season);
    episodes.sort_by_key(|(_, episode)| episode.episode_number);
    episodes
}

/// An episode's locations, ascending by time-code compared as plain strings.
///
/// `"00:10:00"` sorts before `"00:2:00"`; codes are expected zero-padded.
pub fn list_locations(graph: &ContentGraph, episode: EpisodeId) -> Vec<(LocationId, &Location)> {
    let mut locations: Vec<_> = graph
        .location_ids(episode)
        .iter()
        .filter_map(|&id| graph.location(id).map(|location| (id, location)))
        .collect();
    locations.sort_by(|(_, a), (_, b)| a.time_code.cmp(&b.time_code));
    locations
}

fn episodes_in_source_order(graph: &ContentGraph, season: SeasonId) -> Vec<(EpisodeId, &Episode)> {
    graph
        .episode_ids(season)
        .iter()
        .filter_map(|&id| graph.episode(id).map(|episode| (id, episode)))
        .collect()
}

// ---------------------------------------------------------------------------
// Scopes
// ---------------------------------------------------------------------------

/// Which part of the catalog a view covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Scope {
    #[default]
    All,
    Season(SeasonId),
    Episode(EpisodeId),
}

impl Scope {
    /// The season this scope is restricted to, if any.
    pub fn season(&self, graph: &ContentGraph) -> Option<SeasonId> {
        match *self {
            Self::All => None,
            Self::Season(season) => Some(season),
            Self::Episode(episode) => graph.season_of(episode),
        }
    }

    /// The episode this scope is restricted to, if any.
    pub fn episode(&self) -> Option<EpisodeId> {
        match *self {
            Self::Episode(episode) => Some(episode),
            _ => None,
        }
    }
}

/// Every location in `scope`.
///
/// Seasons follow [`list_seasons`], episodes keep source order, and each
/// episode contributes its [`list_locations`] result. Groups are concatenated,
/// never re-sorted against each other.
pub fn flatten_locations(graph: &ContentGraph, scope: Scope) -> Vec<(LocationId, &Location)> {
    match scope {
        Scope::Episode(episode) => list_locations(graph, episode),
        Scope::Season(season) => season_locations(graph, season),
        Scope::All => list_seasons(graph)
            .into_iter()
            .flat_map(|(season, _)| season_locations(graph, season))
            .collect(),
    }
}

fn season_locations(graph: &ContentGraph, season: SeasonId) -> Vec<(LocationId, &Location)> {
    graph
        .episode_ids(season)
        .iter()
        .flat_map(|&episode| list_locations(graph, episode))
        .collect()
}

// ---------------------------------------------------------------------------
// Parents
// ---------------------------------------------------------------------------

pub fn parent_episode(graph: &ContentGraph, location: LocationId) -> Option<(EpisodeId, &Episode)> {
    let id = graph.episode_of(location)?;
    graph.episode(id).map(|episode| (id, episode))
}

pub fn parent_season(graph: &ContentGraph, episode: EpisodeId) -> Option<(SeasonId, &Season)> {
    let id = graph.season_of(episode)?;
    graph.season(id).map(|season| (id, season))
}

/// Two hops: location → episode → season.
pub fn parent_season_of_location(
    graph: &ContentGraph,
    location: LocationId,
) -> Option<(SeasonId, &Season)> {
    let (episode, _) = parent_episode(graph, location)?;
    parent_season(graph, episode)
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// Presentation category (color key) of a season or episode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    #[serde(rename = "season-1")]
    Season1,
    #[serde(rename = "season-2")]
    Season2,
    #[serde(rename = "season-3")]
    Season3,
    #[serde(rename = "season-4")]
    Season4,
    #[serde(rename = "season-5")]
    Season5,
    Unclassified,
}

/// Width of each season's band of season-scoped episode numbers.
const BAND_WIDTH: u32 = 50;

impl Category {
    pub const ALL: [Category; 6] = [
        Self::Season1,
        Self::Season2,
        Self::Season3,
        Self::Season4,
        Self::Season5,
        Self::Unclassified,
    ];

    pub fn token(&self) -> &'static str {
        match self {
            Self::Season1 => "season-1",
            Self::Season2 => "season-2",
            Self::Season3 => "season-3",
            Self::Season4 => "season-4",
            Self::Season5 => "season-5",
            Self::Unclassified => "unclassified",
        }
    }

    fn from_season_number(number: u32) -> Self {
        match number {
            1 => Self::Season1,
            2 => Self::Season2,
            3 => Self::Season3,
            4 => Self::Season4,
            5 => Self::Season5,
            _ => Self::Unclassified,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

pub fn classify_season(season: &Season) -> Category {
    Category::from_season_number(season.season_number)
}

/// Bands: 1000–1050 → season 1, …, 5000–5050 → season 5, inclusive.
pub fn classify_episode(episode: &Episode) -> Category {
    let banded = episode.season_episode_number;
    let band = banded / 1000;
    if (1..=5).contains(&band) && banded % 1000 <= BAND_WIDTH {
        Category::from_season_number(band)
    } else {
        Category::Unclassified
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::tests::{episode, location, season};

    fn sample_graph() -> (ContentGraph, SeasonId, SeasonId, Vec<EpisodeId>) {
        let mut graph = ContentGraph::new();
        // Inserted out of order on purpose.
        let s2 = graph.add_season(season(2));
        let s1 = graph.add_season(season(1));

        let e12 = graph.add_episode(s1, episode(2, 1002)).unwrap();
        let e11 = graph.add_episode(s1, episode(1, 1001)).unwrap();
        let e21 = graph.add_episode(s2, episode(1, 2001)).unwrap();

        graph.add_location(e11, location("b", "00:05:00", 37.0, -122.0)).unwrap();
        graph.add_location(e11, location("a", "00:01:00", 37.1, -122.1)).unwrap();
        graph.add_location(e12, location("c", "00:03:00", 37.2, -122.2)).unwrap();
        graph.add_location(e21, location("d", "00:00:30", 37.3, -122.3)).unwrap();

        (graph, s1, s2, vec![e11, e12, e21])
    }

    fn titles(locations: &[(LocationId, &Location)]) -> Vec<String> {
        locations.iter().map(|(_, l)| l.title.clone()).collect()
    }

    #[test]
    fn seasons_sorted_by_number() {
        let (graph, s1, s2, _) = sample_graph();
        let ids: Vec<_> = list_seasons(&graph).into_iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec![s1, s2]);
    }

    #[test]
    fn episodes_sorted_by_number() {
        let (graph, s1, _, episodes) = sample_graph();
        let ids: Vec<_> = list_episodes(&graph, s1).into_iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec![episodes[0], episodes[1]]);
    }

    #[test]
    fn locations_sort_lexically_not_numerically() {
        let mut graph = ContentGraph::new();
        let s = graph.add_season(season(1));
        let e = graph.add_episode(s, episode(1, 1001)).unwrap();
        for code in ["10:00", "2:00", "09:00"] {
            graph.add_location(e, location(code, code, 37.0, -122.0)).unwrap();
        }

        let codes: Vec<_> = list_locations(&graph, e)
            .into_iter()
            .map(|(_, l)| l.time_code.clone())
            .collect();
        assert_eq!(codes, vec!["09:00", "10:00", "2:00"]);
    }

    #[test]
    fn location_sort_is_stable_for_equal_codes() {
        let mut graph = ContentGraph::new();
        let s = graph.add_season(season(1));
        let e = graph.add_episode(s, episode(1, 1001)).unwrap();
        graph.add_location(e, location("first", "00:01:00", 37.0, -122.0)).unwrap();
        graph.add_location(e, location("second", "00:01:00", 37.0, -122.0)).unwrap();
        assert_eq!(titles(&list_locations(&graph, e)), vec!["first", "second"]);
    }

    #[test]
    fn flatten_concatenates_groups_without_resorting() {
        let (graph, s1, _, episodes) = sample_graph();

        // Season 1: episodes in source order (ep 2 was inserted first).
        assert_eq!(titles(&flatten_locations(&graph, Scope::Season(s1))), vec!["c", "a", "b"]);
        assert_eq!(
            titles(&flatten_locations(&graph, Scope::Episode(episodes[0]))),
            vec!["a", "b"]
        );
        // All: season 1 before season 2 even though season 2 was inserted first.
        assert_eq!(
            titles(&flatten_locations(&graph, Scope::All)),
            vec!["c", "a", "b", "d"]
        );
    }

    #[test]
    fn parents_round_trip() {
        let (graph, s1, _, episodes) = sample_graph();
        for (location_id, _) in flatten_locations(&graph, Scope::All) {
            let (episode_id, _) = parent_episode(&graph, location_id).expect("episode parent");
            let (season_id, _) =
                parent_season_of_location(&graph, location_id).expect("season parent");
            assert!(list_episodes(&graph, season_id).iter().any(|(id, _)| *id == episode_id));
            assert!(
                list_locations(&graph, episode_id)
                    .iter()
                    .any(|(id, _)| *id == location_id)
            );
        }
        assert_eq!(parent_season(&graph, episodes[0]).map(|(id, _)| id), Some(s1));
    }

    #[test]
    fn stale_ids_yield_nothing() {
        let (mut graph, s1, _, episodes) = sample_graph();
        let location = graph.location_ids(episodes[0])[0];
        graph.clear_all();

        assert!(list_episodes(&graph, s1).is_empty());
        assert!(flatten_locations(&graph, Scope::Season(s1)).is_empty());
        assert!(flatten_locations(&graph, Scope::All).is_empty());
        assert!(parent_episode(&graph, location).is_none());
        assert!(parent_season_of_location(&graph, location).is_none());
    }

    #[test]
    fn classify_by_season_number() {
        assert_eq!(classify_season(&season(1)), Category::Season1);
        assert_eq!(classify_season(&season(5)), Category::Season5);
        assert_eq!(classify_season(&season(6)), Category::Unclassified);
        assert_eq!(classify_season(&season(0)), Category::Unclassified);
    }

    #[test]
    fn classify_by_episode_band() {
        assert_eq!(classify_episode(&episode(1, 3042)).token(), "season-3");
        assert_eq!(classify_episode(&episode(1, 9999)), Category::Unclassified);
        assert_eq!(classify_episode(&episode(1, 1000)), Category::Season1);
        assert_eq!(classify_episode(&episode(1, 5050)), Category::Season5);
        assert_eq!(classify_episode(&episode(1, 2051)), Category::Unclassified);
        assert_eq!(classify_episode(&episode(1, 999)), Category::Unclassified);
        assert_eq!(classify_episode(&episode(1, 6001)), Category::Unclassified);
    }

    #[test]
    fn scope_resolves_season() {
        let (graph, s1, _, episodes) = sample_graph();
        assert_eq!(Scope::Episode(episodes[0]).season(&graph), Some(s1));
        assert_eq!(Scope::All.season(&graph), None);
        assert_eq!(Scope::Season(s1).episode(), None);
    }
}
