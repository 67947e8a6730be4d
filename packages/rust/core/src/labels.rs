//! Display strings derived from the graph.

use filmcatalog_shared::Episode;

use crate::graph::{ContentGraph, LocationId};
use crate::query::{self, Scope};

/// `"Season N"` for a season-restricted scope, else `"All Seasons"`.
pub fn season_scope_label(graph: &ContentGraph, scope: Scope) -> String {
    match scope.season(graph).and_then(|id| graph.season(id)) {
        Some(season) => format!("Season {}", season.season_number),
        None => "All Seasons".to_string(),
    }
}

/// `"Episode N"` for an episode scope, else `"All Episodes"`.
pub fn episode_scope_label(graph: &ContentGraph, scope: Scope) -> String {
    match scope.episode().and_then(|id| graph.episode(id)) {
        Some(episode) => format!("Episode {}", episode.episode_number),
        None => "All Episodes".to_string(),
    }
}

/// `"Episode N: Title"`; episode number `0` shows the title alone.
pub fn episode_heading(episode: &Episode) -> String {
    if episode.is_numbered() {
        format!("Episode {}: {}", episode.episode_number, episode.title)
    } else {
        episode.title.clone()
    }
}

pub fn episode_menu_label(episode: &Episode) -> String {
    format!("Ep: {} - {}", episode.episode_number, episode.title)
}

/// `"S{season}E{episode} - {title}"`, or the bare title when a parent is missing.
pub fn location_detail_title(graph: &ContentGraph, location: LocationId) -> String {
    let Some(value) = graph.location(location) else {
        return String::new();
    };
    let episode = query::parent_episode(graph, location);
    let season = query::parent_season_of_location(graph, location);
    match (season, episode) {
        (Some((_, season)), Some((_, episode))) => format!(
            "S{}E{} - {}",
            season.season_number, episode.episode_number, value.title
        ),
        _ => value.title.clone(),
    }
}

/// `"Season S Episode E: Title"` for a location's episode, or `"Unknown Episode"`.
pub fn episode_info(graph: &ContentGraph, location: LocationId) -> String {
    let episode = query::parent_episode(graph, location);
    let season = query::parent_season_of_location(graph, location);
    match (season, episode) {
        (Some((_, season)), Some((_, episode))) => format!(
            "Season {} Episode {}: {}",
            season.season_number, episode.episode_number, episode.title
        ),
        _ => "Unknown Episode".to_string(),
    }
}

pub fn location_count_label(count: usize) -> String {
    if count == 1 {
        "1 Location".to_string()
    } else {
        format!("{count} Locations")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::tests::{episode, location, season};

    #[test]
    fn scope_labels() {
        let mut graph = ContentGraph::new();
        let s = graph.add_season(season(4));
        let e = graph.add_episode(s, episode(7, 4007)).unwrap();

        assert_eq!(season_scope_label(&graph, Scope::All), "All Seasons");
        assert_eq!(season_scope_label(&graph, Scope::Season(s)), "Season 4");
        assert_eq!(season_scope_label(&graph, Scope::Episode(e)), "Season 4");
        assert_eq!(episode_scope_label(&graph, Scope::Season(s)), "All Episodes");
        assert_eq!(episode_scope_label(&graph, Scope::Episode(e)), "Episode 7");
    }

    #[test]
    fn heading_drops_prefix_for_unnumbered_episode() {
        assert_eq!(episode_heading(&episode(3, 1003)), "Episode 3: Episode 3");
        let mut special = episode(0, 1000);
        special.title = "Pilot Movie".into();
        assert_eq!(episode_heading(&special), "Pilot Movie");
        assert_eq!(episode_menu_label(&special), "Ep: 0 - Pilot Movie");
    }

    #[test]
    fn location_labels() {
        let mut graph = ContentGraph::new();
        let s = graph.add_season(season(2));
        let e = graph.add_episode(s, episode(5, 2005)).unwrap();
        let l = graph
            .add_location(e, location("Hall of Justice", "00:00:45", 37.77, -122.41))
            .unwrap();

        assert_eq!(location_detail_title(&graph, l), "S2E5 - Hall of Justice");
        assert_eq!(episode_info(&graph, l), "Season 2 Episode 5: Episode 5");

        graph.clear_all();
        assert_eq!(episode_info(&graph, l), "Unknown Episode");
        assert_eq!(location_detail_title(&graph, l), "");
    }

    #[test]
    fn count_label_pluralizes() {
        assert_eq!(location_count_label(0), "0 Locations");
        assert_eq!(location_count_label(1), "1 Location");
        assert_eq!(location_count_label(12), "12 Locations");
    }
}
