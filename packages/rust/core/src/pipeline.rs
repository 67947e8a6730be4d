//! Whole-catalog reload: season records → staged seasons → content graph → store.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{RwLock, Semaphore};
use tracing::{debug, info, instrument, warn};
use url::Url;

use filmcatalog_shared::{
    CatalogError, Episode, ImageMode, IngestConfig, Location, LocationImage, RECORD_EXTENSION, Season,
    SeasonRange, SeasonRecord, season_record_name,
};
use filmcatalog_storage::{CatalogStore, EntityKind, EntityRecord};

use crate::assets::{AssetStore, split_filename};
use crate::graph::{ContentGraph, SeasonId};

/// Handle hosts share between the pipeline (writer) and readers.
pub type SharedCatalog = Arc<RwLock<ContentGraph>>;

/// An empty catalog ready for its first reload.
pub fn shared_catalog() -> SharedCatalog {
    Arc::new(RwLock::new(ContentGraph::new()))
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

/// Where in a reload an issue came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IngestStage {
    Clear,
    Resolve,
    Decode,
    Validate,
    Persist,
    Commit,
}

impl IngestStage {
    fn is_storage(&self) -> bool {
        matches!(self, Self::Clear | Self::Persist | Self::Commit)
    }
}

/// A recoverable problem met during a reload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngestIssue {
    /// Season index (file number) the issue belongs to, if any.
    pub season: Option<u32>,
    pub stage: IngestStage,
    pub message: String,
}

impl IngestIssue {
    fn new(season: Option<u32>, stage: IngestStage, message: impl Into<String>) -> Self {
        Self {
            season,
            stage,
            message: message.into(),
        }
    }
}

/// Outcome of one [`reload`].
#[derive(Debug, Clone, Serialize)]
pub struct ReloadReport {
    pub started_at: DateTime<Utc>,
    pub range: SeasonRange,
    pub seasons: usize,
    pub episodes: usize,
    pub locations: usize,
    /// Locations whose image fell back to the placeholder.
    pub placeholder_images: usize,
    pub issues: Vec<IngestIssue>,
    /// The pass reached a durable store without storage issues.
    pub persisted: bool,
    #[serde(rename = "elapsed_ms", serialize_with = "serialize_millis")]
    pub elapsed: Duration,
    pub fingerprint: String,
}

impl ReloadReport {
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    /// Message of the most recent issue.
    pub fn last_error(&self) -> Option<&str> {
        self.issues.last().map(|issue| issue.message.as_str())
    }

    /// Compact summary stored with the ingest run.
    pub fn stats(&self) -> serde_json::Value {
        serde_json::json!({
            "status": if self.is_clean() { "completed" } else { "completed_with_issues" },
            "seasons": self.seasons,
            "episodes": self.episodes,
            "locations": self.locations,
            "placeholder_images": self.placeholder_images,
            "issues": self.issues.len(),
            "persisted": self.persisted,
            "elapsed_ms": self.elapsed.as_millis() as u64,
            "fingerprint": self.fingerprint,
        })
    }
}

fn serialize_millis<S: serde::Serializer>(
    elapsed: &Duration,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_u64(elapsed.as_millis() as u64)
}

/// Progress callback for reporting reload status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called when a season index finishes staging (loaded or skipped).
    fn season_staged(&self, number: u32, current: usize, total: usize);
    /// Called once when the reload completes.
    fn done(&self, report: &ReloadReport);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn season_staged(&self, _number: u32, _current: usize, _total: usize) {}
    fn done(&self, _report: &ReloadReport) {}
}

// ---------------------------------------------------------------------------
// Staging
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct StagedSeason {
    season: Season,
    episodes: Vec<StagedEpisode>,
}

#[derive(Debug)]
struct StagedEpisode {
    episode: Episode,
    locations: Vec<Location>,
}

/// Everything one season index produced before touching the graph.
#[derive(Debug)]
struct Staged {
    index: u32,
    season: Option<StagedSeason>,
    issues: Vec<IngestIssue>,
}

impl Staged {
    fn skipped(index: u32, issue: IngestIssue) -> Self {
        Self {
            index,
            season: None,
            issues: vec![issue],
        }
    }
}

/// Resolve, decode, validate and resolve images for season index `index`.
fn stage_season(assets: &dyn AssetStore, index: u32, mode: ImageMode) -> Staged {
    let name = season_record_name(index);
    let resource = format!("{name}.{RECORD_EXTENSION}");

    let Some(bytes) = assets.resolve(&name, RECORD_EXTENSION) else {
        warn!(season = index, %resource, "season record not found, skipping");
        return Staged::skipped(
            index,
            IngestIssue::new(
                Some(index),
                IngestStage::Resolve,
                CatalogError::not_found(&resource).to_string(),
            ),
        );
    };

    let record = match SeasonRecord::from_json(&resource, &bytes) {
        Ok(record) => record,
        Err(e) => {
            warn!(season = index, error = %e, "season record failed to decode, skipping");
            return Staged::skipped(
                index,
                IngestIssue::new(Some(index), IngestStage::Decode, e.to_string()),
            );
        }
    };

    if record.season_number != index {
        warn!(
            file_index = index,
            declared = record.season_number,
            "season number differs from file index; using declared number"
        );
    }

    let mut issues = Vec::new();
    let episodes = record
        .episodes
        .iter()
        .map(|episode_record| {
            let locations = episode_record
                .locations
                .iter()
                .filter_map(|location_record| {
                    if let Err(e) = location_record.validate() {
                        warn!(season = index, error = %e, "skipping invalid location");
                        issues.push(IngestIssue::new(
                            Some(index),
                            IngestStage::Validate,
                            e.to_string(),
                        ));
                        return None;
                    }
                    Some(Location {
                        info: location_record.location_info.trim().to_string(),
                        coordinate: location_record.coordinate(),
                        image: resolve_image(assets, &location_record.image_filename, mode),
                        title: location_record.location_title.trim().to_string(),
                        time_code: location_record.time_code.trim().to_string(),
                    })
                })
                .collect();
            StagedEpisode {
                episode: episode_record.to_episode(),
                locations,
            }
        })
        .collect();

    debug!(
        season = index,
        episodes = record.episodes.len(),
        locations = record.location_count(),
        "season staged"
    );

    Staged {
        index,
        season: Some(StagedSeason {
            season: record.to_season(),
            episodes,
        }),
        issues,
    }
}

/// Turn a record's image filename into a [`LocationImage`].
///
/// Never fails: anything unresolvable becomes [`LocationImage::Placeholder`].
pub fn resolve_image(assets: &dyn AssetStore, filename: &str, mode: ImageMode) -> LocationImage {
    let filename = filename.trim();
    if filename.is_empty() {
        return LocationImage::Placeholder;
    }

    match mode {
        ImageMode::Embedded => {
            let (name, extension) = split_filename(filename);
            match assets.resolve(name, extension) {
                Some(bytes) => LocationImage::Embedded {
                    filename: filename.to_string(),
                    bytes,
                },
                None => {
                    warn!(filename, "image not found, using placeholder");
                    LocationImage::Placeholder
                }
            }
        }
        ImageMode::Referenced => {
            if is_remote(filename) {
                return LocationImage::Reference(filename.to_string());
            }
            let (name, extension) = split_filename(filename);
            if assets.contains(name, extension) {
                LocationImage::Reference(filename.to_string())
            } else {
                warn!(filename, "referenced image not in bundle, using placeholder");
                LocationImage::Placeholder
            }
        }
    }
}

fn is_remote(reference: &str) -> bool {
    Url::parse(reference)
        .map(|url| matches!(url.scheme(), "http" | "https"))
        .unwrap_or(false)
}

// ---------------------------------------------------------------------------
// Reload
// ---------------------------------------------------------------------------

/// Replace the catalog with what the season records in `config.seasons` describe.
///
/// 1. Clear the store (children first)
/// 2. Stage every season index concurrently
/// 3. Under the write lock: clear the graph and insert staged seasons in order
/// 4. Mirror the new graph into the store and commit
///
/// Every failure is recorded in the returned report; nothing aborts the pass.
#[instrument(skip_all, fields(range = %config.seasons, mode = %config.image_mode))]
pub async fn reload<S: CatalogStore>(
    catalog: &SharedCatalog,
    assets: Arc<dyn AssetStore>,
    store: &S,
    config: &IngestConfig,
    progress: &dyn ProgressReporter,
) -> ReloadReport {
    let start = Instant::now();
    let started_at = Utc::now();
    let mut issues = Vec::new();

    info!(range = %config.seasons, "starting reload");

    // --- Phase 1: Clear store ---
    progress.phase("Clearing store");
    for kind in [EntityKind::Location, EntityKind::Episode, EntityKind::Season] {
        if let Err(e) = store.clear(kind).await {
            warn!(%kind, error = %e, "store clear failed, continuing");
            issues.push(IngestIssue::new(None, IngestStage::Clear, e.to_string()));
        }
    }

    // --- Phase 2: Stage seasons ---
    progress.phase("Reading season records");
    let staged = stage_all(assets, config, progress, &mut issues).await;

    // --- Phase 3: Replace graph ---
    progress.phase("Replacing catalog");
    let mut graph = catalog.write().await;
    graph.clear_all();
    let mut placeholder_images = 0;
    let mut loaded_numbers = HashSet::new();
    let mut file_indices = HashMap::new();
    for Staged {
        index,
        season,
        issues: staged_issues,
    } in staged
    {
        issues.extend(staged_issues);
        let Some(staged_season) = season else {
            continue;
        };

        let number = staged_season.season.season_number;
        if !loaded_numbers.insert(number) {
            warn!(file_index = index, season = number, "duplicate season, skipping");
            issues.push(IngestIssue::new(
                Some(index),
                IngestStage::Validate,
                format!("season {number} already loaded; skipping season{index}.{RECORD_EXTENSION}"),
            ));
            continue;
        }

        let season_id = graph.add_season(staged_season.season);
        file_indices.insert(season_id, index);
        for staged_episode in staged_season.episodes {
            let episode_id = match graph.add_episode(season_id, staged_episode.episode) {
                Ok(id) => id,
                Err(e) => {
                    issues.push(IngestIssue::new(Some(index), IngestStage::Validate, e.to_string()));
                    continue;
                }
            };
            for location in staged_episode.locations {
                if location.image.is_placeholder() {
                    placeholder_images += 1;
                }
                if let Err(e) = graph.add_location(episode_id, location) {
                    issues.push(IngestIssue::new(Some(index), IngestStage::Validate, e.to_string()));
                }
            }
        }
    }
    let graph = graph.downgrade();

    // --- Phase 4: Persist ---
    progress.phase("Persisting catalog");
    mirror(&graph, &file_indices, store, &mut issues).await;
    if let Err(e) = store.commit().await {
        warn!(error = %e, "store commit failed");
        issues.push(IngestIssue::new(None, IngestStage::Commit, e.to_string()));
    }

    let persisted = store.is_durable() && !issues.iter().any(|issue| issue.stage.is_storage());
    let report = ReloadReport {
        started_at,
        range: config.seasons,
        seasons: graph.season_count(),
        episodes: graph.episode_count(),
        locations: graph.location_count(),
        placeholder_images,
        issues,
        persisted,
        elapsed: start.elapsed(),
        fingerprint: graph.fingerprint(),
    };
    drop(graph);

    info!(
        seasons = report.seasons,
        episodes = report.episodes,
        locations = report.locations,
        placeholders = report.placeholder_images,
        issues = report.issues.len(),
        persisted = report.persisted,
        elapsed_ms = report.elapsed.as_millis() as u64,
        "reload complete"
    );

    progress.done(&report);
    report
}

/// Stage each index on the blocking pool, at most `resolve_concurrency` at a time.
///
/// Results come back in ascending index order regardless of completion order.
async fn stage_all(
    assets: Arc<dyn AssetStore>,
    config: &IngestConfig,
    progress: &dyn ProgressReporter,
    issues: &mut Vec<IngestIssue>,
) -> Vec<Staged> {
    let semaphore = Arc::new(Semaphore::new(config.resolve_concurrency.max(1)));
    let total = config.seasons.len();
    let mode = config.image_mode;

    let mut handles = Vec::with_capacity(total);
    for index in config.seasons.iter() {
        let permit = match semaphore.clone().acquire_owned().await {
            Ok(permit) => permit,
            Err(e) => {
                issues.push(IngestIssue::new(Some(index), IngestStage::Resolve, e.to_string()));
                continue;
            }
        };
        let assets = Arc::clone(&assets);
        handles.push((
            index,
            tokio::task::spawn_blocking(move || {
                let _permit = permit;
                stage_season(assets.as_ref(), index, mode)
            }),
        ));
    }

    let mut staged = Vec::with_capacity(handles.len());
    for (current, (index, handle)) in handles.into_iter().enumerate() {
        match handle.await {
            Ok(season) => staged.push(season),
            Err(e) => {
                warn!(season = index, error = %e, "staging task failed");
                staged.push(Staged::skipped(
                    index,
                    IngestIssue::new(
                        Some(index),
                        IngestStage::Resolve,
                        format!("staging task failed: {e}"),
                    ),
                ));
            }
        }
        progress.season_staged(index, current + 1, total);
    }
    staged
}

/// Send every entity of `graph` to `store`, parents before children.
///
/// Issues are tagged with the file index each season was loaded from.
async fn mirror<S: CatalogStore>(
    graph: &ContentGraph,
    file_indices: &HashMap<SeasonId, u32>,
    store: &S,
    issues: &mut Vec<IngestIssue>,
) {
    for season_id in graph.season_ids() {
        let Some(season) = graph.season(season_id) else {
            continue;
        };
        let number = file_indices.get(&season_id).copied();
        let season_key = season_id.to_string();
        if let Err(e) = store
            .insert(EntityRecord::Season {
                key: &season_key,
                season,
            })
            .await
        {
            issues.push(IngestIssue::new(number, IngestStage::Persist, e.to_string()));
        }

        for (position, &episode_id) in graph.episode_ids(season_id).iter().enumerate() {
            let Some(episode) = graph.episode(episode_id) else {
                continue;
            };
            let episode_key = episode_id.to_string();
            if let Err(e) = store
                .insert(EntityRecord::Episode {
                    key: &episode_key,
                    season_key: &season_key,
                    position,
                    episode,
                })
                .await
            {
                issues.push(IngestIssue::new(number, IngestStage::Persist, e.to_string()));
            }

            for (position, &location_id) in graph.location_ids(episode_id).iter().enumerate() {
                let Some(location) = graph.location(location_id) else {
                    continue;
                };
                let location_key = location_id.to_string();
                if let Err(e) = store
                    .insert(EntityRecord::Location {
                        key: &location_key,
                        episode_key: &episode_key,
                        position,
                        location,
                    })
                    .await
                {
                    issues.push(IngestIssue::new(number, IngestStage::Persist, e.to_string()));
                }
            }
        }
    }
}
