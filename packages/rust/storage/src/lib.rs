//! libSQL storage layer (embedded, offline).
//!
//! The [`Storage`] struct wraps a libSQL database that mirrors the loaded
//! catalog (seasons, episodes, locations) and records ingest run history.
//!
//! **Access rules:**
//! - The CLI `load` command is the sole writer, via [`Storage::open`]
//! - Read-only inspection goes through [`Storage::open_readonly`]

mod migrations;
mod store;

pub use store::{CatalogStore, EntityKind, EntityRecord, NullStore};

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Utc;
use filmcatalog_shared::{CatalogError, LocationImage, Result};
use libsql::{Connection, Database, params};
use serde::Serialize;
use uuid::Uuid;

fn storage_err(e: impl std::fmt::Display) -> CatalogError {
    CatalogError::Storage(e.to_string())
}

/// Primary storage handle wrapping a libSQL database.
pub struct Storage {
    #[allow(dead_code)]
    db: Database,
    conn: Connection,
    readonly: bool,
    /// Set once a mirror pass has opened its transaction.
    in_transaction: AtomicBool,
}

impl Storage {
    /// Open or create a database at `path` in read-write mode.
    pub async fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| CatalogError::io(parent, e))?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(storage_err)?;
        let conn = db.connect().map_err(storage_err)?;

        let storage = Self {
            db,
            conn,
            readonly: false,
            in_transaction: AtomicBool::new(false),
        };
        storage.run_migrations().await?;
        Ok(storage)
    }

    /// Open a database at `path` in read-only mode.
    pub async fn open_readonly(path: &Path) -> Result<Self> {
        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(storage_err)?;
        let conn = db.connect().map_err(storage_err)?;

        Ok(Self {
            db,
            conn,
            readonly: true,
            in_transaction: AtomicBool::new(false),
        })
    }

    /// Run pending schema migrations.
    async fn run_migrations(&self) -> Result<()> {
        let current_version = self.get_schema_version().await;

        for migration in migrations::all_migrations() {
            if migration.version > current_version {
                tracing::info!(
                    version = migration.version,
                    description = migration.description,
                    "applying migration"
                );
                self.conn
                    .execute_batch(migration.sql)
                    .await
                    .map_err(|e| {
                        CatalogError::Storage(format!(
                            "migration v{} failed: {e}",
                            migration.version
                        ))
                    })?;
            }
        }
        Ok(())
    }

    /// Get the current schema version, or 0 if no migrations have been applied.
    async fn get_schema_version(&self) -> u32 {
        let result = self
            .conn
            .query("SELECT MAX(version) FROM schema_migrations", params![])
            .await;

        match result {
            Ok(mut rows) => {
                if let Ok(Some(row)) = rows.next().await {
                    row.get::<u32>(0).unwrap_or(0)
                } else {
                    0
                }
            }
            Err(_) => 0, // Table doesn't exist yet
        }
    }

    /// Ensure we're in read-write mode before writing.
    fn check_writable(&self) -> Result<()> {
        if self.readonly {
            return Err(CatalogError::Storage(
                "database is opened in read-only mode".into(),
            ));
        }
        Ok(())
    }

    /// Open the mirror transaction on first write of a pass.
    async fn begin_if_needed(&self) -> Result<()> {
        if self.in_transaction.load(Ordering::Acquire) {
            return Ok(());
        }
        self.conn
            .execute("BEGIN", params![])
            .await
            .map_err(storage_err)?;
        self.in_transaction.store(true, Ordering::Release);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Catalog readback
    // -----------------------------------------------------------------------

    /// Number of rows currently stored for `kind`.
    pub async fn count_rows(&self, kind: EntityKind) -> Result<u64> {
        let sql = format!("SELECT COUNT(*) FROM {}", kind.table());
        let mut rows = self
            .conn
            .query(&sql, params![])
            .await
            .map_err(storage_err)?;

        match rows.next().await {
            Ok(Some(row)) => Ok(row.get::<i64>(0).map_err(storage_err)?.max(0) as u64),
            Ok(None) => Ok(0),
            Err(e) => Err(storage_err(e)),
        }
    }

    /// Stored seasons as `(season_number, title)`, ascending by number.
    pub async fn list_seasons(&self) -> Result<Vec<(u32, String)>> {
        let mut rows = self
            .conn
            .query(
                "SELECT season_number, title FROM seasons ORDER BY season_number",
                params![],
            )
            .await
            .map_err(storage_err)?;

        let mut results = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            results.push((
                row.get::<u32>(0).map_err(storage_err)?,
                row.get::<String>(1).map_err(storage_err)?,
            ));
        }
        Ok(results)
    }

    // -----------------------------------------------------------------------
    // Ingest run operations
    // -----------------------------------------------------------------------

    /// Record the start of a reload. Returns the generated run ID.
    pub async fn insert_ingest_run(&self, first_season: u32, last_season: u32) -> Result<String> {
        self.check_writable()?;
        let id = Uuid::now_v7().to_string();
        let now = Utc::now().to_rfc3339();
        self.conn
            .execute(
                "INSERT INTO ingest_runs (id, first_season, last_season, started_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![id.as_str(), first_season, last_season, now.as_str()],
            )
            .await
            .map_err(storage_err)?;
        Ok(id)
    }

    /// Mark a run finished and attach its stats.
    pub async fn finish_ingest_run(&self, run_id: &str, stats_json: &str) -> Result<()> {
        self.check_writable()?;
        let now = Utc::now().to_rfc3339();
        self.conn
            .execute(
                "UPDATE ingest_runs SET finished_at = ?1, stats_json = ?2 WHERE id = ?3",
                params![now.as_str(), stats_json, run_id],
            )
            .await
            .map_err(storage_err)?;
        Ok(())
    }

    /// Most recent runs first.
    pub async fn list_ingest_runs(&self, limit: u32) -> Result<Vec<IngestRun>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, first_season, last_season, started_at, finished_at, stats_json
                 FROM ingest_runs ORDER BY started_at DESC LIMIT ?1",
                params![limit],
            )
            .await
            .map_err(storage_err)?;

        let mut results = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            results.push(IngestRun {
                id: row.get::<String>(0).map_err(storage_err)?,
                first_season: row.get::<u32>(1).map_err(storage_err)?,
                last_season: row.get::<u32>(2).map_err(storage_err)?,
                started_at: row.get::<String>(3).map_err(storage_err)?,
                finished_at: row.get::<String>(4).ok(),
                stats_json: row.get::<String>(5).ok(),
            });
        }
        Ok(results)
    }
}

/// One row of the `ingest_runs` table.
#[derive(Debug, Clone, Serialize)]
pub struct IngestRun {
    pub id: String,
    pub first_season: u32,
    pub last_season: u32,
    /// RFC 3339.
    pub started_at: String,
    /// `None` while a run is in progress or if it never finished.
    pub finished_at: Option<String>,
    pub stats_json: Option<String>,
}

// ---------------------------------------------------------------------------
// CatalogStore
// ---------------------------------------------------------------------------

impl CatalogStore for Storage {
    async fn clear(&self, kind: EntityKind) -> Result<()> {
        self.check_writable()?;
        self.begin_if_needed().await?;
        let sql = format!("DELETE FROM {}", kind.table());
        self.conn
            .execute(&sql, params![])
            .await
            .map_err(storage_err)?;
        Ok(())
    }

    async fn insert(&self, record: EntityRecord<'_>) -> Result<()> {
        self.check_writable()?;
        self.begin_if_needed().await?;
        let written = match record {
            EntityRecord::Season { key, season } => {
                self.conn
                    .execute(
                        "INSERT INTO seasons (key, season_number, title, air_date, total_episodes)
                         VALUES (?1, ?2, ?3, ?4, ?5)",
                        params![
                            key,
                            season.season_number,
                            season.title.as_str(),
                            season.air_date.as_str(),
                            season.total_episodes.as_str(),
                        ],
                    )
                    .await
            }
            EntityRecord::Episode {
                key,
                season_key,
                position,
                episode,
            } => {
                self.conn
                    .execute(
                        "INSERT INTO episodes (key, season_key, position, episode_number,
                           season_episode_number, title, air_date, description, guest_stars)
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                        params![
                            key,
                            season_key,
                            position as i64,
                            episode.episode_number,
                            episode.season_episode_number,
                            episode.title.as_str(),
                            episode.air_date.as_str(),
                            episode.description.as_str(),
                            episode.guest_stars.as_str(),
                        ],
                    )
                    .await
            }
            EntityRecord::Location {
                key,
                episode_key,
                position,
                location,
            } => {
                self.conn
                    .execute(
                        "INSERT INTO locations (key, episode_key, position, title, info, time_code,
                           latitude, longitude, image_kind, image_ref, image_bytes)
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                        params![
                            key,
                            episode_key,
                            position as i64,
                            location.title.as_str(),
                            location.info.as_str(),
                            location.time_code.as_str(),
                            location.coordinate.latitude,
                            location.coordinate.longitude,
                            image_kind(&location.image),
                            location.image.identifier(),
                            location.image.bytes().map(<[u8]>::to_vec),
                        ],
                    )
                    .await
            }
        };
        written.map_err(storage_err)?;
        Ok(())
    }

    async fn commit(&self) -> Result<()> {
        if !self.in_transaction.swap(false, Ordering::AcqRel) {
            return Ok(());
        }
        if let Err(e) = self.conn.execute("COMMIT", params![]).await {
            if let Err(rollback) = self.conn.execute("ROLLBACK", params![]).await {
                tracing::warn!(error = %rollback, "rollback after failed commit also failed");
            }
            return Err(storage_err(e));
        }
        Ok(())
    }
}

fn image_kind(image: &LocationImage) -> &'static str {
    match image {
        LocationImage::Embedded { .. } => "embedded",
        LocationImage::Reference(_) => "reference",
        LocationImage::Placeholder => "placeholder",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use filmcatalog_shared::{Coordinate, Episode, Location, Season};
    use uuid::Uuid;

    /// Create a temp file storage for testing.
    async fn test_storage() -> Storage {
        let tmp = std::env::temp_dir().join(format!("fc_test_{}.db", Uuid::now_v7()));
        Storage::open(&tmp).await.expect("open test db")
    }

    fn season() -> Season {
        Season {
            air_date: "1972-1973".into(),
            title: "Season One".into(),
            total_episodes: "24".into(),
            season_number: 1,
        }
    }

    fn episode() -> Episode {
        Episode {
            air_date: "September 16, 1972".into(),
            description: "Pilot".into(),
            guest_stars: String::new(),
            episode_number: 1,
            title: "The Thirty-Year Pin".into(),
            season_episode_number: 1001,
        }
    }

    fn location(image: LocationImage) -> Location {
        Location {
            info: "Telegraph Hill".into(),
            coordinate: Coordinate::new(37.8024, -122.4058),
            image,
            title: "Coit Tower".into(),
            time_code: "00:01:30".into(),
        }
    }

    async fn mirror_one(storage: &Storage, suffix: &str, image: LocationImage) {
        let (season, episode, location) = (season(), episode(), location(image));
        let season_key = format!("season:{suffix}");
        let episode_key = format!("episode:{suffix}");
        let location_key = format!("location:{suffix}");

        for kind in [EntityKind::Location, EntityKind::Episode, EntityKind::Season] {
            storage.clear(kind).await.expect("clear");
        }
        storage
            .insert(EntityRecord::Season {
                key: &season_key,
                season: &season,
            })
            .await
            .expect("insert season");
        storage
            .insert(EntityRecord::Episode {
                key: &episode_key,
                season_key: &season_key,
                position: 0,
                episode: &episode,
            })
            .await
            .expect("insert episode");
        storage
            .insert(EntityRecord::Location {
                key: &location_key,
                episode_key: &episode_key,
                position: 0,
                location: &location,
            })
            .await
            .expect("insert location");
        storage.commit().await.expect("commit");
    }

    #[tokio::test]
    async fn open_and_migrate() {
        let storage = test_storage().await;
        let version = storage.get_schema_version().await;
        assert_eq!(version, 2);
    }

    #[tokio::test]
    async fn idempotent_migration() {
        let tmp = std::env::temp_dir().join(format!("fc_test_{}.db", Uuid::now_v7()));
        let _s1 = Storage::open(&tmp).await.expect("first open");
        drop(_s1);
        let s2 = Storage::open(&tmp).await.expect("second open");
        assert_eq!(s2.get_schema_version().await, 2);
    }

    #[tokio::test]
    async fn mirror_pass_replaces_previous_rows() {
        let storage = test_storage().await;

        mirror_one(&storage, "0.0", LocationImage::Placeholder).await;
        mirror_one(
            &storage,
            "1.0",
            LocationImage::Embedded {
                filename: "coit.jpg".into(),
                bytes: vec![0xFF, 0xD8, 0xFF],
            },
        )
        .await;

        assert_eq!(storage.count_rows(EntityKind::Season).await.unwrap(), 1);
        assert_eq!(storage.count_rows(EntityKind::Episode).await.unwrap(), 1);
        assert_eq!(storage.count_rows(EntityKind::Location).await.unwrap(), 1);

        let seasons = storage.list_seasons().await.expect("list seasons");
        assert_eq!(seasons, vec![(1, "Season One".to_string())]);
    }

    #[tokio::test]
    async fn commit_without_writes_is_noop() {
        let storage = test_storage().await;
        storage.commit().await.expect("empty commit");
        assert_eq!(storage.count_rows(EntityKind::Season).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn ingest_run_lifecycle() {
        let storage = test_storage().await;

        let run_id = storage.insert_ingest_run(1, 5).await.expect("insert run");
        assert!(!run_id.is_empty());

        let runs = storage.list_ingest_runs(10).await.expect("list runs");
        assert_eq!(runs.len(), 1);
        assert!(runs[0].finished_at.is_none());

        storage
            .finish_ingest_run(&run_id, r#"{"seasons": 5}"#)
            .await
            .expect("finish run");

        let runs = storage.list_ingest_runs(10).await.expect("list runs");
        assert_eq!(runs[0].id, run_id);
        assert_eq!((runs[0].first_season, runs[0].last_season), (1, 5));
        assert!(runs[0].finished_at.is_some());
        assert!(runs[0].stats_json.as_deref().unwrap_or("").contains("seasons"));
    }

    #[tokio::test]
    async fn null_store_keeps_nothing() {
        let store = NullStore;
        assert!(!store.is_durable());
        store.clear(EntityKind::Season).await.expect("clear");
        store.commit().await.expect("commit");
    }

    #[tokio::test]
    async fn readonly_rejects_writes() {
        let tmp = std::env::temp_dir().join(format!("fc_test_{}.db", Uuid::now_v7()));
        let rw = Storage::open(&tmp).await.unwrap();
        rw.insert_ingest_run(1, 5).await.unwrap();
        drop(rw);

        let ro = Storage::open_readonly(&tmp).await.unwrap();
        let result = ro.clear(EntityKind::Season).await;
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("read-only"));

        let runs = ro.list_ingest_runs(5).await.expect("reads still work");
        assert_eq!(runs.len(), 1);
    }
}
