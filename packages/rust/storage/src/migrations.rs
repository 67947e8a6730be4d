//! SQL migration definitions for the filmcatalog database.
//!
//! Migrations are applied in order on database open. Each migration has a
//! version number and a batch of SQL statements.

/// A database migration with a version and SQL statements.
pub(crate) struct Migration {
    pub version: u32,
    pub description: &'static str,
    pub sql: &'static str,
}

/// All migrations, in ascending version order.
pub(crate) fn all_migrations() -> Vec<Migration> {
    vec![
        Migration {
            version: 1,
            description: "Catalog schema: seasons, episodes, locations",
            sql: r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_migrations (
    version    INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS seasons (
    key            TEXT PRIMARY KEY,
    season_number  INTEGER NOT NULL,
    title          TEXT NOT NULL,
    air_date       TEXT NOT NULL,
    total_episodes TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS episodes (
    key                   TEXT PRIMARY KEY,
    season_key            TEXT NOT NULL REFERENCES seasons(key) ON DELETE CASCADE,
    position              INTEGER NOT NULL,
    episode_number        INTEGER NOT NULL,
    season_episode_number INTEGER NOT NULL,
    title                 TEXT NOT NULL,
    air_date              TEXT NOT NULL,
    description           TEXT NOT NULL,
    guest_stars           TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_episodes_season ON episodes(season_key);

CREATE TABLE IF NOT EXISTS locations (
    key         TEXT PRIMARY KEY,
    episode_key TEXT NOT NULL REFERENCES episodes(key) ON DELETE CASCADE,
    position    INTEGER NOT NULL,
    title       TEXT NOT NULL,
    info        TEXT NOT NULL,
    time_code   TEXT NOT NULL,
    latitude    REAL NOT NULL,
    longitude   REAL NOT NULL,
    image_kind  TEXT NOT NULL,
    image_ref   TEXT NOT NULL,
    image_bytes BLOB
);

CREATE INDEX IF NOT EXISTS idx_locations_episode ON locations(episode_key);

INSERT INTO schema_migrations (version) VALUES (1);
"#,
        },
        Migration {
            version: 2,
            description: "Ingest run history",
            sql: r#"
CREATE TABLE IF NOT EXISTS ingest_runs (
    id           TEXT PRIMARY KEY,
    first_season INTEGER NOT NULL,
    last_season  INTEGER NOT NULL,
    started_at   TEXT NOT NULL,
    finished_at  TEXT,
    stats_json   TEXT
);

CREATE INDEX IF NOT EXISTS idx_ingest_runs_started ON ingest_runs(started_at);

INSERT INTO schema_migrations (version) VALUES (2);
"#,
        },
    ]
}
