//! The persistence contract the ingestion pipeline mirrors each reload into.

use std::fmt;
use std::future::Future;

use filmcatalog_shared::{Episode, Location, Result, Season};

/// Entity table a [`CatalogStore::clear`] targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Season,
    Episode,
    Location,
}

impl EntityKind {
    pub(crate) fn table(&self) -> &'static str {
        match self {
            Self::Season => "seasons",
            Self::Episode => "episodes",
            Self::Location => "locations",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Season => "season",
            Self::Episode => "episode",
            Self::Location => "location",
        })
    }
}

/// One entity to persist, keyed by its graph id text.
///
/// `position` is the index within the parent's owning list, so source order
/// survives a round trip through the database.
#[derive(Debug, Clone, Copy)]
pub enum EntityRecord<'a> {
    Season {
        key: &'a str,
        season: &'a Season,
    },
    Episode {
        key: &'a str,
        season_key: &'a str,
        position: usize,
        episode: &'a Episode,
    },
    Location {
        key: &'a str,
        episode_key: &'a str,
        position: usize,
        location: &'a Location,
    },
}

impl EntityRecord<'_> {
    pub fn kind(&self) -> EntityKind {
        match self {
            Self::Season { .. } => EntityKind::Season,
            Self::Episode { .. } => EntityKind::Episode,
            Self::Location { .. } => EntityKind::Location,
        }
    }

    pub fn key(&self) -> &str {
        match self {
            Self::Season { key, .. } | Self::Episode { key, .. } | Self::Location { key, .. } => {
                key
            }
        }
    }
}

/// Durable mirror of the content graph.
///
/// A reload calls `clear` for each kind (children first), `insert` once per
/// entity, then `commit` once. Implementations may buffer until `commit`.
pub trait CatalogStore: Send + Sync {
    fn clear(&self, kind: EntityKind) -> impl Future<Output = Result<()>> + Send;

    fn insert(&self, record: EntityRecord<'_>) -> impl Future<Output = Result<()>> + Send;

    fn commit(&self) -> impl Future<Output = Result<()>> + Send;

    /// `false` for stores that keep nothing.
    fn is_durable(&self) -> bool {
        true
    }
}

/// Store used when persistence is disabled. Accepts everything, keeps nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullStore;

impl CatalogStore for NullStore {
    async fn clear(&self, _kind: EntityKind) -> Result<()> {
        Ok(())
    }

    async fn insert(&self, _record: EntityRecord<'_>) -> Result<()> {
        Ok(())
    }

    async fn commit(&self) -> Result<()> {
        Ok(())
    }

    fn is_durable(&self) -> bool {
        false
    }
}
