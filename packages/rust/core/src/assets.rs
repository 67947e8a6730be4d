//! Asset stores: where season records and location images are looked up.
//!
//! Lookups are by base name plus extension (`season3` + `json`,
//! `coit-tower` + `jpg`). A miss is `None`, never an error; the pipeline
//! decides what a miss means.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use tracing::warn;

/// Read-only source of bundled resources.
pub trait AssetStore: Send + Sync {
    /// Bytes of `name.extension`, or `None` when absent.
    fn resolve(&self, name: &str, extension: &str) -> Option<Vec<u8>>;

    /// Whether `name.extension` exists.
    fn contains(&self, name: &str, extension: &str) -> bool {
        self.resolve(name, extension).is_some()
    }
}

/// Split a filename into base name and extension on its last `.`.
///
/// A name without a dot has an empty extension.
pub fn split_filename(filename: &str) -> (&str, &str) {
    match filename.rsplit_once('.') {
        Some((base, ext)) if !base.is_empty() => (base, ext),
        _ => (filename, ""),
    }
}

fn file_name(name: &str, extension: &str) -> String {
    if extension.is_empty() {
        name.to_string()
    } else {
        format!("{name}.{extension}")
    }
}

// ---------------------------------------------------------------------------
// DirAssetStore
// ---------------------------------------------------------------------------

/// Subdirectory searched after the bundle root.
const IMAGES_DIR: &str = "images";

/// Resources bundled in a directory on disk.
///
/// `name.ext` is looked up in the root first, then in `images/`.
#[derive(Debug, Clone)]
pub struct DirAssetStore {
    root: PathBuf,
}

impl DirAssetStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Candidate paths for `name.extension`, or `None` when the name would
    /// escape the bundle: absolute, drive-prefixed, or with `..` or a leading `.`.
    fn candidates(&self, name: &str, extension: &str) -> Option<[PathBuf; 2]> {
        let file = file_name(name, extension);
        let mut components = Path::new(&file).components().peekable();
        components.peek()?;
        if !components.all(|component| matches!(component, Component::Normal(_))) {
            warn!(name, extension, "rejecting asset name outside bundle");
            return None;
        }
        Some([
            self.root.join(&file),
            self.root.join(IMAGES_DIR).join(&file),
        ])
    }
}

impl AssetStore for DirAssetStore {
    fn resolve(&self, name: &str, extension: &str) -> Option<Vec<u8>> {
        for path in self.candidates(name, extension)? {
            match std::fs::read(&path) {
                Ok(bytes) => return Some(bytes),
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "failed to read asset");
                    return None;
                }
            }
        }
        None
    }

    fn contains(&self, name: &str, extension: &str) -> bool {
        self.candidates(name, extension)
            .is_some_and(|paths| paths.iter().any(|path| path.is_file()))
    }
}

// ---------------------------------------------------------------------------
// MemoryAssetStore
// ---------------------------------------------------------------------------

/// Resources held in memory, keyed by full filename.
#[derive(Debug, Clone, Default)]
pub struct MemoryAssetStore {
    files: HashMap<String, Vec<u8>>,
}

impl MemoryAssetStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace `filename` (e.g. `season1.json`).
    pub fn insert(&mut self, filename: impl Into<String>, bytes: impl Into<Vec<u8>>) {
        self.files.insert(filename.into(), bytes.into());
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with(mut self, filename: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        self.insert(filename, bytes);
        self
    }

    pub fn remove(&mut self, filename: &str) -> Option<Vec<u8>> {
        self.files.remove(filename)
    }
}

impl AssetStore for MemoryAssetStore {
    fn resolve(&self, name: &str, extension: &str) -> Option<Vec<u8>> {
        self.files.get(&file_name(name, extension)).cloned()
    }

    fn contains(&self, name: &str, extension: &str) -> bool {
        self.files.contains_key(&file_name(name, extension))
    }
}
