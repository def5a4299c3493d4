//! On-disk backing store.
//!
//! Layout under the store root:
//!
//! ```text
//! entries/<owner>/<slug>.json    registry entry metadata
//! units/<aa>/<sha256>.txt        immutable source units
//! ```
//!
//! Writes go through a temp file and an atomic rename. Entry updates hold a
//! `<slug>.json.lock` file (created with `create_new`) for the duration of the
//! compare-and-set.

use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, trace};
use walkdir::WalkDir;

use crate::core::{EntryId, RegistryEntry, SourceUnitRef};
use crate::sources::{check_revision, BackingStore, StoreError, WritableStore};
use crate::util::fs::write_atomic;
use crate::util::hash::is_sha256_hex;

/// A store rooted at a directory.
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    root: PathBuf,
    name: String,
}

impl DirectoryStore {
    /// Open (or lazily create) a store at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let name = format!("directory:{}", root.display());
        DirectoryStore { root, name }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn entries_dir(&self) -> PathBuf {
        self.root.join("entries")
    }

    fn entry_path(&self, id: &EntryId) -> PathBuf {
        self.entries_dir()
            .join(id.owner())
            .join(format!("{}.json", id.slug()))
    }

    fn unit_path(&self, unit: &SourceUnitRef) -> PathBuf {
        let hash = unit.as_str();
        self.root
            .join("units")
            .join(&hash[..2])
            .join(format!("{}.txt", hash))
    }

    fn read_entry_file(&self, id: &EntryId) -> Result<Option<RegistryEntry>, StoreError> {
        let path = self.entry_path(id);
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(unavailable(&path, e)),
        };

        let entry: RegistryEntry = serde_json::from_str(&text).map_err(|e| StoreError::Corrupt {
            location: path.display().to_string(),
            message: e.to_string(),
        })?;

        if &entry.id != id {
            return Err(StoreError::Corrupt {
                location: path.display().to_string(),
                message: format!("record belongs to `{}`", entry.id),
            });
        }

        Ok(Some(entry))
    }
}

fn unavailable(path: &Path, err: io::Error) -> StoreError {
    StoreError::Unavailable(format!("{}: {}", path.display(), err))
}

/// Atomic write, reported as an unavailable store on failure.
fn store_file(path: &Path, contents: &[u8]) -> Result<(), StoreError> {
    write_atomic(path, contents).map_err(|e| StoreError::Unavailable(format!("{:#}", e)))
}

/// Exclusive lock on one entry, released on drop.
struct EntryLock {
    path: PathBuf,
}

impl EntryLock {
    fn acquire(entry_path: &Path) -> Result<Self, StoreError> {
        let path = entry_path.with_extension("json.lock");
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| unavailable(parent, e))?;
        }

        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(_) => Ok(EntryLock { path }),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Err(StoreError::Unavailable(
                format!("{} is locked by another writer", entry_path.display()),
            )),
            Err(e) => Err(unavailable(&path, e)),
        }
    }
}

impl Drop for EntryLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            tracing::warn!("failed to release {}: {}", self.path.display(), e);
        }
    }
}

impl BackingStore for DirectoryStore {
    fn name(&self) -> &str {
        &self.name
    }

    fn fetch_entry(&self, id: &EntryId) -> Result<RegistryEntry, StoreError> {
        trace!(%id, "reading entry");
        self.read_entry_file(id)?
            .ok_or_else(|| StoreError::EntryNotFound(id.clone()))
    }

    fn fetch_source_text(&self, unit: &SourceUnitRef) -> Result<String, StoreError> {
        if !is_sha256_hex(unit.as_str()) {
            return Err(StoreError::SourceNotFound(unit.clone()));
        }

        let path = self.unit_path(unit);
        match fs::read_to_string(&path) {
            Ok(text) => Ok(text),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(StoreError::SourceNotFound(unit.clone()))
            }
            Err(e) => Err(unavailable(&path, e)),
        }
    }
}

impl WritableStore for DirectoryStore {
    fn put_source_unit(&self, text: &str) -> Result<SourceUnitRef, StoreError> {
        let unit = SourceUnitRef::for_text(text);
        let path = self.unit_path(&unit);

        if !path.exists() {
            store_file(&path, text.as_bytes())?;
            debug!(unit = unit.short(), "stored source unit");
        }
        Ok(unit)
    }

    fn put_entry(&self, entry: &RegistryEntry, expected: Option<u64>) -> Result<u64, StoreError> {
        let path = self.entry_path(&entry.id);
        let _lock = EntryLock::acquire(&path)?;

        let found = self.read_entry_file(&entry.id)?.map(|e| e.revision);
        let revision = check_revision(&entry.id, expected, found)?;

        let mut stored = entry.clone();
        stored.revision = revision;
        let json = serde_json::to_vec_pretty(&stored).map_err(|e| StoreError::Corrupt {
            location: path.display().to_string(),
            message: e.to_string(),
        })?;
        store_file(&path, &json)?;

        debug!(id = %entry.id, revision, "stored entry");
        Ok(revision)
    }

    fn list_entries(&self) -> Result<Vec<EntryId>, StoreError> {
        let dir = self.entries_dir();
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut ids = Vec::new();
        for item in WalkDir::new(&dir).min_depth(2).max_depth(2) {
            let item = item.map_err(|e| StoreError::Unavailable(e.to_string()))?;
            let path = item.path();
            if !item.file_type().is_file() || path.extension().map_or(true, |ext| ext != "json") {
                continue;
            }

            let owner = path
                .parent()
                .and_then(|p| p.file_name())
                .and_then(|n| n.to_str());
            let slug = path.file_stem().and_then(|s| s.to_str());

            if let (Some(owner), Some(slug)) = (owner, slug) {
                match EntryId::new(owner, slug) {
                    Ok(id) => ids.push(id),
                    Err(e) => tracing::warn!("skipping {}: {}", path.display(), e),
                }
            }
        }

        ids.sort();
        Ok(ids)
    }
}
