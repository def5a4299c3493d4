//! In-memory backing store.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::core::{EntryId, RegistryEntry, SourceUnitRef};
use crate::sources::{check_revision, BackingStore, StoreError, WritableStore};

/// A store kept entirely in memory, safe to share across threads.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<EntryId, RegistryEntry>>,
    units: RwLock<HashMap<SourceUnitRef, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.read_entries().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read_entries(&self) -> Result<RwLockReadGuard<'_, HashMap<EntryId, RegistryEntry>>, StoreError> {
        self.entries.read().map_err(|_| poisoned())
    }

    fn write_entries(
        &self,
    ) -> Result<RwLockWriteGuard<'_, HashMap<EntryId, RegistryEntry>>, StoreError> {
        self.entries.write().map_err(|_| poisoned())
    }
}

fn poisoned() -> StoreError {
    StoreError::Unavailable("memory store lock poisoned".to_string())
}

impl BackingStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    fn fetch_entry(&self, id: &EntryId) -> Result<RegistryEntry, StoreError> {
        self.read_entries()?
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::EntryNotFound(id.clone()))
    }

    fn fetch_source_text(&self, unit: &SourceUnitRef) -> Result<String, StoreError> {
        self.units
            .read()
            .map_err(|_| poisoned())?
            .get(unit)
            .cloned()
            .ok_or_else(|| StoreError::SourceNotFound(unit.clone()))
    }
}

impl WritableStore for MemoryStore {
    fn put_source_unit(&self, text: &str) -> Result<SourceUnitRef, StoreError> {
        let unit = SourceUnitRef::for_text(text);
        self.units
            .write()
            .map_err(|_| poisoned())?
            .entry(unit.clone())
            .or_insert_with(|| text.to_string());
        Ok(unit)
    }

    fn put_entry(&self, entry: &RegistryEntry, expected: Option<u64>) -> Result<u64, StoreError> {
        let mut entries = self.write_entries()?;
        let found = entries.get(&entry.id).map(|e| e.revision);
        let revision = check_revision(&entry.id, expected, found)?;

        let mut stored = entry.clone();
        stored.revision = revision;
        entries.insert(stored.id.clone(), stored);
        Ok(revision)
    }

    fn list_entries(&self) -> Result<Vec<EntryId>, StoreError> {
        let mut ids: Vec<EntryId> = self.read_entries()?.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Namespace;

    fn entry(store: &MemoryStore, id: &str) -> RegistryEntry {
        let code = store.put_source_unit("export function X() {}").unwrap();
        let demo = store.put_source_unit("export function Demo() {}").unwrap();
        RegistryEntry::new(EntryId::parse(id).unwrap(), "X", Namespace::ui(), code, demo)
    }

    #[test]
    fn test_units_are_deduplicated() {
        let store = MemoryStore::new();
        let a = store.put_source_unit("same").unwrap();
        let b = store.put_source_unit("same").unwrap();
        assert_eq!(a, b);
        assert_eq!(store.fetch_source_text(&a).unwrap(), "same");
    }

    #[test]
    fn test_compare_and_set() {
        let store = MemoryStore::new();
        let entry = entry(&store, "alice/x");

        assert_eq!(store.put_entry(&entry, None).unwrap(), 1);
        assert!(matches!(
            store.put_entry(&entry, None),
            Err(StoreError::Conflict { .. })
        ));
        assert_eq!(store.put_entry(&entry, Some(1)).unwrap(), 2);

        // A writer holding a stale revision loses
        assert!(matches!(
            store.put_entry(&entry, Some(1)),
            Err(StoreError::Conflict {
                expected: Some(1),
                found: Some(2),
                ..
            })
        ));
        assert_eq!(store.fetch_entry(&entry.id).unwrap().revision, 2);
    }

    #[test]
    fn test_missing_records() {
        let store = MemoryStore::new();
        let id = EntryId::parse("alice/none").unwrap();
        assert_eq!(store.fetch_entry(&id), Err(StoreError::EntryNotFound(id)));
        assert!(store
            .fetch_source_text(&SourceUnitRef::for_text("nope"))
            .unwrap_err()
            .is_not_found());
        assert!(store.is_empty());
    }
}
