//! Backing stores for registry entries and source units.
//!
//! The resolver only needs two reads: fetch an entry by `owner/slug` and fetch
//! the text of a source unit. Publishing additionally writes source units and
//! entries, the latter guarded by a revision number so concurrent edits of the
//! same entry cannot silently overwrite each other.

pub mod directory;
pub mod memory;

pub use directory::DirectoryStore;
pub use memory::MemoryStore;

use thiserror::Error;

use crate::core::{EntryId, RegistryEntry, SourceUnitRef};

/// Errors reported by a backing store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("registry entry `{0}` not found")]
    EntryNotFound(EntryId),

    #[error("source unit `{}` not found", .0.short())]
    SourceNotFound(SourceUnitRef),

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error(
        "entry `{id}` was modified concurrently (expected revision {}, found {})",
        describe_revision(.expected),
        describe_revision(.found)
    )]
    Conflict {
        id: EntryId,
        expected: Option<u64>,
        found: Option<u64>,
    },

    #[error("corrupt record at {location}: {message}")]
    Corrupt { location: String, message: String },
}

fn describe_revision(revision: &Option<u64>) -> String {
    match revision {
        Some(r) => r.to_string(),
        None => "none".to_string(),
    }
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            StoreError::EntryNotFound(_) | StoreError::SourceNotFound(_)
        )
    }

    /// Transient failures that may succeed when retried.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Unavailable(_) | StoreError::Conflict { .. })
    }
}

/// Read access to registry entries and source units.
pub trait BackingStore: Send + Sync {
    /// Store name for display.
    fn name(&self) -> &str;

    /// Fetch an entry by identifier.
    fn fetch_entry(&self, id: &EntryId) -> Result<RegistryEntry, StoreError>;

    /// Fetch the text of a source unit.
    fn fetch_source_text(&self, unit: &SourceUnitRef) -> Result<String, StoreError>;
}

/// Write access used by the publish flow.
pub trait WritableStore: BackingStore {
    /// Store source text as an immutable unit and return its reference.
    ///
    /// Storing the same text twice returns the same reference.
    fn put_source_unit(&self, text: &str) -> Result<SourceUnitRef, StoreError>;

    /// Create or update an entry with compare-and-set on its revision.
    ///
    /// `expected` is `None` to create a new entry (fails if one exists) or the
    /// revision the caller read (fails if the stored revision differs). The
    /// stored revision is bumped and returned; `entry.revision` is ignored.
    fn put_entry(&self, entry: &RegistryEntry, expected: Option<u64>) -> Result<u64, StoreError>;

    /// All stored entry identifiers, sorted.
    fn list_entries(&self) -> Result<Vec<EntryId>, StoreError>;
}

/// Check a compare-and-set precondition against the stored revision.
pub(crate) fn check_revision(
    id: &EntryId,
    expected: Option<u64>,
    found: Option<u64>,
) -> Result<u64, StoreError> {
    match (expected, found) {
        (None, None) => Ok(1),
        (Some(e), Some(f)) if e == f => Ok(f + 1),
        _ => Err(StoreError::Conflict {
            id: id.clone(),
            expected,
            found,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_revision() {
        let id = EntryId::parse("alice/button").unwrap();
        assert_eq!(check_revision(&id, None, None), Ok(1));
        assert_eq!(check_revision(&id, Some(3), Some(3)), Ok(4));
        assert!(matches!(
            check_revision(&id, None, Some(1)),
            Err(StoreError::Conflict { .. })
        ));
        assert!(matches!(
            check_revision(&id, Some(1), None),
            Err(StoreError::Conflict { .. })
        ));
    }

    #[test]
    fn test_conflict_message() {
        let err = StoreError::Conflict {
            id: EntryId::parse("alice/button").unwrap(),
            expected: Some(2),
            found: Some(3),
        };
        assert_eq!(
            err.to_string(),
            "entry `alice/button` was modified concurrently (expected revision 2, found 3)"
        );
        assert!(err.is_retryable());
        assert!(!err.is_not_found());
    }
}
