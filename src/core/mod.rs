//! Core data structures for Quay.
//!
//! This module contains the foundational types used throughout Quay:
//! - Entry identifiers (`owner/slug`)
//! - Registry entries and their immutable source units
//! - The served manifest wire format

pub mod entry;
pub mod entry_id;
pub mod manifest;

pub use entry::{Namespace, RegistryEntry, SourceUnitRef, REGISTRY_TYPE_PREFIX};
pub use entry_id::{EntryId, EntryIdError};
pub use manifest::{ManifestFile, RegistryManifest};
