//! Quay - a component registry core.
//!
//! This crate analyzes submitted component and demo sources, classifies
//! their dependencies, resolves the transitive closure of registry entries
//! against a backing store, and renders the manifest served to installers.

pub mod analysis;
pub mod classify;
pub mod core;
pub mod ops;
pub mod resolver;
pub mod sources;
pub mod util;

/// Test utilities for quay unit tests.
///
/// This module is only available when compiling with `--cfg test`. It
/// provides registry graph fixtures and an instrumented store wrapper.
#[cfg(test)]
pub mod test_support;

pub use analysis::{AnalysisError, AnalyzeOptions, Analyzer};
pub use classify::{ClassifiedDependencies, ClassifyError};
pub use core::{EntryId, Namespace, RegistryEntry, RegistryManifest, SourceUnitRef};
pub use resolver::{ResolveError, ResolvedSet, Resolver};
pub use sources::{BackingStore, DirectoryStore, MemoryStore, StoreError, WritableStore};
pub use util::context::GlobalContext;
