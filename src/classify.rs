//! Dependency classification.
//!
//! Folds the analyzer's import facts into the three persisted maps of a
//! registry entry:
//! - `external_dependencies`: package name -> version range (component)
//! - `demo_external_dependencies`: package name -> version range (demo)
//! - `internal_dependencies`: local import path -> registry slug
//!
//! Internal dependencies are merged against what is already stored: a known
//! path keeps its linked slug, a new path starts unresolved (empty) and a path
//! no longer imported is dropped. The result only depends on the set of
//! facts, never on their order.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use thiserror::Error;

use crate::analysis::versions::record_version;
use crate::analysis::ImportFact;
use crate::util::diagnostic::{suggestions, Diagnostic};

/// Classification failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClassifyError {
    #[error("unresolved internal dependencies: {}", .paths.join(", "))]
    UnresolvedInternalDependency { paths: Vec<String> },
}

impl ClassifyError {
    /// Convert to a user-friendly diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            ClassifyError::UnresolvedInternalDependency { paths } => {
                let mut diag = Diagnostic::error(
                    "cannot publish: some local imports are not linked to registry entries",
                );
                for path in paths {
                    diag = diag.with_context(format!("`{}` has no registry slug", path));
                }
                diag.with_suggestion(suggestions::LINK_DEPENDENCY)
            }
        }
    }
}

/// The persisted dependency maps of an entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ClassifiedDependencies {
    pub external: BTreeMap<String, String>,
    pub demo_external: BTreeMap<String, String>,
    pub internal: BTreeMap<String, String>,
}

impl ClassifiedDependencies {
    /// Local import paths with no linked slug.
    pub fn unresolved(&self) -> Vec<&str> {
        unresolved(&self.internal)
    }

    /// Fails with `UnresolvedInternalDependency` when any path is unlinked.
    pub fn check_publishable(&self) -> Result<(), ClassifyError> {
        check_publishable(&self.internal)
    }
}

/// Split facts into external packages (with versions) and local paths.
///
/// Every fact lands in exactly one of the two results.
pub fn partition(
    facts: &[ImportFact],
    sentinel: &str,
) -> (BTreeMap<String, String>, BTreeSet<String>) {
    let mut external = BTreeMap::new();
    let mut local = BTreeSet::new();

    // Non-sentinel versions first, so the result does not depend on order
    let mut packages: Vec<&ImportFact> = facts.iter().filter(|f| !f.is_local()).collect();
    packages.sort_by_key(|f| f.version.as_deref() == Some(sentinel) || f.version.is_none());

    for fact in packages {
        let version = fact.version.as_deref().unwrap_or(sentinel);
        record_version(&mut external, fact.dependency_key(), version, sentinel);
    }

    for fact in facts.iter().filter(|f| f.is_local()) {
        local.insert(fact.raw_path.clone());
    }

    (external, local)
}

/// Merge discovered local paths with the stored path -> slug map.
pub fn merge_internal(
    existing: &BTreeMap<String, String>,
    discovered: &BTreeSet<String>,
) -> BTreeMap<String, String> {
    discovered
        .iter()
        .map(|path| {
            let slug = existing.get(path).cloned().unwrap_or_default();
            (path.clone(), slug)
        })
        .collect()
}

/// Produce the three persisted maps from component and demo facts.
pub fn classify(
    component: &[ImportFact],
    demo: &[ImportFact],
    existing_internal: &BTreeMap<String, String>,
    sentinel: &str,
) -> ClassifiedDependencies {
    let (external, local) = partition(component, sentinel);
    let (demo_external, _) = partition(demo, sentinel);

    ClassifiedDependencies {
        external,
        demo_external,
        internal: merge_internal(existing_internal, &local),
    }
}

/// Local import paths with no linked slug.
pub fn unresolved(internal: &BTreeMap<String, String>) -> Vec<&str> {
    internal
        .iter()
        .filter(|(_, slug)| slug.trim().is_empty())
        .map(|(path, _)| path.as_str())
        .collect()
}

/// Publish gate: every internal dependency must be linked.
pub fn check_publishable(internal: &BTreeMap<String, String>) -> Result<(), ClassifyError> {
    let paths = unresolved(internal);
    if paths.is_empty() {
        Ok(())
    } else {
        Err(ClassifyError::UnresolvedInternalDependency {
            paths: paths.into_iter().map(str::to_string).collect(),
        })
    }
}
