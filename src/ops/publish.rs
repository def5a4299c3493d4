//! Publish flow - persist an analyzed submission.
//!
//! Publishing is gated on every internal dependency being linked to an
//! existing entry. Source units are written first (they are immutable and
//! content addressed, so a failed publish only leaves unreferenced units).
//! The entry itself is created, or patched field by field, with a
//! compare-and-set against the revision the submission was prepared from.

use thiserror::Error;
use tracing::{debug, info};

use crate::classify::ClassifyError;
use crate::core::{EntryId, Namespace, RegistryEntry};
use crate::ops::submit::Submission;
use crate::resolver::ResolveError;
use crate::sources::{check_revision, StoreError, WritableStore};
use crate::util::diagnostic::{suggestions, Diagnostic};

/// Errors from publishing or linking.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PublishError {
    #[error(transparent)]
    Unresolved(#[from] ClassifyError),

    #[error("`{path}` is linked to `{value}`, which is not a registry identifier: {message}")]
    InvalidLink {
        path: String,
        value: String,
        message: String,
    },

    #[error("`{path}` links the entry to itself")]
    SelfReference { path: String },

    #[error("`{path}` is not a local import of `{id}`")]
    UnknownImport { id: EntryId, path: String },

    #[error(transparent)]
    Dependency(#[from] ResolveError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl PublishError {
    /// Convert to a user-friendly diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            PublishError::Unresolved(err) => err.to_diagnostic(),
            PublishError::Dependency(err) => err.to_diagnostic(),
            PublishError::InvalidLink { path, value, message } => {
                Diagnostic::error(format!("invalid link for `{}`", path))
                    .with_context(format!("`{}`: {}", value, message))
                    .with_suggestion(suggestions::LINK_DEPENDENCY)
            }
            PublishError::SelfReference { path } => {
                Diagnostic::error(format!("`{}` cannot link an entry to itself", path))
                    .with_context("the demo's import of its own component is removed automatically")
                    .with_suggestion(suggestions::LINK_DEPENDENCY)
            }
            PublishError::UnknownImport { id, path } => {
                Diagnostic::error(format!("`{}` has no local import `{}`", id, path))
                    .with_context("only local imports of the component can be linked")
            }
            PublishError::Store(err @ StoreError::Conflict { .. }) => {
                Diagnostic::error(err.to_string()).with_suggestion(suggestions::CONFLICT)
            }
            PublishError::Store(err) if err.is_retryable() => Diagnostic::error(err.to_string())
                .with_suggestion(suggestions::STORE_UNAVAILABLE),
            PublishError::Store(err) => Diagnostic::error(err.to_string()),
        }
    }
}

/// A submission addressed to an entry.
#[derive(Debug, Clone)]
pub struct PublishRequest {
    pub id: EntryId,
    pub name: String,
    pub namespace: Namespace,
    pub submission: Submission,
    /// Revision the submission was prepared against; `None` publishes a new
    /// entry only
    pub base_revision: Option<u64>,
}

/// What a publish changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishOutcome {
    pub id: EntryId,
    pub revision: u64,
    pub created: bool,
    /// Metadata fields written; empty when the stored entry already matched
    pub changed_fields: Vec<&'static str>,
}

/// Publish `request` to `store`.
pub fn publish<S: WritableStore + ?Sized>(
    store: &S,
    request: &PublishRequest,
) -> Result<PublishOutcome, PublishError> {
    let submission = &request.submission;
    submission.check_publishable()?;

    for (path, value) in &submission.internal_dependencies {
        verify_link(store, &request.id, path, value)?;
    }

    let code = store.put_source_unit(&submission.rewritten_component)?;
    let demo = store.put_source_unit(&submission.rewritten_demo)?;

    let mut candidate = RegistryEntry::new(
        request.id.clone(),
        request.name.clone(),
        request.namespace.clone(),
        code,
        demo,
    );
    candidate.exported_names = submission.exported_names.clone();
    candidate.demo_export_name = submission.demo_export_name.clone();
    candidate.external_dependencies = submission.external_dependencies.clone();
    candidate.demo_external_dependencies = submission.demo_external_dependencies.clone();
    candidate.internal_dependencies = submission.internal_dependencies.clone();

    let existing = match store.fetch_entry(&request.id) {
        Ok(entry) => Some(entry),
        Err(StoreError::EntryNotFound(_)) => None,
        Err(e) => return Err(e.into()),
    };

    // The stored links may have moved since the submission was prepared
    check_revision(
        &request.id,
        request.base_revision,
        existing.as_ref().map(|e| e.revision),
    )?;

    let Some(existing) = existing else {
        let revision = store.put_entry(&candidate, None)?;
        info!(id = %request.id, revision, "published new entry");
        return Ok(PublishOutcome {
            id: request.id.clone(),
            revision,
            created: true,
            changed_fields: changed_fields(None, &candidate),
        });
    };

    let changed = changed_fields(Some(&existing), &candidate);
    if changed.is_empty() {
        debug!(id = %request.id, "entry unchanged");
        return Ok(PublishOutcome {
            id: request.id.clone(),
            revision: existing.revision,
            created: false,
            changed_fields: changed,
        });
    }

    let patched = patch(existing.clone(), &candidate, &changed);
    let revision = store.put_entry(&patched, Some(existing.revision))?;
    info!(id = %request.id, revision, fields = ?changed, "updated entry");

    Ok(PublishOutcome {
        id: request.id.clone(),
        revision,
        created: false,
        changed_fields: changed,
    })
}

/// Link one local import of a stored entry to another entry.
///
/// Returns the new revision.
pub fn link_dependency<S: WritableStore + ?Sized>(
    store: &S,
    id: &EntryId,
    path: &str,
    value: &str,
) -> Result<u64, PublishError> {
    let mut entry = store.fetch_entry(id)?;
    if !entry.internal_dependencies.contains_key(path) {
        return Err(PublishError::UnknownImport {
            id: id.clone(),
            path: path.to_string(),
        });
    }

    let target = verify_link(store, id, path, value)?;
    let expected = entry.revision;
    entry
        .internal_dependencies
        .insert(path.to_string(), value.trim().to_string());

    let revision = store.put_entry(&entry, Some(expected))?;
    info!(%id, path, %target, revision, "linked dependency");
    Ok(revision)
}

/// Check that `value` names an existing entry other than `id`.
fn verify_link<S: WritableStore + ?Sized>(
    store: &S,
    id: &EntryId,
    path: &str,
    value: &str,
) -> Result<EntryId, PublishError> {
    let target = EntryId::parse_relative(value, id.owner()).map_err(|e| PublishError::InvalidLink {
        path: path.to_string(),
        value: value.to_string(),
        message: e.to_string(),
    })?;

    if &target == id {
        return Err(PublishError::SelfReference {
            path: path.to_string(),
        });
    }

    store
        .fetch_entry(&target)
        .map_err(|e| ResolveError::from_store(e, &target, Some(id)))?;
    Ok(target)
}

fn changed_fields(existing: Option<&RegistryEntry>, new: &RegistryEntry) -> Vec<&'static str> {
    let Some(old) = existing else {
        return vec![
            "name",
            "namespace",
            "code",
            "demo",
            "exported_names",
            "demo_export_name",
            "external_dependencies",
            "demo_external_dependencies",
            "internal_dependencies",
        ];
    };

    let mut fields = Vec::new();
    if old.name != new.name {
        fields.push("name");
    }
    if old.namespace != new.namespace {
        fields.push("namespace");
    }
    if old.code != new.code {
        fields.push("code");
    }
    if old.demo != new.demo {
        fields.push("demo");
    }
    if old.exported_names != new.exported_names {
        fields.push("exported_names");
    }
    if old.demo_export_name != new.demo_export_name {
        fields.push("demo_export_name");
    }
    if old.external_dependencies != new.external_dependencies {
        fields.push("external_dependencies");
    }
    if old.demo_external_dependencies != new.demo_external_dependencies {
        fields.push("demo_external_dependencies");
    }
    if old.internal_dependencies != new.internal_dependencies {
        fields.push("internal_dependencies");
    }
    fields
}

fn patch(mut entry: RegistryEntry, new: &RegistryEntry, fields: &[&str]) -> RegistryEntry {
    for field in fields {
        match *field {
            "name" => entry.name = new.name.clone(),
            "namespace" => entry.namespace = new.namespace.clone(),
            "code" => entry.code = new.code.clone(),
            "demo" => entry.demo = new.demo.clone(),
            "exported_names" => entry.exported_names = new.exported_names.clone(),
            "demo_export_name" => entry.demo_export_name = new.demo_export_name.clone(),
            "external_dependencies" => {
                entry.external_dependencies = new.external_dependencies.clone()
            }
            "demo_external_dependencies" => {
                entry.demo_external_dependencies = new.demo_external_dependencies.clone()
            }
            "internal_dependencies" => {
                entry.internal_dependencies = new.internal_dependencies.clone()
            }
            _ => {}
        }
    }
    entry
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    use crate::analysis::{AnalyzeOptions, Analyzer};
    use crate::ops::submit::submit;
    use crate::sources::{BackingStore, MemoryStore};
    use crate::test_support::fixtures::{component_source, demo_source, GraphBuilder};

    const PANEL: &str = "import { Card } from \"./card\";\n\nexport default function Panel() {\n  return <Card />;\n}\n";

    fn request(
        id: &str,
        component: &str,
        existing: &BTreeMap<String, String>,
        base_revision: Option<u64>,
    ) -> PublishRequest {
        let id = EntryId::parse(id).unwrap();
        let name = crate::analysis::pascal_case(id.slug()).unwrap();
        let submission = submit(
            &Analyzer::default(),
            component,
            &demo_source(&name, &format!("./{}", id.slug())),
            existing,
            &AnalyzeOptions::default(),
        )
        .unwrap();

        PublishRequest {
            id,
            name,
            namespace: Namespace::ui(),
            submission,
            base_revision,
        }
    }

    #[test]
    fn test_create_then_unchanged() {
        let store = MemoryStore::new();
        let req = request("alice/button", &component_source("Button"), &BTreeMap::new(), None);

        let outcome = publish(&store, &req).unwrap();
        assert!(outcome.created);
        assert_eq!(outcome.revision, 1);

        let again = PublishRequest {
            base_revision: Some(1),
            ..req
        };
        let again = publish(&store, &again).unwrap();
        assert!(!again.created);
        assert!(again.changed_fields.is_empty());
        assert_eq!(again.revision, 1);
    }

    #[test]
    fn test_edit_patches_changed_fields_only() {
        let store = MemoryStore::new();
        let id = EntryId::parse("alice/button").unwrap();
        publish(
            &store,
            &request("alice/button", &component_source("Button"), &BTreeMap::new(), None),
        )
        .unwrap();
        let first_code = store.fetch_entry(&id).unwrap().code;

        let edited = "import { clsx } from \"clsx\";\n\nexport default function Button() {\n  return <button className={clsx()} />;\n}\n";
        let outcome =
            publish(&store, &request("alice/button", edited, &BTreeMap::new(), Some(1))).unwrap();

        assert_eq!(outcome.revision, 2);
        assert_eq!(outcome.changed_fields, vec!["code", "external_dependencies"]);

        let stored = store.fetch_entry(&id).unwrap();
        assert_eq!(stored.external_dependencies["clsx"], "latest");
        assert_ne!(stored.code, first_code);
        // The previous unit is still readable
        let previous = store.fetch_source_text(&first_code).unwrap();
        assert!(previous.contains("export default function Button()"));
    }

    #[test]
    fn test_stale_submission_does_not_overwrite_concurrent_link() {
        let store = GraphBuilder::new()
            .entry("alice/card", &[])
            .entry("alice/card2", &[])
            .entry("alice/panel", &[("./card", "alice/card")])
            .build();
        let panel = EntryId::parse("alice/panel").unwrap();

        let read = store.fetch_entry(&panel).unwrap();
        let req = request(
            "alice/panel",
            PANEL,
            &read.internal_dependencies,
            Some(read.revision),
        );
        assert_eq!(req.submission.internal_dependencies["./card"], "alice/card");

        // Another edit lands between the read and the publish
        link_dependency(&store, &panel, "./card", "alice/card2").unwrap();

        let err = publish(&store, &req).unwrap_err();
        assert_eq!(
            err,
            PublishError::Store(StoreError::Conflict {
                id: panel.clone(),
                expected: Some(1),
                found: Some(2),
            })
        );

        let stored = store.fetch_entry(&panel).unwrap();
        assert_eq!(stored.revision, 2);
        assert_eq!(stored.internal_dependencies["./card"], "alice/card2");
    }

    #[test]
    fn test_create_only_without_base_revision() {
        let store = MemoryStore::new();
        let req = request("alice/button", &component_source("Button"), &BTreeMap::new(), None);
        publish(&store, &req).unwrap();

        let err = publish(&store, &req).unwrap_err();
        assert!(matches!(
            err,
            PublishError::Store(StoreError::Conflict {
                expected: None,
                found: Some(1),
                ..
            })
        ));

        let missing = request("alice/link", &component_source("Link"), &BTreeMap::new(), Some(3));
        assert!(matches!(
            publish(&store, &missing),
            Err(PublishError::Store(StoreError::Conflict { found: None, .. }))
        ));
    }

    #[test]
    fn test_unlinked_import_blocks_publish() {
        let store = MemoryStore::new();
        let err = publish(&store, &request("alice/panel", PANEL, &BTreeMap::new(), None)).unwrap_err();
        assert!(matches!(err, PublishError::Unresolved(_)));
        assert!(store.is_empty());
    }

    #[test]
    fn test_links_must_exist_and_not_be_self() {
        let store = GraphBuilder::new().entry("alice/card", &[]).build();

        let mut links = BTreeMap::new();
        links.insert("./card".to_string(), "alice/missing".to_string());
        let err = publish(&store, &request("alice/panel", PANEL, &links, None)).unwrap_err();
        assert!(matches!(err, PublishError::Dependency(_)));

        links.insert("./card".to_string(), "panel".to_string());
        let err = publish(&store, &request("alice/panel", PANEL, &links, None)).unwrap_err();
        assert_eq!(
            err,
            PublishError::SelfReference {
                path: "./card".to_string()
            }
        );

        links.insert("./card".to_string(), "card".to_string());
        let outcome = publish(&store, &request("alice/panel", PANEL, &links, None)).unwrap();
        assert!(outcome.created);
    }

    #[test]
    fn test_link_dependency_bumps_revision() {
        let store = GraphBuilder::new()
            .entry("alice/card", &[])
            .entry("alice/panel", &[("./card", "")])
            .build();
        let panel = EntryId::parse("alice/panel").unwrap();

        assert!(matches!(
            link_dependency(&store, &panel, "./nope", "alice/card"),
            Err(PublishError::UnknownImport { .. })
        ));

        let revision = link_dependency(&store, &panel, "./card", "alice/card").unwrap();
        assert_eq!(revision, 2);
        assert!(store.fetch_entry(&panel).unwrap().is_publishable());
    }

    #[test]
    fn test_conflict_diagnostic() {
        let err = PublishError::Store(StoreError::Conflict {
            id: EntryId::parse("alice/panel").unwrap(),
            expected: Some(1),
            found: Some(2),
        });
        let output = err.to_diagnostic().format(false);
        assert!(output.contains("modified concurrently"));
        assert!(output.contains("Re-run the command"));
    }
}
