//! Test utilities for quay unit tests.
//!
//! # Example
//!
//! ```rust,ignore
//! use quay::test_support::fixtures::{CountingStore, GraphBuilder};
//!
//! #[test]
//! fn test_example() {
//!     let store = GraphBuilder::new()
//!         .entry("alice/button", &[("./icon", "alice/icon")])
//!         .entry("alice/icon", &[])
//!         .build();
//!     let counting = CountingStore::new(&store);
//!     // Resolve against `counting` and inspect `counting.fetches(..)`
//! }
//! ```

pub mod fixtures;

pub use fixtures::*;

/// Assertion helpers for testing.
pub mod assertions {
    use crate::util::diagnostic::Diagnostic;

    /// Assert that a diagnostic's plain rendering contains every fragment.
    pub fn assert_diagnostic_contains(diag: &Diagnostic, fragments: &[&str]) {
        let output = diag.format(false);
        for fragment in fragments {
            assert!(
                output.contains(fragment),
                "diagnostic does not contain '{}'\nactual:\n{}",
                fragment,
                output
            );
        }
    }

    /// Assert that a manifest JSON document lists exactly these file paths.
    pub fn assert_manifest_paths(json: &str, expected: &[&str]) {
        let value: serde_json::Value =
            serde_json::from_str(json).unwrap_or_else(|e| panic!("invalid JSON: {}\n{}", e, json));
        let paths: Vec<&str> = value["files"]
            .as_array()
            .unwrap_or_else(|| panic!("manifest has no files array:\n{}", json))
            .iter()
            .filter_map(|f| f["path"].as_str())
            .collect();
        assert_eq!(paths, expected);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::EntryId;
    use crate::sources::{BackingStore, StoreError};
    use crate::util::diagnostic::Diagnostic;

    #[test]
    fn test_graph_builder_links_entries() {
        let store = GraphBuilder::new()
            .entry("alice/button", &[("./icon", "icon")])
            .entry("alice/icon", &[])
            .build();

        let button = store
            .fetch_entry(&EntryId::parse("alice/button").unwrap())
            .unwrap();
        assert_eq!(button.internal_dependencies["./icon"], "icon");
        assert_eq!(button.exported_names, vec!["Button"]);
        assert!(store.fetch_source_text(&button.code).unwrap().contains("Button"));
    }

    #[test]
    fn test_counting_store() {
        let store = GraphBuilder::new().entry("alice/a", &[]).build();
        let counting = CountingStore::new(&store);
        let id = EntryId::parse("alice/a").unwrap();

        counting.fetch_entry(&id).unwrap();
        counting.fetch_entry(&id).unwrap();
        assert_eq!(counting.fetches("alice/a"), 2);
        assert_eq!(counting.fetches("alice/b"), 0);

        let failing = CountingStore::new(&store).failing_with(StoreError::Unavailable("x".into()));
        assert!(failing.fetch_entry(&id).is_err());
        assert_eq!(failing.total(), 1);
    }

    #[test]
    fn test_assertions() {
        use assertions::*;

        let diag = Diagnostic::error("boom").with_context("because");
        assert_diagnostic_contains(&diag, &["boom", "because"]);

        assert_manifest_paths(
            r#"{"files":[{"path":"a.tsx"},{"path":"b.tsx"}]}"#,
            &["a.tsx", "b.tsx"],
        );
    }
}
