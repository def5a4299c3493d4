//! Submission pipeline.
//!
//! A submission is analyzed once, as an explicit call: component and demo
//! text plus the internal dependency map already stored for the entry go in,
//! and the facts to persist come out. Nothing here touches a store.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::debug;

use crate::analysis::{AnalysisError, AnalyzeOptions, Analyzer};
use crate::classify::{self, ClassifyError};

/// Everything a submission produces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Submission {
    pub exported_names: Vec<String>,
    pub demo_export_name: String,
    pub external_dependencies: BTreeMap<String, String>,
    pub demo_external_dependencies: BTreeMap<String, String>,
    pub internal_dependencies: BTreeMap<String, String>,
    pub rewritten_component: String,
    pub rewritten_demo: String,
    /// Self-imports stripped from the demo
    pub removed_imports: Vec<String>,
    /// Whether the demo can render with only its component and packages
    pub preview_ready: bool,
}

impl Submission {
    /// Local import paths still waiting for a registry slug.
    pub fn unresolved(&self) -> Vec<&str> {
        classify::unresolved(&self.internal_dependencies)
    }

    pub fn check_publishable(&self) -> Result<(), ClassifyError> {
        classify::check_publishable(&self.internal_dependencies)
    }

    /// Link a local import path to a registry entry.
    ///
    /// Returns `false` when the path is not an internal dependency.
    pub fn link(&mut self, path: &str, slug: &str) -> bool {
        match self.internal_dependencies.get_mut(path) {
            Some(value) => {
                *value = slug.trim().to_string();
                true
            }
            None => false,
        }
    }
}

/// Analyze and classify one submission.
pub fn submit(
    analyzer: &Analyzer,
    component: &str,
    demo: &str,
    existing_internal: &BTreeMap<String, String>,
    options: &AnalyzeOptions,
) -> Result<Submission, AnalysisError> {
    let source = analyzer.analyze_component(component, options)?;
    let demo = analyzer.analyze_demo(demo, &source.exported_names)?;

    let deps = classify::classify(
        &source.import_facts,
        &demo.import_facts,
        existing_internal,
        analyzer.sentinel(),
    );

    debug!(
        external = deps.external.len(),
        internal = deps.internal.len(),
        unresolved = deps.unresolved().len(),
        "classified submission"
    );

    let preview_ready = demo.preview_ready();
    Ok(Submission {
        exported_names: source.exported_names,
        demo_export_name: demo.export_name,
        external_dependencies: deps.external,
        demo_external_dependencies: deps.demo_external,
        internal_dependencies: deps.internal,
        rewritten_component: source.rewritten,
        rewritten_demo: demo.rewritten,
        removed_imports: demo.removed_imports,
        preview_ready,
    })
}
