//! Source analysis for submitted components and demos.
//!
//! Analysis is a pure function of the source text (plus, for demos, the names
//! exported by the component being demonstrated). It extracts:
//! - the component's exported names, in declaration order
//! - one import fact per imported module
//! - the demo's single render entry
//!
//! and applies the rewrites needed before storage (see [`rewrite`]).

pub mod lexer;
pub mod parser;
pub mod rewrite;
pub mod specifier;
pub mod versions;

use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::util::config::AnalysisConfig;
use crate::util::diagnostic::{suggestions, Diagnostic, ParseDiagnostic};

use self::lexer::SyntaxError;
use self::parser::{parse_module, ExportDecl, ImportBinding, Module};
use self::rewrite::{expose_default_export, strip_async_entry, strip_self_imports};

pub use self::specifier::{ImportKind, PackageSpecifier, ResolutionTable};
pub use self::versions::{VersionTable, LATEST};

/// Which submitted unit a finding refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Component,
    Demo,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::Component => write!(f, "component"),
            SourceKind::Demo => write!(f, "demo"),
        }
    }
}

/// Errors produced by analysis. Both block publishing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnalysisError {
    #[error("failed to parse {unit} source: {message} at line {line}, column {column}")]
    Parse {
        unit: SourceKind,
        message: String,
        line: usize,
        column: usize,
        offset: usize,
    },

    #[error("demo must export exactly one component, found {}", describe_found(.found))]
    MultipleOrNoDemoExport { found: Vec<String> },
}

fn describe_found(found: &[String]) -> String {
    if found.is_empty() {
        "none".to_string()
    } else {
        found
            .iter()
            .map(|n| format!("`{}`", n))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl AnalysisError {
    fn parse(unit: SourceKind, err: SyntaxError) -> Self {
        AnalysisError::Parse {
            unit,
            message: err.message,
            line: err.line,
            column: err.column,
            offset: err.offset,
        }
    }

    /// Convert to a user-friendly diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            AnalysisError::Parse {
                unit,
                message,
                line,
                column,
                ..
            } => Diagnostic::error(format!("could not analyze the {} source", unit))
                .with_context(format!("{} (line {}, column {})", message, line, column))
                .with_suggestion("Fix the syntax error and submit again; nothing was stored"),

            AnalysisError::MultipleOrNoDemoExport { found } => {
                let mut diag =
                    Diagnostic::error("could not determine the demo's render entry");
                if found.is_empty() {
                    diag = diag.with_context("the demo exports no component");
                } else {
                    diag = diag.with_context(format!(
                        "the demo exports {} components: {}",
                        found.len(),
                        describe_found(found)
                    ));
                }
                diag.with_suggestion(suggestions::DEMO_EXPORT)
            }
        }
    }

    /// A miette diagnostic pointing into `source`, for parse errors.
    pub fn to_miette(&self, name: &str, source: &str) -> Option<ParseDiagnostic> {
        match self {
            AnalysisError::Parse {
                unit,
                message,
                offset,
                ..
            } => Some(ParseDiagnostic::new(
                unit.to_string(),
                message.clone(),
                name,
                source.to_string(),
                *offset,
            )),
            AnalysisError::MultipleOrNoDemoExport { .. } => None,
        }
    }
}

/// What one imported module contributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportFact {
    /// Module specifier as written (decoded)
    pub raw_path: String,
    pub kind: ImportKind,
    /// Local names the import binds in this module: the alias for
    /// `{ a as b }`, the namespace name for `* as ns`. Side-effect and
    /// dynamic imports bind nothing.
    pub imported_names: BTreeSet<String>,
    /// Package name, for package imports
    #[serde(skip_serializing_if = "Option::is_none")]
    pub package: Option<String>,
    /// Best-known version range, for package imports
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl ImportFact {
    pub fn is_local(&self) -> bool {
        self.kind == ImportKind::Local
    }

    /// Key of this fact in the persisted dependency maps.
    pub fn dependency_key(&self) -> &str {
        self.package.as_deref().unwrap_or(&self.raw_path)
    }
}

/// Options for component analysis.
#[derive(Debug, Clone, Default)]
pub struct AnalyzeOptions {
    /// Name given to an anonymous default export (PascalCased)
    pub component_name: Option<String>,
}

impl AnalyzeOptions {
    pub fn named(name: impl Into<String>) -> Self {
        AnalyzeOptions {
            component_name: Some(name.into()),
        }
    }
}

/// Facts extracted from a component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceAnalysis {
    pub exported_names: Vec<String>,
    pub import_facts: Vec<ImportFact>,
    /// Source with the default export exposed by name
    pub rewritten: String,
}

impl SourceAnalysis {
    /// Local import paths, in first-seen order.
    pub fn local_paths(&self) -> Vec<&str> {
        self.import_facts
            .iter()
            .filter(|f| f.is_local())
            .map(|f| f.raw_path.as_str())
            .collect()
    }
}

/// Facts extracted from a demo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DemoAnalysis {
    /// The single render entry
    pub export_name: String,
    /// Imports left after stripping self-imports
    pub import_facts: Vec<ImportFact>,
    /// Local imports left after stripping self-imports
    pub local_imports: Vec<String>,
    /// Specifiers of self-imports that were stripped
    pub removed_imports: Vec<String>,
    /// Source with self-imports and the entry's `async` removed
    pub rewritten: String,
}

impl DemoAnalysis {
    /// The demo only depends on its component and on packages.
    pub fn preview_ready(&self) -> bool {
        self.local_imports.is_empty()
    }
}

/// Runs analysis with a fixed resolution table and version source.
#[derive(Debug, Clone)]
pub struct Analyzer {
    table: ResolutionTable,
    versions: VersionTable,
    sentinel: String,
}

impl Default for Analyzer {
    fn default() -> Self {
        Analyzer::new(ResolutionTable::default(), VersionTable::new())
    }
}

impl Analyzer {
    pub fn new(table: ResolutionTable, versions: VersionTable) -> Self {
        Analyzer {
            table,
            versions,
            sentinel: LATEST.to_string(),
        }
    }

    pub fn from_config(config: &AnalysisConfig, versions: VersionTable) -> Self {
        Analyzer::new(ResolutionTable::new(config.local_prefixes.clone()), versions)
            .with_sentinel(config.latest_sentinel.clone())
    }

    pub fn with_sentinel(mut self, sentinel: impl Into<String>) -> Self {
        self.sentinel = sentinel.into();
        self
    }

    pub fn table(&self) -> &ResolutionTable {
        &self.table
    }

    pub fn sentinel(&self) -> &str {
        &self.sentinel
    }

    /// Analyze a component source.
    pub fn analyze_component(
        &self,
        src: &str,
        options: &AnalyzeOptions,
    ) -> Result<SourceAnalysis, AnalysisError> {
        let module =
            parse_module(src).map_err(|e| AnalysisError::parse(SourceKind::Component, e))?;

        let synthesized = match module.default_export() {
            Some(default) if default.target.name().is_none() => {
                let name = options
                    .component_name
                    .as_deref()
                    .and_then(pascal_case)
                    .ok_or_else(|| {
                        AnalysisError::parse(
                            SourceKind::Component,
                            SyntaxError::at(
                                src,
                                default.keyword_span.start,
                                "anonymous default export needs a component name",
                            ),
                        )
                    })?;
                Some(name)
            }
            _ => None,
        };

        let rewritten = expose_default_export(src, &module, synthesized.as_deref());
        let exposed = parse_module(&rewritten)
            .map_err(|e| AnalysisError::parse(SourceKind::Component, e))?;

        let analysis = SourceAnalysis {
            exported_names: exported_names(&exposed),
            import_facts: self.import_facts(&module),
            rewritten,
        };

        debug!(
            exports = ?analysis.exported_names,
            imports = analysis.import_facts.len(),
            "analyzed component"
        );
        Ok(analysis)
    }

    /// Analyze a demo source against the names its component exports.
    pub fn analyze_demo(
        &self,
        src: &str,
        component_exports: &[String],
    ) -> Result<DemoAnalysis, AnalysisError> {
        let module = parse_module(src).map_err(|e| AnalysisError::parse(SourceKind::Demo, e))?;
        let stripped =
            strip_self_imports(src, &module, component_exports, |s| self.table.is_local(s));

        let module = parse_module(&stripped.text)
            .map_err(|e| AnalysisError::parse(SourceKind::Demo, e))?;

        let mut candidates: Vec<String> = exported_names(&module)
            .into_iter()
            .filter(|name| name.starts_with(|c: char| c.is_uppercase()))
            .collect();

        if candidates.len() != 1 {
            return Err(AnalysisError::MultipleOrNoDemoExport { found: candidates });
        }
        let export_name = candidates.remove(0);

        let rewritten = strip_async_entry(&stripped.text, &module, &export_name);
        let import_facts = self.import_facts(&module);
        let local_imports = import_facts
            .iter()
            .filter(|f| f.is_local())
            .map(|f| f.raw_path.clone())
            .collect();

        debug!(
            entry = %export_name,
            removed = ?stripped.removed,
            "analyzed demo"
        );

        Ok(DemoAnalysis {
            export_name,
            import_facts,
            local_imports,
            removed_imports: stripped.removed,
            rewritten,
        })
    }

    /// One fact per distinct module specifier, in first-seen order.
    fn import_facts(&self, module: &Module) -> Vec<ImportFact> {
        let mut facts: Vec<ImportFact> = Vec::new();

        for import in &module.imports {
            if import.specifier.is_empty() {
                continue;
            }

            let names = import.bindings.iter().map(|b| b.local().to_string());

            if let Some(existing) = facts.iter_mut().find(|f| f.raw_path == import.specifier) {
                existing.imported_names.extend(names);
                continue;
            }

            let kind = self.table.classify(&import.specifier);
            let (package, version) = match kind {
                ImportKind::Local => (None, None),
                ImportKind::Package => match PackageSpecifier::parse(&import.specifier) {
                    Some(parsed) => (
                        Some(parsed.name.to_string()),
                        Some(self.versions.version_for(&parsed, &self.sentinel)),
                    ),
                    None => (Some(import.specifier.clone()), Some(self.sentinel.clone())),
                },
            };

            facts.push(ImportFact {
                raw_path: import.specifier.clone(),
                kind,
                imported_names: names.collect(),
                package,
                version,
            });
        }

        facts
    }
}

/// Exported value names in declaration order, without duplicates.
///
/// Type-only exports and re-exports from other modules are not included.
pub fn exported_names(module: &Module) -> Vec<String> {
    let imported_locals: BTreeSet<&str> = module
        .imports
        .iter()
        .flat_map(|i| i.bindings.iter())
        .map(ImportBinding::local)
        .collect();

    let mut positioned: Vec<(usize, &str)> = Vec::new();
    for export in &module.exports {
        match export {
            ExportDecl::Declaration { names, start } => {
                for name in names {
                    let at = module.declaration_start(name).unwrap_or(*start);
                    positioned.push((at, name.as_str()));
                }
            }
            ExportDecl::List {
                specifiers,
                from: None,
                start,
            } => {
                for spec in specifiers {
                    if spec.type_only || spec.exported == "default" {
                        continue;
                    }
                    match module.declaration_start(&spec.local) {
                        Some(at) => positioned.push((at, spec.exported.as_str())),
                        None if imported_locals.contains(spec.local.as_str()) => {
                            positioned.push((*start, spec.exported.as_str()))
                        }
                        None => {}
                    }
                }
            }
            ExportDecl::Default(default) => {
                if let Some(name) = default.target.name() {
                    if let Some(at) = module.declaration_start(name) {
                        positioned.push((at, name));
                    }
                }
            }
            _ => {}
        }
    }

    positioned.sort_by_key(|(at, _)| *at);

    let mut seen = BTreeSet::new();
    positioned
        .into_iter()
        .filter(|(_, name)| seen.insert(*name))
        .map(|(_, name)| name.to_string())
        .collect()
}

/// `"animated-button"` -> `"AnimatedButton"`.
pub fn pascal_case(name: &str) -> Option<String> {
    let out: String = name
        .split(|c: char| !c.is_alphanumeric())
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect();

    out.starts_with(|c: char| c.is_alphabetic()).then_some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analyzer() -> Analyzer {
        Analyzer::default()
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_button_and_demo_end_to_end() {
        let component = "export default function Button() {\n  return <button />\n}\n";
        let demo = "import { Button } from \"./button\";\n\nexport default function Demo() {\n  return <Button />\n}\n";

        let analyzer = analyzer();
        let source = analyzer
            .analyze_component(component, &AnalyzeOptions::default())
            .unwrap();
        assert_eq!(source.exported_names, names(&["Button"]));

        let demo = analyzer.analyze_demo(demo, &source.exported_names).unwrap();
        assert_eq!(demo.export_name, "Demo");
        assert_eq!(demo.removed_imports, names(&["./button"]));
        assert!(!demo.rewritten.contains("./button"));
        assert!(demo.preview_ready());
    }

    #[test]
    fn test_package_and_local_facts() {
        let src = r#"
import { motion } from "framer-motion";
import { Card } from "./card";
import { AnimatePresence } from "framer-motion";

export function Panel() {
  return <Card />
}
"#;
        let analysis = analyzer()
            .analyze_component(src, &AnalyzeOptions::default())
            .unwrap();

        assert_eq!(analysis.import_facts.len(), 2);
        let motion = &analysis.import_facts[0];
        assert_eq!(motion.kind, ImportKind::Package);
        assert_eq!(motion.package.as_deref(), Some("framer-motion"));
        assert_eq!(motion.version.as_deref(), Some("latest"));
        assert_eq!(
            motion.imported_names.iter().collect::<Vec<_>>(),
            vec!["AnimatePresence", "motion"]
        );

        let card = &analysis.import_facts[1];
        assert_eq!(card.kind, ImportKind::Local);
        assert_eq!(card.version, None);
        assert_eq!(analysis.local_paths(), vec!["./card"]);
    }

    #[test]
    fn test_import_facts_record_local_bindings() {
        let src = r#"
import Motion, { motion as m, AnimatePresence } from "framer-motion";
import * as Icons from "lucide-react";
import "./styles.css";

export function Panel() {
  return <Icons.X />
}
"#;
        let analysis = analyzer()
            .analyze_component(src, &AnalyzeOptions::default())
            .unwrap();

        let names = |i: usize| {
            analysis.import_facts[i]
                .imported_names
                .iter()
                .map(String::as_str)
                .collect::<Vec<_>>()
        };
        assert_eq!(names(0), vec!["AnimatePresence", "Motion", "m"]);
        assert_eq!(names(1), vec!["Icons"]);
        assert!(names(2).is_empty());
    }

    #[test]
    fn test_versions_come_from_table() {
        let mut versions = VersionTable::new();
        versions.insert("clsx", "^2.1.0");
        let analyzer = Analyzer::new(ResolutionTable::default(), versions);

        let analysis = analyzer
            .analyze_component(
                "import clsx from \"clsx\";\nexport const cn = clsx;\n",
                &AnalyzeOptions::default(),
            )
            .unwrap();
        assert_eq!(analysis.import_facts[0].version.as_deref(), Some("^2.1.0"));
    }

    #[test]
    fn test_exported_names_follow_declaration_order() {
        let src = r#"
function Item() {}
export const Root = () => null;
type Props = { a: string };
export { Item, type Props };
export default Root;
export { Other } from "./other";
"#;
        let analysis = analyzer()
            .analyze_component(src, &AnalyzeOptions::default())
            .unwrap();
        assert_eq!(analysis.exported_names, names(&["Item", "Root"]));
    }

    #[test]
    fn test_anonymous_default_uses_component_name() {
        let src = "export default () => <div />;\n";
        let analysis = analyzer()
            .analyze_component(src, &AnalyzeOptions::named("animated-badge"))
            .unwrap();
        assert_eq!(analysis.exported_names, names(&["AnimatedBadge"]));
        assert!(analysis.rewritten.contains("export const AnimatedBadge ="));

        let err = analyzer()
            .analyze_component(src, &AnalyzeOptions::default())
            .unwrap_err();
        assert!(matches!(err, AnalysisError::Parse { line: 1, .. }));
    }

    #[test]
    fn test_analysis_is_idempotent() {
        let src = "import { cva } from \"class-variance-authority\";\nexport default function Badge() {}\n";
        let analyzer = analyzer();
        let first = analyzer
            .analyze_component(src, &AnalyzeOptions::default())
            .unwrap();
        let second = analyzer
            .analyze_component(src, &AnalyzeOptions::default())
            .unwrap();
        assert_eq!(first, second);

        let again = analyzer
            .analyze_component(&first.rewritten, &AnalyzeOptions::default())
            .unwrap();
        assert_eq!(again.rewritten, first.rewritten);
        assert_eq!(again.exported_names, first.exported_names);
        assert_eq!(again.import_facts, first.import_facts);
    }

    #[test]
    fn test_demo_export_must_be_unique() {
        let analyzer = analyzer();

        let err = analyzer
            .analyze_demo("export function One() {}\nexport function Two() {}\n", &[])
            .unwrap_err();
        assert_eq!(
            err,
            AnalysisError::MultipleOrNoDemoExport {
                found: names(&["One", "Two"])
            }
        );

        let err = analyzer
            .analyze_demo("export const helper = 1;\n", &[])
            .unwrap_err();
        assert_eq!(err, AnalysisError::MultipleOrNoDemoExport { found: vec![] });
        assert!(err.to_diagnostic().format(false).contains("exports no component"));
    }

    #[test]
    fn test_async_demo_entry_is_stripped() {
        let demo = analyzer()
            .analyze_demo("export default async function Demo() {}\n", &[])
            .unwrap();
        assert_eq!(demo.rewritten, "export default function Demo() {}\n");
    }

    #[test]
    fn test_demo_with_other_local_imports_is_not_preview_ready() {
        let demo = analyzer()
            .analyze_demo(
                "import { Button } from \"./button\";\nimport { data } from \"./data\";\nexport default function Demo() {}\n",
                &names(&["Button"]),
            )
            .unwrap();
        assert_eq!(demo.removed_imports, names(&["./button"]));
        assert_eq!(demo.local_imports, names(&["./data"]));
        assert!(!demo.preview_ready());
    }

    #[test]
    fn test_parse_error_reports_unit_and_location() {
        let err = analyzer()
            .analyze_demo("export default function Demo() {\n", &[])
            .unwrap_err();
        match &err {
            AnalysisError::Parse { unit, .. } => assert_eq!(*unit, SourceKind::Demo),
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(err.to_miette("demo.tsx", "export default function Demo() {\n").is_some());
    }

    #[test]
    fn test_pascal_case() {
        assert_eq!(pascal_case("animated-button").as_deref(), Some("AnimatedButton"));
        assert_eq!(pascal_case("card").as_deref(), Some("Card"));
        assert_eq!(pascal_case("3d-card"), None);
        assert_eq!(pascal_case("--"), None);
    }
}
