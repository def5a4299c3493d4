//! `quay analyze` command

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Result;

use super::{analyzer, report};
use crate::cli::AnalyzeArgs;
use quay::analysis::{AnalysisError, AnalyzeOptions, ImportFact, SourceAnalysis, SourceKind};
use quay::ops::submit::{submit, Submission};
use quay::util::{fs, GlobalContext};

pub fn execute(args: AnalyzeArgs, ctx: &GlobalContext) -> Result<()> {
    let analyzer = analyzer(ctx)?;
    let component = fs::read_to_string(&args.component)?;
    let options = AnalyzeOptions {
        component_name: args.name.clone().or_else(|| file_stem(&args.component)),
    };

    let Some(demo_path) = args.demo.as_deref() else {
        let analysis = analyzer
            .analyze_component(&component, &options)
            .map_err(|e| analysis_failure(e, &args.component, &component, ctx))?;

        if args.json {
            println!("{}", serde_json::to_string_pretty(&analysis)?);
        } else {
            print_component(&analysis);
        }
        return Ok(());
    };

    let demo = fs::read_to_string(demo_path)?;
    let submission = submit(&analyzer, &component, &demo, &BTreeMap::new(), &options).map_err(|e| {
        // Demo parse errors point into the demo; everything else into the component
        let in_demo = matches!(
            e,
            AnalysisError::Parse {
                unit: SourceKind::Demo,
                ..
            }
        );
        if in_demo {
            analysis_failure(e, demo_path, &demo, ctx)
        } else {
            analysis_failure(e, &args.component, &component, ctx)
        }
    })?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&submission)?);
    } else {
        let analysis = analyzer.analyze_component(&component, &options)?;
        print_component(&analysis);
        print_submission(&submission);
    }

    Ok(())
}

fn file_stem(path: &Path) -> Option<String> {
    path.file_stem()
        .and_then(|s| s.to_str())
        .map(str::to_string)
}

/// Report an analysis error, with a source snippet for parse errors.
pub fn analysis_failure(
    err: AnalysisError,
    path: &Path,
    source: &str,
    ctx: &GlobalContext,
) -> anyhow::Error {
    if let Some(parse) = err.to_miette(&path.display().to_string(), source) {
        eprintln!("{:?}", miette::Report::new(parse));
    }
    report(err.to_diagnostic(), ctx)
}

fn print_component(analysis: &SourceAnalysis) {
    println!("exports: {}", analysis.exported_names.join(", "));

    if analysis.import_facts.is_empty() {
        println!("imports: none");
        return;
    }

    println!("imports:");
    for fact in &analysis.import_facts {
        println!("  {}", describe_fact(fact));
    }
}

fn describe_fact(fact: &ImportFact) -> String {
    let names = if fact.imported_names.is_empty() {
        String::new()
    } else {
        format!(
            " {{ {} }}",
            fact.imported_names.iter().cloned().collect::<Vec<_>>().join(", ")
        )
    };

    match (&fact.package, &fact.version) {
        (Some(package), Some(version)) => {
            format!("{} (package {}@{}){}", fact.raw_path, package, version, names)
        }
        _ => format!("{} ({}){}", fact.raw_path, fact.kind, names),
    }
}

fn print_submission(submission: &Submission) {
    println!("demo entry: {}", submission.demo_export_name);

    if !submission.removed_imports.is_empty() {
        println!("removed imports: {}", submission.removed_imports.join(", "));
    }

    print_map("external dependencies", &submission.external_dependencies);
    print_map("demo dependencies", &submission.demo_external_dependencies);

    if submission.internal_dependencies.is_empty() {
        println!("internal dependencies: none");
    } else {
        println!("internal dependencies:");
        for (path, slug) in &submission.internal_dependencies {
            let target = if slug.is_empty() { "(unlinked)" } else { slug.as_str() };
            println!("  {} -> {}", path, target);
        }
    }

    if !submission.preview_ready {
        println!("note: the demo still imports local modules and cannot be previewed alone");
    }
}

fn print_map(label: &str, map: &BTreeMap<String, String>) {
    if map.is_empty() {
        println!("{}: none", label);
        return;
    }

    let items: Vec<String> = map
        .iter()
        .map(|(name, version)| format!("{}@{}", name, version))
        .collect();
    println!("{}: {}", label, items.join(", "));
}
