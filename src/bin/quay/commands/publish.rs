//! `quay publish` command

use std::collections::BTreeMap;

use anyhow::{bail, Result};

use super::analyze::analysis_failure;
use super::{analyzer, open_store, parse_id, report};
use crate::cli::PublishArgs;
use quay::analysis::{pascal_case, AnalysisError, AnalyzeOptions, SourceKind};
use quay::core::Namespace;
use quay::ops::publish::{publish, PublishError, PublishRequest};
use quay::ops::submit::submit;
use quay::sources::{BackingStore, StoreError};
use quay::util::{fs, GlobalContext};

pub fn execute(args: PublishArgs, ctx: &GlobalContext) -> Result<()> {
    let id = parse_id(&args.id)?;
    let namespace: Namespace = args.namespace.parse().map_err(|e: String| anyhow::anyhow!(e))?;
    let links = parse_links(&args.links)?;

    let store = open_store(ctx);
    let (existing_internal, base_revision) = match store.fetch_entry(&id) {
        Ok(entry) => (entry.internal_dependencies, Some(entry.revision)),
        Err(StoreError::EntryNotFound(_)) => (BTreeMap::new(), None),
        Err(e) => return Err(report(PublishError::Store(e).to_diagnostic(), ctx)),
    };

    let component = fs::read_to_string(&args.component)?;
    let demo = fs::read_to_string(&args.demo)?;
    let options = AnalyzeOptions {
        component_name: Some(args.name.clone().unwrap_or_else(|| id.slug().to_string())),
    };

    let mut submission = submit(&analyzer(ctx)?, &component, &demo, &existing_internal, &options)
        .map_err(|e| {
            if matches!(e, AnalysisError::Parse { unit: SourceKind::Demo, .. }) {
                analysis_failure(e, &args.demo, &demo, ctx)
            } else {
                analysis_failure(e, &args.component, &component, ctx)
            }
        })?;

    for (path, target) in &links {
        if !submission.link(path, target) {
            let err = PublishError::UnknownImport {
                id: id.clone(),
                path: path.clone(),
            };
            return Err(report(err.to_diagnostic(), ctx));
        }
    }

    let name = args
        .name
        .clone()
        .or_else(|| submission.exported_names.first().cloned())
        .or_else(|| pascal_case(id.slug()))
        .unwrap_or_else(|| id.slug().to_string());

    let request = PublishRequest {
        id: id.clone(),
        name,
        namespace,
        submission,
        base_revision,
    };

    let outcome = publish(&store, &request).map_err(|e| report(e.to_diagnostic(), ctx))?;

    if outcome.created {
        println!("Published {} (revision {})", outcome.id, outcome.revision);
    } else if outcome.changed_fields.is_empty() {
        println!("{} is up to date (revision {})", outcome.id, outcome.revision);
    } else {
        println!(
            "Updated {} (revision {}): {}",
            outcome.id,
            outcome.revision,
            outcome.changed_fields.join(", ")
        );
    }

    Ok(())
}

/// Parse `--link <path>=<slug>` arguments.
fn parse_links(raw: &[String]) -> Result<Vec<(String, String)>> {
    raw.iter()
        .map(|link| match link.split_once('=') {
            Some((path, target)) if !path.trim().is_empty() && !target.trim().is_empty() => {
                Ok((path.trim().to_string(), target.trim().to_string()))
            }
            _ => bail!("invalid --link `{}`: expected `<path>=<owner/slug>`", link),
        })
        .collect()
}
