//! Command implementations

pub mod analyze;
pub mod check;
pub mod completions;
pub mod link;
pub mod manifest;
pub mod publish;
pub mod tree;

use anyhow::{Context, Result};
use thiserror::Error;

use quay::analysis::{Analyzer, VersionTable};
use quay::core::EntryId;
use quay::sources::DirectoryStore;
use quay::util::diagnostic::{emit, Diagnostic};
use quay::util::{fs, GlobalContext};

/// A failure whose diagnostic has already been printed.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct Reported(pub String);

/// Print `diag` and turn it into an error for `main`.
pub fn report(diag: Diagnostic, ctx: &GlobalContext) -> anyhow::Error {
    emit(&diag, ctx.color());
    Reported(diag.message).into()
}

/// Open the directory store configured for this project.
pub fn open_store(ctx: &GlobalContext) -> DirectoryStore {
    DirectoryStore::new(ctx.store_path())
}

/// Build an analyzer from config, with versions from `package.json` if present.
pub fn analyzer(ctx: &GlobalContext) -> Result<Analyzer> {
    let versions = match ctx.package_json_path() {
        Some(path) => {
            let text = fs::read_to_string(&path)?;
            VersionTable::from_package_json(&text)
                .with_context(|| format!("failed to parse {}", path.display()))?
        }
        None => VersionTable::new(),
    };

    Ok(Analyzer::from_config(&ctx.config().analysis, versions))
}

/// Parse an `owner/slug` argument.
pub fn parse_id(raw: &str) -> Result<EntryId> {
    EntryId::parse(raw).with_context(|| format!("invalid entry identifier `{}`", raw))
}
