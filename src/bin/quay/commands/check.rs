//! `quay check` command

use anyhow::Result;

use super::{open_store, parse_id, report};
use crate::cli::CheckArgs;
use quay::classify::check_publishable;
use quay::ops::publish::PublishError;
use quay::resolver::{ResolveOptions, Resolver};
use quay::sources::BackingStore;
use quay::util::GlobalContext;

pub fn execute(args: CheckArgs, ctx: &GlobalContext) -> Result<()> {
    let id = parse_id(&args.id)?;
    let store = open_store(ctx);

    let entry = store
        .fetch_entry(&id)
        .map_err(|e| report(PublishError::Store(e).to_diagnostic(), ctx))?;

    check_publishable(&entry.internal_dependencies).map_err(|e| report(e.to_diagnostic(), ctx))?;

    let set = Resolver::new(&store)
        .with_options(ResolveOptions::from_config(&ctx.config().resolve))
        .resolve(&[id.to_string()])
        .map_err(|e| report(e.to_diagnostic(), ctx))?;

    println!(
        "{} is publishable (revision {}, {} entries in its closure)",
        id,
        entry.revision,
        set.len()
    );
    Ok(())
}
