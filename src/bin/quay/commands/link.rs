//! `quay link` command

use anyhow::Result;

use super::{open_store, parse_id, report};
use crate::cli::LinkArgs;
use quay::ops::publish::link_dependency;
use quay::util::GlobalContext;

pub fn execute(args: LinkArgs, ctx: &GlobalContext) -> Result<()> {
    let id = parse_id(&args.id)?;
    let store = open_store(ctx);

    let revision = link_dependency(&store, &id, &args.path, &args.target)
        .map_err(|e| report(e.to_diagnostic(), ctx))?;

    println!(
        "Linked `{}` of {} to {} (revision {})",
        args.path, id, args.target, revision
    );
    Ok(())
}
