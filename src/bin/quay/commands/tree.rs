//! `quay tree` command

use std::collections::HashSet;

use anyhow::Result;

use super::{open_store, report};
use crate::cli::TreeArgs;
use quay::core::EntryId;
use quay::resolver::{ResolveOptions, ResolvedSet, Resolver};
use quay::util::GlobalContext;

pub fn execute(args: TreeArgs, ctx: &GlobalContext) -> Result<()> {
    let store = open_store(ctx);
    let set = Resolver::new(&store)
        .with_options(ResolveOptions::from_config(&ctx.config().resolve))
        .resolve(&[args.id.as_str()])
        .map_err(|e| report(e.to_diagnostic(), ctx))?;

    if let Some(root) = set.root() {
        let mut seen = HashSet::new();
        print_tree(
            &set,
            root.id(),
            0,
            args.depth.unwrap_or(usize::MAX),
            &mut seen,
            args.duplicates,
            &mut Vec::new(),
        );
    }

    Ok(())
}

fn print_tree(
    set: &ResolvedSet,
    id: &EntryId,
    depth: usize,
    max_depth: usize,
    seen: &mut HashSet<EntryId>,
    show_duplicates: bool,
    ancestors: &mut Vec<EntryId>,
) {
    if depth > max_depth {
        return;
    }

    let is_duplicate = !seen.insert(id.clone());
    let is_cycle = ancestors.contains(id);

    let prefix = if depth == 0 {
        String::new()
    } else {
        format!("{}├── ", "│   ".repeat(depth - 1))
    };

    let namespace = set
        .get(id)
        .map(|r| r.namespace().registry_type())
        .unwrap_or_default();

    let marker = if is_cycle {
        " (cycle)"
    } else if is_duplicate && !show_duplicates {
        " (*)"
    } else {
        ""
    };

    println!("{}{} [{}]{}", prefix, id, namespace, marker);

    if is_cycle || (is_duplicate && !show_duplicates) {
        return;
    }

    ancestors.push(id.clone());
    for dep in set.dependencies_of(id) {
        print_tree(set, dep, depth + 1, max_depth, seen, show_duplicates, ancestors);
    }
    ancestors.pop();
}
