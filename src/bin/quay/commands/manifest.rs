//! `quay manifest` command

use anyhow::{Context, Result};
use tracing::info;

use super::{open_store, report};
use crate::cli::ManifestArgs;
use quay::ops::serve::{resolve_manifest, ServeError, ServeOptions};
use quay::util::{fs, GlobalContext};

pub fn execute(args: ManifestArgs, ctx: &GlobalContext) -> Result<()> {
    let store = open_store(ctx);
    let opts = ServeOptions::from_config(ctx.config());

    let manifest = match resolve_manifest(&store, &args.ids[..], &opts) {
        Ok(manifest) => manifest,
        Err(ServeError::Resolve(e)) => return Err(report(e.to_diagnostic(), ctx)),
        Err(e) => return Err(e.into()),
    };

    let json = manifest.to_json().context("failed to render manifest")?;

    match args.output {
        Some(path) => {
            fs::write_atomic(&path, json.as_bytes())?;
            info!("wrote {} files to {}", manifest.files.len(), path.display());
        }
        None => println!("{}", json),
    }

    Ok(())
}
