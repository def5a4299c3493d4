//! Quay CLI - a component registry

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::{Cli, Commands};
use commands::Reported;
use quay::util::GlobalContext;

fn main() {
    if let Err(e) = run() {
        // Diagnostics were already printed by the command
        if e.downcast_ref::<Reported>().is_none() {
            eprintln!("error: {:#}", e);
        }
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    // Parse CLI
    let cli = Cli::parse();

    // Set up logging
    let filter = if cli.verbose {
        EnvFilter::new("quay=debug")
    } else {
        EnvFilter::new("quay=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();

    let mut ctx = GlobalContext::new()?;
    ctx.set_verbose(cli.verbose);
    ctx.set_color(!cli.no_color);
    if let Some(store) = cli.store {
        let mut config = ctx.config().clone();
        config.store.path = store;
        ctx = ctx.with_config(config);
    }

    // Execute command
    match cli.command {
        Commands::Analyze(args) => commands::analyze::execute(args, &ctx),
        Commands::Publish(args) => commands::publish::execute(args, &ctx),
        Commands::Link(args) => commands::link::execute(args, &ctx),
        Commands::Manifest(args) => commands::manifest::execute(args, &ctx),
        Commands::Tree(args) => commands::tree::execute(args, &ctx),
        Commands::Check(args) => commands::check::execute(args, &ctx),
        Commands::Completions(args) => commands::completions::execute(args),
    }
}
