//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

/// Quay - analyze, publish and serve registry components
#[derive(Parser)]
#[command(name = "quay")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Registry store directory (overrides `[store] path`)
    #[arg(long, global = true, env = "QUAY_STORE")]
    pub store: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Analyze a component (and optionally its demo) without storing anything
    Analyze(AnalyzeArgs),

    /// Analyze a submission and publish it to the store
    Publish(PublishArgs),

    /// Link a local import of a stored entry to another entry
    Link(LinkArgs),

    /// Print the manifest served for an entry
    Manifest(ManifestArgs),

    /// Display the registry dependency tree of an entry
    Tree(TreeArgs),

    /// Check whether a stored entry is publishable
    Check(CheckArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Args)]
pub struct AnalyzeArgs {
    /// Component source file
    pub component: PathBuf,

    /// Demo source file
    #[arg(long)]
    pub demo: Option<PathBuf>,

    /// Name for an anonymous default export (defaults to the file name)
    #[arg(long)]
    pub name: Option<String>,

    /// Print the analysis as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct PublishArgs {
    /// Entry identifier (`owner/slug`)
    pub id: String,

    /// Component source file
    #[arg(long)]
    pub component: PathBuf,

    /// Demo source file
    #[arg(long)]
    pub demo: PathBuf,

    /// Display name (defaults to the first exported component)
    #[arg(long)]
    pub name: Option<String>,

    /// Registry namespace
    #[arg(long, default_value = "ui")]
    pub namespace: String,

    /// Link a local import: `<path>=<owner/slug>` (repeatable)
    #[arg(long = "link", value_name = "PATH=SLUG")]
    pub links: Vec<String>,
}

#[derive(Args)]
pub struct LinkArgs {
    /// Entry identifier (`owner/slug`)
    pub id: String,

    /// Local import path as written in the component
    pub path: String,

    /// Target entry (`owner/slug`, or `slug` under the same owner)
    pub target: String,
}

#[derive(Args)]
pub struct ManifestArgs {
    /// Entries to resolve; the first one is the manifest root
    #[arg(required = true)]
    pub ids: Vec<String>,

    /// Write the manifest to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Args)]
pub struct TreeArgs {
    /// Entry to show the tree for
    pub id: String,

    /// Maximum depth to display
    #[arg(short, long)]
    pub depth: Option<usize>,

    /// Expand entries that were already shown
    #[arg(long)]
    pub duplicates: bool,
}

#[derive(Args)]
pub struct CheckArgs {
    /// Entry identifier (`owner/slug`)
    pub id: String,
}

#[derive(Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: Shell,
}
