use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "keel",
    about = "Keel: plan configuration changes of provisioned clusters",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Show the differences between two configuration snapshots
    Diff(DiffArgs),
    /// Check a new configuration against the applied one
    Plan(PlanArgs),
    /// Print the change policy of an apply action
    Rules(RulesArgs),
}

#[derive(Args)]
pub struct DiffArgs {
    pub before: PathBuf,
    pub after: PathBuf,
    /// Show unchanged values too
    #[arg(long)]
    pub all: bool,
    #[arg(long)]
    pub no_color: bool,
    /// Omit the +/-/~ change markers
    #[arg(long)]
    pub no_prefix: bool,
    /// Pair list items by position instead of by identity
    #[arg(long)]
    pub respect_order: bool,
}

#[derive(Args)]
pub struct PlanArgs {
    /// Snapshot of the configuration the cluster was applied with
    pub applied: PathBuf,
    /// The new configuration
    pub new: PathBuf,
    /// One of create, upgrade or scale
    #[arg(short, long, default_value = "create")]
    pub action: String,
    /// Plan file (TOML)
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// Do not ask for confirmation
    #[arg(short = 'y', long)]
    pub yes: bool,
    #[arg(long)]
    pub no_color: bool,
}

#[derive(Args)]
pub struct RulesArgs {
    #[arg(short, long, default_value = "create")]
    pub action: String,
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}
