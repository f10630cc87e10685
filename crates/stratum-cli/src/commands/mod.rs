//! CLI command definitions and dispatch.

pub mod merge;
pub mod modules;

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use stratum_common::config::StratumConfig;

/// Stratum: compose layered module documents.
#[derive(Parser, Debug)]
#[command(name = stratum_common::constants::BIN_NAME, version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,

    /// Configuration file. Defaults to `stratum.config.json` in the root module.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log at debug level unless `RUST_LOG` says otherwise.
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Available CLI subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// List every module of the graph, dependencies first.
    Modules(modules::ModulesArgs),
    /// Validate and merge every module document into one.
    Merge(merge::MergeArgs),
}

/// Dispatches the parsed CLI command to its handler.
///
/// # Errors
///
/// Returns an error if the command execution fails.
pub async fn execute(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Modules(args) => modules::execute(args, cli.config.as_deref()).await,
        Command::Merge(args) => merge::execute(args, cli.config.as_deref()).await,
    }
}

/// Loads the configuration named on the command line, or the one next to `root`.
pub(crate) fn load_config(explicit: Option<&Path>, root: &Path) -> anyhow::Result<StratumConfig> {
    match explicit {
        Some(path) => StratumConfig::load(path)
            .with_context(|| format!("cannot load configuration {}", path.display())),
        None => StratumConfig::discover(root)
            .with_context(|| format!("cannot load configuration under {}", root.display())),
    }
}
