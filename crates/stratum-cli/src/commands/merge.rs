//! `strat merge`: Validate and merge every module document.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Args;
use stratum_compose::Composer;
use stratum_graph::Registry;

/// Arguments for the `merge` command.
#[derive(Args, Debug)]
pub struct MergeArgs {
    /// Root module directory.
    #[arg(default_value = ".")]
    pub root: PathBuf,

    /// Write the merged document here instead of standard output.
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Executes the `merge` command.
///
/// Documents are merged children first, so a module overrides identically
/// named items it inherits from its dependencies.
///
/// # Errors
///
/// Returns an error if the graph, a document, or the output file cannot be
/// read or written.
#[allow(clippy::print_stdout)]
pub async fn execute(args: MergeArgs, config: Option<&Path>) -> anyhow::Result<()> {
    let config = super::load_config(config, &args.root)?;
    let registry = Registry::new(config);
    let resolver = registry.resolver(&args.root).await?;
    let composer = Composer::new(resolver.root_dir());
    let merged = composer.compose(&resolver).await?;
    let rendered = serde_json::to_string_pretty(&merged)?;

    match args.output {
        Some(path) => {
            tokio::fs::write(&path, format!("{rendered}\n"))
                .await
                .with_context(|| format!("cannot write {}", path.display()))?;
            tracing::info!(path = %path.display(), "merged document written");
        }
        None => println!("{rendered}"),
    }
    Ok(())
}
