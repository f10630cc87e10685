//! `strat modules`: List the modules of a graph.

use std::path::{Path, PathBuf};

use clap::Args;
use stratum_graph::Registry;

use crate::output;

/// Arguments for the `modules` command.
#[derive(Args, Debug)]
pub struct ModulesArgs {
    /// Root module directory.
    #[arg(default_value = ".")]
    pub root: PathBuf,
}

/// Executes the `modules` command.
///
/// Builds the module graph and prints every module, dependencies before
/// the modules that depend on them.
///
/// # Errors
///
/// Returns an error if the configuration or the graph cannot be loaded.
#[allow(clippy::print_stdout)]
pub async fn execute(args: ModulesArgs, config: Option<&Path>) -> anyhow::Result<()> {
    let config = super::load_config(config, &args.root)?;
    let registry = Registry::new(config);
    let resolver = registry.resolver(&args.root).await?;
    let graph = resolver.graph().await?;

    let rows: Vec<[String; 3]> = graph
        .modules_children_first()
        .map(|module| {
            let name = if module.is_root {
                format!("{} (root)", module.name)
            } else {
                module.name.to_string()
            };
            [
                name,
                module.version.clone(),
                output::relative_to(resolver.root_dir(), &module.location),
            ]
        })
        .collect();

    print!("{}", output::table(&["MODULE", "VERSION", "LOCATION"], &rows));
    println!();
    println!("  {} module(s).", graph.len());
    Ok(())
}
