//! Error types for graph construction and namespace resolution.

use std::fmt;
use std::path::PathBuf;

use stratum_common::error::{BoxError, StratumError};
use stratum_common::types::ModuleName;
use thiserror::Error;

/// Fatal error raised while building the module graph.
///
/// No partial graph is ever returned alongside one of these.
#[derive(Debug, Error)]
pub enum GraphError {
    /// The root location is not a module.
    #[error("{location} is not a module: manifest is missing or has no \"{marker}\" marker")]
    NotAModule {
        /// Location that was expected to be a module.
        location: PathBuf,
        /// Marker field that was looked for.
        marker: String,
    },

    /// No parent directory holds the declared dependency.
    #[error("package \"{name}\" required by {from} was not found in any {packages_dir} directory")]
    PackageNotFound {
        /// Declared dependency name.
        name: String,
        /// Location of the declaring module.
        from: PathBuf,
        /// Packages directory that was searched.
        packages_dir: String,
    },

    /// Two or more locations declare the same module name.
    #[error("module \"{name}\" is declared at multiple locations: {}", display_paths(.locations))]
    DuplicateModule {
        /// Shared module name.
        name: String,
        /// Every location declaring it.
        locations: Vec<PathBuf>,
    },

    /// Modules depend on each other in a loop.
    #[error("dependency cycle between modules: {}", .modules.join(", "))]
    Cycle {
        /// Modules left unordered by the cycle.
        modules: Vec<String>,
    },

    /// A manifest could not be parsed or lacks a required field.
    #[error("invalid manifest {path}: {message}")]
    InvalidManifest {
        /// Manifest file path.
        path: PathBuf,
        /// What is wrong with it.
        message: String,
    },

    /// Shared workspace error (I/O and friends).
    #[error(transparent)]
    Common(#[from] StratumError),
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// One namespaced name claimed by modules with no descendant relation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceConflict {
    /// Namespace category.
    pub category: String,
    /// Contested name.
    pub name: String,
    /// Every tied claimant.
    pub claimants: Vec<ModuleName>,
}

impl fmt::Display for NamespaceConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let claimants: Vec<&str> = self.claimants.iter().map(ModuleName::as_str).collect();
        write!(
            f,
            "{} \"{}\" is claimed by unrelated modules: {}",
            self.category,
            self.name,
            claimants.join(", ")
        )
    }
}

/// Error raised while scanning or resolving namespace claims.
#[derive(Debug, Error)]
pub enum NamespaceError {
    /// A scan callback failed.
    #[error("namespace scan \"{category}\" failed for module {module}: {source}")]
    Scan {
        /// Category being scanned.
        category: String,
        /// Module being scanned.
        module: ModuleName,
        /// Underlying callback error.
        source: BoxError,
    },

    /// Every unresolved conflict across all categories.
    #[error("unresolved namespace conflicts:\n{}", display_conflicts(.0))]
    Conflicts(Vec<NamespaceConflict>),

    /// The graph could not be built.
    #[error(transparent)]
    Graph(#[from] GraphError),
}

fn display_conflicts(conflicts: &[NamespaceConflict]) -> String {
    conflicts
        .iter()
        .map(|c| format!("  {c}"))
        .collect::<Vec<_>>()
        .join("\n")
}
