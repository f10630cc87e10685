//! Memoized module loading.
//!
//! Every location is loaded at most once per [`Loader`]: concurrent requests
//! for the same normalized location share one in-flight read and receive the
//! same [`Arc`]. Diamond dependencies therefore collapse to a single node.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::future::try_join_all;
use stratum_common::config::StratumConfig;
use stratum_common::error::StratumError;
use stratum_common::types::Module;
use tokio::sync::{Mutex, OnceCell};

use crate::error::GraphError;
use crate::graph::ModuleGraph;
use crate::manifest::ManifestSource;

/// A module read from disk together with its resolved dependency locations.
#[derive(Debug)]
pub struct LoadedModule {
    /// The module itself, without namespace claims.
    pub module: Module,
    /// Normalized dependency locations, in declaration order.
    pub dependencies: Vec<PathBuf>,
}

type Slot = Arc<OnceCell<Option<Arc<LoadedModule>>>>;

/// Loads modules and discovers the dependency graph under a root.
#[derive(Debug)]
pub struct Loader {
    config: StratumConfig,
    manifests: Arc<dyn ManifestSource>,
    slots: Mutex<HashMap<PathBuf, Slot>>,
}

impl Loader {
    /// Creates a loader reading manifests through `manifests`.
    pub fn new(config: StratumConfig, manifests: Arc<dyn ManifestSource>) -> Self {
        Self {
            config,
            manifests,
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the configuration this loader was built with.
    pub const fn config(&self) -> &StratumConfig {
        &self.config
    }

    /// Loads the module at `location`.
    ///
    /// Returns `Ok(None)` when the location is not a module; such a location
    /// and everything below it is pruned from the graph. A non-module root is
    /// an error instead.
    ///
    /// # Errors
    ///
    /// Returns an error if the manifest cannot be read or is invalid, if a
    /// dependency cannot be located, or if a root location is not a module.
    pub async fn load_node(
        &self,
        location: &Path,
        is_root: bool,
    ) -> Result<Option<Arc<LoadedModule>>, GraphError> {
        let location = normalize(location).await?;
        let slot = {
            let mut slots = self.slots.lock().await;
            Arc::clone(slots.entry(location.clone()).or_default())
        };
        let loaded = slot
            .get_or_try_init(|| self.read_node(&location, is_root))
            .await?;
        if is_root && loaded.is_none() {
            return Err(self.not_a_module(location));
        }
        Ok(loaded.clone())
    }

    async fn read_node(
        &self,
        location: &Path,
        is_root: bool,
    ) -> Result<Option<Arc<LoadedModule>>, GraphError> {
        let manifest_path = location.join(&self.config.manifest_file);
        tracing::debug!(path = %manifest_path.display(), "reading manifest");
        let manifest = match self.manifests.read(&manifest_path).await? {
            Some(manifest) if manifest.is_module(&self.config.marker_field) => {
                manifest.decode(&manifest_path)?
            }
            _ if is_root => return Err(self.not_a_module(location.to_path_buf())),
            _ => {
                tracing::debug!(location = %location.display(), "not a module, pruning");
                return Ok(None);
            }
        };

        let required = |field: &str, value: Option<&String>| {
            value.cloned().ok_or_else(|| GraphError::InvalidManifest {
                path: manifest_path.clone(),
                message: format!("missing \"{field}\""),
            })
        };
        let name = required("name", manifest.name.as_ref())?;
        let version = required("version", manifest.version.as_ref())?;

        let mut dependencies = Vec::new();
        for dependency in manifest.dependency_names() {
            dependencies.push(self.resolve_dependency(location, dependency).await?);
        }

        Ok(Some(Arc::new(LoadedModule {
            module: Module::new(name, version, location, is_root),
            dependencies,
        })))
    }

    /// Finds `name` in the nearest packages directory at or above `from`.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::PackageNotFound`] if the filesystem root is
    /// reached without a match.
    pub async fn resolve_dependency(&self, from: &Path, name: &str) -> Result<PathBuf, GraphError> {
        for dir in from.ancestors() {
            let candidate = dir.join(&self.config.packages_dir).join(name);
            let is_dir = tokio::fs::metadata(&candidate)
                .await
                .is_ok_and(|meta| meta.is_dir());
            if is_dir {
                return normalize(&candidate).await;
            }
        }
        Err(GraphError::PackageNotFound {
            name: name.to_owned(),
            from: from.to_path_buf(),
            packages_dir: self.config.packages_dir.clone(),
        })
    }

    /// Discovers every module reachable from `root` and builds the graph.
    ///
    /// Each breadth-first level is loaded concurrently.
    ///
    /// # Errors
    ///
    /// Returns the first fatal error; no partial graph is produced.
    pub async fn discover(&self, root: &Path) -> Result<ModuleGraph, GraphError> {
        let root = self
            .load_node(root, true)
            .await?
            .ok_or_else(|| self.not_a_module(root.to_path_buf()))?;
        tracing::info!(root = %root.module.location.display(), "discovering module graph");

        let mut seen: HashSet<PathBuf> = HashSet::from([root.module.location.clone()]);
        let mut discovered = vec![Arc::clone(&root)];
        let mut frontier = vec![root];
        while !frontier.is_empty() {
            let wanted: Vec<&PathBuf> = frontier
                .iter()
                .flat_map(|node| node.dependencies.iter())
                .filter(|location| seen.insert((*location).clone()))
                .collect();
            let loaded = try_join_all(wanted.into_iter().map(|loc| self.load_node(loc, false))).await?;
            let next: Vec<Arc<LoadedModule>> = loaded.into_iter().flatten().collect();
            discovered.extend(next.iter().cloned());
            frontier = next;
        }

        ModuleGraph::build(&discovered)
    }

    fn not_a_module(&self, location: PathBuf) -> GraphError {
        GraphError::NotAModule {
            location,
            marker: self.config.marker_field.clone(),
        }
    }
}

/// Normalizes a location so the same directory always maps to one key.
pub(crate) async fn normalize(path: &Path) -> Result<PathBuf, GraphError> {
    tokio::fs::canonicalize(path)
        .await
        .map_err(|e| StratumError::io(path, e).into())
}
