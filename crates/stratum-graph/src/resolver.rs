//! Lazily built module graphs and the caller-owned resolver registry.
//!
//! A [`Resolver`] builds its graph on first use and serves the cached graph
//! afterwards. A [`Registry`] hands out one resolver per normalized root
//! path; callers own it and reset it between independent runs.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use stratum_common::config::StratumConfig;
use stratum_common::types::Module;
use tokio::sync::Mutex;

use crate::error::{GraphError, NamespaceError};
use crate::graph::ModuleGraph;
use crate::loader::{Loader, normalize};
use crate::manifest::{DiskManifests, ManifestSource};
use crate::namespace::{self, NamespaceLoaders, NamespaceTable};

/// Graph resolver for a single root.
#[derive(Debug)]
pub struct Resolver {
    root: PathBuf,
    loader: Loader,
    graph: Mutex<Option<Arc<ModuleGraph>>>,
}

impl Resolver {
    /// Creates a resolver for `root`. Nothing is read until first use.
    pub fn new(
        root: impl Into<PathBuf>,
        config: StratumConfig,
        manifests: Arc<dyn ManifestSource>,
    ) -> Self {
        Self {
            root: root.into(),
            loader: Loader::new(config, manifests),
            graph: Mutex::new(None),
        }
    }

    /// Returns the root directory this resolver was created for.
    pub fn root_dir(&self) -> &Path {
        &self.root
    }

    /// Returns the configuration used for discovery.
    pub const fn config(&self) -> &StratumConfig {
        self.loader.config()
    }

    /// Returns the module graph, building it on first call.
    ///
    /// # Errors
    ///
    /// Returns an error if graph construction fails. A failed build is not
    /// cached; the next call retries.
    pub async fn graph(&self) -> Result<Arc<ModuleGraph>, GraphError> {
        let mut slot = self.graph.lock().await;
        self.cached(&mut slot).await
    }

    async fn cached(
        &self,
        slot: &mut Option<Arc<ModuleGraph>>,
    ) -> Result<Arc<ModuleGraph>, GraphError> {
        if let Some(graph) = slot.as_ref() {
            return Ok(Arc::clone(graph));
        }
        let graph = Arc::new(self.loader.discover(&self.root).await?);
        *slot = Some(Arc::clone(&graph));
        Ok(graph)
    }

    /// Lists every module, parents before children.
    ///
    /// # Errors
    ///
    /// Returns an error if graph construction fails.
    pub async fn list_modules(&self) -> Result<Vec<Module>, GraphError> {
        Ok(self.graph().await?.modules().cloned().collect())
    }

    /// Returns the named module, if it is part of the graph.
    ///
    /// # Errors
    ///
    /// Returns an error if graph construction fails.
    pub async fn get_module(&self, name: &str) -> Result<Option<Module>, GraphError> {
        Ok(self.graph().await?.module(name).cloned())
    }

    /// Returns the root module.
    ///
    /// # Errors
    ///
    /// Returns an error if graph construction fails.
    pub async fn get_root(&self) -> Result<Module, GraphError> {
        Ok(self.graph().await?.root().clone())
    }

    /// Scans namespaces for every module and resolves their owners.
    ///
    /// On success the cached graph is replaced by one whose modules carry
    /// the claims of exactly the categories in `loaders`. Concurrent calls
    /// are serialized.
    ///
    /// # Errors
    ///
    /// Returns an error if the graph cannot be built, a scan fails, or any
    /// claim stays contested.
    pub async fn resolve_namespaces(
        &self,
        loaders: &NamespaceLoaders,
    ) -> Result<NamespaceTable, NamespaceError> {
        let mut slot = self.graph.lock().await;
        let mut annotated = (*self.cached(&mut slot).await?).clone();
        let table = namespace::resolve_namespaces(&mut annotated, loaders).await?;
        *slot = Some(Arc::new(annotated));
        Ok(table)
    }
}

/// Caller-owned cache of resolvers keyed by normalized root path.
#[derive(Debug)]
pub struct Registry {
    config: StratumConfig,
    manifests: Arc<dyn ManifestSource>,
    resolvers: Mutex<HashMap<PathBuf, Arc<Resolver>>>,
}

impl Registry {
    /// Creates a registry reading manifests from disk.
    pub fn new(config: StratumConfig) -> Self {
        Self::with_manifests(config, Arc::new(DiskManifests))
    }

    /// Creates a registry reading manifests through `manifests`.
    pub fn with_manifests(config: StratumConfig, manifests: Arc<dyn ManifestSource>) -> Self {
        Self {
            config,
            manifests,
            resolvers: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the resolver for `root`, creating it on first request.
    ///
    /// # Errors
    ///
    /// Returns an error if `root` cannot be normalized.
    pub async fn resolver(&self, root: &Path) -> Result<Arc<Resolver>, GraphError> {
        let root = normalize(root).await?;
        let mut resolvers = self.resolvers.lock().await;
        let resolver = resolvers.entry(root.clone()).or_insert_with(|| {
            tracing::debug!(root = %root.display(), "creating resolver");
            Arc::new(Resolver::new(
                root.clone(),
                self.config.clone(),
                Arc::clone(&self.manifests),
            ))
        });
        Ok(Arc::clone(resolver))
    }

    /// Drops the cached resolver for `root`. Returns `true` if one existed.
    ///
    /// # Errors
    ///
    /// Returns an error if `root` cannot be normalized.
    pub async fn forget(&self, root: &Path) -> Result<bool, GraphError> {
        let root = normalize(root).await?;
        Ok(self.resolvers.lock().await.remove(&root).is_some())
    }

    /// Drops every cached resolver.
    pub async fn reset(&self) {
        self.resolvers.lock().await.clear();
    }

    /// Number of cached resolvers.
    pub async fn len(&self) -> usize {
        self.resolvers.lock().await.len()
    }

    /// Returns `true` if no resolver is cached.
    pub async fn is_empty(&self) -> bool {
        self.resolvers.lock().await.is_empty()
    }
}
