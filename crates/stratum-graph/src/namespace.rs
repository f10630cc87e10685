//! Namespace claims and ownership resolution.
//!
//! Modules claim names (route paths, parameter names, ...) in categories.
//! When several modules claim the same name, a claimant that has another
//! claimant among its transitive dependencies is shadowed by it: a
//! descendant may override a claim inherited from an ancestor. If more than
//! one claimant survives, the claim is a genuine collision between
//! unrelated modules.

use std::collections::BTreeMap;

use async_trait::async_trait;
use futures::future::join_all;
use stratum_common::error::BoxError;
use stratum_common::types::{Module, ModuleName};

use crate::error::{NamespaceConflict, NamespaceError};
use crate::graph::ModuleGraph;

/// Scans one module for the names it claims in a single category.
///
/// Scans of different modules run concurrently, so an implementation must
/// only depend on the module it is given.
#[async_trait]
pub trait NamespaceLoader: Send + Sync {
    /// Returns every name `module` claims.
    ///
    /// # Errors
    ///
    /// Any error aborts namespace resolution.
    async fn scan(&self, module: &Module) -> Result<Vec<String>, BoxError>;
}

/// Scanners keyed by namespace category.
pub type NamespaceLoaders = BTreeMap<String, Box<dyn NamespaceLoader>>;

/// Resolved owner of every claimed name, per category.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NamespaceTable {
    owners: BTreeMap<String, BTreeMap<String, ModuleName>>,
}

impl NamespaceTable {
    /// Returns the module owning `name` in `category`.
    pub fn owner(&self, category: &str, name: &str) -> Option<&ModuleName> {
        self.owners.get(category)?.get(name)
    }

    /// Iterates over the resolved names of one category.
    pub fn claims(&self, category: &str) -> impl Iterator<Item = (&str, &ModuleName)> {
        self.owners
            .get(category)
            .into_iter()
            .flat_map(|names| names.iter().map(|(name, owner)| (name.as_str(), owner)))
    }

    /// Iterates over `(category, name, owner)` for every resolved claim.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str, &ModuleName)> {
        self.owners.iter().flat_map(|(category, names)| {
            names
                .iter()
                .map(move |(name, owner)| (category.as_str(), name.as_str(), owner))
        })
    }
}

/// Runs every scanner once per module and records the claims on each module.
///
/// Claims recorded by earlier scans are dropped first, so afterwards every
/// module carries exactly the categories in `loaders`.
///
/// # Errors
///
/// Returns the first scan failure in module order. The graph is left
/// untouched on failure.
pub async fn scan_namespaces(
    graph: &mut ModuleGraph,
    loaders: &NamespaceLoaders,
) -> Result<(), NamespaceError> {
    let scans = {
        let graph = &*graph;
        let pending = graph.modules().flat_map(move |module| {
            loaders.iter().map(move |(category, loader)| async move {
                (category, module.name.clone(), loader.scan(module).await)
            })
        });
        join_all(pending).await
    };

    let mut claims = Vec::with_capacity(scans.len());
    for (category, module, result) in scans {
        let names = result.map_err(|source| NamespaceError::Scan {
            category: category.clone(),
            module: module.clone(),
            source,
        })?;
        let mut unique: Vec<String> = Vec::with_capacity(names.len());
        for name in names {
            if !unique.contains(&name) {
                unique.push(name);
            }
        }
        tracing::debug!(%module, category = %category, claims = unique.len(), "namespace scanned");
        claims.push((category, module, unique));
    }

    for module in graph.modules_mut() {
        module.namespaces.clear();
    }
    for (category, module, unique) in claims {
        if let Some(target) = graph.module_mut(module.as_str()) {
            let _ = target.namespaces.insert(category.clone(), unique);
        }
    }
    Ok(())
}

/// Resolves the owner of every name claimed by the modules of `graph`.
///
/// # Errors
///
/// Returns every unresolved conflict across all categories at once.
pub fn resolve_claims(graph: &ModuleGraph) -> Result<NamespaceTable, NamespaceError> {
    let mut claims: BTreeMap<&str, BTreeMap<&str, Vec<&ModuleName>>> = BTreeMap::new();
    for module in graph.modules() {
        for (category, names) in &module.namespaces {
            let by_name = claims.entry(category.as_str()).or_default();
            for name in names {
                by_name.entry(name.as_str()).or_default().push(&module.name);
            }
        }
    }

    let mut table = NamespaceTable::default();
    let mut conflicts = Vec::new();
    for (category, by_name) in claims {
        for (name, claimants) in by_name {
            let survivors: Vec<&ModuleName> = claimants
                .iter()
                .copied()
                .filter(|claimant| {
                    !claimants
                        .iter()
                        .any(|other| graph.is_descendant(claimant.as_str(), other.as_str()))
                })
                .collect();
            if let [owner] = survivors.as_slice() {
                let _ = table
                    .owners
                    .entry(category.to_owned())
                    .or_default()
                    .insert(name.to_owned(), (*owner).clone());
            } else {
                conflicts.push(NamespaceConflict {
                    category: category.to_owned(),
                    name: name.to_owned(),
                    claimants: survivors.into_iter().cloned().collect(),
                });
            }
        }
    }

    if conflicts.is_empty() {
        Ok(table)
    } else {
        tracing::warn!(count = conflicts.len(), "unresolved namespace conflicts");
        Err(NamespaceError::Conflicts(conflicts))
    }
}

/// Scans every module and resolves namespace ownership.
///
/// # Errors
///
/// Returns an error if a scan fails or if any claim stays contested.
pub async fn resolve_namespaces(
    graph: &mut ModuleGraph,
    loaders: &NamespaceLoaders,
) -> Result<NamespaceTable, NamespaceError> {
    scan_namespaces(graph, loaders).await?;
    resolve_claims(graph)
}
