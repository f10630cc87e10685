//! Module dependency graph built on `petgraph`.
//!
//! Edges point from a module to each of its dependencies (parent to child).
//! The graph keeps a stable parents-before-children order: among modules
//! that are ready at the same time, the one discovered first comes first,
//! so siblings keep their declaration order.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BinaryHeap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use stratum_common::types::{Module, ModuleName};

use crate::error::GraphError;
use crate::loader::LoadedModule;

/// The resolved module dependency graph.
#[derive(Debug, Clone)]
pub struct ModuleGraph {
    graph: DiGraph<Module, ()>,
    root: NodeIndex,
    by_location: HashMap<PathBuf, NodeIndex>,
    by_name: HashMap<ModuleName, NodeIndex>,
    order: Vec<NodeIndex>,
}

impl ModuleGraph {
    /// Builds the graph from modules in discovery order, root first.
    ///
    /// # Errors
    ///
    /// Returns an error if two locations declare the same module name, or if
    /// the dependencies form a cycle.
    pub fn build(discovered: &[Arc<LoadedModule>]) -> Result<Self, GraphError> {
        check_duplicates(discovered)?;

        let mut graph = DiGraph::with_capacity(discovered.len(), discovered.len());
        let mut by_location = HashMap::with_capacity(discovered.len());
        let mut by_name = HashMap::with_capacity(discovered.len());
        for loaded in discovered {
            let idx = graph.add_node(loaded.module.clone());
            let _ = by_location.insert(loaded.module.location.clone(), idx);
            let _ = by_name.insert(loaded.module.name.clone(), idx);
        }
        for loaded in discovered {
            let parent = by_location[&loaded.module.location];
            for location in &loaded.dependencies {
                if let Some(&child) = by_location.get(location) {
                    let _ = graph.update_edge(parent, child, ());
                }
            }
        }

        let root = NodeIndex::new(0);
        let order = parents_first(&graph)?;
        tracing::info!(modules = order.len(), "module graph resolved");
        Ok(Self {
            graph,
            root,
            by_location,
            by_name,
            order,
        })
    }

    /// Returns the root module.
    pub fn root(&self) -> &Module {
        &self.graph[self.root]
    }

    /// Looks up a module by name.
    pub fn module(&self, name: &str) -> Option<&Module> {
        self.by_name.get(name).map(|&idx| &self.graph[idx])
    }

    /// Looks up a module by normalized location.
    pub fn module_at(&self, location: &Path) -> Option<&Module> {
        self.by_location.get(location).map(|&idx| &self.graph[idx])
    }

    /// Returns the location of the named module.
    pub fn location(&self, name: &str) -> Option<&Path> {
        self.module(name).map(|m| m.location.as_path())
    }

    /// Iterates over modules, parents before their children.
    pub fn modules(&self) -> impl Iterator<Item = &Module> {
        self.order.iter().map(|&idx| &self.graph[idx])
    }

    /// Iterates over modules, children before their parents.
    ///
    /// This is the order in which module outputs are merged, so a parent's
    /// declarations override the ones it inherits from its dependencies.
    pub fn modules_children_first(&self) -> impl Iterator<Item = &Module> {
        self.order.iter().rev().map(|&idx| &self.graph[idx])
    }

    /// Direct dependencies of the named module, in declaration order.
    pub fn children(&self, name: &str) -> Vec<&Module> {
        self.neighbors(name, Direction::Outgoing)
    }

    /// Modules that directly depend on the named module.
    pub fn parents(&self, name: &str) -> Vec<&Module> {
        self.neighbors(name, Direction::Incoming)
    }

    fn neighbors(&self, name: &str, direction: Direction) -> Vec<&Module> {
        let Some(&idx) = self.by_name.get(name) else {
            return Vec::new();
        };
        // petgraph lists the most recently added edge first.
        let mut found: Vec<&Module> = self
            .graph
            .neighbors_directed(idx, direction)
            .map(|n| &self.graph[n])
            .collect();
        found.reverse();
        found
    }

    /// Returns `true` if `descendant` is reachable from `ancestor` through
    /// one or more dependency edges.
    pub fn is_descendant(&self, ancestor: &str, descendant: &str) -> bool {
        match (self.by_name.get(ancestor), self.by_name.get(descendant)) {
            (Some(&a), Some(&d)) if a != d => {
                petgraph::algo::has_path_connecting(&self.graph, a, d, None)
            }
            _ => false,
        }
    }

    /// Number of modules in the graph.
    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    /// A built graph always contains its root.
    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    pub(crate) fn modules_mut(&mut self) -> impl Iterator<Item = &mut Module> {
        self.graph.node_weights_mut()
    }

    pub(crate) fn module_mut(&mut self, name: &str) -> Option<&mut Module> {
        let idx = *self.by_name.get(name)?;
        self.graph.node_weight_mut(idx)
    }
}

fn check_duplicates(discovered: &[Arc<LoadedModule>]) -> Result<(), GraphError> {
    let mut locations: BTreeMap<&str, Vec<PathBuf>> = BTreeMap::new();
    for loaded in discovered {
        locations
            .entry(loaded.module.name.as_str())
            .or_default()
            .push(loaded.module.location.clone());
    }
    match locations.into_iter().find(|(_, locs)| locs.len() > 1) {
        Some((name, locations)) => Err(GraphError::DuplicateModule {
            name: name.to_owned(),
            locations,
        }),
        None => Ok(()),
    }
}

/// Kahn's algorithm, always releasing the earliest-discovered ready module.
fn parents_first(graph: &DiGraph<Module, ()>) -> Result<Vec<NodeIndex>, GraphError> {
    let mut indegree: Vec<usize> = graph
        .node_indices()
        .map(|idx| graph.neighbors_directed(idx, Direction::Incoming).count())
        .collect();
    let mut ready: BinaryHeap<Reverse<NodeIndex>> = graph
        .node_indices()
        .filter(|idx| indegree[idx.index()] == 0)
        .map(Reverse)
        .collect();

    let mut order = Vec::with_capacity(graph.node_count());
    while let Some(Reverse(idx)) = ready.pop() {
        order.push(idx);
        for child in graph.neighbors_directed(idx, Direction::Outgoing) {
            indegree[child.index()] -= 1;
            if indegree[child.index()] == 0 {
                ready.push(Reverse(child));
            }
        }
    }

    if order.len() < graph.node_count() {
        let modules = graph
            .node_indices()
            .filter(|idx| indegree[idx.index()] > 0)
            .map(|idx| graph[idx].name.to_string())
            .collect();
        return Err(GraphError::Cycle { modules });
    }
    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{CountingManifests, Fixture};

    fn node(name: &str, location: &str, deps: &[&str]) -> Arc<LoadedModule> {
        Arc::new(LoadedModule {
            module: Module::new(name, "1.0.0", location, false),
            dependencies: deps.iter().map(PathBuf::from).collect(),
        })
    }

    fn names<'a>(modules: impl Iterator<Item = &'a Module>) -> Vec<&'a str> {
        modules.map(|m| m.name.as_str()).collect()
    }

    #[test]
    fn single_root_resolves() {
        let graph = ModuleGraph::build(&[node("app", "/app", &[])]).expect("build");
        assert_eq!(graph.root().name.as_str(), "app");
        assert_eq!(graph.len(), 1);
    }

    #[test]
    fn tree_orders_breadth_first_by_declaration() {
        let graph = ModuleGraph::build(&[
            node("app", "/app", &["/b", "/c"]),
            node("b", "/b", &["/d"]),
            node("c", "/c", &["/e"]),
            node("d", "/d", &[]),
            node("e", "/e", &[]),
        ])
        .expect("build");
        assert_eq!(names(graph.modules()), ["app", "b", "c", "d", "e"]);
        assert_eq!(names(graph.modules_children_first()), ["e", "d", "c", "b", "app"]);
    }

    #[test]
    fn diamond_of_unequal_depth_keeps_parents_first() {
        // app -> b, app -> c, c -> b: b is discovered at depth one but must
        // still come after its parent c.
        let graph = ModuleGraph::build(&[
            node("app", "/app", &["/b", "/c"]),
            node("b", "/b", &[]),
            node("c", "/c", &["/b"]),
        ])
        .expect("build");
        assert_eq!(names(graph.modules()), ["app", "c", "b"]);
    }

    #[test]
    fn children_and_parents_follow_declaration_order() {
        let graph = ModuleGraph::build(&[
            node("app", "/app", &["/x", "/y", "/z"]),
            node("x", "/x", &[]),
            node("y", "/y", &["/z"]),
            node("z", "/z", &[]),
        ])
        .expect("build");
        assert_eq!(names(graph.children("app").into_iter()), ["x", "y", "z"]);
        assert_eq!(names(graph.parents("z").into_iter()), ["app", "y"]);
        assert!(graph.children("missing").is_empty());
    }

    #[test]
    fn descendant_is_transitive_and_strict() {
        let graph = ModuleGraph::build(&[
            node("a", "/a", &["/b", "/d"]),
            node("b", "/b", &["/c"]),
            node("d", "/d", &[]),
            node("c", "/c", &[]),
        ])
        .expect("build");
        assert!(graph.is_descendant("a", "c"));
        assert!(graph.is_descendant("b", "c"));
        assert!(!graph.is_descendant("c", "b"));
        assert!(!graph.is_descendant("b", "d"));
        assert!(!graph.is_descendant("b", "b"));
    }

    #[test]
    fn duplicate_names_fail_naming_every_location() {
        let err = ModuleGraph::build(&[
            node("app", "/app", &["/one/shared", "/two/shared"]),
            node("shared", "/one/shared", &[]),
            node("shared", "/two/shared", &[]),
        ])
        .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("/one/shared"), "got: {msg}");
        assert!(msg.contains("/two/shared"), "got: {msg}");
    }

    #[test]
    fn cycle_detection() {
        let err = ModuleGraph::build(&[
            node("app", "/app", &["/a"]),
            node("a", "/a", &["/b"]),
            node("b", "/b", &["/a"]),
        ])
        .unwrap_err();
        let GraphError::Cycle { modules } = err else {
            panic!("expected a cycle error");
        };
        assert_eq!(modules, ["a", "b"]);
    }

    #[tokio::test]
    async fn discovered_diamond_has_one_shared_node() {
        let fx = Fixture::new();
        let app = fx.module("app", "app", &["left", "right"]);
        let left = fx.module("app/node_modules/left", "left", &["shared"]);
        let _ = fx.module("app/node_modules/right", "right", &["shared"]);
        let shared = fx.module("app/node_modules/shared", "shared", &[]);

        let manifests = Arc::new(CountingManifests::default());
        let loader = crate::loader::Loader::new(
            stratum_common::config::StratumConfig::default(),
            Arc::clone(&manifests) as Arc<dyn crate::manifest::ManifestSource>,
        );
        let graph = loader.discover(&app).await.expect("discover");
        assert_eq!(graph.len(), 4);
        assert_eq!(manifests.reads(), 4);
        assert_eq!(names(graph.parents("shared").into_iter()), ["left", "right"]);
        assert_eq!(names(graph.modules()), ["app", "left", "right", "shared"]);
        assert_eq!(graph.module_at(&shared).map(|m| m.name.as_str()), Some("shared"));
        assert_eq!(graph.location("left"), Some(left.as_path()));
        assert!(graph.module_at(&fx.path("app/node_modules")).is_none());
    }

    #[tokio::test]
    async fn two_directories_with_one_name_fail_discovery() {
        let fx = Fixture::new();
        let app = fx.module("app", "app", &["first", "second"]);
        let first = fx.module("app/node_modules/first", "util", &[]);
        let second = fx.module("app/node_modules/second", "util", &[]);

        let loader = crate::loader::Loader::new(
            stratum_common::config::StratumConfig::default(),
            Arc::new(crate::manifest::DiskManifests),
        );
        let err = loader.discover(&app).await.unwrap_err();
        let GraphError::DuplicateModule { name, locations } = err else {
            panic!("expected a duplicate module error");
        };
        assert_eq!(name, "util");
        assert_eq!(locations, [first, second]);
    }
}
