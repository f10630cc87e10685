//! # stratum-graph
//!
//! Discovery and resolution of the module dependency graph.
//!
//! Handles:
//! - **Manifest**: Reading module manifests and deriving dependency sets.
//! - **Loader**: Memoized per-location loading and upward dependency lookup.
//! - **Graph**: Duplicate detection and parents-before-children ordering.
//! - **Namespace**: Claim scanning and ancestry-based ownership resolution.
//! - **Resolver**: Lazily built graphs cached in a caller-owned [`Registry`](resolver::Registry).

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used, clippy::panic))]

pub mod error;
pub mod graph;
pub mod loader;
pub mod manifest;
pub mod namespace;
pub mod resolver;

#[cfg(test)]
pub(crate) mod fixture;

pub use error::{GraphError, NamespaceConflict, NamespaceError};
pub use graph::ModuleGraph;
pub use loader::{LoadedModule, Loader};
pub use manifest::{DiskManifests, Manifest, ManifestSource, ModuleManifest};
pub use namespace::{NamespaceLoader, NamespaceLoaders, NamespaceTable};
pub use resolver::{Registry, Resolver};
