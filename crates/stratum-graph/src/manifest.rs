//! Module manifests.
//!
//! A manifest is a JSON object living in every module directory. A marked
//! manifest names the module, carries its version, and lists dependency
//! names. Version ranges are never interpreted: a dependency entry only
//! signals presence.

use std::fmt;
use std::path::Path;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};
use stratum_common::error::StratumError;

use crate::error::GraphError;

/// A manifest file as read from disk.
///
/// Only the top-level shape is checked on read. Fields are decoded by
/// [`Manifest::decode`], which the loader calls for marked manifests only,
/// so an unrelated `package.json` never fails discovery.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Manifest {
    fields: Map<String, Value>,
}

impl Manifest {
    /// Parses a manifest from its JSON text.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not a JSON object.
    pub fn parse(path: &Path, content: &str) -> Result<Self, GraphError> {
        let fields = serde_json::from_str(content).map_err(|e| invalid(path, &e))?;
        Ok(Self { fields })
    }

    /// Returns `true` if the manifest carries a non-null `marker` field.
    pub fn is_module(&self, marker: &str) -> bool {
        self.fields.get(marker).is_some_and(|value| !value.is_null())
    }

    /// Raw top-level fields.
    pub const fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Decodes the fields a module manifest must carry.
    ///
    /// # Errors
    ///
    /// Returns an error if a known field has the wrong type.
    pub fn decode(&self, path: &Path) -> Result<ModuleManifest, GraphError> {
        serde_json::from_value(Value::Object(self.fields.clone())).map_err(|e| invalid(path, &e))
    }
}

fn invalid(path: &Path, error: &serde_json::Error) -> GraphError {
    GraphError::InvalidManifest {
        path: path.to_path_buf(),
        message: error.to_string(),
    }
}

/// Typed fields of a marked manifest.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleManifest {
    /// Module name.
    pub name: Option<String>,
    /// Module version.
    pub version: Option<String>,
    /// Runtime dependencies.
    #[serde(default)]
    pub dependencies: Map<String, Value>,
    /// Build-only dependencies.
    #[serde(default)]
    pub dev_dependencies: Map<String, Value>,
    /// Peer dependencies.
    #[serde(default)]
    pub peer_dependencies: Map<String, Value>,
}

impl ModuleManifest {
    /// Dependency names to follow, in declaration order.
    ///
    /// Runtime dependencies come first. A build-only dependency is followed
    /// only when it is re-declared as a peer dependency.
    pub fn dependency_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.dependencies.keys().map(String::as_str).collect();
        for name in self.dev_dependencies.keys() {
            if self.peer_dependencies.contains_key(name) && !self.dependencies.contains_key(name)
            {
                names.push(name);
            }
        }
        names
    }
}

/// Reads manifests for the loader.
#[async_trait]
pub trait ManifestSource: fmt::Debug + Send + Sync {
    /// Reads the manifest at `path`. Returns `Ok(None)` if there is none.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    async fn read(&self, path: &Path) -> Result<Option<Manifest>, GraphError>;
}

/// Reads manifests from the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiskManifests;

#[async_trait]
impl ManifestSource for DiskManifests {
    async fn read(&self, path: &Path) -> Result<Option<Manifest>, GraphError> {
        let content = match tokio::fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StratumError::io(path, e).into()),
        };
        Manifest::parse(path, &content).map(Some)
    }
}
