//! Domain primitive types used across the Stratum workspace.

use std::borrow::Borrow;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Unique identity of a module within one dependency graph.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ModuleName(String);

impl ModuleName {
    /// Creates a module name from a string value.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the inner string representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ModuleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Borrow<str> for ModuleName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ModuleName {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// A versioned, directory-rooted configuration unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Module {
    /// Unique module name.
    pub name: ModuleName,
    /// Declared version (informational only).
    pub version: String,
    /// Normalized directory of the module.
    pub location: PathBuf,
    /// Claimed names per namespace category.
    pub namespaces: BTreeMap<String, Vec<String>>,
    /// Whether this module is the root of the graph.
    pub is_root: bool,
}

impl Module {
    /// Creates a module with no namespace claims.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        location: impl Into<PathBuf>,
        is_root: bool,
    ) -> Self {
        Self {
            name: ModuleName::new(name),
            version: version.into(),
            location: location.into(),
            namespaces: BTreeMap::new(),
            is_root,
        }
    }

    /// Returns the names this module claims in `category`.
    pub fn claims(&self, category: &str) -> &[String] {
        self.namespaces.get(category).map_or(&[][..], Vec::as_slice)
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.version)
    }
}
