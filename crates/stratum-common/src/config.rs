//! Global configuration model for module discovery and composition.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::constants;
use crate::error::{Result, StratumError};

/// Root configuration for a Stratum run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StratumConfig {
    /// Manifest file name inside each module directory.
    pub manifest_file: String,
    /// Manifest key marking a directory as a module.
    pub marker_field: String,
    /// Directory name searched upward when resolving dependencies.
    pub packages_dir: String,
    /// Module document file, relative to the module directory.
    pub document_file: String,
}

impl Default for StratumConfig {
    fn default() -> Self {
        Self {
            manifest_file: constants::DEFAULT_MANIFEST_FILE.into(),
            marker_field: constants::DEFAULT_MARKER_FIELD.into(),
            packages_dir: constants::DEFAULT_PACKAGES_DIR.into(),
            document_file: constants::DEFAULT_DOCUMENT_FILE.into(),
        }
    }
}

impl StratumConfig {
    /// Reads a configuration file. Missing keys fall back to their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid JSON,
    /// or if a field is empty.
    pub fn load(path: &Path) -> Result<Self> {
        tracing::debug!(path = %path.display(), "loading configuration");
        let content = std::fs::read_to_string(path).map_err(|e| StratumError::io(path, e))?;
        let config: Self = serde_json::from_str(&content)?;
        config.check()?;
        Ok(config)
    }

    /// Loads `stratum.config.json` from `root` when present, defaults otherwise.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be loaded.
    pub fn discover(root: &Path) -> Result<Self> {
        let candidate = root.join(constants::CONFIG_FILE);
        if candidate.is_file() {
            Self::load(&candidate)
        } else {
            Ok(Self::default())
        }
    }

    fn check(&self) -> Result<()> {
        let fields = [
            ("manifestFile", &self.manifest_file),
            ("markerField", &self.marker_field),
            ("packagesDir", &self.packages_dir),
            ("documentFile", &self.document_file),
        ];
        for (key, value) in fields {
            if value.trim().is_empty() {
                return Err(StratumError::Config {
                    message: format!("\"{key}\" must not be empty"),
                });
            }
        }
        Ok(())
    }
}
