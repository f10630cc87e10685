//! System-wide constants and default file names.

/// Default manifest file name inside every module directory.
pub const DEFAULT_MANIFEST_FILE: &str = "package.json";

/// Default manifest key whose presence marks a directory as a module.
pub const DEFAULT_MARKER_FIELD: &str = "stratum";

/// Default directory searched upward for installed dependencies.
pub const DEFAULT_PACKAGES_DIR: &str = "node_modules";

/// Default per-module document file name.
pub const DEFAULT_DOCUMENT_FILE: &str = "stratum.json";

/// Optional configuration file looked up at the root of a module tree.
pub const CONFIG_FILE: &str = "stratum.config.json";

/// Binary name for the CLI.
pub const BIN_NAME: &str = "strat";
