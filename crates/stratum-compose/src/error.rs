//! Orchestration errors.
//!
//! Validation problems are aggregated so a single run reports all of them.
//! Everything else is fatal and stops the pass it occurred in.

use std::fmt;
use std::path::PathBuf;

use stratum_common::error::{BoxError, StratumError};
use stratum_common::types::ModuleName;
use stratum_graph::GraphError;
use stratum_tree::{PathError, ProcessError};
use thiserror::Error;

/// Every validation error found in one module's document.
#[derive(Debug)]
pub struct ValidationFailure {
    /// Module whose document failed.
    pub module: ModuleName,
    /// Errors in document traversal order.
    pub errors: Vec<PathError>,
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, error) in self.errors.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "  {}: {error}", self.module)?;
        }
        Ok(())
    }
}

/// Error raised by the validate or process pass.
#[derive(Debug, Error)]
pub enum ComposeError {
    /// One or more documents failed keyword validation.
    #[error("validation failed with {} error(s):\n{}", count_errors(.0), display_failures(.0))]
    Validation(Vec<ValidationFailure>),

    /// A keyword factory could not build its validator or processor.
    #[error("keyword \"{keyword}\" could not be prepared for module {module}: {source}")]
    Factory {
        /// Keyword whose factory failed.
        keyword: String,
        /// Module the handler was built for.
        module: ModuleName,
        /// Underlying factory error.
        source: BoxError,
    },

    /// Processing a module's document failed.
    #[error("processing module {module} failed: {source}")]
    Process {
        /// Module being processed.
        module: ModuleName,
        /// Underlying structural fault.
        source: ProcessError,
    },

    /// A processed document could not be merged.
    #[error("cannot merge output of module {module}: {message}")]
    Merge {
        /// Module whose output was rejected.
        module: ModuleName,
        /// What is wrong with it.
        message: String,
    },

    /// A module document is not valid JSON.
    #[error("invalid document {path}: {source}")]
    Document {
        /// Document file path.
        path: PathBuf,
        /// Underlying parse error.
        source: serde_json::Error,
    },

    /// The module graph could not be built.
    #[error(transparent)]
    Graph(#[from] GraphError),

    /// Shared workspace error (I/O and friends).
    #[error(transparent)]
    Common(#[from] StratumError),
}

fn count_errors(failures: &[ValidationFailure]) -> usize {
    failures.iter().map(|f| f.errors.len()).sum()
}

fn display_failures(failures: &[ValidationFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}
