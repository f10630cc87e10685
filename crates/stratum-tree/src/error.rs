//! Errors raised while interpreting keyword trees.

use stratum_common::error::BoxError;
use thiserror::Error;

use crate::node::TreePath;

/// A keyword error together with the document path it originated at.
#[derive(Debug, Error)]
#[error("at {path}: {source}")]
pub struct PathError {
    /// Path of the object node holding the keyword.
    pub path: TreePath,
    /// Error reported by the keyword validator.
    pub source: BoxError,
}

impl PathError {
    /// Wraps an error with the path it was raised at.
    pub fn new(path: TreePath, source: impl Into<BoxError>) -> Self {
        Self {
            path,
            source: source.into(),
        }
    }
}

/// Fatal fault that aborts a process pass.
#[derive(Debug, Error)]
pub enum ProcessError {
    /// More than one keyword asked to replace the same object.
    #[error(
        "at {path}: ambiguous ownership of object, keywords {} each replace the whole object",
        .keywords.join(", ")
    )]
    AmbiguousObject {
        /// Path of the contested object.
        path: TreePath,
        /// Every keyword that returned an object replacement, in registration order.
        keywords: Vec<String>,
    },

    /// A keyword processor failed.
    #[error("at {path}: keyword \"{keyword}\" failed: {source}")]
    Keyword {
        /// Path of the object node holding the keyword.
        path: TreePath,
        /// Keyword whose processor failed.
        keyword: String,
        /// Underlying processor error.
        source: BoxError,
    },
}
