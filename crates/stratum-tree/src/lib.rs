//! # stratum-tree
//!
//! Immutable JSON trees and the keyword interpreter that runs over them.
//!
//! Handles:
//! - **Node**: Parsing plain JSON into a parent-linked [`Tree`] with path reconstruction.
//! - **Interpret**: The two tree walks, [`validate`] (collects every error) and
//!   [`process`] (rewrites the tree into plain data, fail-fast).
//! - **Error**: Path-carrying error types for both walks.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used, clippy::panic))]

pub mod error;
pub mod interpret;
pub mod node;

pub use error::{PathError, ProcessError};
pub use interpret::{
    Keywords, Processor, Processors, Replacement, Validator, Validators, process, validate,
};
pub use node::{Node, NodeKind, PathSegment, Tree, TreePath};
