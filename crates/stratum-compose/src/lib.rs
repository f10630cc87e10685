//! # stratum-compose
//!
//! Orchestration of keyword passes over every module of a graph.
//!
//! Handles:
//! - **Keyword**: Registration of keyword definitions and their async factories.
//! - **Documents**: Loading each module's document from disk.
//! - **Pass**: The validate pass (aggregate errors) and the process pass
//!   (children first, fail-fast).
//! - **Merge**: Combining processed documents with parent-wins precedence.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used, clippy::panic))]

pub mod documents;
pub mod error;
pub mod keyword;
pub mod merge;
pub mod pass;

pub use documents::{ModuleDocuments, load_documents};
pub use error::{ComposeError, ValidationFailure};
pub use keyword::{KeywordContext, KeywordDefinition};
pub use merge::{ItemIdentity, ItemKey, Merger};
pub use pass::Composer;
