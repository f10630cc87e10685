//! Keyword definitions.
//!
//! A keyword is a reserved document key backed by a plugin. The plugin
//! provides two async factories producing a [`Validator`] and a [`Processor`]
//! scoped to one module. Factories see every module's document, so they can
//! pre-load whatever cross-module data their handlers need.

use std::path::Path;

use async_trait::async_trait;
use stratum_common::error::BoxError;
use stratum_tree::{Processor, Validator};

use crate::documents::ModuleDocuments;

/// What a keyword factory gets to see.
#[derive(Debug, Clone, Copy)]
pub struct KeywordContext<'a> {
    /// Root directory of the module graph.
    pub root_dir: &'a Path,
    /// Module whose document the handler will run over.
    pub module: &'a str,
    /// Every module's document, keyed by module name.
    pub documents: &'a ModuleDocuments,
}

/// A registered keyword plugin.
#[async_trait]
pub trait KeywordDefinition: Send + Sync {
    /// The reserved document key this plugin handles.
    fn keyword(&self) -> &str;

    /// Builds the validator used for `ctx.module`'s document.
    ///
    /// # Errors
    ///
    /// Returns an error if the validator cannot be prepared.
    async fn validator(&self, ctx: &KeywordContext<'_>) -> Result<Box<dyn Validator>, BoxError>;

    /// Builds the processor used for `ctx.module`'s document.
    ///
    /// # Errors
    ///
    /// Returns an error if the processor cannot be prepared.
    async fn processor(&self, ctx: &KeywordContext<'_>) -> Result<Box<dyn Processor>, BoxError>;
}
