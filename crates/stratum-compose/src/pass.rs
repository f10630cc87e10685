//! Validate and process passes over module documents.
//!
//! The validate pass reports every problem in a document at once. The
//! process pass runs module by module, children first, and stops at the
//! first structural fault. Whether a failure is aggregated or fatal is
//! decided here and nowhere else.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use futures::future::try_join_all;
use serde_json::{Map, Value};
use stratum_common::types::ModuleName;
use stratum_graph::Resolver;
use stratum_tree::{Processors, Tree, Validators};

use crate::documents::{ModuleDocuments, load_documents};
use crate::error::{ComposeError, ValidationFailure};
use crate::keyword::{KeywordContext, KeywordDefinition};
use crate::merge::{ItemIdentity, ItemKey, Merger};

/// Runs registered keywords over module documents.
pub struct Composer {
    root_dir: PathBuf,
    keywords: Vec<Arc<dyn KeywordDefinition>>,
    identity: Arc<dyn ItemIdentity>,
}

impl fmt::Debug for Composer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Composer")
            .field("root_dir", &self.root_dir)
            .field(
                "keywords",
                &self.keywords.iter().map(|k| k.keyword()).collect::<Vec<_>>(),
            )
            .finish_non_exhaustive()
    }
}

impl Composer {
    /// Creates a composer with no keywords for the graph rooted at `root_dir`.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
            keywords: Vec::new(),
            identity: Arc::new(ItemKey),
        }
    }

    /// Registers a keyword. Keywords run in registration order.
    #[must_use]
    pub fn keyword(mut self, definition: impl KeywordDefinition + 'static) -> Self {
        self.keywords.push(Arc::new(definition));
        self
    }

    /// Sets how merged items are identified.
    #[must_use]
    pub fn identity(mut self, identity: impl ItemIdentity + 'static) -> Self {
        self.identity = Arc::new(identity);
        self
    }

    fn context<'a>(&'a self, module: &'a str, documents: &'a ModuleDocuments) -> KeywordContext<'a> {
        KeywordContext {
            root_dir: &self.root_dir,
            module,
            documents,
        }
    }

    async fn validators(
        &self,
        module: &str,
        documents: &ModuleDocuments,
    ) -> Result<Validators, ComposeError> {
        let ctx = self.context(module, documents);
        let built = try_join_all(self.keywords.iter().map(|definition| async move {
            definition
                .validator(&ctx)
                .await
                .map(|validator| (definition.keyword().to_owned(), validator))
                .map_err(|source| factory_error(definition.as_ref(), module, source))
        }))
        .await?;
        Ok(built.into_iter().collect())
    }

    async fn processors(
        &self,
        module: &str,
        documents: &ModuleDocuments,
    ) -> Result<Processors, ComposeError> {
        let ctx = self.context(module, documents);
        let built = try_join_all(self.keywords.iter().map(|definition| async move {
            definition
                .processor(&ctx)
                .await
                .map(|processor| (definition.keyword().to_owned(), processor))
                .map_err(|source| factory_error(definition.as_ref(), module, source))
        }))
        .await?;
        Ok(built.into_iter().collect())
    }

    /// Validates one module's document.
    ///
    /// # Errors
    ///
    /// Returns [`ComposeError::Validation`] listing every problem found, or a
    /// factory error if a validator cannot be prepared.
    pub async fn validate_module(
        &self,
        module: &ModuleName,
        document: &Value,
        documents: &ModuleDocuments,
    ) -> Result<(), ComposeError> {
        let validators = self.validators(module.as_str(), documents).await?;
        let tree = Tree::parse(document);
        let errors = stratum_tree::validate(tree.root(), &validators);
        if errors.is_empty() {
            tracing::debug!(%module, "document valid");
            return Ok(());
        }
        tracing::warn!(%module, errors = errors.len(), "document failed validation");
        Err(ComposeError::Validation(vec![ValidationFailure {
            module: module.clone(),
            errors,
        }]))
    }

    /// Processes one module's document into plain JSON.
    ///
    /// # Errors
    ///
    /// Returns the first processing fault.
    pub async fn process_module(
        &self,
        module: &ModuleName,
        document: &Value,
        documents: &ModuleDocuments,
    ) -> Result<Value, ComposeError> {
        let processors = self.processors(module.as_str(), documents).await?;
        let tree = Tree::parse(document);
        stratum_tree::process(tree.root(), &processors).map_err(|source| ComposeError::Process {
            module: module.clone(),
            source,
        })
    }

    /// Processes modules in the given order and merges their output.
    ///
    /// `order` must list children before their parents; later modules win
    /// when items share an identity. A module without a document
    /// contributes nothing.
    ///
    /// # Errors
    ///
    /// Returns the first processing or merge fault.
    pub async fn process_modules(
        &self,
        order: &[ModuleName],
        documents: &ModuleDocuments,
    ) -> Result<Value, ComposeError> {
        let empty = Value::Object(Map::new());
        let mut merger = Merger::new(self.identity.as_ref());
        for module in order {
            let document = documents.get(module).unwrap_or(&empty);
            let output = self.process_module(module, document, documents).await?;
            merger.add(module, output)?;
        }
        Ok(merger.finish())
    }

    /// Validates every module of the resolver's graph, then processes and
    /// merges them children first.
    ///
    /// Validation failures from all modules are reported together, before
    /// any processing starts.
    ///
    /// # Errors
    ///
    /// Returns an error if the graph or documents cannot be loaded, if any
    /// document fails validation, or if processing fails.
    pub async fn compose(&self, resolver: &Resolver) -> Result<Value, ComposeError> {
        let graph = resolver.graph().await?;
        let documents = load_documents(&graph, resolver.config()).await?;
        tracing::info!(modules = graph.len(), keywords = self.keywords.len(), "composing");

        let mut failures = Vec::new();
        for module in graph.modules() {
            let document = &documents[&module.name];
            match self.validate_module(&module.name, document, &documents).await {
                Ok(()) => {}
                Err(ComposeError::Validation(found)) => failures.extend(found),
                Err(other) => return Err(other),
            }
        }
        if !failures.is_empty() {
            return Err(ComposeError::Validation(failures));
        }

        let order: Vec<ModuleName> = graph
            .modules_children_first()
            .map(|module| module.name.clone())
            .collect();
        self.process_modules(&order, &documents).await
    }
}

fn factory_error(
    definition: &dyn KeywordDefinition,
    module: &str,
    source: stratum_common::error::BoxError,
) -> ComposeError {
    ComposeError::Factory {
        keyword: definition.keyword().to_owned(),
        module: ModuleName::new(module),
        source,
    }
}
