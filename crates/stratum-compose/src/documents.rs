//! Loading module documents from disk.

use std::collections::BTreeMap;

use futures::future::try_join_all;
use serde_json::{Map, Value};
use stratum_common::config::StratumConfig;
use stratum_common::error::StratumError;
use stratum_common::types::{Module, ModuleName};
use stratum_graph::ModuleGraph;

use crate::error::ComposeError;

/// One plain JSON document per module.
pub type ModuleDocuments = BTreeMap<ModuleName, Value>;

/// Reads the document of every module in `graph`.
///
/// A module without a document file contributes an empty object.
///
/// # Errors
///
/// Returns an error if a document exists but cannot be read or parsed.
pub async fn load_documents(
    graph: &ModuleGraph,
    config: &StratumConfig,
) -> Result<ModuleDocuments, ComposeError> {
    let loaded = try_join_all(graph.modules().map(|module| load_document(module, config))).await?;
    tracing::debug!(documents = loaded.len(), "module documents loaded");
    Ok(loaded.into_iter().collect())
}

async fn load_document(
    module: &Module,
    config: &StratumConfig,
) -> Result<(ModuleName, Value), ComposeError> {
    let path = module.location.join(&config.document_file);
    let document = match tokio::fs::read_to_string(&path).await {
        Ok(content) => serde_json::from_str(&content)
            .map_err(|source| ComposeError::Document { path, source })?,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(module = %module.name, "no document, using an empty one");
            Value::Object(Map::new())
        }
        Err(e) => return Err(StratumError::io(path, e).into()),
    };
    Ok((module.name.clone(), document))
}
