//! Parent-wins merging of processed module documents.
//!
//! A processed document is a JSON object of sections. Object-valued
//! sections are item maps, merged item by item under a global identifier;
//! any other section value is replaced wholesale. Documents are added
//! children first, so a parent's item silently supersedes a child's item
//! with the same identity.

use serde_json::{Map, Value};
use stratum_common::types::ModuleName;

use crate::error::ComposeError;

/// Derives the global identifier of a document item.
pub trait ItemIdentity: Send + Sync {
    /// Returns the identifier of item `key` in `section` of `module`'s document.
    fn identify(&self, module: &str, section: &str, key: &str) -> String;
}

/// Identifies items by their key alone.
#[derive(Debug, Clone, Copy, Default)]
pub struct ItemKey;

impl ItemIdentity for ItemKey {
    fn identify(&self, _module: &str, _section: &str, key: &str) -> String {
        key.to_owned()
    }
}

/// Accumulates processed documents into one.
pub struct Merger<'a> {
    identity: &'a dyn ItemIdentity,
    merged: Map<String, Value>,
}

impl<'a> Merger<'a> {
    /// Creates an empty merger.
    pub fn new(identity: &'a dyn ItemIdentity) -> Self {
        Self {
            identity,
            merged: Map::new(),
        }
    }

    /// Adds one module's processed document on top of everything added so far.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is not a JSON object.
    pub fn add(&mut self, module: &ModuleName, output: Value) -> Result<(), ComposeError> {
        let Value::Object(sections) = output else {
            return Err(ComposeError::Merge {
                module: module.clone(),
                message: format!("expected an object, got {}", kind_of(&output)),
            });
        };
        for (section, value) in sections {
            let Value::Object(items) = value else {
                let _ = self.merged.insert(section, value);
                continue;
            };
            let target = self
                .merged
                .entry(section.clone())
                .or_insert_with(|| Value::Object(Map::new()));
            if !target.is_object() {
                *target = Value::Object(Map::new());
            }
            let Value::Object(existing) = target else {
                continue;
            };
            for (key, item) in items {
                let id = self.identity.identify(module.as_str(), &section, &key);
                if existing.insert(id.clone(), item).is_some() {
                    tracing::debug!(%module, section = %section, item = %id, "item superseded");
                }
            }
        }
        Ok(())
    }

    /// Returns the merged document.
    pub fn finish(self) -> Value {
        Value::Object(self.merged)
    }
}

const fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
