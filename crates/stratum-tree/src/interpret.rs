//! Keyword-driven tree interpreter.
//!
//! Object keys matching a registered keyword trigger that keyword's handler.
//! Two post-order walks are provided:
//!
//! - [`validate`] visits every node and collects every reported error. It
//!   never stops early, so one pass surfaces every violation in a document.
//! - [`process`] rewrites the tree into plain JSON, applying the
//!   [`Replacement`] each keyword returns. The first failure aborts the pass.
//!
//! Keywords present on the same object are always visited in registration
//! order, never in object key order.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use stratum_common::error::BoxError;

use crate::error::{PathError, ProcessError};
use crate::node::{Node, NodeKind};

/// Checks the value of one keyword occurrence.
pub trait Validator: Send + Sync {
    /// Returns every problem found with `value`, the plain form of the keyword's
    /// property on the object `node`. An empty list means the occurrence is valid.
    fn validate(&self, keyword: &str, node: Node<'_>, value: &Value) -> Vec<BoxError>;
}

/// Rewrites one keyword occurrence.
pub trait Processor: Send + Sync {
    /// Computes the replacement for the keyword on the object `node`.
    ///
    /// `value` is the keyword's property after its own subtree was processed.
    ///
    /// # Errors
    ///
    /// Any error aborts the whole process pass.
    fn process(&self, keyword: &str, node: Node<'_>, value: Value)
    -> Result<Replacement, BoxError>;
}

/// How a keyword rewrites the object that holds it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum Replacement {
    /// Replace the whole containing object with this value.
    Object(Value),
    /// Remove the keyword property and shallow-merge these entries into the object.
    Keyword(Map<String, Value>),
}

/// Keyword handlers in registration order.
pub struct Keywords<T> {
    entries: Vec<(String, T)>,
}

impl<T> fmt::Debug for Keywords<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|(k, _)| k))
            .finish()
    }
}

impl<T> Keywords<T> {
    /// Creates an empty registry.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Registers a handler. Re-registering a keyword replaces its handler
    /// but keeps its original position.
    pub fn register(&mut self, keyword: impl Into<String>, handler: T) {
        let keyword = keyword.into();
        if let Some(slot) = self.entries.iter_mut().find(|(k, _)| *k == keyword) {
            slot.1 = handler;
        } else {
            self.entries.push((keyword, handler));
        }
    }

    /// Returns the handler for `keyword`.
    pub fn get(&self, keyword: &str) -> Option<&T> {
        self.entries
            .iter()
            .find(|(k, _)| k == keyword)
            .map(|(_, handler)| handler)
    }

    /// Iterates over keywords and handlers in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &T)> {
        self.entries.iter().map(|(k, handler)| (k.as_str(), handler))
    }

    /// Number of registered keywords.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no keyword is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<T> Default for Keywords<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, K: Into<String>> FromIterator<(K, T)> for Keywords<T> {
    fn from_iter<I: IntoIterator<Item = (K, T)>>(iter: I) -> Self {
        let mut keywords = Self::new();
        for (keyword, handler) in iter {
            keywords.register(keyword, handler);
        }
        keywords
    }
}

/// Registered validators.
pub type Validators = Keywords<Box<dyn Validator>>;

/// Registered processors.
pub type Processors = Keywords<Box<dyn Processor>>;

/// Validates every keyword occurrence under `root`.
///
/// Children are visited before their parent object's own keywords, so
/// errors come out in post-order document traversal order.
pub fn validate(root: Node<'_>, validators: &Validators) -> Vec<PathError> {
    let mut errors = Vec::new();
    validate_node(root, validators, &mut errors);
    errors
}

fn validate_node(node: Node<'_>, validators: &Validators, errors: &mut Vec<PathError>) {
    match node.kind() {
        NodeKind::Primitive(_) => {}
        NodeKind::Array => {
            for element in node.elements() {
                validate_node(element, validators, errors);
            }
        }
        NodeKind::Object => {
            for (_, child) in node.properties() {
                validate_node(child, validators, errors);
            }
            for (keyword, validator) in validators.iter() {
                let Some(property) = node.property(keyword) else {
                    continue;
                };
                let found = validator.validate(keyword, node, &property.to_value());
                if found.is_empty() {
                    continue;
                }
                let path = node.path();
                tracing::debug!(%path, keyword, count = found.len(), "keyword validation failed");
                errors.extend(
                    found
                        .into_iter()
                        .map(|source| PathError::new(path.clone(), source)),
                );
            }
        }
    }
}

/// Processes the tree under `root` into plain JSON.
///
/// # Errors
///
/// Returns an error if any processor fails or if two keywords on the same
/// object both ask to replace the whole object.
pub fn process(root: Node<'_>, processors: &Processors) -> Result<Value, ProcessError> {
    match root.kind() {
        NodeKind::Primitive(value) => Ok(value.clone()),
        NodeKind::Array => root
            .elements()
            .map(|element| process(element, processors))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        NodeKind::Object => process_object(root, processors),
    }
}

fn process_object(node: Node<'_>, processors: &Processors) -> Result<Value, ProcessError> {
    let mut processed = Map::new();
    for (key, child) in node.properties() {
        let _ = processed.insert(key.to_owned(), process(child, processors)?);
    }

    let mut object_replacements = Vec::new();
    let mut keyword_replacements = Vec::new();
    for (keyword, processor) in processors.iter() {
        let Some(value) = processed.get(keyword) else {
            continue;
        };
        let replacement = processor
            .process(keyword, node, value.clone())
            .map_err(|source| ProcessError::Keyword {
                path: node.path(),
                keyword: keyword.to_owned(),
                source,
            })?;
        match replacement {
            Replacement::Object(value) => object_replacements.push((keyword, value)),
            Replacement::Keyword(entries) => keyword_replacements.push((keyword, entries)),
        }
    }

    if object_replacements.len() > 1 {
        return Err(ProcessError::AmbiguousObject {
            path: node.path(),
            keywords: object_replacements
                .into_iter()
                .map(|(keyword, _)| keyword.to_owned())
                .collect(),
        });
    }

    let mut result = match object_replacements.pop() {
        Some((_, value)) => value,
        None => Value::Object(processed),
    };

    for (keyword, entries) in keyword_replacements {
        if let Value::Object(object) = &mut result {
            let _ = object.shift_remove(keyword);
            object.extend(entries);
        } else {
            tracing::warn!(
                path = %node.path(),
                keyword,
                "object was replaced by a non-object, dropping keyword replacement"
            );
        }
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::node::{PathSegment, Tree};

    /// Reports every keyword value that is not a string.
    struct RequireString;

    impl Validator for RequireString {
        fn validate(&self, keyword: &str, _node: Node<'_>, value: &Value) -> Vec<BoxError> {
            if value.is_string() {
                Vec::new()
            } else {
                vec![format!("{keyword} expects a string, got {value}").into()]
            }
        }
    }

    /// Tags every occurrence with a fixed label.
    struct Always(&'static str);

    impl Validator for Always {
        fn validate(&self, keyword: &str, _node: Node<'_>, _value: &Value) -> Vec<BoxError> {
            vec![format!("{}:{keyword}", self.0).into()]
        }
    }

    struct Fixed(Replacement);

    impl Processor for Fixed {
        fn process(&self, _: &str, _: Node<'_>, _: Value) -> Result<Replacement, BoxError> {
            Ok(self.0.clone())
        }
    }

    /// Replaces `{"$upper": "x"}` with `"X"`.
    struct Upper;

    impl Processor for Upper {
        fn process(&self, _: &str, _: Node<'_>, value: Value) -> Result<Replacement, BoxError> {
            let text = value.as_str().ok_or("expected a string")?;
            Ok(Replacement::Object(json!(text.to_uppercase())))
        }
    }

    /// Hands the processed keyword value back as the whole object.
    struct Unwrap;

    impl Processor for Unwrap {
        fn process(&self, _: &str, _: Node<'_>, value: Value) -> Result<Replacement, BoxError> {
            Ok(Replacement::Object(value))
        }
    }

    struct Failing;

    impl Processor for Failing {
        fn process(&self, _: &str, _: Node<'_>, _: Value) -> Result<Replacement, BoxError> {
            Err("lookup failed".into())
        }
    }

    fn merge(value: Value) -> Box<dyn Processor> {
        Box::new(Fixed(Replacement::Keyword(
            value.as_object().cloned().unwrap_or_default(),
        )))
    }

    fn replace(value: Value) -> Box<dyn Processor> {
        Box::new(Fixed(Replacement::Object(value)))
    }

    fn require_string() -> Validators {
        let mut validators = Validators::new();
        validators.register("$name", Box::new(RequireString));
        validators
    }

    #[test]
    fn validate_collects_every_violation_in_traversal_order() {
        let doc = json!({
            "first": { "$name": 1 },
            "list": [{ "$name": "ok" }, { "$name": false }],
            "last": { "deep": { "$name": null } }
        });
        let tree = Tree::parse(&doc);
        let errors = validate(tree.root(), &require_string());

        let paths: Vec<String> = errors.iter().map(|e| e.path.to_string()).collect();
        assert_eq!(paths, ["first", "list[1]", "last.deep"]);
    }

    #[test]
    fn validate_reports_children_before_parent() {
        let doc = json!({ "$name": 5, "child": { "$name": 6 } });
        let tree = Tree::parse(&doc);
        let errors = validate(tree.root(), &require_string());
        assert_eq!(errors.len(), 2);
        assert_eq!(
            errors[0].path.segments(),
            [PathSegment::Key("child".into())].as_slice()
        );
        assert!(errors[1].path.is_root());
    }

    #[test]
    fn validate_uses_registration_order_not_key_order() {
        let doc = json!({ "$b": 1, "$a": 2 });
        let tree = Tree::parse(&doc);
        let mut validators = Validators::new();
        validators.register("$a", Box::new(Always("a")));
        validators.register("$b", Box::new(Always("b")));

        let errors = validate(tree.root(), &validators);
        let messages: Vec<String> = errors.iter().map(|e| e.source.to_string()).collect();
        assert_eq!(messages, ["a:$a", "b:$b"]);
    }

    #[test]
    fn validate_passes_plain_keyword_value() {
        struct Expect;
        impl Validator for Expect {
            fn validate(&self, _: &str, node: Node<'_>, value: &Value) -> Vec<BoxError> {
                assert_eq!(value, &json!({ "nested": [1, 2] }));
                assert_eq!(node.path().to_string(), "item");
                Vec::new()
            }
        }
        let doc = json!({ "item": { "$spec": { "nested": [1, 2] } } });
        let tree = Tree::parse(&doc);
        let mut validators = Validators::new();
        validators.register("$spec", Box::new(Expect));
        assert!(validate(tree.root(), &validators).is_empty());
    }

    #[test]
    fn register_twice_keeps_position() {
        let mut validators = Validators::new();
        validators.register("$a", Box::new(Always("first")));
        validators.register("$b", Box::new(Always("b")));
        validators.register("$a", Box::new(Always("second")));
        let keys: Vec<&str> = validators.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, ["$a", "$b"]);
        assert_eq!(validators.len(), 2);
    }

    #[test]
    fn process_without_keywords_is_identity() {
        let doc = json!({ "a": [1, { "b": "c" }], "$unknown": true });
        let tree = Tree::parse(&doc);
        let out = process(tree.root(), &Processors::new()).expect("process");
        assert_eq!(out, doc);
    }

    #[test]
    fn process_object_replacement_then_keyword_merge() {
        let doc = json!({ "item": { "$k1": 1, "$k2": 2, "keep": true } });
        let tree = Tree::parse(&doc);
        let mut processors = Processors::new();
        processors.register("$k2", merge(json!({ "y": 1 })));
        processors.register("$k1", replace(json!({ "x": true })));

        let out = process(tree.root(), &processors).expect("process");
        assert_eq!(out, json!({ "item": { "x": true, "y": 1 } }));
    }

    #[test]
    fn process_keyword_replacement_dropped_when_object_becomes_scalar() {
        let doc = json!({ "$k1": "a", "$k2": "b" });
        let tree = Tree::parse(&doc);
        let mut processors = Processors::new();
        processors.register("$k1", replace(json!(42)));
        processors.register("$k2", merge(json!({ "y": 1 })));

        let out = process(tree.root(), &processors).expect("process");
        assert_eq!(out, json!(42));
    }

    #[test]
    fn process_keyword_replacement_removes_key_and_keeps_order() {
        let doc = json!({ "a": 1, "$tag": "t", "b": 2 });
        let tree = Tree::parse(&doc);
        let mut processors = Processors::new();
        processors.register("$tag", merge(json!({ "tag": "t" })));

        let out = process(tree.root(), &processors).expect("process");
        let keys: Vec<&String> = out.as_object().expect("object").keys().collect();
        assert_eq!(keys, ["a", "b", "tag"]);
    }

    #[test]
    fn process_two_object_replacements_is_fatal() {
        let doc = json!({ "wrap": { "$k1": 1, "$k2": 2 } });
        let tree = Tree::parse(&doc);
        let mut processors = Processors::new();
        processors.register("$k1", replace(json!(1)));
        processors.register("$k2", replace(json!(2)));

        let err = process(tree.root(), &processors).unwrap_err();
        let ProcessError::AmbiguousObject { path, keywords } = &err else {
            panic!("unexpected error: {err}");
        };
        assert_eq!(path.to_string(), "wrap");
        assert_eq!(keywords, &["$k1", "$k2"]);
        let msg = err.to_string();
        assert!(msg.contains("$k1") && msg.contains("$k2"), "got: {msg}");
    }

    #[test]
    fn process_sees_already_processed_children() {
        let doc = json!({ "outer": { "$upper": { "$upper": "inner" } } });
        let tree = Tree::parse(&doc);

        let mut processors = Processors::new();
        processors.register("$upper", Box::new(Unwrap));
        let out = process(tree.root(), &processors).expect("process");
        assert_eq!(out, json!({ "outer": "inner" }));

        let mut processors = Processors::new();
        processors.register("$upper", Box::new(Upper));
        let out = process(tree.root(), &processors).expect("process");
        assert_eq!(out, json!({ "outer": "INNER" }));
    }

    #[test]
    fn process_replaces_inside_arrays() {
        let doc = json!([{ "$upper": "a" }, { "$upper": "b" }, "c"]);
        let tree = Tree::parse(&doc);
        let mut processors = Processors::new();
        processors.register("$upper", Box::new(Upper));

        let out = process(tree.root(), &processors).expect("process");
        assert_eq!(out, json!(["A", "B", "c"]));
    }

    #[test]
    fn process_failure_aborts_with_path() {
        let doc = json!({ "a": { "b": { "$ref": "missing" } } });
        let tree = Tree::parse(&doc);
        let mut processors = Processors::new();
        processors.register("$ref", Box::new(Failing));

        let err = process(tree.root(), &processors).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("a.b"), "got: {msg}");
        assert!(msg.contains("lookup failed"), "got: {msg}");
    }

    #[test]
    fn replacement_uses_kind_tag_on_the_wire() {
        let replacement: Replacement =
            serde_json::from_value(json!({ "kind": "object", "value": [1] })).expect("decode");
        assert_eq!(replacement, Replacement::Object(json!([1])));
        let replacement: Replacement =
            serde_json::from_value(json!({ "kind": "keyword", "value": { "a": 1 } }))
                .expect("decode");
        assert!(matches!(replacement, Replacement::Keyword(map) if map.len() == 1));
    }
}
