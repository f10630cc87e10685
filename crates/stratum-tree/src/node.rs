//! Parent-linked tree model over plain JSON values.
//!
//! A [`Tree`] is an arena of nodes built once from a [`serde_json::Value`]
//! and never mutated afterwards. Every non-root node records its parent and
//! the key or index it sits under, so a node's document path can always be
//! reconstructed. [`Node`] is a cheap copyable view into the arena.

use std::fmt;

use serde_json::{Map, Value};

/// One step of a document path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    /// An object property name.
    Key(String),
    /// An array index.
    Index(usize),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key(key) => write!(f, "{key}"),
            Self::Index(index) => write!(f, "{index}"),
        }
    }
}

impl From<&str> for PathSegment {
    fn from(key: &str) -> Self {
        Self::Key(key.to_owned())
    }
}

impl From<usize> for PathSegment {
    fn from(index: usize) -> Self {
        Self::Index(index)
    }
}

/// Ordered keys and indices leading from the root to a node.
///
/// The root itself has the empty path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct TreePath(Vec<PathSegment>);

impl TreePath {
    /// Returns the path segments, root first.
    #[must_use]
    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }

    /// Returns `true` for the root path.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for TreePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "<root>");
        }
        for (i, segment) in self.0.iter().enumerate() {
            match segment {
                PathSegment::Index(index) => write!(f, "[{index}]")?,
                PathSegment::Key(key) if i == 0 => write!(f, "{key}")?,
                PathSegment::Key(key) => write!(f, ".{key}")?,
            }
        }
        Ok(())
    }
}

impl From<Vec<PathSegment>> for TreePath {
    fn from(segments: Vec<PathSegment>) -> Self {
        Self(segments)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct NodeId(usize);

#[derive(Debug)]
enum NodeData {
    Object(Vec<(String, NodeId)>),
    Array(Vec<NodeId>),
    Primitive(Value),
}

#[derive(Debug)]
struct Slot {
    data: NodeData,
    parent: Option<(NodeId, PathSegment)>,
}

/// Immutable, parent-linked snapshot of a JSON document.
#[derive(Debug)]
pub struct Tree {
    slots: Vec<Slot>,
}

impl Tree {
    /// Builds a tree from a plain JSON value.
    ///
    /// Objects and arrays become container nodes whose children link back
    /// to them; every other value becomes a primitive leaf.
    #[must_use]
    pub fn parse(value: &Value) -> Self {
        let mut tree = Self { slots: Vec::new() };
        let _ = tree.insert(value, None);
        tree
    }

    /// Returns the root node.
    #[must_use]
    pub const fn root(&self) -> Node<'_> {
        Node {
            tree: self,
            id: NodeId(0),
        }
    }

    /// Number of nodes in the tree.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// A parsed tree always holds at least its root.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        false
    }

    fn insert(&mut self, value: &Value, parent: Option<(NodeId, PathSegment)>) -> NodeId {
        let id = NodeId(self.slots.len());
        self.slots.push(Slot {
            data: NodeData::Primitive(Value::Null),
            parent,
        });
        let data = match value {
            Value::Object(map) => NodeData::Object(
                map.iter()
                    .map(|(key, child)| {
                        let child_id = self.insert(child, Some((id, PathSegment::Key(key.clone()))));
                        (key.clone(), child_id)
                    })
                    .collect(),
            ),
            Value::Array(items) => NodeData::Array(
                items
                    .iter()
                    .enumerate()
                    .map(|(index, child)| self.insert(child, Some((id, PathSegment::Index(index)))))
                    .collect(),
            ),
            scalar => NodeData::Primitive(scalar.clone()),
        };
        self.slots[id.0].data = data;
        id
    }
}

/// Shape of a node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NodeKind<'t> {
    /// Ordered name to node mapping.
    Object,
    /// Ordered node list.
    Array,
    /// Leaf holding a scalar value.
    Primitive(&'t Value),
}

/// Borrowed view of one node in a [`Tree`].
#[derive(Debug, Clone, Copy)]
pub struct Node<'t> {
    tree: &'t Tree,
    id: NodeId,
}

impl<'t> Node<'t> {
    fn slot(self) -> &'t Slot {
        &self.tree.slots[self.id.0]
    }

    const fn at(self, id: NodeId) -> Self {
        Self {
            tree: self.tree,
            id,
        }
    }

    fn entries(self) -> &'t [(String, NodeId)] {
        match &self.slot().data {
            NodeData::Object(entries) => entries.as_slice(),
            _ => &[],
        }
    }

    fn items(self) -> &'t [NodeId] {
        match &self.slot().data {
            NodeData::Array(items) => items.as_slice(),
            _ => &[],
        }
    }

    /// Returns the shape of this node.
    pub fn kind(self) -> NodeKind<'t> {
        match &self.slot().data {
            NodeData::Object(_) => NodeKind::Object,
            NodeData::Array(_) => NodeKind::Array,
            NodeData::Primitive(value) => NodeKind::Primitive(value),
        }
    }

    /// Returns `true` if this node is an object.
    pub fn is_object(self) -> bool {
        matches!(self.kind(), NodeKind::Object)
    }

    /// Iterates over an object's properties in document order.
    ///
    /// Empty for arrays and primitives.
    pub fn properties(self) -> impl Iterator<Item = (&'t str, Self)> {
        self.entries()
            .iter()
            .map(move |(key, id)| (key.as_str(), self.at(*id)))
    }

    /// Looks up an object property by name.
    pub fn property(self, key: &str) -> Option<Self> {
        self.entries()
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, id)| self.at(*id))
    }

    /// Iterates over an array's elements in order.
    ///
    /// Empty for objects and primitives.
    pub fn elements(self) -> impl Iterator<Item = Self> {
        self.items().iter().map(move |id| self.at(*id))
    }

    /// Returns the parent node, `None` at the root.
    pub fn parent(self) -> Option<Self> {
        self.slot().parent.as_ref().map(|(id, _)| self.at(*id))
    }

    /// Returns the key or index this node sits under in its parent.
    pub fn segment(self) -> Option<&'t PathSegment> {
        self.slot().parent.as_ref().map(|(_, segment)| segment)
    }

    /// Reconstructs the path from the root to this node.
    pub fn path(self) -> TreePath {
        let mut segments = Vec::new();
        let mut current = self;
        while let Some((parent, segment)) = current.slot().parent.as_ref() {
            segments.push(segment.clone());
            current = current.at(*parent);
        }
        segments.reverse();
        TreePath(segments)
    }

    /// Converts this subtree back into plain JSON.
    pub fn to_value(self) -> Value {
        match &self.slot().data {
            NodeData::Object(entries) => Value::Object(
                entries
                    .iter()
                    .map(|(key, id)| (key.clone(), self.at(*id).to_value()))
                    .collect::<Map<String, Value>>(),
            ),
            NodeData::Array(items) => {
                Value::Array(items.iter().map(|id| self.at(*id).to_value()).collect())
            }
            NodeData::Primitive(value) => value.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use serde_json::json;

    use super::*;

    fn find<'t>(node: Node<'t>, wanted: &Value) -> Option<Node<'t>> {
        if let NodeKind::Primitive(value) = node.kind() {
            return (value == wanted).then_some(node);
        }
        node.properties()
            .map(|(_, child)| child)
            .chain(node.elements())
            .find_map(|child| find(child, wanted))
    }

    #[test]
    fn root_has_empty_path() {
        let tree = Tree::parse(&json!({ "a": 1 }));
        assert!(tree.root().path().is_root());
        assert!(tree.root().parent().is_none());
        assert_eq!(tree.root().path().to_string(), "<root>");
    }

    #[test]
    fn nested_node_path_is_reconstructed() {
        let tree = Tree::parse(&json!({ "a": { "b": [1, { "c": 2 }] } }));
        let node = find(tree.root(), &json!(2)).expect("node holding 2");
        let expected: Vec<PathSegment> = vec!["a".into(), "b".into(), 1.into(), "c".into()];
        assert_eq!(node.path().segments(), expected.as_slice());
        assert_eq!(node.path().to_string(), "a.b[1].c");
    }

    #[test]
    fn parent_links_point_to_container() {
        let tree = Tree::parse(&json!({ "list": ["x", "y"] }));
        let list = tree.root().property("list").expect("list");
        let second = list.elements().nth(1).expect("second");
        assert_eq!(second.segment(), Some(&PathSegment::Index(1)));
        let parent = second.parent().expect("parent");
        assert_eq!(parent.to_value(), json!(["x", "y"]));
    }

    #[test]
    fn properties_keep_document_order() {
        let tree = Tree::parse(&json!({ "zeta": 1, "alpha": 2, "mid": 3 }));
        let keys: Vec<&str> = tree.root().properties().map(|(k, _)| k).collect();
        assert_eq!(keys, ["zeta", "alpha", "mid"]);
    }

    #[test]
    fn scalar_document_is_single_leaf() {
        let tree = Tree::parse(&json!("plain"));
        assert_eq!(tree.len(), 1);
        assert_eq!(tree.root().kind(), NodeKind::Primitive(&json!("plain")));
        assert_eq!(tree.root().properties().count(), 0);
        assert_eq!(tree.root().elements().count(), 0);
    }

    #[test]
    fn subtree_converts_back_to_plain() {
        let tree = Tree::parse(&json!({ "a": { "b": [true, null] } }));
        let a = tree.root().property("a").expect("a");
        assert_eq!(a.to_value(), json!({ "b": [true, null] }));
    }

    fn arb_json() -> impl Strategy<Value = Value> {
        let leaf = prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            any::<i64>().prop_map(Value::from),
            (-1.0e6..1.0e6f64).prop_map(Value::from),
            "[a-z]{0,8}".prop_map(Value::String),
        ];
        leaf.prop_recursive(4, 64, 6, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..6).prop_map(Value::Array),
                prop::collection::vec(("[a-z$]{1,6}", inner), 0..6)
                    .prop_map(|entries| Value::Object(entries.into_iter().collect())),
            ]
        })
    }

    proptest! {
        #[test]
        fn parse_then_to_value_round_trips(value in arb_json()) {
            let tree = Tree::parse(&value);
            prop_assert_eq!(tree.root().to_value(), value);
        }
    }
}
