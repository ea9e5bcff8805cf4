//! Generic syntax tree node
//!
//! The core only cares about the generic shape of a tree: an object with a
//! string `type` field. Everything else (children, literal values, positions,
//! custom data) is owned by parsers, compilers, and transformers.

use crate::error::ProcessorError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Key every node carries
pub const TYPE_KEY: &str = "type";

/// A node-shaped JSON object
///
/// Invariant: the underlying map always has a string `type` entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "Value")]
pub struct Node {
    fields: Map<String, Value>,
}

impl Node {
    /// Create node of the given type with no other fields
    #[must_use]
    pub fn new(kind: impl Into<String>) -> Self {
        let mut fields = Map::new();
        fields.insert(TYPE_KEY.to_string(), Value::String(kind.into()));
        Self { fields }
    }

    /// Empty root, returned by `parse` when no parser is configured
    #[must_use]
    pub fn root() -> Self {
        Self::new("root").with("children", Value::Array(Vec::new()))
    }

    /// Literal `text` node
    #[must_use]
    pub fn text(value: impl Into<String>) -> Self {
        Self::new("text").with("value", Value::String(value.into()))
    }

    /// Node type
    #[inline]
    #[must_use]
    pub fn kind(&self) -> &str {
        self.fields
            .get(TYPE_KEY)
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    /// Literal value (`value` field) if it is a string
    #[inline]
    #[must_use]
    pub fn value(&self) -> Option<&str> {
        self.fields.get("value").and_then(Value::as_str)
    }

    /// Get a field
    #[inline]
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Set a field, returning the previous value
    ///
    /// Setting `type` to a non-string is ignored so the node stays node-shaped.
    pub fn set(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        let key = key.into();
        if key == TYPE_KEY && !value.is_string() {
            return None;
        }
        self.fields.insert(key, value)
    }

    /// Builder variant of [`Node::set`]
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: Value) -> Self {
        self.set(key, value);
        self
    }

    /// Child nodes, skipping children that are not node-shaped
    #[must_use]
    pub fn children(&self) -> Vec<Node> {
        self.fields
            .get("children")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| Node::try_from(item.clone()).ok())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Replace all children
    pub fn set_children(&mut self, children: Vec<Node>) {
        let items = children.into_iter().map(Value::from).collect();
        self.fields.insert("children".to_string(), Value::Array(items));
    }

    /// Append a child, creating the `children` array if missing
    pub fn push_child(&mut self, child: Node) {
        let entry = self
            .fields
            .entry("children")
            .or_insert_with(|| Value::Array(Vec::new()));
        if !entry.is_array() {
            *entry = Value::Array(Vec::new());
        }
        if let Value::Array(items) = entry {
            items.push(child.into());
        }
    }

    /// Underlying fields
    #[inline]
    #[must_use]
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }
}

/// Whether a JSON value is node-shaped
#[must_use]
pub fn is_node(value: &Value) -> bool {
    value
        .as_object()
        .and_then(|fields| fields.get(TYPE_KEY))
        .is_some_and(Value::is_string)
}

impl TryFrom<Value> for Node {
    type Error = ProcessorError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        if !is_node(&value) {
            return Err(ProcessorError::NotANode(describe(&value)));
        }
        match value {
            Value::Object(fields) => Ok(Self { fields }),
            other => Err(ProcessorError::NotANode(describe(&other))),
        }
    }
}

impl From<Node> for Value {
    fn from(node: Node) -> Self {
        Value::Object(node.fields)
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", Value::Object(self.fields.clone()))
    }
}

fn describe(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(_) => "boolean".to_string(),
        Value::Number(_) => "number".to_string(),
        Value::String(_) => "string".to_string(),
        Value::Array(_) => "array".to_string(),
        Value::Object(_) => "object without a string `type`".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn root_is_empty() {
        let root = Node::root();
        assert_eq!(root.kind(), "root");
        assert!(root.children().is_empty());
    }

    #[test]
    fn try_from_rejects_non_nodes() {
        assert!(Node::try_from(json!("abc")).is_err());
        assert!(Node::try_from(json!({"value": 1})).is_err());
        assert!(Node::try_from(json!({"type": 1})).is_err());

        let node = Node::try_from(json!({"type": "x", "value": "y"})).unwrap();
        assert_eq!(node.kind(), "x");
        assert_eq!(node.value(), Some("y"));
    }

    #[test]
    fn not_a_node_message() {
        let err = Node::try_from(json!([1, 2])).unwrap_err();
        assert_eq!(err.to_string(), "expected a node: array");
    }

    #[test]
    fn type_stays_a_string() {
        let mut node = Node::new("x");
        assert_eq!(node.set("type", json!(3)), None);
        assert_eq!(node.kind(), "x");
    }

    #[test]
    fn push_child_builds_children() {
        let mut node = Node::new("paragraph");
        node.push_child(Node::text("a"));
        node.push_child(Node::text("b"));

        let values: Vec<_> = node
            .children()
            .iter()
            .filter_map(|c| c.value().map(str::to_string))
            .collect();
        assert_eq!(values, vec!["a", "b"]);
    }

    #[test]
    fn serde_goes_through_validation() {
        let node: Node = serde_json::from_value(json!({"type": "root", "children": []})).unwrap();
        assert_eq!(node, Node::root());
        assert!(serde_json::from_value::<Node>(json!({"children": []})).is_err());
        assert_eq!(serde_json::to_value(Node::text("a")).unwrap(), json!({"type": "text", "value": "a"}));
    }
}
