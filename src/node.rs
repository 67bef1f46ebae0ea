//! Closed tree representation of an unflattened schema.
//!
//! Every value reachable from a schema is exactly one of an object, an array,
//! or a scalar, so traversal code can match exhaustively instead of probing a
//! dynamically typed value.

use std::collections::BTreeMap;

use serde::{Serialize, Serializer};

/// A node of an unflattened schema tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Named fields, sorted by key.
    Object(BTreeMap<String, Node>),
    /// Positional items. Gaps left by sparse indices hold `Scalar::Null`.
    Array(Vec<Node>),
    /// A leaf value.
    Scalar(Scalar),
}

/// A leaf value. In captured schemas this is normally a type hint string such
/// as `"string"` or `"float64"`, but literal JSON values are accepted too.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Null,
    Bool(bool),
    Number(serde_json::Number),
    String(String),
}

impl Node {
    /// The empty object, returned for empty or missing input.
    pub fn empty_object() -> Self {
        Node::Object(BTreeMap::new())
    }

    pub fn null() -> Self {
        Node::Scalar(Scalar::Null)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Node::Scalar(Scalar::Null))
    }

    pub fn as_object(&self) -> Option<&BTreeMap<String, Node>> {
        match self {
            Node::Object(fields) => Some(fields),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Node]> {
        match self {
            Node::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Convert back into a `serde_json::Value`.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Node::Object(fields) => serde_json::Value::Object(
                fields
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
            Node::Array(items) => {
                serde_json::Value::Array(items.iter().map(Node::to_json).collect())
            }
            Node::Scalar(Scalar::Null) => serde_json::Value::Null,
            Node::Scalar(Scalar::Bool(b)) => serde_json::Value::Bool(*b),
            Node::Scalar(Scalar::Number(n)) => serde_json::Value::Number(n.clone()),
            Node::Scalar(Scalar::String(s)) => serde_json::Value::String(s.clone()),
        }
    }
}

impl From<serde_json::Value> for Node {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Node::Scalar(Scalar::Null),
            serde_json::Value::Bool(b) => Node::Scalar(Scalar::Bool(b)),
            serde_json::Value::Number(n) => Node::Scalar(Scalar::Number(n)),
            serde_json::Value::String(s) => Node::Scalar(Scalar::String(s)),
            serde_json::Value::Array(items) => {
                Node::Array(items.into_iter().map(Node::from).collect())
            }
            serde_json::Value::Object(fields) => Node::Object(
                fields
                    .into_iter()
                    .map(|(k, v)| (k, Node::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<&serde_json::Value> for Node {
    fn from(value: &serde_json::Value) -> Self {
        Node::from(value.clone())
    }
}

impl Serialize for Node {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}
