//! Sub-tree selection with JSONPath-like expressions.
//!
//! Only the subset needed for schema selection is supported: an optional `$`
//! root marker followed by `.`-separated segments, where digit-only segments
//! (or `[n]` brackets) index into arrays. `""`, `"$"` and `"$."` select the
//! whole tree.

use crate::error::{Error, Result};
use crate::node::Node;
use crate::unflatten::is_index_segment;

/// The shape of an extracted sub-tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractedKind {
    Object,
    Array,
    Primitive,
}

/// A successfully extracted sub-tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Extracted {
    pub kind: ExtractedKind,
    pub value: Node,
}

impl Extracted {
    fn new(value: Node) -> Self {
        let kind = match &value {
            Node::Object(_) => ExtractedKind::Object,
            Node::Array(_) => ExtractedKind::Array,
            Node::Scalar(_) => ExtractedKind::Primitive,
        };
        Self { kind, value }
    }
}

/// Applies one path expression to unflattened schemas.
#[derive(Debug, Clone)]
pub struct JsonPathProcessor {
    path: String,
    skip_on_error: bool,
}

impl JsonPathProcessor {
    /// `skip_on_error` is recorded for the caller; resolution failures are
    /// always returned as [`Error::PathNotFound`].
    pub fn new(path: impl Into<String>, skip_on_error: bool) -> Self {
        Self {
            path: path.into().trim().to_string(),
            skip_on_error,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn skip_on_error(&self) -> bool {
        self.skip_on_error
    }

    /// Whether the configured path selects the whole tree.
    pub fn is_root(&self) -> bool {
        is_root_path(&self.path)
    }

    /// Resolve the configured path against `tree`.
    pub fn process(&self, tree: &Node) -> Result<Extracted> {
        if self.is_root() {
            return Ok(Extracted::new(tree.clone()));
        }

        let mut current = tree;
        for segment in segments(&self.path) {
            current = descend(current, &segment).ok_or_else(|| Error::PathNotFound {
                path: self.path.clone(),
                segment: segment.clone(),
            })?;
        }
        Ok(Extracted::new(current.clone()))
    }
}

/// `""`, `"$"` and `"$."` all address the root.
pub fn is_root_path(path: &str) -> bool {
    matches!(path.trim(), "" | "$" | "$.")
}

fn descend<'a>(node: &'a Node, segment: &str) -> Option<&'a Node> {
    match node {
        Node::Object(fields) => fields.get(segment),
        Node::Array(items) if is_index_segment(segment) => {
            segment.parse::<usize>().ok().and_then(|i| items.get(i))
        }
        Node::Array(_) => None,
        Node::Scalar(_) => None,
    }
}

/// Split a path into plain segments, normalizing `a[0]` to `a.0`.
fn segments(path: &str) -> Vec<String> {
    let body = path
        .strip_prefix("$.")
        .or_else(|| path.strip_prefix('$'))
        .unwrap_or(path);
    body.replace('[', ".")
        .replace(']', "")
        .split('.')
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn tree() -> Node {
        Node::from(json!({
            "properties": {"a": "string", "items": [{"sku": "string"}, "number"]},
            "context": {"traits": {"email": "string"}}
        }))
    }

    #[test]
    fn root_forms_return_input() {
        for path in ["", "$", "$.", "  $  "] {
            let out = JsonPathProcessor::new(path, false).process(&tree()).unwrap();
            assert_eq!(out.value, tree(), "path {path:?}");
            assert_eq!(out.kind, ExtractedKind::Object);
        }
    }

    #[test]
    fn selects_properties() {
        let input = Node::from(json!({"properties": {"a": "string"}}));
        let out = JsonPathProcessor::new("$.properties", false)
            .process(&input)
            .unwrap();
        assert_eq!(out.value.to_json(), json!({"a": "string"}));
    }

    #[test]
    fn descends_through_arrays() {
        let p = JsonPathProcessor::new("$.properties.items.0.sku", false);
        let out = p.process(&tree()).unwrap();
        assert_eq!(out.kind, ExtractedKind::Primitive);
        assert_eq!(out.value.to_json(), json!("string"));

        let p = JsonPathProcessor::new("$.properties.items[1]", false);
        assert_eq!(p.process(&tree()).unwrap().value.to_json(), json!("number"));

        let p = JsonPathProcessor::new("$.properties.items", false);
        assert_eq!(p.process(&tree()).unwrap().kind, ExtractedKind::Array);
    }

    #[test]
    fn accepts_paths_without_root_marker() {
        let p = JsonPathProcessor::new("context.traits", true);
        assert_eq!(
            p.process(&tree()).unwrap().value.to_json(),
            json!({"email": "string"})
        );
        assert!(p.skip_on_error());
    }

    #[test]
    fn unresolved_path_is_not_found() {
        let p = JsonPathProcessor::new("$.traits.name", true);
        let err = p.process(&tree()).unwrap_err();
        assert!(err.is_path_not_found());
        assert!(err.to_string().contains("traits"));

        let p = JsonPathProcessor::new("$.properties.items.5", false);
        assert!(p.process(&tree()).unwrap_err().is_path_not_found());

        let p = JsonPathProcessor::new("$.properties.a.b", false);
        assert!(p.process(&tree()).unwrap_err().is_path_not_found());
    }

    #[test]
    fn signed_array_index_does_not_resolve() {
        let p = JsonPathProcessor::new("$.properties.items.+1", false);
        let err = p.process(&tree()).unwrap_err();
        assert!(err.is_path_not_found());
        assert!(err.to_string().contains("'+1'"));
    }
}
