//! Rebuild nested trees from flattened dot-path maps.
//!
//! Captured schemas arrive as flat maps such as
//! `{"properties.cart.0.sku": "string"}`. Each key is split on `.`; a segment
//! made only of decimal digits addresses an array slot, any other segment
//! addresses an object field.
//!
//! Arrays grow to `max_index + 1` and unreferenced slots are filled with
//! `null`, so `{"a.0": "x", "a.2": "z"}` becomes `{"a": ["x", null, "z"]}`.
//!
//! Keys are applied in sorted order and the first key to reach a branch fixes
//! whether it is an object or an array:
//! - a numeric segment reaching an object branch is stored as a field named by
//!   the digits,
//! - a field segment reaching an array branch is dropped.
//!
//! A scalar sitting where a deeper key needs a container is replaced by that
//! container. Unflattening never fails.

use std::collections::BTreeMap;

use tracing::debug;

use crate::node::Node;

/// Indices above this are treated as field names to bound allocation.
const MAX_ARRAY_INDEX: usize = 100_000;

/// Unflatten a dot-path map into a nested object tree.
///
/// Empty input yields an empty object. Values that are already nested JSON
/// are converted as-is, so a map without dotted keys round-trips unchanged.
pub fn unflatten(flat: &BTreeMap<String, serde_json::Value>) -> Node {
    let mut root = Node::empty_object();
    for (key, value) in flat {
        let segments: Vec<&str> = key.split('.').collect();
        insert(&mut root, &segments, Node::from(value));
    }
    root
}

/// Unflatten optional input; `None` behaves like an empty map.
pub fn unflatten_opt(flat: Option<&BTreeMap<String, serde_json::Value>>) -> Node {
    flat.map(unflatten).unwrap_or_else(Node::empty_object)
}

fn insert(node: &mut Node, segments: &[&str], value: Node) {
    let Some((head, rest)) = segments.split_first() else {
        merge(node, value);
        return;
    };

    match node {
        Node::Object(fields) => {
            let slot = fields.entry((*head).to_string()).or_insert_with(Node::null);
            insert(slot, rest, value);
        }
        Node::Array(items) => match parse_index(head) {
            Some(index) => {
                if items.len() <= index {
                    items.resize(index + 1, Node::null());
                }
                insert(&mut items[index], rest, value);
            }
            None => {
                debug!(segment = %head, "dropping field segment under an array branch");
            }
        },
        Node::Scalar(_) => {
            *node = if parse_index(head).is_some() {
                Node::Array(Vec::new())
            } else {
                Node::empty_object()
            };
            insert(node, segments, value);
        }
    }
}

/// Place `value` at `node`, merging containers of the same kind.
fn merge(node: &mut Node, value: Node) {
    match node {
        Node::Scalar(_) => *node = value,
        Node::Object(existing) => match value {
            Node::Object(incoming) => {
                for (key, child) in incoming {
                    merge(existing.entry(key).or_insert_with(Node::null), child);
                }
            }
            // Structure discovered through deeper keys wins over a bare value.
            _ => debug!("keeping object branch over conflicting value"),
        },
        Node::Array(existing) => match value {
            Node::Array(incoming) => {
                if existing.len() < incoming.len() {
                    existing.resize(incoming.len(), Node::null());
                }
                for (slot, child) in existing.iter_mut().zip(incoming) {
                    merge(slot, child);
                }
            }
            _ => debug!("keeping array branch over conflicting value"),
        },
    }
}

/// Whether `segment` is written as an array index: one or more ASCII digits,
/// without sign or whitespace.
pub(crate) fn is_index_segment(segment: &str) -> bool {
    !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit())
}

fn parse_index(segment: &str) -> Option<usize> {
    if !is_index_segment(segment) {
        return None;
    }
    segment
        .parse::<usize>()
        .ok()
        .filter(|index| *index <= MAX_ARRAY_INDEX)
}
