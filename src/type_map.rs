//! Maps captured JSON type hints to the YAML type names used in the output
//! documents, and derives custom-type names from property paths.
//!
//! # Type Mapping Table
//!
//! | Captured hint | YAML type | Notes |
//! |---------------|-----------|-------|
//! | `number`, `integer`, `boolean`, `object`, `array`, `null` | same | |
//! | `float64` | `number` | Legacy hint |
//! | `bool` | `boolean` | Legacy hint |
//! | anything else | `string` | Includes `string` and literal values |

use std::fmt;

use serde::Serialize;

use crate::node::{Node, Scalar};

/// Custom type names are at most this long, suffix included.
pub const MAX_CUSTOM_TYPE_NAME_LEN: usize = 65;

/// A primitive type name as written in the properties document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum YamlType {
    String,
    Number,
    Integer,
    Boolean,
    Object,
    Array,
    Null,
}

impl YamlType {
    pub fn as_str(&self) -> &'static str {
        match self {
            YamlType::String => "string",
            YamlType::Number => "number",
            YamlType::Integer => "integer",
            YamlType::Boolean => "boolean",
            YamlType::Object => "object",
            YamlType::Array => "array",
            YamlType::Null => "null",
        }
    }
}

impl fmt::Display for YamlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Map a captured JSON type hint to a YAML type.
pub fn json_to_yaml_type(type_name: &str) -> YamlType {
    match type_name.trim() {
        "number" | "float64" => YamlType::Number,
        "integer" => YamlType::Integer,
        "boolean" | "bool" => YamlType::Boolean,
        "object" => YamlType::Object,
        "array" => YamlType::Array,
        "null" => YamlType::Null,
        _ => YamlType::String,
    }
}

/// Infer the YAML type of a schema node.
///
/// String leaves are read as type hints; other literals map by their JSON kind.
pub fn node_type(node: &Node) -> YamlType {
    match node {
        Node::Object(_) => YamlType::Object,
        Node::Array(_) => YamlType::Array,
        Node::Scalar(Scalar::String(hint)) => json_to_yaml_type(hint),
        Node::Scalar(Scalar::Bool(_)) => YamlType::Boolean,
        Node::Scalar(Scalar::Number(n)) if n.is_i64() || n.is_u64() => YamlType::Integer,
        Node::Scalar(Scalar::Number(_)) => YamlType::Number,
        Node::Scalar(Scalar::Null) => YamlType::Null,
    }
}

/// Convert a property path to a PascalCase name token.
///
/// Only the last dot segment is used and every non-alphanumeric run acts as a
/// word break:
/// - `"context.traits.address"` → `"Address"`
/// - `"products_item"` → `"ProductsItem"`
/// - `"shipping-info"` → `"ShippingInfo"`
pub fn to_pascal_case(path: &str) -> String {
    let name = path.rsplit('.').next().unwrap_or(path);
    name.split(|c: char| !c.is_ascii_alphanumeric())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                None => String::new(),
                Some(c) => c.to_ascii_uppercase().to_string() + chars.as_str(),
            }
        })
        .collect()
}

/// Base name for a custom type minted at `path`: the PascalCase token plus
/// `suffix`, truncated so the whole name fits [`MAX_CUSTOM_TYPE_NAME_LEN`].
pub fn custom_type_base_name(path: &str, suffix: &str) -> String {
    let mut token = to_pascal_case(path);
    if token.is_empty() {
        token = "Custom".to_string();
    }
    let room = MAX_CUSTOM_TYPE_NAME_LEN.saturating_sub(suffix.len());
    token.truncate(room);
    format!("{token}{suffix}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn passthrough_types() {
        assert_eq!(json_to_yaml_type("number"), YamlType::Number);
        assert_eq!(json_to_yaml_type("integer"), YamlType::Integer);
        assert_eq!(json_to_yaml_type("boolean"), YamlType::Boolean);
        assert_eq!(json_to_yaml_type("object"), YamlType::Object);
        assert_eq!(json_to_yaml_type("array"), YamlType::Array);
        assert_eq!(json_to_yaml_type("null"), YamlType::Null);
    }

    #[test]
    fn legacy_hints() {
        assert_eq!(json_to_yaml_type("float64"), YamlType::Number);
        assert_eq!(json_to_yaml_type("bool"), YamlType::Boolean);
    }

    #[test]
    fn unknown_type_falls_back_to_string() {
        for t in ["string", "int", "datetime", "Alice", ""] {
            assert_eq!(json_to_yaml_type(t), YamlType::String, "expected string for {t}");
        }
    }

    #[test]
    fn node_type_reads_literals() {
        assert_eq!(node_type(&Node::from(json!(3))), YamlType::Integer);
        assert_eq!(node_type(&Node::from(json!(3.5))), YamlType::Number);
        assert_eq!(node_type(&Node::from(json!(false))), YamlType::Boolean);
        assert_eq!(node_type(&Node::from(json!(null))), YamlType::Null);
        assert_eq!(node_type(&Node::from(json!("float64"))), YamlType::Number);
        assert_eq!(node_type(&Node::from(json!({}))), YamlType::Object);
        assert_eq!(node_type(&Node::from(json!([]))), YamlType::Array);
    }

    #[test]
    fn pascal_case_conversion() {
        assert_eq!(to_pascal_case("context.traits.address"), "Address");
        assert_eq!(to_pascal_case("products_item"), "ProductsItem");
        assert_eq!(to_pascal_case("shipping-info"), "ShippingInfo");
        assert_eq!(to_pascal_case("a.b.__"), "");
    }

    #[test]
    fn custom_type_names_fit_length_bounds() {
        assert_eq!(custom_type_base_name("address", "Type"), "AddressType");
        assert_eq!(custom_type_base_name("tags", "Array"), "TagsArray");
        assert_eq!(custom_type_base_name("__", "Type"), "CustomType");

        let long = "x".repeat(100);
        let name = custom_type_base_name(&long, "Array");
        assert_eq!(name.len(), MAX_CUSTOM_TYPE_NAME_LEN);
        assert!(name.ends_with("Array"));
    }
}
