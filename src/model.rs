//! Entities produced by schema analysis and the references that link them.
//!
//! References between documents take the form `#/<kind>/<document>/<id>`.

use std::collections::BTreeMap;

use crate::type_map::YamlType;

/// `metadata.name` of the events document.
pub const EVENTS_DOCUMENT: &str = "extracted_events";
/// `metadata.name` of the properties document.
pub const PROPERTIES_DOCUMENT: &str = "extracted_properties";
/// `metadata.name` of the custom types document.
pub const CUSTOM_TYPES_DOCUMENT: &str = "extracted_custom_types";

pub fn event_ref(id: &str) -> String {
    format!("#/events/{EVENTS_DOCUMENT}/{id}")
}

pub fn property_ref(id: &str) -> String {
    format!("#/properties/{PROPERTIES_DOCUMENT}/{id}")
}

pub fn custom_type_ref(id: &str) -> String {
    format!("#/custom-types/{CUSTOM_TYPES_DOCUMENT}/{id}")
}

/// An event discovered from a schema's identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub id: String,
    pub name: String,
    pub event_type: String,
    pub description: String,
    /// UID of the first schema that produced this event.
    pub source_schema: String,
}

/// The declared type of a property.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PropertyType {
    Primitive(YamlType),
    /// A custom type, by ID.
    Custom(String),
}

impl PropertyType {
    /// The value written to the `type` field: a YAML type name or a
    /// custom-type reference.
    pub fn reference(&self) -> String {
        match self {
            PropertyType::Primitive(t) => t.as_str().to_string(),
            PropertyType::Custom(id) => custom_type_ref(id),
        }
    }

    /// Type name without reference syntax, used when minting property IDs.
    pub fn clean_name(&self) -> &str {
        match self {
            PropertyType::Primitive(t) => t.as_str(),
            PropertyType::Custom(id) => id,
        }
    }
}

/// A named, typed property shared by every schema that carries it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Property {
    pub id: String,
    pub name: String,
    pub property_type: PropertyType,
    pub description: String,
    /// Path at which the property was first seen.
    pub path: String,
    pub json_type: YamlType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CustomTypeKind {
    Object,
    Array,
}

impl CustomTypeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CustomTypeKind::Object => "object",
            CustomTypeKind::Array => "array",
        }
    }
}

/// Structural content of a custom type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CustomTypeShape {
    Object {
        structure: BTreeMap<String, YamlType>,
    },
    Array {
        item_type: YamlType,
        /// Custom type ID of object items.
        item_ref: Option<String>,
    },
}

/// A deduplicated structural type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomType {
    pub id: String,
    pub name: String,
    pub description: String,
    pub shape: CustomTypeShape,
    pub content_hash: String,
}

impl CustomType {
    pub fn kind(&self) -> CustomTypeKind {
        match self.shape {
            CustomTypeShape::Object { .. } => CustomTypeKind::Object,
            CustomTypeShape::Array { .. } => CustomTypeKind::Array,
        }
    }
}

/// Binding of one event to its properties within a tracking plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRule {
    pub id: String,
    pub event_ref: String,
    pub properties: Vec<RuleProperty>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleProperty {
    pub property_ref: String,
    pub required: bool,
}

/// The rules for one write key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackingPlan {
    pub write_key: String,
    /// Plan name, also the output file stem (`writekey-<sanitized key>`).
    pub name: String,
    pub rules: Vec<EventRule>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn references_use_document_names() {
        assert_eq!(event_ref("signed_up"), "#/events/extracted_events/signed_up");
        assert_eq!(
            property_ref("id_string"),
            "#/properties/extracted_properties/id_string"
        );
        assert_eq!(
            custom_type_ref("AddressType"),
            "#/custom-types/extracted_custom_types/AddressType"
        );
    }

    #[test]
    fn property_type_rendering() {
        let primitive = PropertyType::Primitive(YamlType::Number);
        assert_eq!(primitive.reference(), "number");
        assert_eq!(primitive.clean_name(), "number");

        let custom = PropertyType::Custom("AddressType".to_string());
        assert_eq!(
            custom.reference(),
            "#/custom-types/extracted_custom_types/AddressType"
        );
        assert_eq!(custom.clean_name(), "AddressType");
    }
}
