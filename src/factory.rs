//! Minting of deduplicated properties and custom types.
//!
//! Each factory owns the records it created, the lookup table used for
//! deduplication, and the set of IDs already taken in its namespace.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use tracing::trace;

use crate::model::{CustomType, CustomTypeKind, CustomTypeShape, Property, PropertyType};
use crate::naming::{SanitizeMode, UniqueStrategy, content_hash, ensure_unique, sanitize};
use crate::type_map::{MAX_CUSTOM_TYPE_NAME_LEN, YamlType, custom_type_base_name};

/// Content-addressed custom types: structurally equal shapes share one record.
#[derive(Debug, Default)]
pub struct CustomTypeFactory {
    types: BTreeMap<String, CustomType>,
    by_content: HashMap<(String, CustomTypeKind), String>,
    used_names: BTreeSet<String>,
}

impl CustomTypeFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or create the object type with the given field → type structure.
    ///
    /// `path` only influences the name of a newly minted type.
    pub fn object_type(&mut self, path: &str, structure: BTreeMap<String, YamlType>) -> &CustomType {
        let hash = object_hash(&structure);
        let description = format!("Object type inferred at {}", display_path(path));
        self.get_or_insert(
            path,
            "Type",
            hash,
            CustomTypeKind::Object,
            description,
            CustomTypeShape::Object { structure },
        )
    }

    /// Get or create the array type with the given item type.
    ///
    /// Arrays of objects carry the item's custom type ID in `item_ref`, so
    /// arrays of structurally different objects stay distinct.
    pub fn array_type(
        &mut self,
        path: &str,
        item_type: YamlType,
        item_ref: Option<String>,
    ) -> &CustomType {
        let content = match &item_ref {
            Some(id) => format!("{item_type}:{id}"),
            None => item_type.to_string(),
        };
        let hash = content_hash(&content, Some("array"));
        let description = format!("Array type inferred at {}", display_path(path));
        self.get_or_insert(
            path,
            "Array",
            hash,
            CustomTypeKind::Array,
            description,
            CustomTypeShape::Array {
                item_type,
                item_ref,
            },
        )
    }

    fn get_or_insert(
        &mut self,
        path: &str,
        suffix: &str,
        hash: String,
        kind: CustomTypeKind,
        description: String,
        shape: CustomTypeShape,
    ) -> &CustomType {
        let key = (hash, kind);
        let id = match self.by_content.get(&key) {
            Some(id) => {
                trace!(id = %id, path = %path, "reusing custom type");
                id.clone()
            }
            None => {
                let base = custom_type_base_name(path, suffix);
                let id = ensure_unique(
                    &base,
                    &self.used_names,
                    UniqueStrategy::LetterSuffix,
                    Some(MAX_CUSTOM_TYPE_NAME_LEN),
                );
                trace!(id = %id, path = %path, kind = kind.as_str(), "minted custom type");
                self.used_names.insert(id.clone());
                self.types.insert(
                    id.clone(),
                    CustomType {
                        id: id.clone(),
                        name: id.clone(),
                        description,
                        shape,
                        content_hash: key.0.clone(),
                    },
                );
                self.by_content.insert(key, id.clone());
                id
            }
        };
        &self.types[&id]
    }

    pub fn get(&self, id: &str) -> Option<&CustomType> {
        self.types.get(id)
    }

    /// All custom types, sorted by ID.
    pub fn types(&self) -> impl Iterator<Item = &CustomType> {
        self.types.values()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

fn object_hash(structure: &BTreeMap<String, YamlType>) -> String {
    let content = structure
        .iter()
        .map(|(field, ty)| format!("{}:{ty}", escape_field(field)))
        .collect::<Vec<_>>()
        .join(",");
    content_hash(&content, None)
}

/// Escape the `:` and `,` separators of the object hash content.
fn escape_field(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    for c in field.chars() {
        if matches!(c, '\\' | ':' | ',') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Properties deduplicated by sanitized name and exact type.
#[derive(Debug, Default)]
pub struct PropertyFactory {
    properties: BTreeMap<String, Property>,
    by_key: HashMap<(String, PropertyType), String>,
    used_ids: BTreeSet<String>,
}

impl PropertyFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or create the property `name` of `property_type`.
    ///
    /// Returns `None` without recording anything when `path` or `name` is
    /// empty. A known (name, type) pair returns the existing property and
    /// keeps its original path.
    pub fn get_or_create(
        &mut self,
        name: &str,
        path: &str,
        property_type: PropertyType,
        json_type: YamlType,
    ) -> Option<&Property> {
        let name = name.trim();
        if path.is_empty() || name.is_empty() {
            return None;
        }

        let sanitized_name = sanitize(name, SanitizeMode::Basic);
        // Custom type IDs are case-sensitive, so the type is compared as is.
        let key = (sanitized_name.clone(), property_type.clone());
        if let Some(id) = self.by_key.get(&key).cloned() {
            return self.properties.get(&id);
        }

        let base = format!(
            "{sanitized_name}_{}",
            sanitize(property_type.clean_name(), SanitizeMode::Basic)
        );
        let id = ensure_unique(&base, &self.used_ids, UniqueStrategy::Counter, None);
        trace!(id = %id, path = %path, "minted property");

        self.used_ids.insert(id.clone());
        self.by_key.insert(key, id.clone());
        self.properties.insert(
            id.clone(),
            Property {
                id: id.clone(),
                name: name.to_string(),
                property_type,
                description: format!("Property discovered at {path}"),
                path: path.to_string(),
                json_type,
            },
        );
        self.properties.get(&id)
    }

    pub fn get(&self, id: &str) -> Option<&Property> {
        self.properties.get(id)
    }

    /// All properties, sorted by ID.
    pub fn properties(&self) -> impl Iterator<Item = &Property> {
        self.properties.values()
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }
}

fn display_path(path: &str) -> &str {
    if path.is_empty() { "root" } else { path }
}
