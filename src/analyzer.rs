//! Schema analysis: turns captured schemas into events, properties, and
//! custom types.
//!
//! A single [`SchemaAnalyzer`] owns every namespace used during a run (event
//! IDs, property IDs, custom type names), so uniqueness and deduplication hold
//! across all schemas it sees. Schemas are processed sequentially in input
//! order; the same input yields the same state apart from randomly minted
//! event IDs, which can be pinned with [`SchemaAnalyzer::with_seed`].

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet, HashMap};

use rand::distributions::Alphanumeric;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, trace};

use crate::config::ExtractionConfig;
use crate::error::Result;
use crate::factory::{CustomTypeFactory, PropertyFactory};
use crate::model::{Event, PropertyType};
use crate::naming::{SanitizeMode, sanitize};
use crate::node::Node;
use crate::path::JsonPathProcessor;
use crate::schema::Schema;
use crate::type_map::{YamlType, node_type};
use crate::unflatten::unflatten;

/// Event name used when a schema has a blank identifier.
pub const UNKNOWN_EVENT: &str = "unknown_event";

/// Sanitized event IDs shorter than this are replaced by a random ID.
const MIN_EVENT_ID_LEN: usize = 3;

const RANDOM_EVENT_ID_LEN: usize = 10;

/// Appended to an array's path to name its items.
const ITEM_SUFFIX: &str = "_item";

/// Counters collected during analysis for reporting.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct AnalysisStats {
    pub schemas_seen: usize,
    pub schemas_analyzed: usize,
    pub skipped_on_path_error: usize,
    pub kept_unfiltered: usize,
    pub duplicate_events: usize,
    /// One message per failed path resolution.
    pub path_errors: Vec<String>,
}

/// What analysis discovered within one schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalyzedSchema {
    pub uid: String,
    pub write_key: String,
    pub event_type: String,
    pub event_identifier: String,
    /// IDs of every property found in this schema, sorted.
    pub property_ids: BTreeSet<String>,
}

/// Walks schemas and accumulates the entities for the output documents.
#[derive(Debug)]
pub struct SchemaAnalyzer {
    config: ExtractionConfig,
    events: BTreeMap<String, Event>,
    /// Raw identifier → event ID, so random fallbacks stay stable per run.
    identifier_ids: HashMap<String, String>,
    /// (event identifier, write key) → event ID.
    event_keys: BTreeMap<(String, String), String>,
    properties: PropertyFactory,
    custom_types: CustomTypeFactory,
    analyzed: Vec<AnalyzedSchema>,
    stats: AnalysisStats,
    rng: StdRng,
}

impl SchemaAnalyzer {
    pub fn new(config: ExtractionConfig) -> Self {
        Self::with_rng(config, StdRng::from_entropy())
    }

    /// Create an analyzer whose random event IDs are reproducible.
    pub fn with_seed(config: ExtractionConfig, seed: u64) -> Self {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: ExtractionConfig, rng: StdRng) -> Self {
        Self {
            config,
            events: BTreeMap::new(),
            identifier_ids: HashMap::new(),
            event_keys: BTreeMap::new(),
            properties: PropertyFactory::new(),
            custom_types: CustomTypeFactory::new(),
            analyzed: Vec::new(),
            stats: AnalysisStats::default(),
            rng,
        }
    }

    /// Analyze `schemas` in order.
    ///
    /// Malformed or empty schemas degrade gracefully; the `Result` leaves room
    /// for wrapping future failure modes and is currently always `Ok`.
    pub fn analyze_schemas(&mut self, schemas: &[Schema]) -> Result<()> {
        for schema in schemas {
            self.analyze_schema(schema);
        }
        info!(
            schemas = self.stats.schemas_seen,
            analyzed = self.stats.schemas_analyzed,
            events = self.events.len(),
            properties = self.properties.len(),
            custom_types = self.custom_types.len(),
            "analysis complete"
        );
        Ok(())
    }

    fn analyze_schema(&mut self, schema: &Schema) {
        self.stats.schemas_seen += 1;

        let tree = unflatten(&schema.schema);
        let processor = JsonPathProcessor::new(
            self.config.path_for(&schema.event_type),
            self.config.skip_failed,
        );
        let selected = match processor.process(&tree) {
            Ok(extracted) => extracted.value,
            Err(err) => {
                self.stats.path_errors.push(format!("schema '{}': {err}", schema.uid));
                if processor.skip_on_error() {
                    debug!(uid = %schema.uid, error = %err, "skipping schema");
                    self.stats.skipped_on_path_error += 1;
                    return;
                }
                debug!(uid = %schema.uid, error = %err, "keeping unfiltered schema");
                self.stats.kept_unfiltered += 1;
                tree
            }
        };

        self.record_event(schema);

        let mut property_ids = BTreeSet::new();
        self.walk_root(&selected, &mut property_ids);

        self.analyzed.push(AnalyzedSchema {
            uid: schema.uid.clone(),
            write_key: schema.write_key.clone(),
            event_type: schema.event_type.clone(),
            event_identifier: schema.event_identifier.clone(),
            property_ids,
        });
        self.stats.schemas_analyzed += 1;
    }

    // ── Events ─────────────────────────────────────────────────────────

    fn record_event(&mut self, schema: &Schema) {
        let identifier = schema.event_identifier.trim();
        let name = if identifier.is_empty() {
            UNKNOWN_EVENT
        } else {
            identifier
        };

        let id = match self.identifier_ids.get(name) {
            Some(id) => id.clone(),
            None => {
                let mut id = sanitize(name, SanitizeMode::Event);
                if id.chars().count() < MIN_EVENT_ID_LEN {
                    id = self.random_event_id();
                }
                self.identifier_ids.insert(name.to_string(), id.clone());
                id
            }
        };

        match self.events.entry(id.clone()) {
            Entry::Vacant(slot) => {
                trace!(id = %id, uid = %schema.uid, "new event");
                slot.insert(Event {
                    id: id.clone(),
                    name: name.to_string(),
                    event_type: schema.event_type.clone(),
                    description: format!(
                        "Extracted from {} schema {}",
                        display_or(&schema.event_type, "unknown"),
                        schema.uid
                    ),
                    source_schema: schema.uid.clone(),
                });
            }
            Entry::Occupied(_) => self.stats.duplicate_events += 1,
        }

        self.event_keys.insert(
            (schema.event_identifier.clone(), schema.write_key.clone()),
            id,
        );
    }

    fn random_event_id(&mut self) -> String {
        loop {
            let suffix: String = (0..RANDOM_EVENT_ID_LEN)
                .map(|_| char::from(self.rng.sample(Alphanumeric)).to_ascii_lowercase())
                .collect();
            let id = format!("event_{suffix}");
            if !self.events.contains_key(&id) {
                return id;
            }
        }
    }

    // ── Properties and custom types ────────────────────────────────────

    fn walk_root(&mut self, node: &Node, found: &mut BTreeSet<String>) {
        match node {
            Node::Object(fields) => self.walk_object(fields, "", found),
            Node::Array(items) => self.walk_items(items, "item", found),
            Node::Scalar(_) => trace!("selected value is a primitive, no properties"),
        }
    }

    fn walk_object(
        &mut self,
        fields: &BTreeMap<String, Node>,
        parent: &str,
        found: &mut BTreeSet<String>,
    ) {
        for (name, value) in fields {
            let path = if parent.is_empty() {
                name.clone()
            } else {
                format!("{parent}.{name}")
            };
            self.walk_field(name, &path, value, found);
        }
    }

    fn walk_field(&mut self, name: &str, path: &str, value: &Node, found: &mut BTreeSet<String>) {
        match value {
            Node::Object(children) if !children.is_empty() => {
                let type_id = self
                    .custom_types
                    .object_type(path, structure_of(children))
                    .id
                    .clone();
                self.add_property(name, path, PropertyType::Custom(type_id), YamlType::Object, found);
                self.walk_object(children, path, found);
            }
            Node::Array(items) => {
                let item_path = format!("{path}{ITEM_SUFFIX}");
                let (item_type, item_ref) = self.array_item_type(items, &item_path);
                let type_id = self
                    .custom_types
                    .array_type(path, item_type, item_ref)
                    .id
                    .clone();
                self.add_property(name, path, PropertyType::Custom(type_id), YamlType::Array, found);
                self.walk_items(items, &item_path, found);
            }
            // Scalars and empty objects.
            other => {
                let ty = node_type(other);
                self.add_property(name, path, PropertyType::Primitive(ty), ty, found);
            }
        }
    }

    fn walk_items(&mut self, items: &[Node], item_path: &str, found: &mut BTreeSet<String>) {
        for item in items {
            match item {
                Node::Object(fields) => self.walk_object(fields, item_path, found),
                Node::Array(inner) => {
                    self.walk_items(inner, &format!("{item_path}{ITEM_SUFFIX}"), found)
                }
                Node::Scalar(_) => {}
            }
        }
    }

    /// Item type of an array, read from its first non-null element.
    ///
    /// Empty arrays default to `string`. Object items mint their own custom
    /// type, whose ID is returned alongside.
    fn array_item_type(&mut self, items: &[Node], item_path: &str) -> (YamlType, Option<String>) {
        let Some(first) = items.iter().find(|item| !item.is_null()) else {
            return (YamlType::String, None);
        };
        match first {
            Node::Object(fields) if !fields.is_empty() => {
                let id = self
                    .custom_types
                    .object_type(item_path, structure_of(fields))
                    .id
                    .clone();
                (YamlType::Object, Some(id))
            }
            other => (node_type(other), None),
        }
    }

    fn add_property(
        &mut self,
        name: &str,
        path: &str,
        property_type: PropertyType,
        json_type: YamlType,
        found: &mut BTreeSet<String>,
    ) {
        if let Some(property) = self
            .properties
            .get_or_create(name, path, property_type, json_type)
        {
            found.insert(property.id.clone());
        }
    }

    // ── Accessors ──────────────────────────────────────────────────────

    /// All events, sorted by ID.
    pub fn events(&self) -> impl Iterator<Item = &Event> {
        self.events.values()
    }

    pub fn event(&self, id: &str) -> Option<&Event> {
        self.events.get(id)
    }

    /// The event recorded for schemas with this identifier and write key.
    pub fn event_id_for(&self, event_identifier: &str, write_key: &str) -> Option<&str> {
        self.event_keys
            .get(&(event_identifier.to_string(), write_key.to_string()))
            .map(String::as_str)
    }

    pub fn properties(&self) -> &PropertyFactory {
        &self.properties
    }

    pub fn custom_types(&self) -> &CustomTypeFactory {
        &self.custom_types
    }

    /// Per-schema results in input order. Skipped schemas are absent.
    pub fn analyzed_schemas(&self) -> &[AnalyzedSchema] {
        &self.analyzed
    }

    pub fn stats(&self) -> &AnalysisStats {
        &self.stats
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }
}

fn structure_of(fields: &BTreeMap<String, Node>) -> BTreeMap<String, YamlType> {
    fields
        .iter()
        .map(|(name, value)| (name.clone(), node_type(value)))
        .collect()
}

fn display_or<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    if value.trim().is_empty() { fallback } else { value }
}
