//! Document generation from analyzer state.
//!
//! Renders four kinds of YAML documents from a finished [`SchemaAnalyzer`]:
//! - `events.yaml` with every event
//! - `properties.yaml` with every property
//! - `custom-types.yaml` with every custom type
//! - `tracking-plans/writekey-<key>.yaml`, one per write key
//!
//! Output is deterministic: entities are emitted in ID order and references
//! are sorted, so unchanged analyzer state renders byte-identical YAML.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info};

use crate::analyzer::{AnalyzedSchema, SchemaAnalyzer};
use crate::error::{Error, Result};
use crate::model::{
    CUSTOM_TYPES_DOCUMENT, CustomType, CustomTypeShape, EVENTS_DOCUMENT, EventRule,
    PROPERTIES_DOCUMENT, Property, RuleProperty, TrackingPlan, custom_type_ref, event_ref,
    property_ref,
};
use crate::naming::{SanitizeMode, UniqueStrategy, ensure_unique, sanitize};
use crate::type_map::YamlType;

/// Envelope `version` of every generated document.
pub const DOCUMENT_VERSION: &str = "rudder/v0.1";

pub const EVENTS_FILE: &str = "events.yaml";
pub const PROPERTIES_FILE: &str = "properties.yaml";
pub const CUSTOM_TYPES_FILE: &str = "custom-types.yaml";
pub const TRACKING_PLANS_DIR: &str = "tracking-plans";

/// Property names that are marked required in every rule that carries them.
const IDENTITY_FIELDS: &[&str] = &["userId", "anonymousId", "event", "messageId", "type"];

/// Statistics collected during generation for reporting.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct GenerationStats {
    /// Documents rendered, including those skipped by a dry run.
    pub documents: usize,
    /// Documents actually written to disk.
    pub documents_written: usize,
    pub events: usize,
    pub properties: usize,
    pub custom_types: usize,
    pub tracking_plans: usize,
    pub rules: usize,
}

// ── Document model ─────────────────────────────────────────────────────

/// `version` / `kind` / `metadata` / `spec` envelope shared by all documents.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Document<T> {
    pub version: String,
    pub kind: String,
    pub metadata: Metadata,
    pub spec: T,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metadata {
    pub name: String,
}

impl<T> Document<T> {
    fn new(kind: &str, name: &str, spec: T) -> Self {
        Self {
            version: DOCUMENT_VERSION.to_string(),
            kind: kind.to_string(),
            metadata: Metadata {
                name: name.to_string(),
            },
            spec,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventsSpec {
    pub events: Vec<EventEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventEntry {
    pub id: String,
    pub name: String,
    pub event_type: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PropertiesSpec {
    pub properties: Vec<PropertyEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PropertyEntry {
    pub id: String,
    pub name: String,
    /// YAML type name or custom-type reference.
    #[serde(rename = "type")]
    pub property_type: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CustomTypesSpec {
    pub types: Vec<CustomTypeEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CustomTypeEntry {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub description: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub properties: Vec<PropertyRefEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<ArrayConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct PropertyRefEntry {
    #[serde(rename = "$ref")]
    pub reference: String,
    pub required: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArrayConfig {
    #[serde(rename = "itemTypes")]
    pub item_types: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackingPlanSpec {
    pub id: String,
    pub display_name: String,
    pub description: String,
    pub rules: Vec<RuleEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleEntry {
    #[serde(rename = "type")]
    pub rule_type: String,
    pub id: String,
    pub event: RuleEventEntry,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub properties: Vec<PropertyRefEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleEventEntry {
    #[serde(rename = "$ref")]
    pub reference: String,
    pub allow_unplanned: bool,
}

// ── Generators ─────────────────────────────────────────────────────────

/// All events, sorted by ID.
pub fn events_document(analyzer: &SchemaAnalyzer) -> Document<EventsSpec> {
    let events = analyzer
        .events()
        .map(|e| EventEntry {
            id: e.id.clone(),
            name: e.name.clone(),
            event_type: e.event_type.clone(),
            description: e.description.clone(),
        })
        .collect();
    Document::new("events", EVENTS_DOCUMENT, EventsSpec { events })
}

/// All properties, sorted by ID.
pub fn properties_document(analyzer: &SchemaAnalyzer) -> Document<PropertiesSpec> {
    let properties = analyzer
        .properties()
        .properties()
        .map(|p| PropertyEntry {
            id: p.id.clone(),
            name: p.name.clone(),
            property_type: p.property_type.reference(),
            description: p.description.clone(),
        })
        .collect();
    Document::new("properties", PROPERTIES_DOCUMENT, PropertiesSpec { properties })
}

/// All custom types, sorted by ID.
///
/// Object types list a reference to the property backing each field; array
/// types carry their item type.
pub fn custom_types_document(analyzer: &SchemaAnalyzer) -> Document<CustomTypesSpec> {
    let properties: Vec<&Property> = analyzer.properties().properties().collect();
    let types = analyzer
        .custom_types()
        .types()
        .map(|t| custom_type_entry(t, &properties))
        .collect();
    Document::new("custom-types", CUSTOM_TYPES_DOCUMENT, CustomTypesSpec { types })
}

fn custom_type_entry(custom_type: &CustomType, properties: &[&Property]) -> CustomTypeEntry {
    let (refs, config) = match &custom_type.shape {
        CustomTypeShape::Object { structure } => {
            let refs: BTreeSet<PropertyRefEntry> = structure
                .iter()
                .filter_map(|(field, ty)| field_property(field, *ty, properties))
                .map(|p| PropertyRefEntry {
                    reference: property_ref(&p.id),
                    required: false,
                })
                .collect();
            (refs.into_iter().collect(), None)
        }
        CustomTypeShape::Array {
            item_type,
            item_ref,
        } => {
            let item = match item_ref {
                Some(id) => custom_type_ref(id),
                None => item_type.to_string(),
            };
            (
                Vec::new(),
                Some(ArrayConfig {
                    item_types: vec![item],
                }),
            )
        }
    };

    CustomTypeEntry {
        id: custom_type.id.clone(),
        name: custom_type.name.clone(),
        kind: custom_type.kind().as_str().to_string(),
        description: custom_type.description.clone(),
        properties: refs,
        config,
    }
}

/// The property backing an object field: matched by name or trailing path
/// segment, preferring one whose type agrees with the field's.
fn field_property<'a>(field: &str, ty: YamlType, properties: &[&'a Property]) -> Option<&'a Property> {
    let matches_field = |p: &&&'a Property| {
        p.name == field || p.path.rsplit('.').next() == Some(field)
    };
    properties
        .iter()
        .filter(matches_field)
        .find(|p| p.json_type == ty)
        .or_else(|| properties.iter().find(matches_field))
        .copied()
}

/// Build one tracking plan per write key.
///
/// Every analyzed schema with a recorded event yields one rule. Rule IDs are
/// `<write key>_<event>_rule`; on collision the schema's index within its
/// group is added. Collisions are checked across all plans.
pub fn tracking_plans(analyzer: &SchemaAnalyzer) -> Vec<TrackingPlan> {
    let mut by_write_key: BTreeMap<&str, Vec<&AnalyzedSchema>> = BTreeMap::new();
    for schema in analyzer.analyzed_schemas() {
        by_write_key
            .entry(schema.write_key.as_str())
            .or_default()
            .push(schema);
    }

    let mut used_rule_ids: BTreeSet<String> = BTreeSet::new();
    let mut used_plan_names: BTreeSet<String> = BTreeSet::new();
    let mut plans = Vec::with_capacity(by_write_key.len());

    for (write_key, schemas) in by_write_key {
        let key_slug = write_key_slug(write_key);
        let name = ensure_unique(
            &format!("writekey-{key_slug}"),
            &used_plan_names,
            UniqueStrategy::Counter,
            None,
        );
        used_plan_names.insert(name.clone());

        let mut rules = Vec::with_capacity(schemas.len());
        for (index, schema) in schemas.iter().enumerate() {
            let Some(event_id) = analyzer.event_id_for(&schema.event_identifier, write_key) else {
                debug!(uid = %schema.uid, "no event recorded, skipping rule");
                continue;
            };

            let mut id = format!("{key_slug}_{event_id}_rule");
            if used_rule_ids.contains(&id) {
                id = ensure_unique(
                    &format!("{key_slug}_{event_id}_{index}_rule"),
                    &used_rule_ids,
                    UniqueStrategy::Counter,
                    None,
                );
            }
            used_rule_ids.insert(id.clone());

            let properties = schema
                .property_ids
                .iter()
                .filter_map(|pid| analyzer.properties().get(pid))
                .map(|p| RuleProperty {
                    property_ref: property_ref(&p.id),
                    required: is_identity_field(&p.name),
                })
                .collect();

            rules.push(EventRule {
                id,
                event_ref: event_ref(event_id),
                properties,
            });
        }

        plans.push(TrackingPlan {
            write_key: write_key.to_string(),
            name,
            rules,
        });
    }

    plans
}

/// Properties are shared by sanitized name, so compare in that form to
/// treat every spelling that maps to the property alike.
fn is_identity_field(name: &str) -> bool {
    let name = sanitize(name, SanitizeMode::Basic);
    IDENTITY_FIELDS
        .iter()
        .any(|field| sanitize(field, SanitizeMode::Basic) == name)
}

fn write_key_slug(write_key: &str) -> String {
    let slug = sanitize(write_key.trim(), SanitizeMode::Basic);
    if slug.is_empty() {
        "unknown".to_string()
    } else {
        slug
    }
}

pub fn tracking_plan_document(plan: &TrackingPlan) -> Document<TrackingPlanSpec> {
    let rules = plan
        .rules
        .iter()
        .map(|rule| RuleEntry {
            rule_type: "event_rule".to_string(),
            id: rule.id.clone(),
            event: RuleEventEntry {
                reference: rule.event_ref.clone(),
                allow_unplanned: false,
            },
            properties: rule
                .properties
                .iter()
                .map(|p| PropertyRefEntry {
                    reference: p.property_ref.clone(),
                    required: p.required,
                })
                .collect(),
        })
        .collect();

    Document::new(
        "tp",
        &plan.name,
        TrackingPlanSpec {
            id: plan.name.clone(),
            display_name: format!("Tracking plan for {}", plan.write_key),
            description: format!("Rules inferred from schemas captured for write key {}", plan.write_key),
            rules,
        },
    )
}

// ── Rendering and output ───────────────────────────────────────────────

/// Render every document to YAML, keyed by path relative to the output
/// directory. `plans` comes from [`tracking_plans`] on the same analyzer.
pub fn render_documents(
    analyzer: &SchemaAnalyzer,
    plans: &[TrackingPlan],
) -> Result<BTreeMap<PathBuf, String>> {
    let mut files = BTreeMap::new();
    files.insert(
        PathBuf::from(EVENTS_FILE),
        serde_yaml::to_string(&events_document(analyzer))?,
    );
    files.insert(
        PathBuf::from(PROPERTIES_FILE),
        serde_yaml::to_string(&properties_document(analyzer))?,
    );
    files.insert(
        PathBuf::from(CUSTOM_TYPES_FILE),
        serde_yaml::to_string(&custom_types_document(analyzer))?,
    );
    for plan in plans {
        files.insert(
            Path::new(TRACKING_PLANS_DIR).join(format!("{}.yaml", plan.name)),
            serde_yaml::to_string(&tracking_plan_document(plan))?,
        );
    }
    Ok(files)
}

/// Render all documents and write them under `output_dir`.
///
/// With `dry_run`, documents are rendered and counted but nothing touches
/// the filesystem.
pub fn write_documents(
    analyzer: &SchemaAnalyzer,
    output_dir: &Path,
    dry_run: bool,
) -> Result<GenerationStats> {
    let plans = tracking_plans(analyzer);
    let mut stats = GenerationStats {
        events: analyzer.events().count(),
        properties: analyzer.properties().len(),
        custom_types: analyzer.custom_types().len(),
        tracking_plans: plans.len(),
        rules: plans.iter().map(|p| p.rules.len()).sum(),
        ..Default::default()
    };

    for (relative, content) in render_documents(analyzer, &plans)? {
        let path = output_dir.join(&relative);
        stats.documents += 1;
        if dry_run {
            info!(path = %path.display(), bytes = content.len(), "dry run, not writing");
            continue;
        }
        write_file(&path, &content)?;
        debug!(path = %path.display(), "wrote document");
        stats.documents_written += 1;
    }

    Ok(stats)
}

/// Write content to a file, creating parent directories as needed.
fn write_file(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| Error::Write {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }
    std::fs::write(path, content).map_err(|e| Error::Write {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExtractionConfig;
    use crate::schema::Schema;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn schema(write_key: &str, identifier: &str, fields: serde_json::Value) -> Schema {
        Schema {
            uid: format!("{write_key}/{identifier}"),
            write_key: write_key.to_string(),
            event_type: "track".to_string(),
            event_identifier: identifier.to_string(),
            schema: serde_json::from_value(fields).unwrap(),
            ..Default::default()
        }
    }

    fn analyze(schemas: &[Schema]) -> SchemaAnalyzer {
        let mut analyzer = SchemaAnalyzer::with_seed(ExtractionConfig::default(), 3);
        analyzer.analyze_schemas(schemas).unwrap();
        analyzer
    }

    #[test]
    fn events_document_is_sorted() {
        let analyzer = analyze(&[
            schema("wk", "Zoom In", json!({})),
            schema("wk", "Added To Cart", json!({})),
        ]);
        let doc = events_document(&analyzer);
        assert_eq!(doc.kind, "events");
        assert_eq!(doc.metadata.name, "extracted_events");
        let ids: Vec<_> = doc.spec.events.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, ["added_to_cart", "zoom_in"]);
    }

    #[test]
    fn properties_document_uses_type_references() {
        let analyzer = analyze(&[schema(
            "wk",
            "Checkout",
            json!({"properties.address.city": "string"}),
        )]);
        let doc = properties_document(&analyzer);
        let address = doc.spec.properties.iter().find(|p| p.name == "address").unwrap();
        assert_eq!(
            address.property_type,
            "#/custom-types/extracted_custom_types/AddressType"
        );
        let city = doc.spec.properties.iter().find(|p| p.name == "city").unwrap();
        assert_eq!(city.property_type, "string");
    }

    #[test]
    fn object_types_reference_their_field_properties() {
        let analyzer = analyze(&[schema(
            "wk",
            "Checkout",
            json!({
                "properties.address.city": "string",
                "properties.address.zip": "integer",
                "properties.zip": "string"
            }),
        )]);
        let doc = custom_types_document(&analyzer);
        let address = doc.spec.types.iter().find(|t| t.id == "AddressType").unwrap();
        assert_eq!(address.kind, "object");
        assert_eq!(
            address.properties,
            vec![
                PropertyRefEntry {
                    reference: "#/properties/extracted_properties/city_string".into(),
                    required: false,
                },
                PropertyRefEntry {
                    reference: "#/properties/extracted_properties/zip_integer".into(),
                    required: false,
                },
            ]
        );
        assert!(address.config.is_none());
    }

    #[test]
    fn array_types_carry_item_config() {
        let analyzer = analyze(&[schema(
            "wk",
            "Order Completed",
            json!({"properties.products.0.sku": "string", "properties.tags.0": "string"}),
        )]);
        let doc = custom_types_document(&analyzer);
        let products = doc.spec.types.iter().find(|t| t.id == "ProductsArray").unwrap();
        assert_eq!(products.kind, "array");
        assert_eq!(
            products.config,
            Some(ArrayConfig {
                item_types: vec!["#/custom-types/extracted_custom_types/ProductsItemType".into()],
            })
        );
        let tags = doc.spec.types.iter().find(|t| t.id == "TagsArray").unwrap();
        assert_eq!(
            tags.config,
            Some(ArrayConfig {
                item_types: vec!["string".into()],
            })
        );
    }

    #[test]
    fn rules_share_properties_across_events() {
        let analyzer = analyze(&[
            schema("wk1", "e1", json!({"properties.id": "string"})),
            schema("wk1", "e2", json!({"properties.id": "string"})),
        ]);
        let plans = tracking_plans(&analyzer);
        assert_eq!(plans.len(), 1);
        assert_eq!(plans[0].name, "writekey-wk1");
        assert_eq!(plans[0].rules.len(), 2);
        for rule in &plans[0].rules {
            assert_eq!(
                rule.properties,
                vec![RuleProperty {
                    property_ref: "#/properties/extracted_properties/id_string".into(),
                    required: false,
                }]
            );
        }
    }

    #[test]
    fn rule_ids_are_unique_across_write_keys() {
        let analyzer = analyze(&[
            schema("wk-1", "Signed Up", json!({})),
            schema("wk_1", "Signed Up", json!({})),
            schema("wk-1", "Signed Up", json!({"properties.plan": "string"})),
        ]);
        let plans = tracking_plans(&analyzer);
        assert_eq!(plans.len(), 2);
        let ids: Vec<_> = plans
            .iter()
            .flat_map(|p| p.rules.iter().map(|r| r.id.clone()))
            .collect();
        assert_eq!(
            ids,
            [
                "wk_1_signed_up_rule",
                "wk_1_signed_up_1_rule",
                "wk_1_signed_up_0_rule"
            ]
        );
        let names: Vec<_> = plans.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["writekey-wk_1", "writekey-wk_1_1"]);
    }

    #[test]
    fn identity_fields_are_required() {
        let config = ExtractionConfig {
            json_path: "$".into(),
            ..Default::default()
        };
        let mut analyzer = SchemaAnalyzer::with_seed(config, 3);
        analyzer
            .analyze_schemas(&[schema(
                "wk",
                "Signed Up",
                json!({"userId": "string", "anonymousId": "string", "properties.plan": "string"}),
            )])
            .unwrap();
        let plans = tracking_plans(&analyzer);
        let required: BTreeMap<_, _> = plans[0].rules[0]
            .properties
            .iter()
            .map(|p| (p.property_ref.rsplit('/').next().unwrap().to_string(), p.required))
            .collect();
        assert!(required["userid_string"]);
        assert!(required["anonymousid_string"]);
        assert!(!required["plan_string"]);
    }

    #[test]
    fn identity_fields_are_required_whatever_spelling_came_first() {
        let config = ExtractionConfig {
            json_path: "$".into(),
            ..Default::default()
        };
        let mut analyzer = SchemaAnalyzer::with_seed(config, 3);
        analyzer
            .analyze_schemas(&[
                schema("wk", "Signed Up", json!({"userid": "string"})),
                schema("wk", "Logged In", json!({"userId": "string"})),
            ])
            .unwrap();
        assert_eq!(analyzer.properties().len(), 1);
        let plans = tracking_plans(&analyzer);
        assert_eq!(plans[0].rules.len(), 2);
        for rule in &plans[0].rules {
            assert_eq!(
                rule.properties,
                vec![RuleProperty {
                    property_ref: "#/properties/extracted_properties/userid_string".into(),
                    required: true,
                }]
            );
        }
    }

    #[test]
    fn skipped_schemas_produce_no_rules() {
        let config = ExtractionConfig {
            skip_failed: true,
            ..Default::default()
        };
        let mut analyzer = SchemaAnalyzer::with_seed(config, 3);
        analyzer
            .analyze_schemas(&[
                schema("wk", "Viewed", json!({"context.ip": "string"})),
                schema("wk", "Clicked", json!({"properties.x": "string"})),
            ])
            .unwrap();
        let plans = tracking_plans(&analyzer);
        assert_eq!(plans[0].rules.len(), 1);
        assert_eq!(plans[0].rules[0].id, "wk_clicked_rule");
    }

    #[test]
    fn tracking_plan_document_envelope() {
        let analyzer = analyze(&[schema("wk", "Signed Up", json!({}))]);
        let plans = tracking_plans(&analyzer);
        let doc = tracking_plan_document(&plans[0]);
        assert_eq!(doc.version, DOCUMENT_VERSION);
        assert_eq!(doc.kind, "tp");
        assert_eq!(doc.metadata.name, "writekey-wk");
        assert_eq!(doc.spec.rules[0].rule_type, "event_rule");
        assert_eq!(
            doc.spec.rules[0].event.reference,
            "#/events/extracted_events/signed_up"
        );
        let yaml = serde_yaml::to_string(&doc).unwrap();
        assert!(yaml.contains("kind: tp"));
        assert!(yaml.contains("allow_unplanned: false"));
    }

    #[test]
    fn rendering_is_deterministic() {
        let analyzer = analyze(&[
            schema("wk2", "Order Completed", json!({"properties.products.0.sku": "string"})),
            schema("wk1", "Signed Up", json!({"properties.plan": "string"})),
        ]);
        let plans = tracking_plans(&analyzer);
        let first = render_documents(&analyzer, &plans).unwrap();
        let second = render_documents(&analyzer, &tracking_plans(&analyzer)).unwrap();
        assert_eq!(first, second);
        let paths: Vec<_> = first.keys().map(|p| p.to_string_lossy().into_owned()).collect();
        assert_eq!(
            paths,
            [
                "custom-types.yaml",
                "events.yaml",
                "properties.yaml",
                "tracking-plans/writekey-wk1.yaml",
                "tracking-plans/writekey-wk2.yaml"
            ]
        );
    }

    #[test]
    fn dry_run_counts_rendered_but_not_written_documents() {
        let analyzer = analyze(&[schema("wk", "Signed Up", json!({"properties.plan": "string"}))]);
        let dir = tempfile::tempdir().unwrap();

        let dry = write_documents(&analyzer, dir.path(), true).unwrap();
        assert_eq!(dry.documents, 4);
        assert_eq!(dry.documents_written, 0);
        assert!(!dir.path().join(EVENTS_FILE).exists());

        let written = write_documents(&analyzer, dir.path(), false).unwrap();
        assert_eq!(written.documents, 4);
        assert_eq!(written.documents_written, 4);
        assert!(dir.path().join("tracking-plans/writekey-wk.yaml").exists());
    }

    #[test]
    fn blank_write_key_gets_placeholder_plan() {
        let analyzer = analyze(&[schema("", "Signed Up", json!({}))]);
        let plans = tracking_plans(&analyzer);
        assert_eq!(plans[0].name, "writekey-unknown");
        assert_eq!(plans[0].rules[0].id, "unknown_signed_up_rule");
    }
}
