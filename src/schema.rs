//! Captured event schema records and loading.
//!
//! Records are produced upstream by the schema fetch client, which saves
//! either a bare JSON array or a page envelope `{"results": [...]}`. Both
//! shapes are accepted here.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{Error, Result};

/// One captured event shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schema {
    /// Schema UID assigned by the capture service.
    #[serde(default)]
    pub uid: String,

    /// Source write key; groups schemas into tracking plans.
    #[serde(default)]
    pub write_key: String,

    /// Event type (e.g., `"track"`, `"identify"`).
    #[serde(default)]
    pub event_type: String,

    /// Event name for track calls (e.g., `"Order Completed"`).
    #[serde(default)]
    pub event_identifier: String,

    /// Flattened dot-path → type hint map. `null` reads as empty.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub schema: BTreeMap<String, serde_json::Value>,

    #[serde(default)]
    pub created_at: Option<String>,

    #[serde(default)]
    pub last_seen: Option<String>,

    /// Number of events observed with this shape.
    #[serde(default)]
    pub count: u64,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SchemaFile {
    List(Vec<Schema>),
    Page { results: Vec<Schema> },
}

fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<BTreeMap<String, serde_json::Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<BTreeMap<String, serde_json::Value>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Parse schema records from JSON text.
pub fn parse_schemas(json: &str) -> Result<Vec<Schema>> {
    let file: SchemaFile = serde_json::from_str(json)?;
    Ok(match file {
        SchemaFile::List(schemas) => schemas,
        SchemaFile::Page { results } => results,
    })
}

/// Load schema records from a JSON file on disk.
pub fn load_schemas(path: &Path) -> Result<Vec<Schema>> {
    let content = std::fs::read_to_string(path).map_err(|e| Error::Read {
        path: path.to_path_buf(),
        source: e,
    })?;
    parse_schemas(&content)
}
