//! Raw catalog types matching the JSON catalog file.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    Asc,
    Desc,
}

/// How the sort field is compared: byte-wise text, or as a parsed date.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKind {
    #[default]
    Text,
    Date,
    Number,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SortConfig {
    pub field: String,
    #[serde(default)]
    pub kind: SortKind,
    pub direction: SortDirection,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationRule {
    #[serde(default)]
    pub required: Option<bool>,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub max_length: Option<u32>,
    #[serde(default)]
    pub min_length: Option<u32>,
    #[serde(default)]
    pub pattern: Option<String>,
    #[serde(default)]
    pub allowed: Option<Vec<serde_json::Value>>,
    #[serde(default)]
    pub minimum: Option<f64>,
    #[serde(default)]
    pub maximum: Option<f64>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EntityConfig {
    /// Logical name used by `fetch_entity` (e.g. "bus_lines").
    pub name: String,
    /// Backend resource path / table name.
    pub table: String,
    /// Primary-key column as stored by the backend.
    #[serde(default = "default_primary_key")]
    pub primary_key: String,
    /// Alternate spellings of the primary key, renamed to `id` on normalization.
    #[serde(default)]
    pub pk_aliases: Vec<String>,
    #[serde(default)]
    pub sort: Option<SortConfig>,
    #[serde(default)]
    pub validation: HashMap<String, ValidationRule>,
    #[serde(default)]
    pub comment: Option<String>,
}

fn default_primary_key() -> String {
    "id".to_string()
}

/// `from_entity.from_column` holds the id of a `to_entity` record, embedded as `embed`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RelationConfig {
    pub from_entity: String,
    pub from_column: String,
    pub to_entity: String,
    pub embed: String,
}

/// Whole catalog in one struct.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct FullConfig {
    pub entities: Vec<EntityConfig>,
    #[serde(default)]
    pub relations: Vec<RelationConfig>,
}
