//! Per-source extraction records.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Key to nullable value mapping, ordered by key.
pub type FieldMap = BTreeMap<String, Option<String>>;

/// Key-value pairs extracted from one source document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractionRecord {
    /// Source identifier (attachment name). Empty when unknown.
    #[serde(default)]
    pub source: String,

    /// Document classification label.
    #[serde(default)]
    pub document_type: String,

    /// Extracted values; scalars in JSON input are stringified.
    #[serde(default, deserialize_with = "deserialize_field_map")]
    pub extracted_data: FieldMap,

    /// Confidence per key (0.0 - 1.0).
    #[serde(default)]
    pub confidence_scores: BTreeMap<String, f64>,

    /// Free-text notes per key.
    #[serde(default, deserialize_with = "deserialize_notes")]
    pub extraction_notes: BTreeMap<String, String>,
}

impl ExtractionRecord {
    pub fn new(source: impl Into<String>, document_type: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            document_type: document_type.into(),
            ..Self::default()
        }
    }

    /// Add a value (builder style).
    pub fn with_value(mut self, key: impl Into<String>, value: Option<&str>) -> Self {
        self.extracted_data.insert(key.into(), value.map(str::to_string));
        self
    }

    /// Add a confidence score (builder style).
    pub fn with_confidence(mut self, key: impl Into<String>, confidence: f64) -> Self {
        self.confidence_scores.insert(key.into(), confidence);
        self
    }

    /// Add a note (builder style).
    pub fn with_note(mut self, key: impl Into<String>, note: impl Into<String>) -> Self {
        self.extraction_notes.insert(key.into(), note.into());
        self
    }

    /// Value for `key`, `None` if absent or null.
    pub fn value(&self, key: &str) -> Option<&str> {
        self.extracted_data.get(key).and_then(|v| v.as_deref())
    }

    /// Confidence for `key`, 0.0 if missing.
    pub fn confidence(&self, key: &str) -> f64 {
        self.confidence_scores.get(key).copied().unwrap_or(0.0)
    }
}

/// Stringify a JSON scalar. Arrays and objects are kept as compact JSON.
pub fn value_to_field(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        other => Some(other.to_string()),
    }
}

/// Convert a JSON object into a [`FieldMap`].
pub fn field_map_from_json(map: BTreeMap<String, Value>) -> FieldMap {
    map.into_iter().map(|(k, v)| (k, value_to_field(v))).collect()
}

/// Deserialize a [`FieldMap`], accepting any JSON scalar as a value.
pub fn deserialize_field_map<'de, D>(deserializer: D) -> Result<FieldMap, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<BTreeMap<String, Value>>::deserialize(deserializer)?;
    Ok(raw.map(field_map_from_json).unwrap_or_default())
}

fn deserialize_notes<'de, D>(deserializer: D) -> Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<BTreeMap<String, Value>>::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .filter_map(|(k, v)| value_to_field(v).map(|v| (k, v)))
        .collect())
}
