//! Value types exchanged with document stores.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A field map as stored in a document (and as returned to callers).
pub type Record = Map<String, Value>;

/// A stored document: its id within the collection plus its field map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    #[serde(default)]
    pub fields: Record,
}

impl Document {
    pub fn new(id: impl Into<String>, fields: Record) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }

    /// Flattens the document into a record carrying a synthetic `id` field.
    ///
    /// The addressing id wins over any stored `id` field.
    pub fn into_record(self) -> Record {
        let mut record = self.fields;
        record.insert("id".to_string(), Value::String(self.id));
        record
    }
}

/// An equality predicate on a top-level field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldFilter {
    pub field: String,
    pub value: Value,
}

impl FieldFilter {
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn matches(&self, record: &Record) -> bool {
        record.get(&self.field) == Some(&self.value)
    }
}

/// Renders a scalar as a key part.
///
/// Strings are used as-is, numbers and booleans through their JSON text.
/// `null`, empty strings and composite values yield `None`.
pub fn value_to_key_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
