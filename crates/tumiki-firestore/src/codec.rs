//! Firestore typed-value codec.
//!
//! Firestore represents every field as a single-key object naming its type,
//! e.g. `{"stringValue": "a"}` or `{"integerValue": "42"}` (64-bit integers
//! travel as strings). [`TypedValue`] models that wire format; [`encode`] and
//! [`decode`] convert to and from plain JSON.
//!
//! JSON numbers carry no integer/float distinction once parsed, so encoding
//! infers it: a finite number with no fractional part becomes an integer.
//! `4.0` therefore round-trips as `4`.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Number, Value, json};
use tumiki_storage::{Document, Record};

/// A Firestore field value.
#[derive(Debug, Clone, PartialEq)]
pub enum TypedValue {
    Null,
    Boolean(bool),
    Integer(i64),
    Double(f64),
    String(String),
    Array(Vec<TypedValue>),
    Map(BTreeMap<String, TypedValue>),
    /// A variant this codec does not model (timestamps, references, ...).
    Unsupported,
}

impl TypedValue {
    /// Renders the wire representation.
    pub fn to_wire(&self) -> Value {
        match self {
            TypedValue::Null | TypedValue::Unsupported => json!({ "nullValue": null }),
            TypedValue::Boolean(b) => json!({ "booleanValue": b }),
            TypedValue::Integer(i) => json!({ "integerValue": i.to_string() }),
            TypedValue::Double(d) => match Number::from_f64(*d) {
                Some(n) => json!({ "doubleValue": n }),
                None if d.is_nan() => json!({ "doubleValue": "NaN" }),
                None if d.is_sign_positive() => json!({ "doubleValue": "Infinity" }),
                None => json!({ "doubleValue": "-Infinity" }),
            },
            TypedValue::String(s) => json!({ "stringValue": s }),
            TypedValue::Array(values) => {
                let values: Vec<Value> = values.iter().map(TypedValue::to_wire).collect();
                json!({ "arrayValue": { "values": values } })
            }
            TypedValue::Map(fields) => json!({ "mapValue": { "fields": fields_to_wire(fields) } }),
        }
    }

    /// Parses the wire representation. Anything unrecognised is [`TypedValue::Unsupported`].
    pub fn from_wire(wire: &Value) -> TypedValue {
        let Some(obj) = wire.as_object() else {
            return TypedValue::Unsupported;
        };

        if let Some(s) = obj.get("stringValue").and_then(Value::as_str) {
            return TypedValue::String(s.to_string());
        }
        if let Some(raw) = obj.get("integerValue") {
            let parsed = match raw {
                Value::String(s) => s.parse::<i64>().ok(),
                Value::Number(n) => n.as_i64(),
                _ => None,
            };
            return parsed.map_or(TypedValue::Unsupported, TypedValue::Integer);
        }
        if let Some(raw) = obj.get("doubleValue") {
            let parsed = match raw {
                Value::Number(n) => n.as_f64(),
                Value::String(s) => match s.as_str() {
                    "NaN" => Some(f64::NAN),
                    "Infinity" => Some(f64::INFINITY),
                    "-Infinity" => Some(f64::NEG_INFINITY),
                    other => other.parse::<f64>().ok(),
                },
                _ => None,
            };
            return parsed.map_or(TypedValue::Unsupported, TypedValue::Double);
        }
        if let Some(b) = obj.get("booleanValue").and_then(Value::as_bool) {
            return TypedValue::Boolean(b);
        }
        if obj.contains_key("nullValue") {
            return TypedValue::Null;
        }
        if let Some(array) = obj.get("arrayValue") {
            let values = array
                .get("values")
                .and_then(Value::as_array)
                .map(|vs| vs.iter().map(TypedValue::from_wire).collect())
                .unwrap_or_default();
            return TypedValue::Array(values);
        }
        if let Some(map) = obj.get("mapValue") {
            let fields = map
                .get("fields")
                .and_then(Value::as_object)
                .map(fields_from_wire)
                .unwrap_or_default();
            return TypedValue::Map(fields);
        }
        TypedValue::Unsupported
    }
}

impl Serialize for TypedValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_wire().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for TypedValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let wire = Value::deserialize(deserializer)?;
        Ok(TypedValue::from_wire(&wire))
    }
}

fn fields_to_wire(fields: &BTreeMap<String, TypedValue>) -> Map<String, Value> {
    fields
        .iter()
        .map(|(k, v)| (k.clone(), v.to_wire()))
        .collect()
}

fn fields_from_wire(fields: &Map<String, Value>) -> BTreeMap<String, TypedValue> {
    fields
        .iter()
        .map(|(k, v)| (k.clone(), TypedValue::from_wire(v)))
        .collect()
}

/// Largest magnitude at which every whole `f64` is still an exact `i64`.
const MAX_EXACT_WHOLE_F64: f64 = 9_007_199_254_740_992.0;

/// Encodes a JSON value.
pub fn encode(value: &Value) -> TypedValue {
    match value {
        Value::Null => TypedValue::Null,
        Value::Bool(b) => TypedValue::Boolean(*b),
        Value::String(s) => TypedValue::String(s.clone()),
        Value::Number(n) => encode_number(n),
        Value::Array(values) => TypedValue::Array(values.iter().map(encode).collect()),
        Value::Object(fields) => TypedValue::Map(encode_fields(fields)),
    }
}

fn encode_number(n: &Number) -> TypedValue {
    if let Some(i) = n.as_i64() {
        return TypedValue::Integer(i);
    }
    let f = n.as_f64().unwrap_or(f64::NAN);
    if f.is_finite() && f.fract() == 0.0 && f.abs() <= MAX_EXACT_WHOLE_F64 {
        TypedValue::Integer(f as i64)
    } else {
        TypedValue::Double(f)
    }
}

/// Encodes every field of a record.
pub fn encode_fields(fields: &Record) -> BTreeMap<String, TypedValue> {
    fields.iter().map(|(k, v)| (k.clone(), encode(v))).collect()
}

/// Decodes a typed value. Unsupported variants and non-finite doubles become `null`.
pub fn decode(value: &TypedValue) -> Value {
    match value {
        TypedValue::Null | TypedValue::Unsupported => Value::Null,
        TypedValue::Boolean(b) => Value::Bool(*b),
        TypedValue::Integer(i) => Value::from(*i),
        TypedValue::Double(d) => Number::from_f64(*d).map_or(Value::Null, Value::Number),
        TypedValue::String(s) => Value::String(s.clone()),
        TypedValue::Array(values) => Value::Array(values.iter().map(decode).collect()),
        TypedValue::Map(fields) => Value::Object(decode_fields(fields)),
    }
}

pub fn decode_fields(fields: &BTreeMap<String, TypedValue>) -> Record {
    fields.iter().map(|(k, v)| (k.clone(), decode(v))).collect()
}

/// A document as returned by the REST API.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WireDocument {
    /// Full resource name, `projects/{p}/databases/{d}/documents/{collection}/{id}`.
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub fields: BTreeMap<String, TypedValue>,
}

impl WireDocument {
    /// Document id: the last segment of the resource name.
    pub fn id(&self) -> &str {
        self.name.rsplit('/').next().unwrap_or_default()
    }
}

/// Decodes a REST document. A document without fields yields an empty field map.
pub fn decode_document(doc: &WireDocument) -> Document {
    Document::new(doc.id(), decode_fields(&doc.fields))
}
