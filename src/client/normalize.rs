//! Response normalization
//!
//! The dashboard backend is assembled from services that disagree on field
//! casing (`Success` vs `success`, `OrgId` vs `orgId`) and on whether results
//! are wrapped in a `{ success, data }` envelope. [`normalize`] turns any JSON
//! value into a [`Normalized`] tree whose objects answer lookups under any
//! casing of a key, and whose top-level envelopes expose canonical lowercase
//! `success` / `data` / `error` / `message` fields next to the originals.

use std::collections::HashMap;

use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};
use serde_json::{Map, Number, Value};

/// Envelope fields as (canonical, PascalCase) pairs, in canonical order
const ENVELOPE_FIELDS: [(&str, &str); 4] = [
    ("success", "Success"),
    ("data", "Data"),
    ("error", "Error"),
    ("message", "Message"),
];

/// Normalize an arbitrary JSON value.
///
/// Idempotent: normalizing `normalize(v).to_value()` yields a tree that
/// answers every lookup the same way.
pub fn normalize(value: &Value) -> Normalized {
    match value {
        Value::Null => Normalized::Null,
        Value::Bool(b) => Normalized::Bool(*b),
        Value::Number(n) => Normalized::Number(n.clone()),
        Value::String(s) => Normalized::String(s.clone()),
        Value::Array(items) => Normalized::Array(items.iter().map(normalize).collect()),
        Value::Object(map) => Normalized::Object(normalize_object(map)),
    }
}

fn normalize_object(map: &Map<String, Value>) -> NormalizedObject {
    let mut object = NormalizedObject::default();

    if is_envelope(map) {
        for (canonical, pascal) in ENVELOPE_FIELDS {
            if let Some(value) = coalesce(map, pascal, canonical) {
                object.insert(canonical.to_string(), normalize(value));
            }
        }
    }

    for (key, value) in map {
        // Canonical envelope fields already hold the resolved value
        if !object.exact.contains_key(key) {
            object.insert(key.clone(), normalize(value));
        }
    }

    object
}

/// Both a success-like and a data-like key, checked case-sensitively
fn is_envelope(map: &Map<String, Value>) -> bool {
    let has_success = map.contains_key("Success") || map.contains_key("success");
    let has_data = map.contains_key("Data") || map.contains_key("data");
    has_success && has_data
}

/// `map[pascal] ?? map[camel]`, keeping a present-but-null value when
/// nothing better exists
fn coalesce<'a>(map: &'a Map<String, Value>, pascal: &str, camel: &str) -> Option<&'a Value> {
    map.get(pascal)
        .filter(|v| !v.is_null())
        .or_else(|| map.get(camel))
        .or_else(|| map.get(pascal))
}

/// A normalized JSON value
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Normalized {
    #[default]
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    Array(Vec<Normalized>),
    Object(NormalizedObject),
}

impl Normalized {
    /// Case-insensitive property lookup; `None` for non-objects
    pub fn get(&self, key: &str) -> Option<&Normalized> {
        match self {
            Normalized::Object(object) => object.get(key),
            _ => None,
        }
    }

    /// Case-insensitive membership check; `false` for non-objects
    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Normalized::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Normalized::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Normalized::String(s) => Some(s),
            _ => None,
        }
    }

    /// Integer reading; tolerates numeric strings. Fractional values are
    /// floored (20.7 reads as 20, -0.5 as -1); non-finite ones read as `None`.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Normalized::Number(n) => n.as_i64().or_else(|| n.as_f64().and_then(floor_to_i64)),
            Normalized::String(s) => {
                let s = s.trim();
                s.parse()
                    .ok()
                    .or_else(|| s.parse::<f64>().ok().and_then(floor_to_i64))
            }
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Normalized::Number(n) => n.as_f64(),
            Normalized::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Normalized]> {
        match self {
            Normalized::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&NormalizedObject> {
        match self {
            Normalized::Object(object) => Some(object),
            _ => None,
        }
    }

    /// String reading of an identifier that may arrive as a string or number
    pub fn as_id(&self) -> Option<String> {
        match self {
            Normalized::String(s) if !s.is_empty() => Some(s.clone()),
            Normalized::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    /// Typed view of the canonical envelope fields
    pub fn envelope(&self) -> Envelope<'_> {
        Envelope {
            success: self.get("success").and_then(Normalized::as_bool),
            data: self.get("data").filter(|d| !d.is_null()),
            error: self.get("error").and_then(Normalized::as_str),
            message: self.get("message").and_then(Normalized::as_str),
        }
    }

    /// Convert back to a plain JSON value, keeping actual keys
    pub fn to_value(&self) -> Value {
        match self {
            Normalized::Null => Value::Null,
            Normalized::Bool(b) => Value::Bool(*b),
            Normalized::Number(n) => Value::Number(n.clone()),
            Normalized::String(s) => Value::String(s.clone()),
            Normalized::Array(items) => Value::Array(items.iter().map(Self::to_value).collect()),
            Normalized::Object(object) => Value::Object(
                object
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_value()))
                    .collect(),
            ),
        }
    }
}

impl From<&Value> for Normalized {
    fn from(value: &Value) -> Self {
        normalize(value)
    }
}

impl From<Value> for Normalized {
    fn from(value: Value) -> Self {
        normalize(&value)
    }
}

impl Serialize for Normalized {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Normalized::Null => serializer.serialize_unit(),
            Normalized::Bool(b) => serializer.serialize_bool(*b),
            Normalized::Number(n) => n.serialize(serializer),
            Normalized::String(s) => serializer.serialize_str(s),
            Normalized::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Normalized::Object(object) => {
                let mut map = serializer.serialize_map(Some(object.len()))?;
                for (k, v) in object.iter() {
                    map.serialize_entry(k, v)?;
                }
                map.end()
            }
        }
    }
}

/// Object with case-insensitive key resolution.
///
/// Entries keep source order. Lookups try the exact key first, then the
/// lowercased key; when several keys fold to the same lowercase form the
/// last one wins.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NormalizedObject {
    entries: Vec<(String, Normalized)>,
    exact: HashMap<String, usize>,
    folded: HashMap<String, usize>,
}

impl NormalizedObject {
    fn insert(&mut self, key: String, value: Normalized) {
        let index = self.entries.len();
        self.exact.insert(key.clone(), index);
        self.folded.insert(key.to_lowercase(), index);
        self.entries.push((key, value));
    }

    pub fn get(&self, key: &str) -> Option<&Normalized> {
        let index = self
            .exact
            .get(key)
            .or_else(|| self.folded.get(&key.to_lowercase()))?;
        self.entries.get(*index).map(|(_, v)| v)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Actual keys in source order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Normalized)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

fn floor_to_i64(value: f64) -> Option<i64> {
    // Saturating cast; out-of-range finite values clamp to i64 bounds
    value.is_finite().then(|| value.floor() as i64)
}

/// Canonical envelope fields read from a normalized response
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Envelope<'a> {
    pub success: Option<bool>,
    pub data: Option<&'a Normalized>,
    pub error: Option<&'a str>,
    pub message: Option<&'a str>,
}

impl Envelope<'_> {
    /// Explicit `success: false`
    pub fn is_failure(&self) -> bool {
        self.success == Some(false)
    }
}
