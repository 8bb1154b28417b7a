//! Conversion between plain values and Datastore wire values
//!
//! Same coercion rules as the Firestore codec; Datastore adds `key`, `blob`
//! and `entity` property types. Malformed JSON text for `array`, `entity`
//! or `key` becomes an empty container or an empty key.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use crate::firestore::codec::{
    base64_text, coerce_bool, coerce_double, coerce_i64, coerce_string, double_to_json, geo_point,
    is_integral, parse_container, timestamp_text,
};
use crate::firestore::field_value::NullValue;

use super::value::{ArrayValue, DatastoreValue, Entity, Key, Properties, ValueKind};

/// Value type selectable in a property form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyType {
    /// Text
    String,
    /// 64-bit integer
    Integer,
    /// Floating point
    Double,
    /// Boolean
    Boolean,
    /// Null
    Null,
    /// Point in time
    Timestamp,
    /// Latitude/longitude
    GeoPoint,
    /// Key of another entity
    Key,
    /// Binary data
    Blob,
    /// Array, entered as JSON
    Array,
    /// Embedded entity, entered as a JSON object
    Entity,
}

impl PropertyType {
    /// All property types, in form order
    pub const ALL: [PropertyType; 11] = [
        PropertyType::String,
        PropertyType::Integer,
        PropertyType::Double,
        PropertyType::Boolean,
        PropertyType::Null,
        PropertyType::Timestamp,
        PropertyType::GeoPoint,
        PropertyType::Key,
        PropertyType::Blob,
        PropertyType::Array,
        PropertyType::Entity,
    ];

    /// Lowercase type name
    pub fn as_str(&self) -> &'static str {
        match self {
            PropertyType::String => "string",
            PropertyType::Integer => "integer",
            PropertyType::Double => "double",
            PropertyType::Boolean => "boolean",
            PropertyType::Null => "null",
            PropertyType::Timestamp => "timestamp",
            PropertyType::GeoPoint => "geopoint",
            PropertyType::Key => "key",
            PropertyType::Blob => "blob",
            PropertyType::Array => "array",
            PropertyType::Entity => "entity",
        }
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PropertyType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        PropertyType::ALL
            .iter()
            .copied()
            .find(|ty| ty.as_str() == lowered)
            .ok_or_else(|| format!("unknown property type '{}'", s))
    }
}

/// Encode a plain value as a Datastore value of the given type
pub fn to_wire(property_type: PropertyType, raw: &Value, exclude_from_indexes: bool) -> DatastoreValue {
    let kind = match property_type {
        PropertyType::String => ValueKind::StringValue(coerce_string(raw)),
        PropertyType::Integer => ValueKind::IntegerValue(
            coerce_i64(raw)
                .unwrap_or_else(|| {
                    warn!(value = %raw, "Integer property value is not a number, using 0");
                    0
                })
                .to_string(),
        ),
        PropertyType::Double => ValueKind::DoubleValue(coerce_double(raw).unwrap_or_else(|| {
            warn!(value = %raw, "Double property value is not a number, using 0");
            0.0
        })),
        PropertyType::Boolean => ValueKind::BooleanValue(coerce_bool(raw)),
        PropertyType::Null => ValueKind::NullValue(NullValue),
        PropertyType::Timestamp => ValueKind::TimestampValue(timestamp_text(raw)),
        PropertyType::GeoPoint => ValueKind::GeoPointValue(geo_point(raw)),
        PropertyType::Key => ValueKind::KeyValue(key(raw)),
        PropertyType::Blob => ValueKind::BlobValue(base64_text(raw)),
        PropertyType::Array => {
            let values = match parse_container(raw) {
                Some(Value::Array(items)) => items.iter().map(json_to_value).collect(),
                _ => Vec::new(),
            };
            ValueKind::ArrayValue(ArrayValue { values })
        }
        PropertyType::Entity => {
            let properties = match parse_container(raw) {
                Some(Value::Object(entries)) => object_to_properties(&entries),
                _ => Properties::new(),
            };
            ValueKind::EntityValue(Entity {
                key: None,
                properties,
            })
        }
    };
    DatastoreValue::new(kind).excluded(exclude_from_indexes)
}

/// Decode a Datastore value into a plain value
///
/// Keys decode to their JSON form (`{"path": [...]}`) so they re-encode
/// unchanged.
pub fn from_wire(value: &DatastoreValue) -> Value {
    match &value.kind {
        ValueKind::StringValue(s) | ValueKind::TimestampValue(s) | ValueKind::BlobValue(s) => {
            Value::String(s.clone())
        }
        ValueKind::IntegerValue(s) => match s.trim().parse::<i64>() {
            Ok(n) => Value::Number(n.into()),
            Err(_) => Value::String(s.clone()),
        },
        ValueKind::DoubleValue(d) => double_to_json(*d),
        ValueKind::BooleanValue(b) => Value::Bool(*b),
        ValueKind::NullValue(_) => Value::Null,
        ValueKind::GeoPointValue(point) => serde_json::json!({
            "latitude": point.latitude,
            "longitude": point.longitude,
        }),
        ValueKind::KeyValue(key) => serde_json::to_value(key).unwrap_or(Value::Null),
        ValueKind::EntityValue(entity) => Value::Object(
            entity
                .properties
                .iter()
                .map(|(k, v)| (k.clone(), from_wire(v)))
                .collect(),
        ),
        ValueKind::ArrayValue(array) => Value::Array(array.values.iter().map(from_wire).collect()),
    }
}

/// Property type that re-encodes a wire value into the same variant
pub fn infer_type(value: &DatastoreValue) -> PropertyType {
    match value.kind {
        ValueKind::NullValue(_) => PropertyType::Null,
        ValueKind::BooleanValue(_) => PropertyType::Boolean,
        ValueKind::IntegerValue(_) => PropertyType::Integer,
        ValueKind::DoubleValue(_) => PropertyType::Double,
        ValueKind::TimestampValue(_) => PropertyType::Timestamp,
        ValueKind::KeyValue(_) => PropertyType::Key,
        ValueKind::StringValue(_) => PropertyType::String,
        ValueKind::BlobValue(_) => PropertyType::Blob,
        ValueKind::GeoPointValue(_) => PropertyType::GeoPoint,
        ValueKind::EntityValue(_) => PropertyType::Entity,
        ValueKind::ArrayValue(_) => PropertyType::Array,
    }
}

/// Encode a plain JSON value, inferring the Datastore type
pub fn json_to_value(raw: &Value) -> DatastoreValue {
    let kind = match raw {
        Value::Null => ValueKind::NullValue(NullValue),
        Value::Bool(b) => ValueKind::BooleanValue(*b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => ValueKind::IntegerValue(i.to_string()),
            None => {
                let f = n.as_f64().unwrap_or(0.0);
                if is_integral(f) {
                    ValueKind::IntegerValue((f as i64).to_string())
                } else {
                    ValueKind::DoubleValue(f)
                }
            }
        },
        Value::String(s) => ValueKind::StringValue(s.clone()),
        Value::Array(items) => ValueKind::ArrayValue(ArrayValue {
            values: items.iter().map(json_to_value).collect(),
        }),
        Value::Object(entries) => ValueKind::EntityValue(Entity {
            key: None,
            properties: object_to_properties(entries),
        }),
    };
    DatastoreValue::new(kind)
}

/// Encode every entry of a plain JSON object
pub fn object_to_properties(entries: &Map<String, Value>) -> Properties {
    entries
        .iter()
        .map(|(k, v)| (k.clone(), json_to_value(v)))
        .collect()
}

/// Key from JSON (`{"path": [...]}`) or from `Kind:id/Kind:name` text
fn key(raw: &Value) -> Key {
    match raw {
        Value::String(text) if !text.trim_start().starts_with('{') => {
            Key::parse_display_path(text)
        }
        other => match parse_container(other).map(serde_json::from_value::<Key>) {
            Some(Ok(key)) => key,
            Some(Err(e)) => {
                warn!(error = %e, "Malformed key, using empty key");
                Key::default()
            }
            None => Key::default(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datastore::value::PathElement;
    use serde_json::json;

    #[test]
    fn test_integer_is_string_encoded() {
        let value = to_wire(PropertyType::Integer, &json!(5), false);
        assert_eq!(value.kind, ValueKind::IntegerValue("5".to_string()));
        assert_eq!(from_wire(&value), json!(5));
    }

    #[test]
    fn test_bad_double_defaults_to_zero() {
        let value = to_wire(PropertyType::Double, &json!("not-a-number"), false);
        assert_eq!(value.kind, ValueKind::DoubleValue(0.0));
    }

    #[test]
    fn test_exclude_flag_is_kept() {
        let value = to_wire(PropertyType::String, &json!("long text"), true);
        assert!(value.exclude_from_indexes);
    }

    #[test]
    fn test_malformed_containers_are_empty() {
        let array = to_wire(PropertyType::Array, &json!("[1, 2"), false);
        assert_eq!(array.kind, ValueKind::ArrayValue(ArrayValue::default()));

        let entity = to_wire(PropertyType::Entity, &json!("{oops"), false);
        assert_eq!(entity.kind, ValueKind::EntityValue(Entity::default()));

        let key = to_wire(PropertyType::Key, &json!("{\"path\": 3}"), false);
        assert_eq!(key.kind, ValueKind::KeyValue(Key::default()));
    }

    #[test]
    fn test_key_from_text_and_json() {
        let from_text = to_wire(PropertyType::Key, &json!("User:alice/Post:7"), false);
        let ValueKind::KeyValue(key) = &from_text.kind else {
            panic!("expected key");
        };
        assert_eq!(key.path[1], PathElement::with_id("Post", 7));

        let decoded = from_wire(&from_text);
        let again = to_wire(PropertyType::Key, &decoded, false);
        assert_eq!(again, from_text);
    }

    #[test]
    fn test_entity_from_json_text() {
        let value = to_wire(PropertyType::Entity, &json!("{\"n\": 1.5, \"ok\": true}"), false);
        let ValueKind::EntityValue(entity) = &value.kind else {
            panic!("expected entity");
        };
        assert_eq!(entity.properties["n"].kind, ValueKind::DoubleValue(1.5));
        assert_eq!(from_wire(&value), json!({"n": 1.5, "ok": true}));
    }

    #[test]
    fn test_scalar_idempotence() {
        let samples = [
            (PropertyType::String, json!("hello")),
            (PropertyType::Integer, json!("12")),
            (PropertyType::Double, json!(2.5)),
            (PropertyType::Boolean, json!("true")),
            (PropertyType::Null, json!("anything")),
            (PropertyType::Timestamp, json!("2026-02-01T12:30")),
            (PropertyType::GeoPoint, json!("10, 20")),
            (PropertyType::Blob, json!("cmF3IGJ5dGVz")),
            (PropertyType::Double, json!("Infinity")),
        ];
        for (ty, raw) in samples {
            let first = to_wire(ty, &raw, false);
            let second = to_wire(ty, &from_wire(&first), false);
            assert_eq!(first, second, "{} should be stable", ty);
            assert_eq!(infer_type(&first), ty);
        }
    }

    #[test]
    fn test_blob_takes_base64_or_plain_text() {
        let blob = |raw| to_wire(PropertyType::Blob, &raw, false).kind;
        assert_eq!(blob(json!("test")), ValueKind::BlobValue("test".to_string()));
        assert_eq!(blob(json!({"text": "test"})), ValueKind::BlobValue("dGVzdA==".to_string()));
    }

    #[test]
    fn test_property_type_from_str() {
        assert_eq!("GeoPoint".parse::<PropertyType>(), Ok(PropertyType::GeoPoint));
        assert!("reference".parse::<PropertyType>().is_err());
    }
}
