//! Firestore field value types
//!
//! The REST wire form of a Firestore value is a JSON object with exactly one
//! `*Value` key, e.g. `{"stringValue": "x"}` or
//! `{"mapValue": {"fields": {...}}}`. [`FirestoreValue`] is a closed enum
//! whose serde representation (external tagging, camelCase) is exactly that
//! shape, so an object with no tag or with two tags is rejected on decode.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::geo_point::GeoPoint;

/// Field mapping at the root of a document or inside a `mapValue`
pub type Fields = BTreeMap<String, FirestoreValue>;

/// A single Firestore value in its wire representation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FirestoreValue {
    /// UTF-8 string
    StringValue(String),
    /// 64-bit integer, decimal-string encoded
    IntegerValue(String),
    /// IEEE 754 double; non-finite values travel as `"NaN"`, `"Infinity"`
    /// or `"-Infinity"`
    DoubleValue(#[serde(with = "double_value")] f64),
    /// Boolean
    BooleanValue(bool),
    /// Null
    NullValue(NullValue),
    /// RFC 3339 timestamp
    TimestampValue(String),
    /// Latitude/longitude pair
    GeoPointValue(GeoPoint),
    /// Full resource name of another document
    ReferenceValue(String),
    /// Base64-encoded bytes
    BytesValue(String),
    /// Nested map
    MapValue(MapValue),
    /// Ordered array
    ArrayValue(ArrayValue),
}

/// Payload of `nullValue`
///
/// Serializes as JSON `null`; accepts `null` or the protobuf enum name
/// `"NULL_VALUE"` (or anything else) on decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NullValue;

impl Serialize for NullValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_unit()
    }
}

impl<'de> Deserialize<'de> for NullValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        serde::de::IgnoredAny::deserialize(deserializer)?;
        Ok(NullValue)
    }
}

/// Serde form of `doubleValue`
///
/// Finite doubles are JSON numbers. NaN and the infinities are the
/// strings used by the protobuf JSON mapping, and are accepted back.
pub(crate) mod double_value {
    use std::fmt;

    use serde::de::{self, Visitor};
    use serde::{Deserializer, Serializer};

    /// Wire text of a non-finite double
    pub(crate) fn non_finite_text(value: f64) -> Option<&'static str> {
        if value.is_nan() {
            Some("NaN")
        } else if value == f64::INFINITY {
            Some("Infinity")
        } else if value == f64::NEG_INFINITY {
            Some("-Infinity")
        } else {
            None
        }
    }

    /// Non-finite double named by its wire text
    pub(crate) fn parse_non_finite(text: &str) -> Option<f64> {
        match text {
            "NaN" => Some(f64::NAN),
            "Infinity" => Some(f64::INFINITY),
            "-Infinity" => Some(f64::NEG_INFINITY),
            _ => None,
        }
    }

    pub(crate) fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        match non_finite_text(*value) {
            Some(text) => serializer.serialize_str(text),
            None => serializer.serialize_f64(*value),
        }
    }

    pub(crate) fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        deserializer.deserialize_any(DoubleVisitor)
    }

    struct DoubleVisitor;

    impl<'de> Visitor<'de> for DoubleVisitor {
        type Value = f64;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a number, \"NaN\", \"Infinity\" or \"-Infinity\"")
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> Result<f64, E> {
            Ok(v)
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<f64, E> {
            Ok(v as f64)
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<f64, E> {
            Ok(v as f64)
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<f64, E> {
            parse_non_finite(v)
                .or_else(|| v.trim().parse::<f64>().ok().filter(|n| n.is_finite()))
                .ok_or_else(|| E::invalid_value(de::Unexpected::Str(v), &self))
        }
    }
}

/// Nested map value
///
/// `fields` is absent on the wire for an empty map (`{"mapValue": {}}`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MapValue {
    /// Map entries
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<Fields>,
}

/// Array value
///
/// `values` is absent on the wire for an empty array (`{"arrayValue": {}}`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArrayValue {
    /// Array elements in order
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<FirestoreValue>>,
}

impl FirestoreValue {
    /// String value
    pub fn string(value: impl Into<String>) -> Self {
        Self::StringValue(value.into())
    }

    /// Integer value
    pub fn integer(value: i64) -> Self {
        Self::IntegerValue(value.to_string())
    }

    /// Double value
    pub fn double(value: f64) -> Self {
        Self::DoubleValue(value)
    }

    /// Boolean value
    pub fn boolean(value: bool) -> Self {
        Self::BooleanValue(value)
    }

    /// Null value
    pub fn null() -> Self {
        Self::NullValue(NullValue)
    }

    /// Map value from entries
    pub fn map(fields: Fields) -> Self {
        Self::MapValue(MapValue {
            fields: Some(fields),
        })
    }

    /// Array value from elements
    pub fn array(values: Vec<FirestoreValue>) -> Self {
        Self::ArrayValue(ArrayValue {
            values: Some(values),
        })
    }

    /// Short lowercase name of the variant, as used in error messages
    pub fn kind(&self) -> &'static str {
        match self {
            Self::StringValue(_) => "string",
            Self::IntegerValue(_) => "integer",
            Self::DoubleValue(_) => "double",
            Self::BooleanValue(_) => "boolean",
            Self::NullValue(_) => "null",
            Self::TimestampValue(_) => "timestamp",
            Self::GeoPointValue(_) => "geopoint",
            Self::ReferenceValue(_) => "reference",
            Self::BytesValue(_) => "bytes",
            Self::MapValue(_) => "map",
            Self::ArrayValue(_) => "array",
        }
    }

    /// Whether this value can hold children
    pub fn is_container(&self) -> bool {
        matches!(self, Self::MapValue(_) | Self::ArrayValue(_))
    }

    /// Map entries, if this is a map with fields
    pub fn as_fields(&self) -> Option<&Fields> {
        match self {
            Self::MapValue(map) => map.fields.as_ref(),
            _ => None,
        }
    }

    /// Array elements, if this is an array with values
    pub fn as_values(&self) -> Option<&[FirestoreValue]> {
        match self {
            Self::ArrayValue(array) => array.values.as_deref(),
            _ => None,
        }
    }

    /// String payload of string-like variants
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::StringValue(s)
            | Self::TimestampValue(s)
            | Self::ReferenceValue(s)
            | Self::BytesValue(s) => Some(s),
            _ => None,
        }
    }

    /// Integer payload
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::IntegerValue(s) => s.parse().ok(),
            _ => None,
        }
    }

    /// Number of direct children (0 for scalars)
    pub fn child_count(&self) -> usize {
        match self {
            Self::MapValue(map) => map.fields.as_ref().map_or(0, |f| f.len()),
            Self::ArrayValue(array) => array.values.as_ref().map_or(0, |v| v.len()),
            _ => 0,
        }
    }
}

impl fmt::Display for FirestoreValue {
    /// Compact preview used in document listings
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StringValue(s) => write!(f, "\"{}\"", s),
            Self::IntegerValue(s) | Self::TimestampValue(s) | Self::ReferenceValue(s) => {
                write!(f, "{}", s)
            }
            Self::DoubleValue(d) => write!(f, "{}", d),
            Self::BooleanValue(b) => write!(f, "{}", b),
            Self::NullValue(_) => write!(f, "null"),
            Self::GeoPointValue(g) => write!(f, "[{}° N, {}° E]", g.latitude, g.longitude),
            Self::BytesValue(s) => write!(f, "<{} base64 chars>", s.len()),
            Self::MapValue(_) => write!(f, "{{{} fields}}", self.child_count()),
            Self::ArrayValue(_) => write!(f, "[{} items]", self.child_count()),
        }
    }
}

/// Firestore document as returned by the REST API
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    /// Full resource name
    /// (`projects/{p}/databases/{d}/documents/{collection}/{id}...`)
    #[serde(default)]
    pub name: String,

    /// Document fields
    #[serde(default)]
    pub fields: Fields,

    /// Creation time (RFC 3339), set by the server
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_time: Option<String>,

    /// Last update time (RFC 3339), set by the server
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_time: Option<String>,
}

impl Document {
    /// Get the document ID (last segment of the name)
    pub fn id(&self) -> &str {
        self.name.rsplit('/').next().unwrap_or(&self.name)
    }

    /// Get a top-level field
    pub fn get(&self, field: &str) -> Option<&FirestoreValue> {
        self.fields.get(field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_wire_shape_scalar() {
        let value = FirestoreValue::integer(5);
        assert_eq!(serde_json::to_value(&value).unwrap(), json!({"integerValue": "5"}));

        let value = FirestoreValue::null();
        assert_eq!(serde_json::to_value(&value).unwrap(), json!({"nullValue": null}));
    }

    #[test]
    fn test_non_finite_doubles() {
        let fields: Fields = serde_json::from_value(json!({
            "nan": {"doubleValue": "NaN"},
            "up": {"doubleValue": "Infinity"},
            "down": {"doubleValue": "-Infinity"},
            "whole": {"doubleValue": 3}
        }))
        .unwrap();
        assert!(matches!(fields["nan"], FirestoreValue::DoubleValue(d) if d.is_nan()));
        assert_eq!(fields["up"], FirestoreValue::double(f64::INFINITY));
        assert_eq!(fields["down"], FirestoreValue::double(f64::NEG_INFINITY));
        assert_eq!(fields["whole"], FirestoreValue::double(3.0));

        let encoded = serde_json::to_value(FirestoreValue::double(f64::NAN)).unwrap();
        assert_eq!(encoded, json!({"doubleValue": "NaN"}));
        let decoded: FirestoreValue = serde_json::from_value(encoded).unwrap();
        assert!(matches!(decoded, FirestoreValue::DoubleValue(d) if d.is_nan()));

        let err = serde_json::from_value::<FirestoreValue>(json!({"doubleValue": "lots"}));
        assert!(err.is_err());
    }

    #[test]
    fn test_decode_nested_map() {
        let value: FirestoreValue = serde_json::from_value(json!({
            "mapValue": {"fields": {"a": {"arrayValue": {"values": [{"booleanValue": true}]}}}}
        }))
        .unwrap();

        let fields = value.as_fields().unwrap();
        assert_eq!(fields["a"].as_values().unwrap(), &[FirestoreValue::boolean(true)]);
    }

    #[test]
    fn test_decode_empty_containers() {
        let map: FirestoreValue = serde_json::from_value(json!({"mapValue": {}})).unwrap();
        assert_eq!(map, FirestoreValue::MapValue(MapValue { fields: None }));
        assert_eq!(map.child_count(), 0);

        let array: FirestoreValue = serde_json::from_value(json!({"arrayValue": {}})).unwrap();
        assert_eq!(serde_json::to_value(&array).unwrap(), json!({"arrayValue": {}}));
    }

    #[test]
    fn test_decode_null_placeholder() {
        let value: FirestoreValue = serde_json::from_value(json!({"nullValue": "NULL_VALUE"})).unwrap();
        assert_eq!(value, FirestoreValue::null());
    }

    #[test]
    fn test_reject_untagged_value() {
        assert!(serde_json::from_value::<FirestoreValue>(json!({})).is_err());
        assert!(serde_json::from_value::<FirestoreValue>(json!({"bogusValue": 1})).is_err());
    }

    #[test]
    fn test_reject_two_tags() {
        let result = serde_json::from_value::<FirestoreValue>(json!({
            "stringValue": "a",
            "booleanValue": true
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_document_decode() {
        let doc: Document = serde_json::from_value(json!({
            "name": "projects/p/databases/(default)/documents/users/alice",
            "fields": {"name": {"stringValue": "Alice"}},
            "createTime": "2026-01-01T00:00:00Z"
        }))
        .unwrap();

        assert_eq!(doc.id(), "alice");
        assert_eq!(doc.get("name"), Some(&FirestoreValue::string("Alice")));
        assert!(doc.update_time.is_none());
    }

    #[test]
    fn test_display_preview() {
        assert_eq!(FirestoreValue::string("x").to_string(), "\"x\"");
        assert_eq!(FirestoreValue::array(vec![FirestoreValue::null()]).to_string(), "[1 items]");
    }
}
