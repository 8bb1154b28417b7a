//! Conversion between plain values and Firestore wire values
//!
//! Edit forms work with plain JSON values (`serde_json::Value`) plus a
//! chosen [`FieldType`]. [`to_wire`] and [`from_wire`] are total: input that
//! cannot be read as the requested type falls back to a default instead of
//! failing (`0` for numbers, empty containers for malformed JSON text).
//!
//! Integers and doubles are distinct on the wire: integers travel as
//! decimal strings in `integerValue`, doubles as numbers in `doubleValue`.
//! When the type is inferred from a plain number, an integral value becomes
//! an integer and anything else a double.

use std::fmt;
use std::str::FromStr;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use tracing::warn;

use super::field_value::double_value::{non_finite_text, parse_non_finite};
use super::field_value::{Fields, FirestoreValue};
use super::geo_point::GeoPoint;
use super::timestamp::{normalize_timestamp, Timestamp};

/// Value type selectable in a field form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    /// `stringValue`
    String,
    /// `integerValue`
    Integer,
    /// `doubleValue`
    Double,
    /// Integer or double, whichever fits the number
    Number,
    /// `booleanValue`
    Boolean,
    /// `nullValue`
    Null,
    /// `timestampValue`
    Timestamp,
    /// `geoPointValue`
    GeoPoint,
    /// `referenceValue`
    Reference,
    /// `bytesValue`
    Bytes,
    /// `arrayValue`
    Array,
    /// `mapValue`
    Map,
}

impl FieldType {
    /// All selectable types, in form order
    pub const ALL: [FieldType; 12] = [
        FieldType::String,
        FieldType::Integer,
        FieldType::Double,
        FieldType::Number,
        FieldType::Boolean,
        FieldType::Null,
        FieldType::Timestamp,
        FieldType::GeoPoint,
        FieldType::Reference,
        FieldType::Bytes,
        FieldType::Array,
        FieldType::Map,
    ];

    /// Lowercase type name
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Integer => "integer",
            FieldType::Double => "double",
            FieldType::Number => "number",
            FieldType::Boolean => "boolean",
            FieldType::Null => "null",
            FieldType::Timestamp => "timestamp",
            FieldType::GeoPoint => "geopoint",
            FieldType::Reference => "reference",
            FieldType::Bytes => "bytes",
            FieldType::Array => "array",
            FieldType::Map => "map",
        }
    }

    /// Whether values of this type have children
    pub fn is_container(&self) -> bool {
        matches!(self, FieldType::Array | FieldType::Map)
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        FieldType::ALL
            .iter()
            .copied()
            .find(|ty| ty.as_str() == lowered)
            .ok_or_else(|| format!("unknown field type '{}'", s))
    }
}

/// Encode a plain value as a Firestore value of the given type
pub fn to_wire(field_type: FieldType, raw: &Value) -> FirestoreValue {
    match field_type {
        FieldType::String => FirestoreValue::StringValue(coerce_string(raw)),
        FieldType::Integer => FirestoreValue::integer(coerce_i64(raw).unwrap_or_else(|| {
            warn!(value = %raw, "Integer field value is not a number, using 0");
            0
        })),
        FieldType::Double => FirestoreValue::DoubleValue(coerce_double(raw).unwrap_or_else(|| {
            warn!(value = %raw, "Double field value is not a number, using 0");
            0.0
        })),
        FieldType::Number => number_to_wire(coerce_f64(raw).unwrap_or(0.0)),
        FieldType::Boolean => FirestoreValue::BooleanValue(coerce_bool(raw)),
        FieldType::Null => FirestoreValue::null(),
        FieldType::Timestamp => FirestoreValue::TimestampValue(timestamp_text(raw)),
        FieldType::GeoPoint => geo_point(raw).to_value(),
        FieldType::Reference => FirestoreValue::ReferenceValue(coerce_string(raw)),
        FieldType::Bytes => FirestoreValue::BytesValue(base64_text(raw)),
        FieldType::Array => {
            let values = match parse_container(raw) {
                Some(Value::Array(items)) => items.iter().map(json_to_value).collect(),
                _ => Vec::new(),
            };
            FirestoreValue::array(values)
        }
        FieldType::Map => {
            let fields = match parse_container(raw) {
                Some(Value::Object(entries)) => object_to_fields(&entries),
                _ => Fields::new(),
            };
            FirestoreValue::map(fields)
        }
    }
}

/// Decode a Firestore value into a plain value
pub fn from_wire(value: &FirestoreValue) -> Value {
    match value {
        FirestoreValue::StringValue(s)
        | FirestoreValue::TimestampValue(s)
        | FirestoreValue::ReferenceValue(s)
        | FirestoreValue::BytesValue(s) => Value::String(s.clone()),
        FirestoreValue::IntegerValue(s) => match s.trim().parse::<i64>() {
            Ok(n) => Value::Number(n.into()),
            Err(_) => Value::String(s.clone()),
        },
        FirestoreValue::DoubleValue(d) => double_to_json(*d),
        FirestoreValue::BooleanValue(b) => Value::Bool(*b),
        FirestoreValue::NullValue(_) => Value::Null,
        FirestoreValue::GeoPointValue(point) => serde_json::json!({
            "latitude": point.latitude,
            "longitude": point.longitude,
        }),
        FirestoreValue::MapValue(map) => {
            let entries = map
                .fields
                .iter()
                .flatten()
                .map(|(k, v)| (k.clone(), from_wire(v)))
                .collect::<Map<String, Value>>();
            Value::Object(entries)
        }
        FirestoreValue::ArrayValue(array) => {
            Value::Array(array.values.iter().flatten().map(from_wire).collect())
        }
    }
}

/// Field type that re-encodes a wire value into the same variant
pub fn infer_type(value: &FirestoreValue) -> FieldType {
    match value {
        FirestoreValue::StringValue(_) => FieldType::String,
        FirestoreValue::IntegerValue(_) => FieldType::Integer,
        FirestoreValue::DoubleValue(_) => FieldType::Double,
        FirestoreValue::BooleanValue(_) => FieldType::Boolean,
        FirestoreValue::NullValue(_) => FieldType::Null,
        FirestoreValue::TimestampValue(_) => FieldType::Timestamp,
        FirestoreValue::GeoPointValue(_) => FieldType::GeoPoint,
        FirestoreValue::ReferenceValue(_) => FieldType::Reference,
        FirestoreValue::BytesValue(_) => FieldType::Bytes,
        FirestoreValue::MapValue(_) => FieldType::Map,
        FirestoreValue::ArrayValue(_) => FieldType::Array,
    }
}

/// Encode a plain JSON value, inferring the Firestore type
pub fn json_to_value(raw: &Value) -> FirestoreValue {
    match raw {
        Value::Null => FirestoreValue::null(),
        Value::Bool(b) => FirestoreValue::BooleanValue(*b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => FirestoreValue::integer(i),
            None => number_to_wire(n.as_f64().unwrap_or(0.0)),
        },
        Value::String(s) => FirestoreValue::StringValue(s.clone()),
        Value::Array(items) => FirestoreValue::array(items.iter().map(json_to_value).collect()),
        Value::Object(entries) => FirestoreValue::map(object_to_fields(entries)),
    }
}

/// Encode every entry of a plain JSON object
pub fn object_to_fields(entries: &Map<String, Value>) -> Fields {
    entries
        .iter()
        .map(|(k, v)| (k.clone(), json_to_value(v)))
        .collect()
}

/// Integral numbers become `integerValue`, everything else `doubleValue`
pub(crate) fn number_to_wire(n: f64) -> FirestoreValue {
    if is_integral(n) {
        return FirestoreValue::integer(n as i64);
    }
    FirestoreValue::DoubleValue(n)
}

pub(crate) fn timestamp_text(raw: &Value) -> String {
    match raw {
        Value::String(text) => match normalize_timestamp(text) {
            Some(normalized) => normalized,
            None => {
                warn!(value = %text, "Unrecognized timestamp, sending as entered");
                text.clone()
            }
        },
        Value::Number(n) => {
            let millis = n.as_i64().unwrap_or_else(|| n.as_f64().unwrap_or(0.0) as i64);
            match DateTime::<Utc>::from_timestamp_millis(millis) {
                Some(dt) => Timestamp::from_datetime(dt).to_rfc3339(),
                None => Timestamp::now().to_rfc3339(),
            }
        }
        _ => Timestamp::now().to_rfc3339(),
    }
}

pub(crate) fn geo_point(raw: &Value) -> GeoPoint {
    let parsed = match raw {
        Value::String(text) if !text.trim_start().starts_with('{') => None,
        other => parse_container(other),
    };
    match parsed {
        Some(Value::Object(entries)) => {
            let coordinate = |key: &str| entries.get(key).and_then(coerce_f64).unwrap_or(0.0);
            GeoPoint::clamped(coordinate("latitude"), coordinate("longitude"))
        }
        _ => {
            let text = coerce_string(raw);
            let mut parts = text.split(',').map(|p| p.trim().parse::<f64>().unwrap_or(0.0));
            let latitude = parts.next().unwrap_or(0.0);
            let longitude = parts.next().unwrap_or(0.0);
            GeoPoint::clamped(latitude, longitude)
        }
    }
}

/// Base64 payload of a bytes input
///
/// Text is taken as base64 and sent unchanged. `{"text": "..."}` carries
/// plain text, which is encoded.
pub(crate) fn base64_text(raw: &Value) -> String {
    let parsed = match raw {
        Value::String(text) if !text.trim_start().starts_with('{') => None,
        other => parse_container(other),
    };
    if let Some(Value::Object(entries)) = parsed {
        if let Some(Value::String(plain)) = entries.get("text") {
            return STANDARD.encode(plain.as_bytes());
        }
    }

    let text = coerce_string(raw);
    if STANDARD.decode(text.as_bytes()).is_err() {
        warn!(value = %text, "Bytes value is not valid base64, sending as entered");
    }
    text
}

/// Plain JSON form of a double; non-finite values become their wire text
pub(crate) fn double_to_json(d: f64) -> Value {
    match Number::from_f64(d) {
        Some(n) => Value::Number(n),
        None => Value::String(non_finite_text(d).unwrap_or("NaN").to_string()),
    }
}

/// Like [`coerce_f64`], also accepting `"NaN"`, `"Infinity"` and `"-Infinity"`
pub(crate) fn coerce_double(raw: &Value) -> Option<f64> {
    coerce_f64(raw).or_else(|| match raw {
        Value::String(s) => parse_non_finite(s.trim()),
        _ => None,
    })
}

/// Whether `n` is an integer that fits `i64` (`Number.isInteger` semantics)
///
/// `i64::MAX as f64` rounds up to 2^63, which is already out of range.
pub(crate) fn is_integral(n: f64) -> bool {
    n.is_finite() && n.fract() == 0.0 && n >= i64::MIN as f64 && n < i64::MAX as f64
}

/// Text of a plain value; `null` becomes the empty string
pub(crate) fn coerce_string(raw: &Value) -> String {
    match raw {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

pub(crate) fn coerce_f64(raw: &Value) -> Option<f64> {
    let n = match raw {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }?;
    n.is_finite().then_some(n)
}

pub(crate) fn coerce_i64(raw: &Value) -> Option<i64> {
    match raw {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().filter(|f| f.is_finite()).map(|f| f.trunc() as i64))
        }
        Value::Bool(b) => Some(i64::from(*b)),
        _ => None,
    }
}

pub(crate) fn coerce_bool(raw: &Value) -> bool {
    match raw {
        Value::Bool(b) => *b,
        Value::String(s) => matches!(s.trim().to_ascii_lowercase().as_str(), "true" | "1" | "yes"),
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        _ => false,
    }
}

/// JSON value of a container input: text is parsed, other values pass
/// through; malformed text yields `None`
pub(crate) fn parse_container(raw: &Value) -> Option<Value> {
    match raw {
        Value::String(text) if text.trim().is_empty() => None,
        Value::String(text) => match serde_json::from_str(text) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                warn!(error = %e, "Malformed JSON in container field, using empty value");
                None
            }
        },
        other => Some(other.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const SCALARS: [FieldType; 10] = [
        FieldType::String,
        FieldType::Integer,
        FieldType::Double,
        FieldType::Number,
        FieldType::Boolean,
        FieldType::Null,
        FieldType::Timestamp,
        FieldType::GeoPoint,
        FieldType::Reference,
        FieldType::Bytes,
    ];

    #[test]
    fn test_integer_is_string_encoded() {
        let value = to_wire(FieldType::Integer, &json!(5));
        assert_eq!(value, FirestoreValue::IntegerValue("5".to_string()));
        assert_eq!(from_wire(&value), json!(5));
    }

    #[test]
    fn test_integer_from_text() {
        assert_eq!(to_wire(FieldType::Integer, &json!(" 42 ")).as_i64(), Some(42));
        assert_eq!(to_wire(FieldType::Integer, &json!("7.9")).as_i64(), Some(7));
        assert_eq!(to_wire(FieldType::Integer, &json!("abc")).as_i64(), Some(0));
    }

    #[test]
    fn test_double_defaults_to_zero() {
        assert_eq!(
            to_wire(FieldType::Double, &json!("not-a-number")),
            FirestoreValue::DoubleValue(0.0)
        );
        assert_eq!(to_wire(FieldType::Double, &json!("2.5")), FirestoreValue::DoubleValue(2.5));
    }

    #[test]
    fn test_number_infers_integer_or_double() {
        assert_eq!(to_wire(FieldType::Number, &json!(3.0)), FirestoreValue::integer(3));
        assert_eq!(to_wire(FieldType::Number, &json!(3.25)), FirestoreValue::DoubleValue(3.25));
    }

    #[test]
    fn test_timestamp_minute_precision() {
        assert_eq!(
            to_wire(FieldType::Timestamp, &json!("2026-02-01T12:30")),
            FirestoreValue::TimestampValue("2026-02-01T12:30:00Z".to_string())
        );
    }

    #[test]
    fn test_timestamp_from_epoch_millis() {
        assert_eq!(
            to_wire(FieldType::Timestamp, &json!(0)),
            FirestoreValue::TimestampValue("1970-01-01T00:00:00Z".to_string())
        );
    }

    #[test]
    fn test_boolean_coercion() {
        assert_eq!(to_wire(FieldType::Boolean, &json!("TRUE")), FirestoreValue::boolean(true));
        assert_eq!(to_wire(FieldType::Boolean, &json!("no")), FirestoreValue::boolean(false));
        assert_eq!(to_wire(FieldType::Boolean, &json!(1)), FirestoreValue::boolean(true));
    }

    #[test]
    fn test_geopoint_inputs() {
        let from_object = to_wire(FieldType::GeoPoint, &json!({"latitude": "10.5", "longitude": 20}));
        assert_eq!(from_object, GeoPoint { latitude: 10.5, longitude: 20.0 }.to_value());

        let from_text = to_wire(FieldType::GeoPoint, &json!("10.5, 20"));
        assert_eq!(from_text, from_object);

        let clamped = to_wire(FieldType::GeoPoint, &json!({"latitude": 100}));
        assert_eq!(clamped, GeoPoint { latitude: 90.0, longitude: 0.0 }.to_value());
    }

    #[test]
    fn test_bytes_text_is_the_base64_payload() {
        for text in ["aGVsbG8=", "test", "abcd", "hello"] {
            assert_eq!(
                to_wire(FieldType::Bytes, &json!(text)),
                FirestoreValue::BytesValue(text.to_string())
            );
        }
    }

    #[test]
    fn test_bytes_plain_text_is_encoded() {
        assert_eq!(
            to_wire(FieldType::Bytes, &json!({"text": "hello"})),
            FirestoreValue::BytesValue("aGVsbG8=".to_string())
        );
        assert_eq!(
            to_wire(FieldType::Bytes, &json!(r#"{"text": "test"}"#)),
            FirestoreValue::BytesValue("dGVzdA==".to_string())
        );
    }

    #[test]
    fn test_non_finite_double_survives_from_wire() {
        let value = FirestoreValue::double(f64::NEG_INFINITY);
        assert_eq!(from_wire(&value), json!("-Infinity"));
        assert_eq!(to_wire(FieldType::Double, &from_wire(&value)), value);

        let nan = to_wire(FieldType::Double, &from_wire(&FirestoreValue::double(f64::NAN)));
        assert!(matches!(nan, FirestoreValue::DoubleValue(d) if d.is_nan()));
    }

    #[test]
    fn test_integral_range_excludes_two_pow_63() {
        let two_pow_63 = 9_223_372_036_854_775_808.0_f64;
        assert!(!is_integral(two_pow_63));
        assert_eq!(number_to_wire(two_pow_63), FirestoreValue::DoubleValue(two_pow_63));
        assert!(is_integral(i64::MIN as f64));
        assert!(is_integral(9_007_199_254_740_992.0));
    }

    #[test]
    fn test_array_from_text_and_malformed() {
        let value = to_wire(FieldType::Array, &json!("[1, 2.5, \"x\", {\"k\": true}]"));
        let values = value.as_values().unwrap();
        assert_eq!(values[0], FirestoreValue::integer(1));
        assert_eq!(values[1], FirestoreValue::DoubleValue(2.5));
        assert_eq!(values[2], FirestoreValue::string("x"));
        assert_eq!(values[3].as_fields().unwrap()["k"], FirestoreValue::boolean(true));

        assert_eq!(to_wire(FieldType::Array, &json!("[1, 2")), FirestoreValue::array(vec![]));
        assert_eq!(to_wire(FieldType::Array, &json!({"a": 1})), FirestoreValue::array(vec![]));
    }

    #[test]
    fn test_map_from_text_and_malformed() {
        let value = to_wire(FieldType::Map, &json!("{\"a\": {\"b\": null}}"));
        assert_eq!(from_wire(&value), json!({"a": {"b": null}}));

        assert_eq!(to_wire(FieldType::Map, &json!("{oops")), FirestoreValue::map(Fields::new()));
        assert_eq!(to_wire(FieldType::Map, &json!("")), FirestoreValue::map(Fields::new()));
    }

    #[test]
    fn test_from_wire_nested() {
        let value: FirestoreValue = serde_json::from_value(json!({
            "mapValue": {"fields": {
                "n": {"integerValue": "12"},
                "list": {"arrayValue": {"values": [{"doubleValue": 1.5}, {"nullValue": null}]}},
                "where": {"geoPointValue": {"latitude": 1.0, "longitude": 2.0}},
                "empty": {"arrayValue": {}}
            }}
        }))
        .unwrap();

        assert_eq!(
            from_wire(&value),
            json!({
                "n": 12,
                "list": [1.5, null],
                "where": {"latitude": 1.0, "longitude": 2.0},
                "empty": []
            })
        );
    }

    #[test]
    fn test_round_trip_is_idempotent_for_scalars() {
        let inputs = [
            json!("hello"),
            json!(5),
            json!("3.75"),
            json!(true),
            json!(null),
            json!("2026-02-01T12:30"),
            json!({"latitude": 45.0, "longitude": -73.5}),
        ];
        for ty in SCALARS {
            for input in &inputs {
                let first = to_wire(ty, input);
                let again = to_wire(ty, &from_wire(&first));
                assert_eq!(first, again, "type {} input {}", ty, input);
            }
        }
    }

    #[test]
    fn test_infer_type_round_trip() {
        let value = FirestoreValue::ReferenceValue("projects/p/databases/(default)/documents/a/b".to_string());
        assert_eq!(to_wire(infer_type(&value), &from_wire(&value)), value);
    }

    #[test]
    fn test_field_type_parse() {
        assert_eq!("GeoPoint".parse::<FieldType>(), Ok(FieldType::GeoPoint));
        assert_eq!(" map ".parse::<FieldType>(), Ok(FieldType::Map));
        assert!("decimal".parse::<FieldType>().is_err());
        assert_eq!(serde_json::to_value(FieldType::GeoPoint).unwrap(), json!("geopoint"));
    }
}
