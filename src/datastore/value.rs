//! Datastore entity and value wire types
//!
//! Mirrors the JSON shape of the Datastore v1 REST API. A value carries
//! exactly one tagged payload plus the `excludeFromIndexes` flag.

use std::collections::BTreeMap;
use std::fmt;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::firestore::field_value::NullValue;
use crate::firestore::geo_point::GeoPoint;

/// Entity properties by name
pub type Properties = BTreeMap<String, DatastoreValue>;

/// Datastore property value
///
/// Decoding rejects an object with no payload tag or with more than one.
/// Other keys (such as `meaning`) are ignored.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatastoreValue {
    /// The tagged payload
    #[serde(flatten)]
    pub kind: ValueKind,

    /// Whether the property is left out of indexes
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub exclude_from_indexes: bool,
}

impl<'de> Deserialize<'de> for DatastoreValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let mut object = Map::<String, Value>::deserialize(deserializer)?;

        let exclude_from_indexes = match object.remove("excludeFromIndexes") {
            None | Some(Value::Null) => false,
            Some(Value::Bool(exclude)) => exclude,
            Some(other) => {
                return Err(D::Error::custom(format!(
                    "excludeFromIndexes must be a boolean, got {}",
                    other
                )))
            }
        };

        object.retain(|key, _| ValueKind::TAGS.contains(&key.as_str()));
        match object.len() {
            1 => {}
            0 => return Err(D::Error::custom("Datastore value has no value tag")),
            n => {
                let tags: Vec<&str> = object.keys().map(String::as_str).collect();
                return Err(D::Error::custom(format!(
                    "Datastore value has {} value tags ({}), expected one",
                    n,
                    tags.join(", ")
                )));
            }
        }

        let kind = ValueKind::deserialize(Value::Object(object)).map_err(D::Error::custom)?;
        Ok(Self {
            kind,
            exclude_from_indexes,
        })
    }
}

/// Payload of a [`DatastoreValue`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ValueKind {
    /// `nullValue`
    NullValue(NullValue),
    /// `booleanValue`
    BooleanValue(bool),
    /// `integerValue`, decimal text
    IntegerValue(String),
    /// `doubleValue`; non-finite values travel as their names
    DoubleValue(#[serde(with = "crate::firestore::field_value::double_value")] f64),
    /// `timestampValue`, RFC 3339
    TimestampValue(String),
    /// `keyValue`
    KeyValue(Key),
    /// `stringValue`
    StringValue(String),
    /// `blobValue`, base64
    BlobValue(String),
    /// `geoPointValue`
    GeoPointValue(GeoPoint),
    /// `entityValue`, an embedded entity
    EntityValue(Entity),
    /// `arrayValue`
    ArrayValue(ArrayValue),
}

/// Payload of `arrayValue`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArrayValue {
    /// Elements; omitted on the wire when empty
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<DatastoreValue>,
}

impl ValueKind {
    /// Wire names of the payload tags
    pub const TAGS: [&'static str; 11] = [
        "nullValue",
        "booleanValue",
        "integerValue",
        "doubleValue",
        "timestampValue",
        "keyValue",
        "stringValue",
        "blobValue",
        "geoPointValue",
        "entityValue",
        "arrayValue",
    ];
}

impl DatastoreValue {
    /// Indexed value of the given kind
    pub fn new(kind: ValueKind) -> Self {
        Self {
            kind,
            exclude_from_indexes: false,
        }
    }

    /// Same value with the index exclusion flag set
    pub fn excluded(mut self, exclude: bool) -> Self {
        self.exclude_from_indexes = exclude;
        self
    }

    /// Short name of the payload kind, for messages
    pub fn kind_name(&self) -> &'static str {
        match self.kind {
            ValueKind::NullValue(_) => "null",
            ValueKind::BooleanValue(_) => "boolean",
            ValueKind::IntegerValue(_) => "integer",
            ValueKind::DoubleValue(_) => "double",
            ValueKind::TimestampValue(_) => "timestamp",
            ValueKind::KeyValue(_) => "key",
            ValueKind::StringValue(_) => "string",
            ValueKind::BlobValue(_) => "blob",
            ValueKind::GeoPointValue(_) => "geopoint",
            ValueKind::EntityValue(_) => "entity",
            ValueKind::ArrayValue(_) => "array",
        }
    }
}

/// Entity key: partition plus ancestor path
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Key {
    /// Project/namespace/database the entity lives in
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partition_id: Option<PartitionId>,

    /// Ancestor path, root first; the last element names the entity
    #[serde(default)]
    pub path: Vec<PathElement>,
}

/// Partition of a key
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartitionId {
    /// Project ID
    #[serde(default)]
    pub project_id: String,
    /// Namespace; the default namespace is omitted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace_id: Option<String>,
    /// Database; the default database is omitted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_id: Option<String>,
}

/// One `kind` + identifier step of a key path
///
/// At most one of `id` and `name` is set; neither means the key is
/// incomplete and the emulator allocates an ID.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathElement {
    /// Entity kind
    pub kind: String,
    /// Numeric ID as decimal text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Key name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl PathElement {
    /// Element identified by name
    pub fn named(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            id: None,
            name: Some(name.into()),
        }
    }

    /// Element identified by numeric ID
    pub fn with_id(kind: impl Into<String>, id: i64) -> Self {
        Self {
            kind: kind.into(),
            id: Some(id.to_string()),
            name: None,
        }
    }
}

impl Key {
    /// Key from a path, in the default partition
    pub fn new(path: Vec<PathElement>) -> Self {
        Self {
            partition_id: None,
            path,
        }
    }

    /// Render the path as `Kind:id/Kind:name`
    ///
    /// Incomplete elements render as the bare kind.
    pub fn display_path(&self) -> String {
        self.path
            .iter()
            .map(|element| match (&element.id, &element.name) {
                (Some(id), _) => format!("{}:{}", element.kind, id),
                (None, Some(name)) => format!("{}:{}", element.kind, name),
                (None, None) => element.kind.clone(),
            })
            .collect::<Vec<_>>()
            .join("/")
    }

    /// Parse a path rendered by [`display_path`](Self::display_path)
    ///
    /// Identifiers made only of digits are read as numeric IDs. Empty
    /// steps are skipped.
    pub fn parse_display_path(text: &str) -> Self {
        let path = text
            .split('/')
            .map(str::trim)
            .filter(|step| !step.is_empty())
            .map(|step| match step.split_once(':') {
                Some((kind, ident)) if !ident.is_empty() && ident.bytes().all(|b| b.is_ascii_digit()) => {
                    PathElement {
                        kind: kind.to_string(),
                        id: Some(ident.to_string()),
                        name: None,
                    }
                }
                Some((kind, ident)) if !ident.is_empty() => PathElement::named(kind, ident),
                Some((kind, _)) => PathElement {
                    kind: kind.to_string(),
                    ..Default::default()
                },
                None => PathElement {
                    kind: step.to_string(),
                    ..Default::default()
                },
            })
            .collect();
        Self::new(path)
    }

    /// Kind of the entity this key names
    pub fn kind(&self) -> Option<&str> {
        self.path.last().map(|element| element.kind.as_str())
    }

    /// Whether the last element carries an ID or name
    pub fn is_complete(&self) -> bool {
        self.path
            .last()
            .is_some_and(|element| element.id.is_some() || element.name.is_some())
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_path())
    }
}

/// Datastore entity
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    /// Entity key; absent for embedded entities
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<Key>,
    /// Properties by name
    #[serde(default)]
    pub properties: Properties,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_value_wire_shape() {
        let value = DatastoreValue::new(ValueKind::IntegerValue("7".to_string())).excluded(true);
        assert_eq!(
            serde_json::to_value(&value).unwrap(),
            json!({"integerValue": "7", "excludeFromIndexes": true})
        );

        let indexed = DatastoreValue::new(ValueKind::StringValue("x".to_string()));
        assert_eq!(serde_json::to_value(&indexed).unwrap(), json!({"stringValue": "x"}));
    }

    #[test]
    fn test_decode_requires_one_tag() {
        let value: DatastoreValue =
            serde_json::from_value(json!({"stringValue": "x", "meaning": 22, "excludeFromIndexes": true}))
                .unwrap();
        assert_eq!(value.kind, ValueKind::StringValue("x".to_string()));
        assert!(value.exclude_from_indexes);

        let err = serde_json::from_value::<DatastoreValue>(json!({"stringValue": "x", "integerValue": "1"}))
            .unwrap_err();
        assert!(err.to_string().contains("expected one"));

        assert!(serde_json::from_value::<DatastoreValue>(json!({"excludeFromIndexes": true})).is_err());
    }

    #[test]
    fn test_double_value_non_finite() {
        let value: DatastoreValue = serde_json::from_value(json!({"doubleValue": "Infinity"})).unwrap();
        assert_eq!(value.kind, ValueKind::DoubleValue(f64::INFINITY));
        assert_eq!(serde_json::to_value(&value).unwrap(), json!({"doubleValue": "Infinity"}));
    }

    #[test]
    fn test_decode_entity() {
        let entity: Entity = serde_json::from_value(json!({
            "key": {
                "partitionId": {"projectId": "demo"},
                "path": [{"kind": "User", "name": "alice"}, {"kind": "Post", "id": "42"}]
            },
            "properties": {
                "title": {"stringValue": "hi", "excludeFromIndexes": true},
                "draft": {"booleanValue": false},
                "nothing": {"nullValue": null}
            }
        }))
        .unwrap();

        let key = entity.key.unwrap();
        assert_eq!(key.display_path(), "User:alice/Post:42");
        assert_eq!(key.kind(), Some("Post"));
        assert!(key.is_complete());
        assert!(entity.properties["title"].exclude_from_indexes);
        assert_eq!(entity.properties["draft"].kind, ValueKind::BooleanValue(false));
        assert_eq!(entity.properties["nothing"].kind_name(), "null");
    }

    #[test]
    fn test_parse_display_path() {
        let key = Key::parse_display_path("User:alice/Post:42/Comment");
        assert_eq!(
            key.path,
            vec![
                PathElement::named("User", "alice"),
                PathElement::with_id("Post", 42),
                PathElement {
                    kind: "Comment".to_string(),
                    ..Default::default()
                },
            ]
        );
        assert!(!key.is_complete());
        assert_eq!(key.to_string(), "User:alice/Post:42/Comment");
        assert!(Key::parse_display_path("").path.is_empty());
    }
}
