//! Field tree mutation
//!
//! All operations work on a caller-owned copy of a document's fields. A
//! failed mutation may leave that copy partially edited; the live document
//! is only replaced after the update round-trip succeeds.

use tracing::debug;

use crate::error::FieldPathError;

use super::field_path::{FieldPath, PathSegment};
use super::field_value::{ArrayValue, Fields, FirestoreValue};
use super::navigator::{
    field_not_found, navigate_to_parent_mut, not_a_map, not_an_array, out_of_range, step_mut,
    undefined, ParentMut,
};

/// Set the value at `path`, adding or overwriting it
///
/// A `Field` segment inserts into the parent map (creating its `fields` if
/// absent). An `Index` segment overwrites an existing element; the index one
/// past the end appends. A path ending in the append marker appends to the
/// array addressed by the rest of the path.
pub fn set_field(
    fields: &mut Fields,
    path: &FieldPath,
    value: FirestoreValue,
) -> Result<(), FieldPathError> {
    if path.is_append() {
        let Some(array_path) = path.parent() else {
            return Err(FieldPathError::EmptyPath);
        };
        append_to_array(fields, &array_path, value)?;
        return Ok(());
    }

    let (parent, last) = navigate_to_parent_mut(fields, path)?;
    debug!(path = %path, "Setting field");

    match (parent, last) {
        (ParentMut::Fields(map), PathSegment::Field(name)) => {
            map.insert(name.clone(), value);
            Ok(())
        }
        (ParentMut::Value(FirestoreValue::MapValue(map)), PathSegment::Field(name)) => {
            map.fields
                .get_or_insert_with(Fields::new)
                .insert(name.clone(), value);
            Ok(())
        }
        (ParentMut::Value(FirestoreValue::ArrayValue(array)), PathSegment::Index(index)) => {
            let values = array.values.get_or_insert_with(Vec::new);
            let index = *index;
            if index < values.len() {
                values[index] = value;
                return Ok(());
            }
            if index == values.len() {
                values.push(value);
                return Ok(());
            }
            Err(out_of_range(index, values.len(), path))
        }
        (ParentMut::Fields(_), segment @ PathSegment::Index(_)) => {
            Err(not_an_array(segment, path, "map"))
        }
        (ParentMut::Value(other), segment @ PathSegment::Index(_)) => {
            Err(not_an_array(segment, path, other.kind()))
        }
        (ParentMut::Value(other), segment @ PathSegment::Field(_)) => {
            Err(not_a_map(segment, path, other.kind()))
        }
    }
}

/// Remove the value at `path` and return it
///
/// Array elements after a removed index shift down, keeping their order.
pub fn delete_field(fields: &mut Fields, path: &FieldPath) -> Result<FirestoreValue, FieldPathError> {
    let (parent, last) = navigate_to_parent_mut(fields, path)?;
    debug!(path = %path, "Deleting field");

    match (parent, last) {
        (ParentMut::Fields(map), PathSegment::Field(name)) => {
            map.remove(name)
                .ok_or_else(|| field_not_found(map, name, path))
        }
        (ParentMut::Value(FirestoreValue::MapValue(map)), segment @ PathSegment::Field(name)) => {
            let Some(entries) = map.fields.as_mut() else {
                return Err(undefined(segment, path));
            };
            entries
                .remove(name)
                .ok_or_else(|| field_not_found(entries, name, path))
        }
        (ParentMut::Value(FirestoreValue::ArrayValue(array)), PathSegment::Index(index)) => {
            let values = array.values.get_or_insert_with(Vec::new);
            if *index >= values.len() {
                return Err(out_of_range(*index, values.len(), path));
            }
            Ok(values.remove(*index))
        }
        (ParentMut::Fields(_), segment @ PathSegment::Index(_)) => {
            Err(not_an_array(segment, path, "map"))
        }
        (ParentMut::Value(other), segment @ PathSegment::Index(_)) => {
            Err(not_an_array(segment, path, other.kind()))
        }
        (ParentMut::Value(other), segment @ PathSegment::Field(_)) => {
            Err(not_a_map(segment, path, other.kind()))
        }
    }
}

/// Append `value` to the array at `array_path`
///
/// The array is rebuilt with the new element and stored back at its own
/// location in the parent, so the container slot is replaced rather than
/// pushed into. Returns the index of the new element.
pub fn append_to_array(
    fields: &mut Fields,
    array_path: &FieldPath,
    value: FirestoreValue,
) -> Result<usize, FieldPathError> {
    let Some(last) = array_path.last() else {
        return Err(FieldPathError::EmptyPath);
    };
    let (parent, _) = navigate_to_parent_mut(fields, array_path)?;
    let container = step_mut(parent, last, array_path)?;

    let mut values = match &mut *container {
        FirestoreValue::ArrayValue(array) => array.values.take().unwrap_or_default(),
        other => return Err(not_an_array(last, array_path, other.kind())),
    };
    values.push(value);
    let index = values.len() - 1;
    *container = FirestoreValue::ArrayValue(ArrayValue {
        values: Some(values),
    });

    debug!(path = %array_path, index, "Appended array element");
    Ok(index)
}

/// Move a map entry to a new key under the same parent
///
/// Renaming onto an existing key overwrites it.
pub fn rename_field(
    fields: &mut Fields,
    path: &FieldPath,
    new_name: &str,
) -> Result<(), FieldPathError> {
    let Some(parent_path) = path.parent() else {
        return Err(FieldPathError::EmptyPath);
    };
    if !matches!(path.last(), Some(PathSegment::Field(_))) {
        return Err(match path.last() {
            Some(segment) => not_a_map(segment, path, "array"),
            None => FieldPathError::EmptyPath,
        });
    }

    let value = delete_field(fields, path)?;
    set_field(fields, &parent_path.child(new_name), value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::firestore::navigator::get_value;
    use serde_json::json;

    fn fields(value: serde_json::Value) -> Fields {
        serde_json::from_value(value).unwrap()
    }

    fn path(text: &str) -> FieldPath {
        FieldPath::parse(text).unwrap()
    }

    fn sample() -> Fields {
        fields(json!({
            "name": {"stringValue": "old"},
            "profile": {"mapValue": {"fields": {"age": {"integerValue": "30"}}}},
            "tags": {"arrayValue": {"values": [
                {"stringValue": "a"},
                {"stringValue": "b"},
                {"stringValue": "c"}
            ]}},
            "empty": {"mapValue": {}}
        }))
    }

    fn strings(fields: &Fields, array: &str) -> Vec<String> {
        get_value(fields, &path(array))
            .unwrap()
            .as_values()
            .unwrap_or_default()
            .iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect()
    }

    #[test]
    fn test_set_root_field() {
        let mut doc = sample();
        set_field(&mut doc, &path("name"), FirestoreValue::string("new")).unwrap();
        assert_eq!(doc["name"], FirestoreValue::string("new"));
    }

    #[test]
    fn test_set_nested_field() {
        let mut doc = sample();
        set_field(&mut doc, &path("profile.city"), FirestoreValue::string("Oslo")).unwrap();
        assert_eq!(
            get_value(&doc, &path("profile.city")).unwrap(),
            &FirestoreValue::string("Oslo")
        );
        assert_eq!(get_value(&doc, &path("profile.age")).unwrap().as_i64(), Some(30));
    }

    #[test]
    fn test_set_creates_missing_fields() {
        let mut doc = sample();
        set_field(&mut doc, &path("empty.x"), FirestoreValue::boolean(true)).unwrap();
        assert_eq!(
            get_value(&doc, &path("empty.x")).unwrap(),
            &FirestoreValue::boolean(true)
        );
    }

    #[test]
    fn test_set_array_element() {
        let mut doc = sample();
        set_field(&mut doc, &path("tags[1]"), FirestoreValue::string("B")).unwrap();
        assert_eq!(strings(&doc, "tags"), vec!["a", "B", "c"]);
    }

    #[test]
    fn test_set_array_one_past_end_appends() {
        let mut doc = sample();
        set_field(&mut doc, &path("tags[3]"), FirestoreValue::string("d")).unwrap();
        assert_eq!(strings(&doc, "tags"), vec!["a", "b", "c", "d"]);

        let err = set_field(&mut doc, &path("tags[9]"), FirestoreValue::null()).unwrap_err();
        assert!(matches!(err, FieldPathError::InvalidIndex { .. }));
    }

    #[test]
    fn test_set_field_on_scalar_fails() {
        let mut doc = sample();
        let err = set_field(&mut doc, &path("name.first"), FirestoreValue::null()).unwrap_err();
        assert!(matches!(err, FieldPathError::NotAMap { found: "string", .. }));
    }

    #[test]
    fn test_set_empty_path_fails() {
        let mut doc = sample();
        assert_eq!(
            set_field(&mut doc, &path(""), FirestoreValue::null()).unwrap_err(),
            FieldPathError::EmptyPath
        );
    }

    #[test]
    fn test_delete_array_element_keeps_order() {
        let mut doc = sample();
        let removed = delete_field(&mut doc, &path("tags[1]")).unwrap();
        assert_eq!(removed, FirestoreValue::string("b"));
        assert_eq!(strings(&doc, "tags"), vec!["a", "c"]);
    }

    #[test]
    fn test_delete_root_and_nested_fields() {
        let mut doc = sample();
        delete_field(&mut doc, &path("name")).unwrap();
        assert!(!doc.contains_key("name"));

        delete_field(&mut doc, &path("profile.age")).unwrap();
        assert_eq!(get_value(&doc, &path("profile")).unwrap().child_count(), 0);
    }

    #[test]
    fn test_delete_missing_field() {
        let mut doc = sample();
        let err = delete_field(&mut doc, &path("profile.nope")).unwrap_err();
        assert!(matches!(err, FieldPathError::FieldNotFound { ref available, .. } if available == &["age"]));
    }

    #[test]
    fn test_delete_out_of_range() {
        let mut doc = sample();
        let err = delete_field(&mut doc, &path("tags[3]")).unwrap_err();
        assert!(matches!(err, FieldPathError::InvalidIndex { .. }));
        assert_eq!(strings(&doc, "tags").len(), 3);
    }

    #[test]
    fn test_append_via_marker() {
        let mut doc = sample();
        set_field(&mut doc, &path("tags.-"), FirestoreValue::string("d")).unwrap();
        assert_eq!(strings(&doc, "tags"), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_append_to_nested_array() {
        let mut doc = fields(json!({
            "matrix": {"arrayValue": {"values": [{"arrayValue": {}}]}}
        }));
        let index = append_to_array(&mut doc, &path("matrix[0]"), FirestoreValue::integer(7)).unwrap();
        assert_eq!(index, 0);
        assert_eq!(get_value(&doc, &path("matrix[0][0]")).unwrap().as_i64(), Some(7));
    }

    #[test]
    fn test_append_to_non_array() {
        let mut doc = sample();
        let err = append_to_array(&mut doc, &path("profile"), FirestoreValue::null()).unwrap_err();
        assert!(matches!(err, FieldPathError::NotAnArray { found: "map", .. }));
    }

    #[test]
    fn test_rename_field() {
        let mut doc = sample();
        rename_field(&mut doc, &path("profile.age"), "years").unwrap();
        assert_eq!(get_value(&doc, &path("profile.years")).unwrap().as_i64(), Some(30));
        assert!(get_value(&doc, &path("profile.age")).is_err());
    }

    #[test]
    fn test_rename_array_element_fails() {
        let mut doc = sample();
        assert!(rename_field(&mut doc, &path("tags[0]"), "x").is_err());
    }
}
