//! Field tree navigation
//!
//! Walks a document's field tree one [`PathSegment`] at a time. The root of
//! the tree is the bare field mapping of a document; below it every node is
//! a [`FirestoreValue`], and only `mapValue` and `arrayValue` have children.

use crate::error::FieldPathError;

use super::field_path::{FieldPath, PathSegment};
use super::field_value::{Fields, FirestoreValue};

/// Read-only position in a field tree
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Node<'a> {
    /// The document's root field mapping
    Fields(&'a Fields),
    /// A value somewhere below the root
    Value(&'a FirestoreValue),
}

impl<'a> Node<'a> {
    /// The value at this position, `None` at the root
    pub fn value(self) -> Option<&'a FirestoreValue> {
        match self {
            Node::Fields(_) => None,
            Node::Value(value) => Some(value),
        }
    }
}

/// Mutable position in a field tree, used as a write parent
#[derive(Debug)]
pub enum ParentMut<'a> {
    /// The document's root field mapping
    Fields(&'a mut Fields),
    /// A value somewhere below the root
    Value(&'a mut FirestoreValue),
}

/// Walk `path` from `root` and return the node it addresses
///
/// The empty path returns `root` unchanged.
pub fn navigate<'a>(root: Node<'a>, path: &FieldPath) -> Result<Node<'a>, FieldPathError> {
    descend(root, path.segments(), path)
}

fn descend<'a>(
    node: Node<'a>,
    segments: &[PathSegment],
    path: &FieldPath,
) -> Result<Node<'a>, FieldPathError> {
    let Some((segment, rest)) = segments.split_first() else {
        return Ok(node);
    };
    let child = step(node, segment, path)?;
    descend(Node::Value(child), rest, path)
}

/// Return the value a non-empty path addresses inside a document
pub fn get_value<'a>(
    fields: &'a Fields,
    path: &FieldPath,
) -> Result<&'a FirestoreValue, FieldPathError> {
    let (parent, last) = navigate_to_parent(Node::Fields(fields), path)?;
    step(parent, last, path)
}

/// Walk all but the last segment of `path`
///
/// Returns the parent node and the unresolved final segment so callers can
/// act on `parent` with `last`. Fails with `EmptyPath` for an empty path.
pub fn navigate_to_parent<'a, 'p>(
    root: Node<'a>,
    path: &'p FieldPath,
) -> Result<(Node<'a>, &'p PathSegment), FieldPathError> {
    let Some((last, init)) = path.segments().split_last() else {
        return Err(FieldPathError::EmptyPath);
    };
    let parent = descend(root, init, path)?;
    Ok((parent, last))
}

/// Mutable counterpart of [`navigate_to_parent`] rooted at a field mapping
pub fn navigate_to_parent_mut<'a, 'p>(
    root: &'a mut Fields,
    path: &'p FieldPath,
) -> Result<(ParentMut<'a>, &'p PathSegment), FieldPathError> {
    let Some((last, init)) = path.segments().split_last() else {
        return Err(FieldPathError::EmptyPath);
    };

    let mut current = ParentMut::Fields(root);
    for segment in init {
        current = ParentMut::Value(step_mut(current, segment, path)?);
    }
    Ok((current, last))
}

/// Resolve one segment against a node
pub(crate) fn step<'a>(
    node: Node<'a>,
    segment: &PathSegment,
    path: &FieldPath,
) -> Result<&'a FirestoreValue, FieldPathError> {
    match (node, segment) {
        (Node::Fields(fields), PathSegment::Field(name)) => lookup(fields, name, path),
        (Node::Fields(_), PathSegment::Index(_)) => Err(not_an_array(segment, path, "map")),
        (Node::Value(FirestoreValue::MapValue(map)), PathSegment::Field(name)) => {
            let Some(fields) = map.fields.as_ref() else {
                return Err(undefined(segment, path));
            };
            lookup(fields, name, path)
        }
        (Node::Value(FirestoreValue::ArrayValue(array)), PathSegment::Index(index)) => {
            let Some(values) = array.values.as_ref() else {
                return Err(out_of_range(*index, 0, path));
            };
            values
                .get(*index)
                .ok_or_else(|| out_of_range(*index, values.len(), path))
        }
        (Node::Value(other), PathSegment::Index(_)) => {
            Err(not_an_array(segment, path, other.kind()))
        }
        (Node::Value(other), PathSegment::Field(_)) => Err(not_a_map(segment, path, other.kind())),
    }
}

/// Resolve one segment against a mutable node
pub(crate) fn step_mut<'a>(
    node: ParentMut<'a>,
    segment: &PathSegment,
    path: &FieldPath,
) -> Result<&'a mut FirestoreValue, FieldPathError> {
    match (node, segment) {
        (ParentMut::Fields(fields), PathSegment::Field(name)) => lookup_mut(fields, name, path),
        (ParentMut::Fields(_), PathSegment::Index(_)) => Err(not_an_array(segment, path, "map")),
        (ParentMut::Value(FirestoreValue::MapValue(map)), PathSegment::Field(name)) => {
            let Some(fields) = map.fields.as_mut() else {
                return Err(undefined(segment, path));
            };
            lookup_mut(fields, name, path)
        }
        (ParentMut::Value(FirestoreValue::ArrayValue(array)), PathSegment::Index(index)) => {
            let Some(values) = array.values.as_mut() else {
                return Err(out_of_range(*index, 0, path));
            };
            let len = values.len();
            values
                .get_mut(*index)
                .ok_or_else(|| out_of_range(*index, len, path))
        }
        (ParentMut::Value(other), PathSegment::Index(_)) => {
            Err(not_an_array(segment, path, other.kind()))
        }
        (ParentMut::Value(other), PathSegment::Field(_)) => {
            Err(not_a_map(segment, path, other.kind()))
        }
    }
}

fn lookup<'a>(
    fields: &'a Fields,
    name: &str,
    path: &FieldPath,
) -> Result<&'a FirestoreValue, FieldPathError> {
    fields
        .get(name)
        .ok_or_else(|| field_not_found(fields, name, path))
}

fn lookup_mut<'a>(
    fields: &'a mut Fields,
    name: &str,
    path: &FieldPath,
) -> Result<&'a mut FirestoreValue, FieldPathError> {
    if !fields.contains_key(name) {
        return Err(field_not_found(fields, name, path));
    }
    fields
        .get_mut(name)
        .ok_or_else(|| field_not_found(&Fields::new(), name, path))
}

pub(crate) fn field_not_found(fields: &Fields, name: &str, path: &FieldPath) -> FieldPathError {
    FieldPathError::FieldNotFound {
        field: name.to_string(),
        path: path.to_string(),
        available: fields.keys().cloned().collect(),
    }
}

pub(crate) fn out_of_range(index: usize, len: usize, path: &FieldPath) -> FieldPathError {
    FieldPathError::InvalidIndex {
        index: index.to_string(),
        path: path.to_string(),
        reason: format!("out of bounds for array of length {}", len),
    }
}

pub(crate) fn undefined(segment: &PathSegment, path: &FieldPath) -> FieldPathError {
    FieldPathError::UndefinedValue {
        segment: segment.to_string(),
        path: path.to_string(),
    }
}

pub(crate) fn not_an_array(
    segment: &PathSegment,
    path: &FieldPath,
    found: &'static str,
) -> FieldPathError {
    FieldPathError::NotAnArray {
        segment: segment.to_string(),
        path: path.to_string(),
        found,
    }
}

pub(crate) fn not_a_map(
    segment: &PathSegment,
    path: &FieldPath,
    found: &'static str,
) -> FieldPathError {
    FieldPathError::NotAMap {
        segment: segment.to_string(),
        path: path.to_string(),
        found,
    }
}
