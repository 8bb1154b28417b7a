//! Field path parsing
//!
//! A field path addresses a location inside a document's field tree using
//! dots for map keys and brackets for array indices:
//! `tags[0].name` → `[Field("tags"), Index(0), Field("name")]`.
//!
//! The trailing segment `-` is the append marker: `tags.-` addresses a new
//! element at the end of the `tags` array.

use std::fmt;
use std::str::FromStr;

use crate::error::FieldPathError;

/// Segment name that addresses "one past the end" of an array
pub const APPEND_MARKER: &str = "-";

/// One step in a field path
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    /// Map key
    Field(String),
    /// Array index
    Index(usize),
}

impl PathSegment {
    /// Whether this is the append marker
    pub fn is_append_marker(&self) -> bool {
        matches!(self, Self::Field(name) if name == APPEND_MARKER)
    }
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Field(name) => write!(f, "{}", name),
            Self::Index(index) => write!(f, "[{}]", index),
        }
    }
}

/// Parsed field path together with its original text
///
/// The original text is kept so every navigation error can quote it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldPath {
    raw: String,
    segments: Vec<PathSegment>,
}

impl FieldPath {
    /// Parse a dotted/bracketed path
    ///
    /// # Example
    /// ```
    /// use gcp_emulator_admin::firestore::{FieldPath, PathSegment};
    ///
    /// let path = FieldPath::parse("tags[0].name").unwrap();
    /// assert_eq!(path.segments(), &[
    ///     PathSegment::Field("tags".to_string()),
    ///     PathSegment::Index(0),
    ///     PathSegment::Field("name".to_string()),
    /// ]);
    /// ```
    pub fn parse(path: &str) -> Result<Self, FieldPathError> {
        Ok(Self {
            raw: path.to_string(),
            segments: parse_field_path(path)?,
        })
    }

    /// Build a path from segments; the text is rendered canonically
    pub fn from_segments(segments: Vec<PathSegment>) -> Self {
        Self {
            raw: render(&segments),
            segments,
        }
    }

    /// Path of a single top-level field
    pub fn field(name: impl Into<String>) -> Self {
        Self::from_segments(vec![PathSegment::Field(name.into())])
    }

    /// Original path text
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Parsed segments
    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// Whether the path has no segments
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Number of segments
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Final segment
    pub fn last(&self) -> Option<&PathSegment> {
        self.segments.last()
    }

    /// Path without its final segment (`None` for the empty path)
    pub fn parent(&self) -> Option<FieldPath> {
        let (_, init) = self.segments.split_last()?;
        Some(Self::from_segments(init.to_vec()))
    }

    /// Path extended by a map key
    pub fn child(&self, name: impl Into<String>) -> FieldPath {
        self.extended(PathSegment::Field(name.into()))
    }

    /// Path extended by an array index
    pub fn index(&self, index: usize) -> FieldPath {
        self.extended(PathSegment::Index(index))
    }

    /// Path extended by the append marker
    pub fn append(&self) -> FieldPath {
        self.child(APPEND_MARKER)
    }

    /// Whether the path ends with the append marker
    pub fn is_append(&self) -> bool {
        self.last().is_some_and(PathSegment::is_append_marker)
    }

    fn extended(&self, segment: PathSegment) -> FieldPath {
        let mut segments = self.segments.clone();
        segments.push(segment);
        Self::from_segments(segments)
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

impl FromStr for FieldPath {
    type Err = FieldPathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Tokenize a field path into segments
///
/// Empty names (leading, trailing or doubled separators) are skipped.
/// Fails with `MalformedPath` on a `[` without `]` and with `InvalidIndex`
/// when the bracket content is not a non-negative integer.
pub fn parse_field_path(path: &str) -> Result<Vec<PathSegment>, FieldPathError> {
    let mut segments = Vec::new();
    let mut rest = path;

    loop {
        let dot = rest.find('.');
        let bracket = rest.find('[');

        match (dot, bracket) {
            (Some(d), bracket) if bracket.map_or(true, |open| d < open) => {
                push_field(&mut segments, &rest[..d]);
                rest = &rest[d + 1..];
            }
            (_, Some(open)) => {
                push_field(&mut segments, &rest[..open]);

                let after_open = &rest[open + 1..];
                let Some(close) = after_open.find(']') else {
                    return Err(FieldPathError::MalformedPath {
                        path: path.to_string(),
                    });
                };

                let index_text = &after_open[..close];
                let index = index_text.trim().parse::<usize>().map_err(|_| {
                    FieldPathError::InvalidIndex {
                        index: index_text.to_string(),
                        path: path.to_string(),
                        reason: "Invalid array index".to_string(),
                    }
                })?;
                segments.push(PathSegment::Index(index));
                rest = &after_open[close + 1..];
            }
            _ => {
                push_field(&mut segments, rest);
                break;
            }
        }
    }

    Ok(segments)
}

fn push_field(segments: &mut Vec<PathSegment>, name: &str) {
    if !name.is_empty() {
        segments.push(PathSegment::Field(name.to_string()));
    }
}

fn render(segments: &[PathSegment]) -> String {
    let mut out = String::new();
    for segment in segments {
        match segment {
            PathSegment::Field(name) => {
                if !out.is_empty() {
                    out.push('.');
                }
                out.push_str(name);
            }
            PathSegment::Index(index) => {
                out.push_str(&format!("[{}]", index));
            }
        }
    }
    out
}
