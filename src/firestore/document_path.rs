//! Firestore document resource paths
//!
//! Documents are addressed as
//! `projects/{project}/databases/{database}/documents/{collection}/{document}`
//! with any number of `/{subcollection}/{subdocument}` pairs appended.

use std::fmt;
use std::str::FromStr;

use crate::error::AdminError;

/// Parsed full resource name of a document
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentPath {
    project_id: String,
    database_id: String,
    /// Alternating collection and document IDs, always an even count >= 2
    segments: Vec<String>,
}

impl DocumentPath {
    /// Parse a full resource name
    pub fn parse(name: &str) -> Result<Self, AdminError> {
        let invalid = |reason: &str| AdminError::InvalidDocumentPath(format!("{}: {}", reason, name));

        let parts: Vec<&str> = name.trim_matches('/').split('/').collect();
        let [projects, project_id, databases, database_id, documents, rest @ ..] = parts.as_slice()
        else {
            return Err(invalid("expected projects/{p}/databases/{d}/documents/..."));
        };

        // Validate fixed prefix (error cases first)
        if *projects != "projects" || *databases != "databases" || *documents != "documents" {
            return Err(invalid("expected projects/{p}/databases/{d}/documents/..."));
        }
        if project_id.is_empty() || database_id.is_empty() {
            return Err(invalid("empty project or database ID"));
        }

        Self::from_parts(*project_id, *database_id, rest.iter().map(|s| s.to_string()).collect())
            .map_err(|_| invalid("expected alternating collection/document segments"))
    }

    /// Build a path of a top-level document
    pub fn new(
        project_id: impl Into<String>,
        database_id: impl Into<String>,
        collection_id: impl Into<String>,
        document_id: impl Into<String>,
    ) -> Result<Self, AdminError> {
        Self::from_parts(
            project_id,
            database_id,
            vec![collection_id.into(), document_id.into()],
        )
    }

    /// Build a path from a relative `collection/doc[/sub/doc]*` path
    pub fn from_relative(
        project_id: impl Into<String>,
        database_id: impl Into<String>,
        relative: &str,
    ) -> Result<Self, AdminError> {
        let segments = relative
            .trim_matches('/')
            .split('/')
            .map(str::to_string)
            .collect();
        Self::from_parts(project_id, database_id, segments)
    }

    fn from_parts(
        project_id: impl Into<String>,
        database_id: impl Into<String>,
        segments: Vec<String>,
    ) -> Result<Self, AdminError> {
        if segments.len() < 2 || segments.len() % 2 != 0 || segments.iter().any(|s| s.is_empty()) {
            return Err(AdminError::InvalidDocumentPath(segments.join("/")));
        }
        Ok(Self {
            project_id: project_id.into(),
            database_id: database_id.into(),
            segments,
        })
    }

    /// Project ID
    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    /// Database ID (e.g. `(default)`)
    pub fn database_id(&self) -> &str {
        &self.database_id
    }

    /// Get the document ID (last segment of path)
    pub fn id(&self) -> &str {
        self.segments.last().map_or("", String::as_str)
    }

    /// ID of the collection that directly contains the document
    pub fn collection_id(&self) -> &str {
        &self.segments[self.segments.len() - 2]
    }

    /// Collection path relative to the database root (`users/alice/posts`)
    pub fn collection_path(&self) -> String {
        self.segments[..self.segments.len() - 1].join("/")
    }

    /// Document path relative to the database root (`users/alice/posts/p1`)
    pub fn relative_path(&self) -> String {
        self.segments.join("/")
    }

    /// `projects/{p}/databases/{d}`
    pub fn database_path(&self) -> String {
        format!("projects/{}/databases/{}", self.project_id, self.database_id)
    }

    /// Full resource name
    pub fn full_path(&self) -> String {
        format!("{}/documents/{}", self.database_path(), self.relative_path())
    }

    /// Number of collection/document levels (1 for top-level documents)
    pub fn depth(&self) -> usize {
        self.segments.len() / 2
    }

    /// Whether this document lives in a subcollection
    pub fn is_nested(&self) -> bool {
        self.depth() > 1
    }

    /// Document that owns this document's collection, if nested
    pub fn parent_document(&self) -> Option<DocumentPath> {
        if !self.is_nested() {
            return None;
        }
        Some(Self {
            project_id: self.project_id.clone(),
            database_id: self.database_id.clone(),
            segments: self.segments[..self.segments.len() - 2].to_vec(),
        })
    }

    /// Document inside a subcollection of this document
    pub fn child(
        &self,
        collection_id: impl Into<String>,
        document_id: impl Into<String>,
    ) -> Result<DocumentPath, AdminError> {
        let mut segments = self.segments.clone();
        segments.push(collection_id.into());
        segments.push(document_id.into());
        Self::from_parts(self.project_id.clone(), self.database_id.clone(), segments)
    }
}

impl fmt::Display for DocumentPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full_path())
    }
}

impl FromStr for DocumentPath {
    type Err = AdminError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NAME: &str = "projects/demo/databases/(default)/documents/users/alice";

    #[test]
    fn test_parse_top_level() {
        let path = DocumentPath::parse(NAME).unwrap();
        assert_eq!(path.project_id(), "demo");
        assert_eq!(path.database_id(), "(default)");
        assert_eq!(path.collection_id(), "users");
        assert_eq!(path.id(), "alice");
        assert_eq!(path.collection_path(), "users");
        assert!(!path.is_nested());
        assert!(path.parent_document().is_none());
        assert_eq!(path.to_string(), NAME);
    }

    #[test]
    fn test_parse_subcollection() {
        let path = DocumentPath::parse(&format!("{}/posts/p1", NAME)).unwrap();
        assert_eq!(path.collection_id(), "posts");
        assert_eq!(path.collection_path(), "users/alice/posts");
        assert_eq!(path.relative_path(), "users/alice/posts/p1");
        assert_eq!(path.depth(), 2);
        assert_eq!(path.parent_document().unwrap().to_string(), NAME);
    }

    #[test]
    fn test_child() {
        let path = DocumentPath::parse(NAME).unwrap();
        let child = path.child("posts", "p1").unwrap();
        assert_eq!(child.full_path(), format!("{}/posts/p1", NAME));
    }

    #[test]
    fn test_from_relative() {
        let path = DocumentPath::from_relative("demo", "(default)", "/users/alice/").unwrap();
        assert_eq!(path.to_string(), NAME);
        assert!(DocumentPath::from_relative("demo", "(default)", "users").is_err());
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for bad in [
            "",
            "projects/demo",
            "projects/demo/databases/(default)/documents",
            "projects/demo/databases/(default)/documents/users",
            "projects/demo/databases/(default)/documents/users//x",
            "project/demo/databases/(default)/documents/users/alice",
        ] {
            assert!(DocumentPath::parse(bad).is_err(), "{} should be rejected", bad);
        }
    }
}
