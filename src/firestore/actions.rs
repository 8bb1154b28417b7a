//! Field editing actions
//!
//! [`FieldActions`] ties the path, mutation and codec layers to a
//! [`DocumentStore`]. Each action copies the selected document's fields,
//! mutates the copy, writes the full mapping back with one
//! `update_document` call, then reloads the collection and reselects the
//! document. The selected document is only replaced once the round-trip
//! has succeeded.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{error, info};

use crate::error::AdminError;

use super::codec::{to_wire, FieldType};
use super::document_path::DocumentPath;
use super::field_path::{FieldPath, PathSegment};
use super::field_value::{Document, Fields, FirestoreValue};
use super::mutator::{delete_field, rename_field, set_field};
use super::navigator::{navigate, Node};
use super::store::DocumentStore;

/// Whether a form adds a new field or edits an existing one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EditMode {
    /// Add a field under `parent_path` (or at the root)
    Add,
    /// Replace the field at `field_path`
    Edit,
}

/// Input of the add/edit field form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldForm {
    /// Field name; ignored when the target is an array element
    pub field_name: String,
    /// Type the raw value is encoded as
    pub field_type: FieldType,
    /// Raw value as typed in the form
    pub field_value: Value,
    /// Path of the edited field (edit mode)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_path: Option<String>,
    /// Path of the container a new field is added to (add mode)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_path: Option<String>,
}

impl FieldForm {
    /// Form for a top-level field
    pub fn new(field_name: impl Into<String>, field_type: FieldType, field_value: Value) -> Self {
        Self {
            field_name: field_name.into(),
            field_type,
            field_value,
            field_path: None,
            parent_path: None,
        }
    }

    /// Set the edited field's path
    pub fn at_path(mut self, path: impl Into<String>) -> Self {
        self.field_path = Some(path.into());
        self
    }

    /// Set the container a new field is added to
    pub fn under(mut self, parent: impl Into<String>) -> Self {
        self.parent_path = Some(parent.into());
        self
    }
}

/// Field editing actions over a document store
pub struct FieldActions<S> {
    store: S,
    selected: RwLock<Option<Document>>,
}

impl<S: DocumentStore> FieldActions<S> {
    /// Create actions over `store` with no document selected
    pub fn new(store: S) -> Self {
        Self {
            store,
            selected: RwLock::new(None),
        }
    }

    /// The backing store
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Select the document subsequent actions edit
    pub async fn select(&self, document: Option<Document>) {
        *self.selected.write().await = document;
    }

    /// Currently selected document
    pub async fn selected(&self) -> Option<Document> {
        self.selected.read().await.clone()
    }

    /// Add or edit a field of the selected document
    ///
    /// Returns the full field mapping that was written.
    pub async fn save_field(&self, form: &FieldForm, mode: EditMode) -> Result<Fields, AdminError> {
        let result = self.try_save_field(form, mode).await;
        if let Err(e) = &result {
            error!(field = %form.field_name, ?mode, error = %e, "Failed to save field");
        }
        result
    }

    /// Delete a field or array element of the selected document
    ///
    /// Returns the full field mapping that was written.
    pub async fn delete_field(&self, path: &str) -> Result<Fields, AdminError> {
        let result = self.try_delete_field(path).await;
        if let Err(e) = &result {
            error!(path, error = %e, "Failed to delete field");
        }
        result
    }

    async fn try_save_field(&self, form: &FieldForm, mode: EditMode) -> Result<Fields, AdminError> {
        let document = self.require_selected().await?;
        let mut fields = document.fields.clone();
        let value = to_wire(form.field_type, &form.field_value);

        match mode {
            EditMode::Add => add_field(&mut fields, form, value)?,
            EditMode::Edit => edit_field(&mut fields, form, value)?,
        }

        self.write_back(&document, fields).await
    }

    async fn try_delete_field(&self, path: &str) -> Result<Fields, AdminError> {
        let document = self.require_selected().await?;
        let path = FieldPath::parse(path)?;
        let mut fields = document.fields.clone();

        delete_field(&mut fields, &path)?;
        self.write_back(&document, fields).await
    }

    async fn require_selected(&self) -> Result<Document, AdminError> {
        self.selected().await.ok_or(AdminError::NoDocumentSelected)
    }

    async fn write_back(&self, document: &Document, fields: Fields) -> Result<Fields, AdminError> {
        let path = DocumentPath::parse(&document.name)?;
        if path.database_id() != self.store.database_id() {
            return Err(AdminError::InvalidDocumentPath(format!(
                "{} belongs to database '{}', not '{}'",
                document.name,
                path.database_id(),
                self.store.database_id()
            )));
        }
        let collection = path.collection_path();

        self.store
            .update_document(path.project_id(), &collection, path.id(), &fields)
            .await?;
        info!(document = %document.name, field_count = fields.len(), "Updated document fields");

        self.store.load_documents(path.project_id(), &collection).await?;
        let reloaded = self
            .store
            .documents()
            .await
            .into_iter()
            .find(|doc| doc.name == document.name)
            .unwrap_or_else(|| Document {
                fields: fields.clone(),
                ..document.clone()
            });
        self.select(Some(reloaded)).await;

        Ok(fields)
    }
}

fn add_field(fields: &mut Fields, form: &FieldForm, value: FirestoreValue) -> Result<(), AdminError> {
    let parent = match form.parent_path.as_deref().map(str::trim) {
        Some(text) if !text.is_empty() => FieldPath::parse(text)?,
        _ => FieldPath::from_segments(Vec::new()),
    };

    let parent_node = navigate(Node::Fields(&*fields), &parent)?;
    if matches!(parent_node.value(), Some(FirestoreValue::ArrayValue(_))) {
        set_field(fields, &parent.append(), value)?;
        return Ok(());
    }

    let name = required_name(form)?;
    let target = parent.child(name);
    if navigate(Node::Fields(&*fields), &target).is_ok() {
        return Err(AdminError::InvalidForm(format!(
            "Field '{}' already exists",
            target
        )));
    }
    set_field(fields, &target, value)?;
    Ok(())
}

fn edit_field(fields: &mut Fields, form: &FieldForm, value: FirestoreValue) -> Result<(), AdminError> {
    let path = match form.field_path.as_deref().map(str::trim) {
        Some(text) if !text.is_empty() => FieldPath::parse(text)?,
        _ => FieldPath::field(required_name(form)?),
    };

    // Array elements have no name to change
    let Some(PathSegment::Field(current)) = path.last() else {
        set_field(fields, &path, value)?;
        return Ok(());
    };

    let name = required_name(form)?;
    let renamed = name != current.as_str();
    if renamed {
        if let Some(target) = path.parent().map(|parent| parent.child(name)) {
            if navigate(Node::Fields(&*fields), &target).is_ok() {
                return Err(AdminError::InvalidForm(format!(
                    "Field '{}' already exists",
                    target
                )));
            }
        }
    }

    set_field(fields, &path, value)?;
    if renamed {
        rename_field(fields, &path, name)?;
    }
    Ok(())
}

fn required_name(form: &FieldForm) -> Result<&str, AdminError> {
    let name = form.field_name.trim();
    if name.is_empty() {
        return Err(AdminError::InvalidForm("Field name is required".to_string()));
    }
    Ok(name)
}
