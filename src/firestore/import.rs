//! Bulk import and export of collection documents
//!
//! Records use the REST field mapping, so an export can be written to a
//! JSON file and imported into another project or database unchanged.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::AdminError;

use super::field_value::{Document, Fields};
use super::store::DocumentStore;

/// What to do when an imported document already exists
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ImportMode {
    /// Replace the existing document's fields
    #[default]
    Overwrite,
    /// Leave the existing document untouched and count it as skipped
    SkipExisting,
}

/// One document in an import file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImportRecord {
    /// Document ID; generated on import when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Document fields
    #[serde(default)]
    pub fields: Fields,
}

/// Outcome of an import
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportReport {
    /// Newly created documents
    pub created: usize,
    /// Existing documents whose fields were replaced
    pub overwritten: usize,
    /// Existing documents left untouched
    pub skipped: usize,
    /// Records that failed, as (document ID or position, error message)
    pub failed: Vec<(String, String)>,
}

impl ImportReport {
    /// Number of records written or deliberately left alone
    pub fn succeeded(&self) -> usize {
        self.created + self.overwritten + self.skipped
    }

    /// Whether every record went through
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Import records into a collection
///
/// Records are written one at a time. A record that fails is reported in
/// [`ImportReport::failed`] and does not stop the import. The collection is
/// reloaded once at the end.
pub async fn import_documents<S: DocumentStore>(
    store: &S,
    project_id: &str,
    collection_id: &str,
    records: &[ImportRecord],
    mode: ImportMode,
) -> Result<ImportReport, AdminError> {
    let mut report = ImportReport::default();

    for (position, record) in records.iter().enumerate() {
        let label = record
            .id
            .clone()
            .unwrap_or_else(|| format!("#{}", position + 1));

        let created = store
            .create_document(project_id, collection_id, &record.fields, record.id.as_deref())
            .await;

        match created {
            Ok(_) => report.created += 1,
            Err(e) if e.is_already_exists() => match (mode, record.id.as_deref()) {
                (ImportMode::SkipExisting, _) => report.skipped += 1,
                (ImportMode::Overwrite, Some(id)) => {
                    match store
                        .update_document(project_id, collection_id, id, &record.fields)
                        .await
                    {
                        Ok(()) => report.overwritten += 1,
                        Err(e) => report.failed.push((label, e.user_message())),
                    }
                }
                (ImportMode::Overwrite, None) => report.failed.push((label, e.user_message())),
            },
            Err(e) => {
                warn!(document = %label, error = %e, "Failed to import document");
                report.failed.push((label, e.user_message()));
            }
        }
    }

    info!(
        collection = collection_id,
        created = report.created,
        overwritten = report.overwritten,
        skipped = report.skipped,
        failed = report.failed.len(),
        "Import finished"
    );

    store.load_documents(project_id, collection_id).await?;
    Ok(report)
}

/// Convert loaded documents into import records
pub fn export_documents(documents: &[Document]) -> Vec<ImportRecord> {
    documents
        .iter()
        .map(|doc| ImportRecord {
            id: Some(doc.id().to_string()),
            fields: doc.fields.clone(),
        })
        .collect()
}
