//! Document store
//!
//! [`DocumentStore`] is the seam between field actions and the emulator:
//! it writes whole documents and keeps the list of documents last loaded
//! for a collection. [`FirestoreStore`] backs it with [`FirestoreClient`].

use std::future::Future;

use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::error::AdminError;
use crate::settings::EmulatorSettings;

use super::client::FirestoreClient;
use super::field_value::{Document, Fields};

/// Operations the field actions need from a document backend
///
/// `collection_id` is the collection path relative to the database root,
/// so documents in subcollections use `users/alice/posts`.
pub trait DocumentStore: Send + Sync {
    /// Database the store reads and writes
    fn database_id(&self) -> &str {
        EmulatorSettings::DEFAULT_DATABASE
    }

    /// Replace all fields of a document
    fn update_document(
        &self,
        project_id: &str,
        collection_id: &str,
        document_id: &str,
        fields: &Fields,
    ) -> impl Future<Output = Result<(), AdminError>> + Send;

    /// Reload the documents of a collection into [`documents`](Self::documents)
    fn load_documents(
        &self,
        project_id: &str,
        collection_id: &str,
    ) -> impl Future<Output = Result<(), AdminError>> + Send;

    /// Documents from the last load
    fn documents(&self) -> impl Future<Output = Vec<Document>> + Send;

    /// Delete a document by full resource name
    fn delete_document(
        &self,
        path: &str,
        collection_id: &str,
    ) -> impl Future<Output = Result<(), AdminError>> + Send;

    /// Create a document, with a generated ID when `document_id` is `None`
    fn create_document(
        &self,
        project_id: &str,
        collection_id: &str,
        fields: &Fields,
        document_id: Option<&str>,
    ) -> impl Future<Output = Result<Document, AdminError>> + Send;
}

/// [`DocumentStore`] backed by the Firestore emulator
pub struct FirestoreStore {
    client: FirestoreClient,
    documents: RwLock<Vec<Document>>,
    collection: RwLock<Option<String>>,
}

impl FirestoreStore {
    /// Create a store over a client
    pub fn new(client: FirestoreClient) -> Self {
        Self {
            client,
            documents: RwLock::new(Vec::new()),
            collection: RwLock::new(None),
        }
    }

    /// Underlying client
    pub fn client(&self) -> &FirestoreClient {
        &self.client
    }

    /// Collection of the last load
    pub async fn current_collection(&self) -> Option<String> {
        self.collection.read().await.clone()
    }

    /// Find a loaded document by full resource name
    pub async fn find(&self, name: &str) -> Option<Document> {
        self.documents
            .read()
            .await
            .iter()
            .find(|doc| doc.name == name)
            .cloned()
    }
}

impl DocumentStore for FirestoreStore {
    fn database_id(&self) -> &str {
        self.client.database_id()
    }

    async fn update_document(
        &self,
        project_id: &str,
        collection_id: &str,
        document_id: &str,
        fields: &Fields,
    ) -> Result<(), AdminError> {
        self.client
            .update_document(project_id, collection_id, document_id, fields)
            .await?;
        Ok(())
    }

    async fn load_documents(&self, project_id: &str, collection_id: &str) -> Result<(), AdminError> {
        let loaded = self.client.list_documents(project_id, collection_id).await?;
        debug!(collection = collection_id, count = loaded.len(), "Loaded documents");

        *self.documents.write().await = loaded;
        *self.collection.write().await = Some(collection_id.to_string());
        Ok(())
    }

    async fn documents(&self) -> Vec<Document> {
        self.documents.read().await.clone()
    }

    async fn delete_document(&self, path: &str, collection_id: &str) -> Result<(), AdminError> {
        self.client.delete_document(path).await?;
        info!(document = path, collection = collection_id, "Deleted document");

        if self.current_collection().await.as_deref() == Some(collection_id) {
            self.documents.write().await.retain(|doc| doc.name != path);
        }
        Ok(())
    }

    async fn create_document(
        &self,
        project_id: &str,
        collection_id: &str,
        fields: &Fields,
        document_id: Option<&str>,
    ) -> Result<Document, AdminError> {
        let auto_id;
        let document_id = match document_id.filter(|id| !id.is_empty()) {
            Some(id) => id,
            None => {
                auto_id = generate_document_id();
                auto_id.as_str()
            }
        };

        let created = self
            .client
            .create_document(project_id, collection_id, fields, Some(document_id))
            .await?;
        info!(document = %created.name, "Created document");

        if self.current_collection().await.as_deref() == Some(collection_id) {
            self.documents.write().await.push(created.clone());
        }
        Ok(created)
    }
}

/// Random 20-character alphanumeric ID, the shape Firestore SDKs generate
pub fn generate_document_id() -> String {
    use rand::Rng;
    rand::thread_rng()
        .sample_iter(&rand::distributions::Alphanumeric)
        .take(20)
        .map(char::from)
        .collect()
}
