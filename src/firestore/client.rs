//! REST client for the Firestore emulator
//!
//! Talks to the emulator's REST surface:
//! `{base}/v1/projects/{p}/databases/{d}/documents/...`. Every request
//! carries `Authorization: Bearer owner`, which the emulator treats as an
//! admin credential that bypasses security rules.

use std::sync::Arc;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{AdminError, ApiError};
use crate::settings::{EmulatorSettings, Service};

use super::field_value::{Document, Fields};

/// Page size for list calls
const PAGE_SIZE: &str = "300";

/// Firestore emulator client
///
/// Cheap to clone; clones share one HTTP connection pool.
#[derive(Clone)]
pub struct FirestoreClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    base_url: Url,
    database_id: String,
    http_client: reqwest::Client,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListDocumentsResponse {
    #[serde(default)]
    documents: Vec<Document>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListCollectionIdsResponse {
    #[serde(default)]
    collection_ids: Vec<String>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ListCollectionIdsRequest<'a> {
    page_size: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    page_token: Option<&'a str>,
}

#[derive(Serialize)]
struct DocumentBody<'a> {
    fields: &'a Fields,
}

impl FirestoreClient {
    /// Create a client for the Firestore emulator in `settings`
    pub fn new(settings: &EmulatorSettings) -> Result<Self, AdminError> {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer owner"));

        let http_client = reqwest::Client::builder()
            .timeout(settings.request_timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| AdminError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        let base_url = settings.base_url(Service::Firestore);
        let base_url = Url::parse(&base_url).map_err(|e| {
            AdminError::Internal(format!("Invalid Firestore emulator URL '{}': {}", base_url, e))
        })?;

        Ok(Self {
            inner: Arc::new(ClientInner {
                base_url,
                database_id: settings.database_id.clone(),
                http_client,
            }),
        })
    }

    /// Same emulator, different database; shares the connection pool
    pub fn with_database(&self, database_id: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                base_url: self.inner.base_url.clone(),
                database_id: database_id.into(),
                http_client: self.inner.http_client.clone(),
            }),
        }
    }

    /// Database this client addresses
    pub fn database_id(&self) -> &str {
        &self.inner.database_id
    }

    /// Emulator base URL
    pub fn base_url(&self) -> &str {
        self.inner.base_url.as_str()
    }

    /// `projects/{p}/databases/{d}`
    pub fn database_path(&self, project_id: &str) -> String {
        format!("projects/{}/databases/{}", project_id, self.inner.database_id)
    }

    /// URL of the documents root of a project
    pub fn documents_url(&self, project_id: &str) -> Result<Url, AdminError> {
        self.url(self.documents_segments(project_id))
    }

    /// URL of a collection, given its path relative to the database root
    pub fn collection_url(&self, project_id: &str, collection_path: &str) -> Result<Url, AdminError> {
        let mut segments = self.documents_segments(project_id);
        segments.extend(split_path(collection_path));
        self.url(segments)
    }

    /// URL of a document, given its collection path and ID
    pub fn document_url(
        &self,
        project_id: &str,
        collection_path: &str,
        document_id: &str,
    ) -> Result<Url, AdminError> {
        let mut segments = self.documents_segments(project_id);
        segments.extend(split_path(collection_path));
        segments.push(document_id);
        self.url(segments)
    }

    /// URL of a resource given its full name
    pub fn resource_url(&self, name: &str) -> Result<Url, AdminError> {
        let mut segments = vec!["v1"];
        segments.extend(split_path(name));
        self.url(segments)
    }

    fn documents_segments<'a>(&'a self, project_id: &'a str) -> Vec<&'a str> {
        vec![
            "v1",
            "projects",
            project_id,
            "databases",
            self.inner.database_id.as_str(),
            "documents",
        ]
    }

    /// Base URL with each segment appended percent-encoded
    fn url<'a>(&self, segments: impl IntoIterator<Item = &'a str>) -> Result<Url, AdminError> {
        let mut url = self.inner.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                AdminError::Internal(format!("Emulator URL '{}' cannot carry a path", self.inner.base_url))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// List every document of a collection, following page tokens
    pub async fn list_documents(
        &self,
        project_id: &str,
        collection_path: &str,
    ) -> Result<Vec<Document>, AdminError> {
        let url = self.collection_url(project_id, collection_path)?;
        let mut documents = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self
                .inner
                .http_client
                .get(url.clone())
                .query(&[("pageSize", PAGE_SIZE)]);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token.as_str())]);
            }

            debug!(url = %url, "Listing documents");
            let response = check_response(request.send().await?).await?;
            let page: ListDocumentsResponse = response.json().await?;
            documents.extend(page.documents);

            page_token = match page.next_page_token {
                Some(token) if !token.is_empty() => Some(token),
                _ => break,
            };
        }

        Ok(documents)
    }

    /// Fetch one document by full resource name
    pub async fn get_document(&self, name: &str) -> Result<Document, AdminError> {
        let url = self.resource_url(name)?;
        debug!(url = %url, "Getting document");
        let response = check_response(self.inner.http_client.get(url.clone()).send().await?).await?;
        Ok(response.json().await?)
    }

    /// Create a document; the emulator assigns an ID when none is given
    pub async fn create_document(
        &self,
        project_id: &str,
        collection_path: &str,
        fields: &Fields,
        document_id: Option<&str>,
    ) -> Result<Document, AdminError> {
        let url = self.collection_url(project_id, collection_path)?;
        let mut request = self
            .inner
            .http_client
            .post(url.clone())
            .json(&DocumentBody { fields });
        if let Some(id) = document_id.filter(|id| !id.is_empty()) {
            request = request.query(&[("documentId", id)]);
        }

        debug!(url = %url, document_id = ?document_id, "Creating document");
        let response = check_response(request.send().await?).await?;
        Ok(response.json().await?)
    }

    /// Replace all fields of a document (no update mask)
    pub async fn update_document(
        &self,
        project_id: &str,
        collection_path: &str,
        document_id: &str,
        fields: &Fields,
    ) -> Result<Document, AdminError> {
        let url = self.document_url(project_id, collection_path, document_id)?;

        debug!(url = %url, field_count = fields.len(), "Updating document");
        let response = check_response(
            self.inner
                .http_client
                .patch(url.clone())
                .json(&DocumentBody { fields })
                .send()
                .await?,
        )
        .await?;
        Ok(response.json().await?)
    }

    /// Delete a document by full resource name
    pub async fn delete_document(&self, name: &str) -> Result<(), AdminError> {
        let url = self.resource_url(name)?;
        debug!(url = %url, "Deleting document");
        check_response(self.inner.http_client.delete(url.clone()).send().await?).await?;
        Ok(())
    }

    /// List collection IDs at the root, or under a document
    ///
    /// `parent_document` is relative to the database root
    /// (`users/alice`).
    pub async fn list_collection_ids(
        &self,
        project_id: &str,
        parent_document: Option<&str>,
    ) -> Result<Vec<String>, AdminError> {
        let mut segments = self.documents_segments(project_id);
        segments.extend(parent_document.into_iter().flat_map(split_path));
        let last = format!("{}:listCollectionIds", segments.pop().unwrap_or_default());
        segments.push(&last);
        let url = self.url(segments)?;

        let mut ids = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let body = ListCollectionIdsRequest {
                page_size: 300,
                page_token: page_token.as_deref(),
            };
            debug!(url = %url, "Listing collection IDs");
            let response =
                check_response(self.inner.http_client.post(url.clone()).json(&body).send().await?).await?;
            let page: ListCollectionIdsResponse = response.json().await?;
            ids.extend(page.collection_ids);

            page_token = match page.next_page_token {
                Some(token) if !token.is_empty() => Some(token),
                _ => break,
            };
        }

        ids.sort();
        Ok(ids)
    }

    /// Delete every document of the database (emulator-only endpoint)
    pub async fn clear_database(&self, project_id: &str) -> Result<(), AdminError> {
        let mut segments = self.documents_segments(project_id);
        segments.insert(0, "emulator");
        let url = self.url(segments)?;
        debug!(url = %url, "Clearing emulator database");
        check_response(self.inner.http_client.delete(url.clone()).send().await?).await?;
        Ok(())
    }
}

/// Non-empty `/`-separated segments of a resource path
fn split_path(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|segment| !segment.is_empty())
}

/// Turn a non-success response into a classified [`ApiError`]
pub(crate) async fn check_response(
    response: reqwest::Response,
) -> Result<reqwest::Response, AdminError> {
    // Handle error responses first
    if !response.status().is_success() {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        return Err(ApiError::from_response(status, &body).into());
    }
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> FirestoreClient {
        FirestoreClient::new(&EmulatorSettings::default()).unwrap()
    }

    #[test]
    fn test_documents_url() {
        assert_eq!(
            client().documents_url("demo").unwrap().as_str(),
            "http://localhost:8080/v1/projects/demo/databases/(default)/documents"
        );
    }

    #[test]
    fn test_collection_url_trims_slashes() {
        assert_eq!(
            client().collection_url("demo", "/users/alice/posts/").unwrap().as_str(),
            "http://localhost:8080/v1/projects/demo/databases/(default)/documents/users/alice/posts"
        );
    }

    #[test]
    fn test_with_database() {
        let other = client().with_database("staging");
        assert_eq!(other.database_id(), "staging");
        assert_eq!(other.database_path("demo"), "projects/demo/databases/staging");
    }

    #[test]
    fn test_resource_url() {
        assert_eq!(
            client()
                .resource_url("projects/demo/databases/(default)/documents/a/b")
                .unwrap()
                .as_str(),
            "http://localhost:8080/v1/projects/demo/databases/(default)/documents/a/b"
        );
    }

    #[test]
    fn test_document_url_encodes_reserved_characters() {
        let url = client().document_url("demo", "users", "a#b?c d%").unwrap();
        assert_eq!(
            url.path(),
            "/v1/projects/demo/databases/(default)/documents/users/a%23b%3Fc%20d%25"
        );
        assert_eq!(url.fragment(), None);
        assert_eq!(url.query(), None);

        let url = client()
            .resource_url("projects/demo/databases/(default)/documents/users/a#b?c")
            .unwrap();
        assert!(url.path().ends_with("/users/a%23b%3Fc"));
        assert_eq!(url.fragment(), None);
    }

    #[tokio::test]
    async fn test_unreachable_emulator_is_network_error() {
        let mut settings = EmulatorSettings::default();
        settings.firestore_host = "127.0.0.1:1".to_string();
        let client = FirestoreClient::new(&settings).unwrap();

        let err = client.list_documents("demo", "users").await.unwrap_err();
        assert!(matches!(err, AdminError::Network(_)));
        assert!(err.is_connection_failure());
    }
}
