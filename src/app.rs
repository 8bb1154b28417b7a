//! Application context
//!
//! [`App`] is created once by the application shell and handed to whatever
//! needs emulator access. It owns the settings, the connection tracker and
//! the Firestore client; nothing here lives in a global.

use std::sync::Arc;

use crate::connection::ServiceConnections;
use crate::error::AdminError;
use crate::firestore::{FieldActions, FirestoreClient, FirestoreStore};
use crate::settings::EmulatorSettings;

/// Application context
///
/// Cheap to clone; clones share the connection tracker and HTTP pools.
///
/// # Example
/// ```no_run
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// use gcp_emulator_admin::{App, EmulatorSettings, Service};
///
/// let app = App::new(EmulatorSettings::from_env())?;
/// app.connections().start_monitoring();
///
/// if app.connections().is_connected(Service::Firestore).await {
///     let collections = app.firestore().list_collection_ids(app.project_id(), None).await?;
///     println!("Collections: {:?}", collections);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct App {
    inner: Arc<AppInner>,
}

struct AppInner {
    settings: EmulatorSettings,
    connections: ServiceConnections,
    firestore: FirestoreClient,
}

impl App {
    /// Create a context for the emulators in `settings`
    pub fn new(settings: EmulatorSettings) -> Result<Self, AdminError> {
        // Validate settings (error case first)
        if settings.project_id.trim().is_empty() {
            return Err(AdminError::Internal(
                "Project ID cannot be empty".to_string(),
            ));
        }

        let connections = ServiceConnections::new(settings.clone())?;
        let firestore = FirestoreClient::new(&settings)?;

        Ok(Self {
            inner: Arc::new(AppInner {
                settings,
                connections,
                firestore,
            }),
        })
    }

    /// Create a context from the standard emulator environment variables
    pub fn from_env() -> Result<Self, AdminError> {
        Self::new(EmulatorSettings::from_env())
    }

    /// Settings in use
    pub fn settings(&self) -> &EmulatorSettings {
        &self.inner.settings
    }

    /// Project ID in use
    pub fn project_id(&self) -> &str {
        &self.inner.settings.project_id
    }

    /// Emulator connection tracker
    pub fn connections(&self) -> &ServiceConnections {
        &self.inner.connections
    }

    /// Firestore client for the configured database
    pub fn firestore(&self) -> &FirestoreClient {
        &self.inner.firestore
    }

    /// Document store over another Firestore database
    pub fn firestore_store(&self, database_id: &str) -> FirestoreStore {
        FirestoreStore::new(self.inner.firestore.with_database(database_id))
    }

    /// Field actions over a Firestore database
    pub fn field_actions(&self, database_id: &str) -> FieldActions<FirestoreStore> {
        FieldActions::new(self.firestore_store(database_id))
    }
}
