//! Client-side key/value storage
//!
//! Small pieces of UI state (known databases, metrics) persist as string
//! values under fixed keys. [`MemoryStore`] keeps them for the process
//! lifetime; [`FileStore`] writes them to a JSON file. Access is
//! synchronous and guarded by a lock; one process is assumed per file.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, warn};

use crate::error::AdminError;
use crate::settings::EmulatorSettings;

/// String key/value storage
pub trait KeyValueStore: Send + Sync {
    /// Value stored under `key`
    fn get(&self, key: &str) -> Option<String>;

    /// Store `value` under `key`
    fn set(&self, key: &str, value: &str) -> Result<(), AdminError>;

    /// Remove `key`; removing a missing key is not an error
    fn remove(&self, key: &str) -> Result<(), AdminError>;
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for Arc<T> {
    fn get(&self, key: &str) -> Option<String> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), AdminError> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), AdminError> {
        (**self).remove(key)
    }
}

fn lock(entries: &Mutex<BTreeMap<String, String>>) -> Result<MutexGuard<'_, BTreeMap<String, String>>, AdminError> {
    entries
        .lock()
        .map_err(|_| AdminError::internal("storage lock poisoned"))
}

/// In-process storage
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        lock(&self.entries).ok()?.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), AdminError> {
        lock(&self.entries)?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), AdminError> {
        lock(&self.entries)?.remove(key);
        Ok(())
    }
}

/// Storage persisted as a JSON object in a file
///
/// The whole file is rewritten on every change.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl FileStore {
    /// Open the store at `path`
    ///
    /// A missing file starts empty. A file that is not a JSON object of
    /// strings is ignored (and replaced on the next write).
    pub fn open(path: impl AsRef<Path>) -> Result<Self, AdminError> {
        let path = path.as_ref().to_path_buf();
        let entries = match std::fs::read_to_string(&path) {
            Ok(json) => serde_json::from_str(&json).unwrap_or_else(|e| {
                warn!(path = %path.display(), error = %e, "Ignoring malformed storage file");
                BTreeMap::new()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn save(&self, entries: &BTreeMap<String, String>) -> Result<(), AdminError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(entries)?;
        std::fs::write(&self.path, json)?;
        debug!(path = %self.path.display(), keys = entries.len(), "Saved storage file");
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        lock(&self.entries).ok()?.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), AdminError> {
        let mut entries = lock(&self.entries)?;
        let mut updated = entries.clone();
        updated.insert(key.to_string(), value.to_string());
        self.save(&updated)?;
        *entries = updated;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), AdminError> {
        let mut entries = lock(&self.entries)?;
        if !entries.contains_key(key) {
            return Ok(());
        }
        let mut updated = entries.clone();
        updated.remove(key);
        self.save(&updated)?;
        *entries = updated;
        Ok(())
    }
}

/// Firestore databases the user has added, and the one selected
pub struct DatabasePreferences<S> {
    store: S,
}

impl<S: KeyValueStore> DatabasePreferences<S> {
    /// Key holding the JSON array of database IDs
    pub const DATABASES_KEY: &'static str = "firestore-databases";
    /// Key holding the selected database ID
    pub const SELECTED_KEY: &'static str = "firestore-selected-database";

    /// Preferences backed by `store`
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Known database IDs; always contains the default database first
    pub fn databases(&self) -> Vec<String> {
        let default = EmulatorSettings::DEFAULT_DATABASE;
        let mut databases: Vec<String> = self
            .store
            .get(Self::DATABASES_KEY)
            .and_then(|json| match serde_json::from_str(&json) {
                Ok(ids) => Some(ids),
                Err(e) => {
                    warn!(error = %e, "Malformed database list, using default");
                    None
                }
            })
            .unwrap_or_default();

        databases.retain(|id| id != default);
        databases.insert(0, default.to_string());
        databases
    }

    /// Add a database ID; returns `false` if it was already known
    pub fn add_database(&self, database_id: &str) -> Result<bool, AdminError> {
        let database_id = database_id.trim();
        if database_id.is_empty() {
            return Err(AdminError::InvalidForm("Database ID is required".to_string()));
        }

        let mut databases = self.databases();
        if databases.iter().any(|id| id == database_id) {
            return Ok(false);
        }
        databases.push(database_id.to_string());
        self.save_databases(&databases)?;
        Ok(true)
    }

    /// Remove a database ID; returns `false` if it was not known
    ///
    /// The default database cannot be removed. Removing the selected
    /// database selects the default one.
    pub fn remove_database(&self, database_id: &str) -> Result<bool, AdminError> {
        if database_id == EmulatorSettings::DEFAULT_DATABASE {
            return Err(AdminError::InvalidForm(
                "The default database cannot be removed".to_string(),
            ));
        }

        let mut databases = self.databases();
        let before = databases.len();
        databases.retain(|id| id != database_id);
        if databases.len() == before {
            return Ok(false);
        }
        self.save_databases(&databases)?;

        if self.store.get(Self::SELECTED_KEY).as_deref() == Some(database_id) {
            self.store
                .set(Self::SELECTED_KEY, EmulatorSettings::DEFAULT_DATABASE)?;
        }
        Ok(true)
    }

    /// Selected database; the default one if none or an unknown one is stored
    pub fn selected_database(&self) -> String {
        match self.store.get(Self::SELECTED_KEY) {
            Some(id) if self.databases().contains(&id) => id,
            _ => EmulatorSettings::DEFAULT_DATABASE.to_string(),
        }
    }

    /// Select a known database
    pub fn select_database(&self, database_id: &str) -> Result<(), AdminError> {
        if !self.databases().iter().any(|id| id == database_id) {
            return Err(AdminError::InvalidForm(format!(
                "Unknown database '{}'",
                database_id
            )));
        }
        self.store.set(Self::SELECTED_KEY, database_id)
    }

    fn save_databases(&self, databases: &[String]) -> Result<(), AdminError> {
        self.store
            .set(Self::DATABASES_KEY, &serde_json::to_string(databases)?)
    }
}
