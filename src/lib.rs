//! GCP Emulator Admin
//!
//! Admin core for the Google Cloud emulators (Pub/Sub, Storage, Firestore,
//! Datastore): Firestore field-path addressing and mutation, value codecs,
//! emulator REST access and connection tracking.
//!
//! # Example (edit a nested field)
//! ```
//! use gcp_emulator_admin::firestore::{get_value, set_field, to_wire, FieldPath, FieldType, Fields};
//! use serde_json::json;
//!
//! let mut fields: Fields = serde_json::from_value(json!({
//!     "profile": {"mapValue": {"fields": {"name": {"stringValue": "old"}}}}
//! })).unwrap();
//!
//! let path = FieldPath::parse("profile.name").unwrap();
//! set_field(&mut fields, &path, to_wire(FieldType::String, &json!("new"))).unwrap();
//! assert_eq!(get_value(&fields, &path).unwrap().as_str(), Some("new"));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod app;
pub mod connection;
pub mod datastore;
pub mod error;
pub mod firestore;
pub mod logging;
pub mod metrics;
pub mod settings;
pub mod storage;

// Re-exports for convenience
pub use app::App;
pub use connection::{ConnectionStatus, ServiceConnections, ServiceStatus, StatusChange};
pub use error::{AdminError, ApiError, ApiErrorKind, FieldPathError};
pub use firestore::{FieldPath, FirestoreValue, PathSegment};
pub use metrics::MetricsTracker;
pub use settings::{EmulatorSettings, Service};
pub use storage::{DatabasePreferences, FileStore, KeyValueStore, MemoryStore};
