//! Cloud Firestore module
//!
//! Layers, bottom-up:
//! - `field_value.rs`: wire types (`FirestoreValue`, `Document`)
//! - `field_path.rs`: dotted/bracketed path parsing
//! - `navigator.rs`: walking a document's field tree
//! - `mutator.rs`: set/delete/append/rename on a field tree
//! - `codec.rs`: plain values to and from wire values
//! - `client.rs`, `store.rs`: emulator REST access
//! - `actions.rs`: field editing round-trips
//! - `import.rs`: bulk import and export

pub mod actions;
pub mod client;
pub mod codec;
pub mod document_path;
pub mod field_path;
pub mod field_value;
pub mod geo_point;
pub mod import;
pub mod mutator;
pub mod navigator;
pub mod store;
pub mod timestamp;

pub use actions::{EditMode, FieldActions, FieldForm};
pub use client::FirestoreClient;
pub use codec::{from_wire, infer_type, json_to_value, to_wire, FieldType};
pub use document_path::DocumentPath;
pub use field_path::{parse_field_path, FieldPath, PathSegment, APPEND_MARKER};
pub use field_value::{ArrayValue, Document, Fields, FirestoreValue, MapValue, NullValue};
pub use geo_point::GeoPoint;
pub use import::{export_documents, import_documents, ImportMode, ImportRecord, ImportReport};
pub use mutator::{append_to_array, delete_field, rename_field, set_field};
pub use navigator::{get_value, navigate, navigate_to_parent, navigate_to_parent_mut, Node, ParentMut};
pub use store::{DocumentStore, FirestoreStore};
pub use timestamp::Timestamp;
