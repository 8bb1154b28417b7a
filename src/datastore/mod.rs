//! Cloud Datastore values
//!
//! Entity/value wire types and the property codec used by the Datastore
//! property forms.

pub mod codec;
pub mod value;

pub use codec::{from_wire, infer_type, json_to_value, to_wire, PropertyType};
pub use value::{ArrayValue, DatastoreValue, Entity, Key, PartitionId, PathElement, Properties, ValueKind};
