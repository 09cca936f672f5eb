//! Storage kinds and runtime values.
//!
//! Closed set of persistable value shapes, their physical column types,
//! and the value representation exchanged with entity instances.

pub mod storage_kind;
pub mod value;

pub use storage_kind::{type_names, EntityRef, StorageKind};
pub use value::{assign, date_from_epoch, date_to_epoch, FromValue, Value};
