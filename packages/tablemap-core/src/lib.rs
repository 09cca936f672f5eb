//! Object-relational mapping engine over SQLite.
//!
//! Maps typed entity instances onto relational tables, reconciles the
//! store schema with registered types, and rebuilds instances from rows,
//! including scalar arrays and object references kept in join tables.

pub mod config;
pub mod error;
pub mod executor;
pub mod manager;
pub mod map;
pub mod query;
mod read;
pub mod record;
pub mod schema;
pub mod types;
pub mod version;
mod write;

#[cfg(test)]
pub(crate) mod fixtures;

pub use config::ManagerConfig;
pub use error::{OrmError, Result};
pub use manager::Manager;
pub use map::{ColumnAttribute, EntityDefinition, Indexer, JoinMap, PersistenceMap};
pub use query::{ColumnSorting, QueryOptions};
pub use record::{Record, RecordMeta, TableObject};
pub use schema::SchemaReport;
pub use types::{StorageKind, Value};
pub use version::DbVersion;
