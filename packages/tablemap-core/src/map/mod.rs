//! Persistence and join maps.
//!
//! Describes how the properties of each entity type map onto primary-table
//! columns, join tables and secondary indices.

pub mod definition;
pub mod indexer;
pub mod join_map;
pub mod persistence_map;

pub use definition::{ColumnAttribute, EntityDefinition};
pub use indexer::Indexer;
pub use join_map::{JoinMap, ID_EXTENSION};
pub use persistence_map::{PersistenceMap, PropertyPersistence};
