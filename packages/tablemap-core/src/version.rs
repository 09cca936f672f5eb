//! Schema version marker stored alongside application tables.

use crate::map::EntityDefinition;
use crate::record::{Record, RecordMeta, TableObject};
use crate::types::{assign, StorageKind, Value};

/// Single-row table holding the application's schema version.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct DbVersion {
    pub meta: RecordMeta,
    pub version: f64,
}

impl DbVersion {
    pub const VERSION: &'static str = "version";
}

impl Record for DbVersion {
    fn table_name(&self) -> &'static str {
        Self::TABLE
    }

    fn meta(&self) -> &RecordMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut RecordMeta {
        &mut self.meta
    }

    fn value(&self, property: &str) -> Option<Value> {
        (property == Self::VERSION).then(|| self.version.into())
    }

    fn set_value(&mut self, property: &str, value: Value) -> bool {
        property == Self::VERSION && assign(&mut self.version, value)
    }
}

impl TableObject for DbVersion {
    const TABLE: &'static str = "DBVersion";

    fn definition() -> EntityDefinition {
        EntityDefinition::new().property(Self::VERSION, StorageKind::Float)
    }
}
