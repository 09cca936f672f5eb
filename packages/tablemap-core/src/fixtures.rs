//! Records used by unit tests.

use crate::map::EntityDefinition;
use crate::record::{Record, RecordMeta, TableObject};
use crate::types::{assign, StorageKind, Value};

/// Declares `secret` without exposing it, to exercise unreadable properties.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Gadget {
    pub meta: RecordMeta,
    pub name: Option<String>,
    pub price: f64,
    pub tags: Vec<String>,
}

impl Record for Gadget {
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
        match property {
            "name" => Some(self.name.clone().into()),
            "price" => Some(self.price.into()),
            "tags" => Some(self.tags.clone().into()),
            _ => None,
        }
    }

    fn set_value(&mut self, property: &str, value: Value) -> bool {
        match property {
            "name" => assign(&mut self.name, value),
            "price" => assign(&mut self.price, value),
            "tags" => assign(&mut self.tags, value),
            _ => false,
        }
    }
}

impl TableObject for Gadget {
    const TABLE: &'static str = "Gadget";

    fn definition() -> EntityDefinition {
        EntityDefinition::new()
            .property("name", StorageKind::String)
            .attribute("name", "NOT NULL")
            .property("price", StorageKind::Float)
            .property("secret", StorageKind::String)
            .property("tags", StorageKind::StringArray)
    }
}
