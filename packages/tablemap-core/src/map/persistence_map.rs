use std::collections::HashMap;

use super::Indexer;
use crate::error::{OrmError, Result};
use crate::record::keys;
use crate::types::StorageKind;

/// Storage declaration for one property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyPersistence {
    pub kind: StorageKind,
    /// Column name, defaults to the property name
    pub column_name: Option<String>,
    /// Column attribute such as `NOT NULL`
    pub attribute: Option<String>,
}

impl PropertyPersistence {
    pub fn new(kind: StorageKind) -> Self {
        Self {
            kind,
            column_name: None,
            attribute: None,
        }
    }

    pub fn with_column(mut self, column: impl Into<String>) -> Self {
        let column = column.into();
        self.column_name = if column.is_empty() { None } else { Some(column) };
        self
    }
}

/// Property-to-column map for one entity type.
///
/// Maps are values: [`append`](Self::append) returns a new map, and a map
/// marked initialized accepts no further properties.
#[derive(Debug, Clone, PartialEq)]
pub struct PersistenceMap {
    table: String,
    order: Vec<String>,
    properties: HashMap<String, PropertyPersistence>,
    // column name -> property name
    column_map: HashMap<String, String>,
    indexer: Option<Indexer>,
    initialized: bool,
}

impl PersistenceMap {
    /// Empty map without the implicit properties.
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            order: Vec::new(),
            properties: HashMap::new(),
            column_map: HashMap::new(),
            indexer: None,
            initialized: false,
        }
    }

    /// Map seeded with the id, created and modified properties.
    pub fn register(table: impl Into<String>) -> Self {
        Self::new(table).with_defaults()
    }

    /// Implicit properties carried by every entity type.
    pub fn default_properties() -> Vec<(String, PropertyPersistence)> {
        vec![
            (keys::ID.to_string(), PropertyPersistence::new(StorageKind::Int)),
            (
                keys::CREATED_TIME.to_string(),
                PropertyPersistence::new(StorageKind::Date),
            ),
            (
                keys::MODIFIED_TIME.to_string(),
                PropertyPersistence::new(StorageKind::Date),
            ),
        ]
    }

    fn with_defaults(mut self) -> Self {
        for (name, persistence) in Self::default_properties() {
            self.insert(name, persistence);
        }
        self
    }

    /// Returns a map holding the current entries plus `contents`.
    ///
    /// Keys already present are logged and skipped. A `Some` indexer
    /// replaces the current one.
    pub fn append(
        &self,
        contents: impl IntoIterator<Item = (String, PropertyPersistence)>,
        indexer: Option<Indexer>,
    ) -> Result<PersistenceMap> {
        if self.initialized {
            return Err(OrmError::MapFrozen(self.table.clone()));
        }
        let mut map = self.clone();
        for (name, persistence) in contents {
            if map.properties.contains_key(&name) {
                tracing::debug!("Already have an item with the key: {} ({})", name, self.table);
                continue;
            }
            map.insert(name, persistence);
        }
        if indexer.is_some() {
            map.indexer = indexer;
        }
        Ok(map.with_defaults())
    }

    fn insert(&mut self, name: String, persistence: PropertyPersistence) {
        if self.properties.contains_key(&name) {
            return;
        }
        let column = persistence
            .column_name
            .clone()
            .unwrap_or_else(|| name.clone());
        self.column_map.insert(column, name.clone());
        self.order.push(name.clone());
        self.properties.insert(name, persistence);
    }

    /// Freezes the map.
    pub fn mark_initialized(&mut self) {
        self.initialized = true;
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn indexer(&self) -> Option<&Indexer> {
        self.indexer.as_ref()
    }

    pub fn get(&self, property: &str) -> Option<&PropertyPersistence> {
        self.properties.get(property)
    }

    pub fn contains(&self, property: &str) -> bool {
        self.properties.contains_key(property)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Properties in declaration order.
    pub fn properties(&self) -> impl Iterator<Item = (&str, &PropertyPersistence)> {
        self.order
            .iter()
            .filter_map(move |name| self.properties.get(name).map(|p| (name.as_str(), p)))
    }

    /// Properties stored as primary-table columns.
    pub fn inline_properties(&self) -> impl Iterator<Item = (&str, &PropertyPersistence)> {
        self.properties().filter(|(_, p)| !p.kind.requires_join_table())
    }

    /// Properties stored in join tables.
    pub fn join_properties(&self) -> impl Iterator<Item = (&str, &PropertyPersistence)> {
        self.properties().filter(|(_, p)| p.kind.requires_join_table())
    }

    pub fn property_for_column(&self, column: &str) -> Option<&str> {
        self.column_map.get(column).map(String::as_str)
    }

    pub fn column_for_property(&self, property: &str) -> Option<&str> {
        let (name, persistence) = self.properties.get_key_value(property)?;
        Some(persistence.column_name.as_deref().unwrap_or(name.as_str()))
    }
}
