use super::{Indexer, PropertyPersistence};
use crate::types::StorageKind;

/// Column attributes accepted in table definitions.
pub struct ColumnAttribute;

impl ColumnAttribute {
    pub const NOT_NULL: &'static str = "NOT NULL";
    pub const UNIQUE: &'static str = "UNIQUE";
}

/// Flat list of property declarations for one entity type.
///
/// A derived type composes a base definition with [`include`](Self::include)
/// instead of inheriting from it.
#[derive(Debug, Clone, Default)]
pub struct EntityDefinition {
    properties: Vec<(String, PropertyPersistence)>,
    indexer: Option<Indexer>,
}

impl EntityDefinition {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends the base declarations. Earlier declarations of a property win.
    pub fn include(mut self, base: EntityDefinition) -> Self {
        self.properties.extend(base.properties);
        if self.indexer.is_none() {
            self.indexer = base.indexer;
        }
        self
    }

    pub fn property(mut self, name: impl Into<String>, kind: StorageKind) -> Self {
        self.properties
            .push((name.into(), PropertyPersistence::new(kind)));
        self
    }

    /// Declares a property stored under a column name other than its own.
    pub fn property_with_column(
        mut self,
        name: impl Into<String>,
        kind: StorageKind,
        column: impl Into<String>,
    ) -> Self {
        self.properties.push((
            name.into(),
            PropertyPersistence::new(kind).with_column(column),
        ));
        self
    }

    /// Attaches a column attribute to an already declared property.
    pub fn attribute(mut self, name: &str, attribute: &str) -> Self {
        match self.properties.iter_mut().find(|(n, _)| n == name) {
            Some((_, persistence)) => persistence.attribute = Some(attribute.to_string()),
            None => tracing::warn!(
                "Attribute '{}' given for undeclared property '{}'",
                attribute,
                name
            ),
        }
        self
    }

    pub fn indexed(mut self, indexer: Indexer) -> Self {
        self.indexer = Some(indexer);
        self
    }

    pub fn properties(&self) -> &[(String, PropertyPersistence)] {
        &self.properties
    }

    pub fn indexer(&self) -> Option<&Indexer> {
        self.indexer.as_ref()
    }

    pub fn into_parts(self) -> (Vec<(String, PropertyPersistence)>, Option<Indexer>) {
        (self.properties, self.indexer)
    }
}
