use crate::types::StorageKind;

/// Suffix of the parent-key column in every join table.
pub const ID_EXTENSION: &str = "_ID";

/// Join table descriptor for one relational property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinMap {
    /// `<Table>_ID`, holds the owning row's id
    pub parent_key_column: String,
    /// `<Table>_<column>`
    pub join_table_name: String,
    /// Element column, named after the property's column
    pub join_column_name: String,
    pub element_kind: StorageKind,
}

impl JoinMap {
    pub fn for_property(table: &str, column: &str, kind: StorageKind) -> Self {
        Self {
            parent_key_column: format!("{}{}", table, ID_EXTENSION),
            join_table_name: format!("{}_{}", table, column),
            join_column_name: column.to_string(),
            element_kind: kind,
        }
    }

    /// Physical type of the element column.
    pub fn element_type(&self) -> &'static str {
        self.element_kind.join_element_type()
    }

    /// Name of the parent-key index on the join table.
    pub fn parent_index_name(&self, table: &str) -> String {
        format!("{}_{}_idx", table, self.join_column_name)
    }
}
