use std::collections::HashMap;

use super::introspect::creation_string_columns;
use super::table_builder::{
    add_column_statement, create_join_index_statement, create_join_table_statement,
    create_table_statement, property_is_readable,
};
use super::SchemaReport;
use crate::executor::Executor;
use crate::map::{JoinMap, PersistenceMap};
use crate::record::{keys, Record};

/// Brings the store in line with registered persistence maps.
///
/// Only ever adds: missing tables, columns and indices are created, and
/// nothing is renamed or dropped.
pub struct SchemaValidator<'e, 'c> {
    ex: &'e Executor<'c>,
    catalog: HashMap<String, String>,
}

impl<'e, 'c> SchemaValidator<'e, 'c> {
    /// Loads the current creation statements from the store.
    pub fn new(ex: &'e Executor<'c>) -> Self {
        let catalog = ex.creation_strings().unwrap_or_else(|err| {
            tracing::warn!("Could not read the schema catalog: {}", err);
            HashMap::new()
        });
        Self { ex, catalog }
    }

    /// Whether the store has a table named `table`.
    pub fn has_table(&self, table: &str) -> bool {
        self.catalog.contains_key(table)
    }

    /// Reconciles `map`'s primary table, secondary index and join tables.
    ///
    /// `sample` is a default instance of the mapped type, used to decide
    /// which properties are readable.
    pub fn validate(
        &mut self,
        map: &PersistenceMap,
        sample: &dyn Record,
    ) -> (SchemaReport, HashMap<String, JoinMap>) {
        let table = map.table();
        let mut report = SchemaReport::new(table);

        if self.has_table(table) {
            self.add_missing_columns(map, sample, &mut report);
        } else {
            let sql = create_table_statement(map, sample, &mut report);
            if report.record(&sql, self.ex.execute_batch(&sql)) {
                tracing::info!("Created table {}", table);
                report.created_table = true;
                self.catalog.insert(table.to_string(), sql);
            }
        }

        if let Some(sql) = map.indexer().and_then(|i| i.create_statement(table)) {
            report.record(&sql, self.ex.execute_batch(&sql));
        }

        let mut joins = HashMap::new();
        for (name, persistence) in map.join_properties() {
            let column = map.column_for_property(name).unwrap_or(name);
            let join = JoinMap::for_property(table, column, persistence.kind.clone());
            self.reconcile_join_table(table, &join, &mut report);
            joins.insert(column.to_string(), join);
        }

        if !report.is_ok() {
            tracing::warn!(
                "Schema reconciliation for {} had {} failed statement(s)",
                table,
                report.failures.len()
            );
        }
        (report, joins)
    }

    /// Columns present on `table`, preferring the store's own catalog.
    fn existing_columns(&self, table: &str) -> Vec<String> {
        match self.ex.table_columns(table) {
            Ok(columns) if !columns.is_empty() => columns,
            _ => self
                .catalog
                .get(table)
                .map(|sql| creation_string_columns(sql))
                .unwrap_or_default(),
        }
    }

    fn add_missing_columns(
        &mut self,
        map: &PersistenceMap,
        sample: &dyn Record,
        report: &mut SchemaReport,
    ) {
        let table = map.table();
        let existing = self.existing_columns(table);
        for (name, persistence) in map.inline_properties() {
            let column = map.column_for_property(name).unwrap_or(name);
            if existing.iter().any(|c| c == column) {
                continue;
            }
            if !property_is_readable(sample, name) {
                report.warn(format!(
                    "Property {} on {} is not readable; column not added",
                    name, table
                ));
                continue;
            }
            let sql = add_column_statement(table, column, persistence.kind.column_type());
            if report.record(&sql, self.ex.execute_batch(&sql)) {
                tracing::info!("Added column {} to {}", column, table);
                report.added_columns.push(column.to_string());
            }
        }
    }

    fn reconcile_join_table(&mut self, table: &str, join: &JoinMap, report: &mut SchemaReport) {
        let join_table = join.join_table_name.as_str();
        if self.has_table(join_table) {
            let existing = self.existing_columns(join_table);
            let expected = [
                (keys::ID, crate::types::type_names::INT),
                (
                    join.parent_key_column.as_str(),
                    crate::types::type_names::INT,
                ),
                (join.join_column_name.as_str(), join.element_type()),
            ];
            for (column, column_type) in expected {
                if existing.iter().any(|c| c == column) {
                    continue;
                }
                let sql = add_column_statement(join_table, column, column_type);
                if report.record(&sql, self.ex.execute_batch(&sql)) {
                    report
                        .repaired_join_columns
                        .push(format!("{}.{}", join_table, column));
                }
            }
        } else {
            let sql = create_join_table_statement(join);
            if report.record(&sql, self.ex.execute_batch(&sql)) {
                tracing::info!("Created join table {}", join_table);
                report.created_join_tables.push(join_table.to_string());
                self.catalog.insert(join_table.to_string(), sql);
            }
        }

        let sql = create_join_index_statement(table, join);
        report.record(&sql, self.ex.execute_batch(&sql));
    }
}
