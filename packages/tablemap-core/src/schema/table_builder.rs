use crate::map::{JoinMap, PersistenceMap};
use crate::record::{keys, Record};
use crate::types::type_names;

use super::SchemaReport;

/// Whether the engine can read `property` off instances like `sample`.
///
/// The id and timestamps live in the record's bookkeeping and are always
/// readable.
pub(crate) fn property_is_readable(sample: &dyn Record, property: &str) -> bool {
    matches!(
        property,
        keys::ID | keys::CREATED_TIME | keys::MODIFIED_TIME
    ) || sample.value(property).is_some()
        || sample.related(property).is_some()
}

/// Column definition used in CREATE and ALTER statements.
fn column_definition(column: &str, column_type: &str, attribute: Option<&str>) -> String {
    match attribute {
        Some(attribute) => format!("{} {} {}", column, column_type, attribute),
        None => format!("{} {}", column, column_type),
    }
}

/// Creation statement for `map`'s primary table.
///
/// Only inline properties readable on `sample` get a column; the others are
/// noted as warnings on `report`.
pub fn create_table_statement(
    map: &PersistenceMap,
    sample: &dyn Record,
    report: &mut SchemaReport,
) -> String {
    let mut columns = vec![format!(
        "{} {} PRIMARY KEY AUTOINCREMENT",
        keys::ID,
        type_names::INT
    )];
    for (name, persistence) in map.inline_properties() {
        if name == keys::ID {
            continue;
        }
        if !property_is_readable(sample, name) {
            report.warn(format!(
                "Property {} on {} is not readable; no column created",
                name,
                map.table()
            ));
            continue;
        }
        let column = map.column_for_property(name).unwrap_or(name);
        columns.push(column_definition(
            column,
            persistence.kind.column_type(),
            persistence.attribute.as_deref(),
        ));
    }
    format!(
        "CREATE TABLE IF NOT EXISTS {} ({})",
        map.table(),
        columns.join(", ")
    )
}

/// `ALTER TABLE ... ADD COLUMN` for one missing column.
pub(crate) fn add_column_statement(table: &str, column: &str, column_type: &str) -> String {
    format!(
        "ALTER TABLE {} ADD COLUMN {}",
        table,
        column_definition(column, column_type, None)
    )
}

/// Creation statement for one join table.
pub fn create_join_table_statement(join: &JoinMap) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {} ({} {} PRIMARY KEY AUTOINCREMENT, {} {}, {} {})",
        join.join_table_name,
        keys::ID,
        type_names::INT,
        join.parent_key_column,
        type_names::INT,
        join.join_column_name,
        join.element_type()
    )
}

/// Parent-key index on one join table.
pub(crate) fn create_join_index_statement(table: &str, join: &JoinMap) -> String {
    format!(
        "CREATE INDEX IF NOT EXISTS {} ON {} ({})",
        join.parent_index_name(table),
        join.join_table_name,
        join.parent_key_column
    )
}
