//! Query options and SELECT statement generation.

use std::collections::HashMap;

use crate::map::{JoinMap, PersistenceMap};
use crate::record::keys;

/// Sort direction tokens accepted in [`QueryOptions::sorting`].
pub struct ColumnSorting;

impl ColumnSorting {
    pub const ASCENDING: &'static str = "ASC";
    pub const DESCENDING: &'static str = "DESC";
}

/// Combinator tokens accepted in [`QueryOptions::conditions`].
pub struct Combinator;

impl Combinator {
    pub const AND: &'static str = "AND";
    pub const OR: &'static str = "OR";
}

/// Caller-supplied shape of a fetch.
///
/// Conditions are raw SQL fragments of the form `<column> <operator> <operand>`
/// and are interpolated as-is.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryOptions {
    /// Projection; `None` selects every column
    pub property_names: Option<Vec<String>>,
    /// Join properties to populate on a sparse fetch
    pub join_properties_to_populate: Option<Vec<String>>,
    /// Sort columns, optionally mixed with one `ASC`/`DESC` token
    pub sorting: Option<Vec<String>>,
    /// WHERE fragments, optionally mixed with one `AND`/`OR` token
    pub conditions: Option<Vec<String>>,
    pub distinct: bool,
}

impl QueryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds options in one call.
    ///
    /// `ascending` only applies when `sort_columns` is given.
    pub fn with(
        conditions: Option<Vec<String>>,
        property_names: Option<Vec<String>>,
        sort_columns: Option<Vec<String>>,
        ascending: bool,
        distinct: bool,
    ) -> Self {
        let sorting = sort_columns.map(|mut columns| {
            columns.push(
                if ascending {
                    ColumnSorting::ASCENDING
                } else {
                    ColumnSorting::DESCENDING
                }
                .to_string(),
            );
            columns
        });
        Self {
            property_names,
            join_properties_to_populate: None,
            sorting,
            conditions,
            distinct,
        }
    }

    pub fn condition(mut self, condition: impl Into<String>) -> Self {
        self.conditions
            .get_or_insert_with(Vec::new)
            .push(condition.into());
        self
    }

    /// Combines conditions with OR instead of AND.
    pub fn any_condition(self) -> Self {
        self.condition(Combinator::OR)
    }

    pub fn properties<S: Into<String>>(mut self, names: impl IntoIterator<Item = S>) -> Self {
        self.property_names = Some(names.into_iter().map(Into::into).collect());
        self
    }

    pub fn populate<S: Into<String>>(mut self, names: impl IntoIterator<Item = S>) -> Self {
        self.join_properties_to_populate = Some(names.into_iter().map(Into::into).collect());
        self
    }

    pub fn sort_by(mut self, column: impl Into<String>) -> Self {
        self.sorting.get_or_insert_with(Vec::new).push(column.into());
        self
    }

    pub fn descending(self) -> Self {
        self.sort_by(ColumnSorting::DESCENDING)
    }

    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }
}

/// Splits the sort list into columns and direction, defaulting to ascending.
fn sort_spec(sorting: &[String]) -> (Vec<&str>, &'static str) {
    let mut direction = ColumnSorting::ASCENDING;
    let mut columns = Vec::with_capacity(sorting.len());
    for item in sorting {
        let token = item.trim();
        if token.eq_ignore_ascii_case(ColumnSorting::ASCENDING) {
            direction = ColumnSorting::ASCENDING;
        } else if token.eq_ignore_ascii_case(ColumnSorting::DESCENDING) {
            direction = ColumnSorting::DESCENDING;
        } else if !token.is_empty() {
            columns.push(token);
        }
    }
    (columns, direction)
}

/// Splits the condition list into fragments and combinator, defaulting to AND.
fn condition_spec(conditions: &[String]) -> (Vec<&str>, &'static str) {
    let mut combinator = Combinator::AND;
    let mut fragments = Vec::with_capacity(conditions.len());
    for item in conditions {
        let token = item.trim();
        if token.eq_ignore_ascii_case(Combinator::OR) {
            combinator = Combinator::OR;
        } else if token.eq_ignore_ascii_case(Combinator::AND) {
            combinator = Combinator::AND;
        } else if !token.is_empty() {
            fragments.push(token);
        }
    }
    (fragments, combinator)
}

/// Rewrites a condition on a join-backed column into a subquery on its join table.
fn rewrite_condition(condition: &str, joins: &HashMap<String, JoinMap>) -> String {
    let column = condition.split_whitespace().next().unwrap_or_default();
    match joins.get(column) {
        Some(join) => format!(
            "{} IN (SELECT {} FROM {} WHERE {})",
            keys::ID,
            join.parent_key_column,
            join.join_table_name,
            condition
        ),
        None => condition.to_string(),
    }
}

/// Projected column names, or `None` for `*`.
///
/// Join-backed properties are dropped and the id and timestamps are
/// always included.
pub fn projection(options: &QueryOptions, map: &PersistenceMap) -> Option<Vec<String>> {
    let names = options.property_names.as_ref()?;
    let mut columns: Vec<String> = Vec::with_capacity(names.len() + 3);
    for name in names {
        let persistence = map.get(name);
        if persistence.is_some_and(|p| p.kind.requires_join_table()) {
            continue;
        }
        let column = map.column_for_property(name).unwrap_or(name).to_string();
        if !columns.contains(&column) {
            columns.push(column);
        }
    }
    for key in [keys::ID, keys::CREATED_TIME, keys::MODIFIED_TIME] {
        if !columns.iter().any(|c| c == key) {
            columns.push(key.to_string());
        }
    }
    Some(columns)
}

/// Builds the SELECT statement for a fetch on `map`'s table.
pub fn select_statement(
    options: &QueryOptions,
    map: &PersistenceMap,
    joins: &HashMap<String, JoinMap>,
) -> String {
    let table = map.table();
    let columns = projection(options, map);

    let mut sql = String::from("SELECT ");
    if options.distinct {
        sql.push_str("DISTINCT ");
    }
    match &columns {
        Some(columns) => sql.push_str(&columns.join(", ")),
        None => sql.push('*'),
    }
    sql.push_str(" FROM ");
    sql.push_str(table);

    let mut clauses = Vec::new();
    if let Some(conditions) = &options.conditions {
        let (fragments, combinator) = condition_spec(conditions);
        if !fragments.is_empty() {
            let rewritten: Vec<String> = fragments
                .iter()
                .map(|c| rewrite_condition(c, joins))
                .collect();
            clauses.push(format!(
                "({})",
                rewritten.join(&format!(" {} ", combinator))
            ));
        }
    }
    if options.distinct {
        // the id column makes every row unique, so keep the newest row per group
        let group: Vec<&str> = columns
            .iter()
            .flatten()
            .map(String::as_str)
            .filter(|c| ![keys::ID, keys::CREATED_TIME, keys::MODIFIED_TIME].contains(c))
            .collect();
        if !group.is_empty() {
            clauses.push(format!(
                "{} IN (SELECT MAX({}) FROM {} GROUP BY {})",
                keys::ID,
                keys::ID,
                table,
                group.join(", ")
            ));
        }
    }
    if !clauses.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&clauses.join(" AND "));
    }

    if let Some(sorting) = &options.sorting {
        let (sort_columns, direction) = sort_spec(sorting);
        if !sort_columns.is_empty() {
            sql.push_str(" ORDER BY ");
            sql.push_str(&sort_columns.join(", "));
            sql.push(' ');
            sql.push_str(direction);
        }
    }
    sql
}

/// Join properties whose rows a fetch should load.
pub fn join_properties_to_load(
    options: &QueryOptions,
    map: &PersistenceMap,
    sparse: bool,
) -> Vec<String> {
    let all = map.join_properties().map(|(name, _)| name.to_string());
    if sparse {
        if let Some(requested) = options
            .join_properties_to_populate
            .as_ref()
            .filter(|r| !r.is_empty())
        {
            return all.filter(|name| requested.contains(name)).collect();
        }
    }
    match &options.property_names {
        Some(names) => all.filter(|name| names.contains(name)).collect(),
        None => all.collect(),
    }
}
