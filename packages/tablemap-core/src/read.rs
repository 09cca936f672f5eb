//! Fetching rows back into typed instances.

use std::collections::HashMap;
use std::sync::Arc;

use rusqlite::types::Value as SqlValue;

use crate::error::{OrmError, Result};
use crate::executor::Row;
use crate::manager::{Manager, Session, Shared};
use crate::map::{JoinMap, PersistenceMap};
use crate::query::{join_properties_to_load, select_statement, QueryOptions};
use crate::record::{downcast_record, keys, Record, TableObject};
use crate::types::{StorageKind, Value};

/// Instances whose relations are being loaded, outermost first.
#[derive(Debug, Default)]
pub(crate) struct ReadContext {
    loading: Vec<(&'static str, i64)>,
}

impl ReadContext {
    fn is_loading(&self, table: &str, id: i64) -> bool {
        self.loading.iter().any(|(t, i)| *t == table && *i == id)
    }
}

impl Session<'_> {
    /// Runs a fetch on `table` and rebuilds one instance per row.
    pub(crate) fn fetch_records(
        &self,
        table: &str,
        options: &QueryOptions,
        sparse: bool,
        ctx: &mut ReadContext,
    ) -> Result<Vec<Box<dyn Record>>> {
        let map = self.registry.map_for(table)?;
        let joins = self.registry.joins(table)?;
        let sql = select_statement(options, map, joins);
        let rows = self.ex.query(&sql, &[])?;
        let load = join_properties_to_load(options, map, sparse);

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            let mut record = self.registry.instantiate(table)?;
            apply_row(map, &mut *record, row);
            self.populate_joins(map, joins, &mut *record, &load, ctx)?;
            records.push(record);
        }
        Ok(records)
    }

    /// Fetches the rows with the given ids, in the order given.
    ///
    /// Unknown ids are skipped.
    pub(crate) fn fetch_by_ids(
        &self,
        table: &str,
        ids: &[i64],
        ctx: &mut ReadContext,
    ) -> Result<Vec<Box<dyn Record>>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let list: Vec<String> = ids.iter().map(i64::to_string).collect();
        let options = QueryOptions::new().condition(format!("{} IN ({})", keys::ID, list.join(",")));
        let mut by_id: HashMap<i64, Box<dyn Record>> = self
            .fetch_records(table, &options, false, ctx)?
            .into_iter()
            .map(|r| (r.meta().id, r))
            .collect();
        Ok(ids.iter().filter_map(|id| by_id.remove(id)).collect())
    }

    pub(crate) fn all_ids(&self, table: &str) -> Result<Vec<i64>> {
        let map = self.registry.map_for(table)?;
        let sql = format!("SELECT {} FROM {}", keys::ID, map.table());
        self.ex.query_ids(&sql, &[])
    }

    fn populate_joins(
        &self,
        map: &PersistenceMap,
        joins: &HashMap<String, JoinMap>,
        record: &mut dyn Record,
        load: &[String],
        ctx: &mut ReadContext,
    ) -> Result<()> {
        if load.is_empty() {
            return Ok(());
        }
        let id = record.meta().id;
        ctx.loading.push((record.table_name(), id));
        let mut result = Ok(());
        for property in load {
            result = self.populate_join(map, joins, record, property, id, ctx);
            if result.is_err() {
                break;
            }
        }
        ctx.loading.pop();
        result
    }

    fn populate_join(
        &self,
        map: &PersistenceMap,
        joins: &HashMap<String, JoinMap>,
        record: &mut dyn Record,
        property: &str,
        id: i64,
        ctx: &mut ReadContext,
    ) -> Result<()> {
        let Some(persistence) = map.get(property) else {
            return Ok(());
        };
        let column = map.column_for_property(property).unwrap_or(property);
        let Some(join) = joins.get(column) else {
            tracing::warn!("No join map for {}.{}", map.table(), property);
            return Ok(());
        };

        let sql = format!(
            "SELECT {} FROM {} WHERE {} = ? ORDER BY {}",
            join.join_column_name,
            join.join_table_name,
            join.parent_key_column,
            keys::ID
        );
        let cells: Vec<SqlValue> = self
            .ex
            .query(&sql, &[SqlValue::Integer(id)])?
            .into_iter()
            .filter_map(|row| row.into_columns().into_iter().next().map(|(_, v)| v))
            .collect();
        if cells.is_empty() {
            return Ok(());
        }

        let applied = match &persistence.kind {
            StorageKind::Object(target) | StorageKind::ObjectArray(target) => {
                if ctx.loading.len() > self.config.max_relation_depth {
                    tracing::warn!(
                        "Relation depth limit {} reached at {}.{}; left unset",
                        self.config.max_relation_depth,
                        map.table(),
                        property
                    );
                    return Ok(());
                }
                let ids: Vec<i64> = cells
                    .into_iter()
                    .filter_map(|v| match v {
                        SqlValue::Integer(i) => Some(i),
                        _ => None,
                    })
                    .filter(|ref_id| {
                        let cyclic = ctx.is_loading(target.table, *ref_id);
                        if cyclic {
                            tracing::warn!(
                                "Skipping cyclic reference {}.{} -> {} {}",
                                map.table(),
                                property,
                                target.table,
                                ref_id
                            );
                        }
                        !cyclic
                    })
                    .collect();
                let related = self.fetch_by_ids(target.table, &ids, ctx)?;
                related.is_empty() || record.set_related(property, related)
            }
            StorageKind::Binary => cells
                .into_iter()
                .next()
                .and_then(|v| Value::from_sql(&StorageKind::Binary, v))
                .map_or(true, |v| record.set_value(property, v)),
            kind => {
                let element = kind.element_kind();
                let values = cells
                    .into_iter()
                    .filter_map(|v| Value::from_sql(&element, v))
                    .collect();
                record.set_value(property, Value::Array(values))
            }
        };
        if !applied {
            tracing::debug!("Could not assign {}.{}", map.table(), property);
        }
        Ok(())
    }
}

/// Copies one row's columns onto `record`.
///
/// NULL and unconvertible cells leave the property at its default.
fn apply_row(map: &PersistenceMap, record: &mut dyn Record, row: Row) {
    for (column, stored) in row.into_columns() {
        match column.as_str() {
            keys::ID => {
                if let SqlValue::Integer(id) = stored {
                    record.meta_mut().id = id;
                }
            }
            keys::CREATED_TIME => {
                if let Some(Value::Date(date)) = Value::from_sql(&StorageKind::Date, stored) {
                    record.meta_mut().created_time = Some(date);
                }
            }
            keys::MODIFIED_TIME => {
                if let Some(Value::Date(date)) = Value::from_sql(&StorageKind::Date, stored) {
                    record.meta_mut().modified_time = Some(date);
                }
            }
            _ => {
                let Some(property) = map.property_for_column(&column) else {
                    tracing::trace!("Ignoring unmapped column {}.{}", map.table(), column);
                    continue;
                };
                let Some(persistence) = map.get(property) else {
                    continue;
                };
                if let Some(value) = Value::from_sql(&persistence.kind, stored) {
                    if !record.set_value(property, value) {
                        tracing::debug!("Could not assign {}.{}", map.table(), property);
                    }
                }
            }
        }
    }
}

fn into_typed<T: TableObject>(records: Vec<Box<dyn Record>>) -> Result<Vec<T>> {
    records
        .into_iter()
        .map(|record| {
            downcast_record::<T>(record).ok_or_else(|| OrmError::Mapping {
                table: T::TABLE.to_string(),
                message: "registered type does not match the requested type".to_string(),
            })
        })
        .collect()
}

fn fetch_typed<T: TableObject>(
    shared: &Shared,
    options: &QueryOptions,
    sparse: bool,
) -> Result<Vec<T>> {
    let records = shared
        .session(|s| s.fetch_records(T::TABLE, options, sparse, &mut ReadContext::default()))?;
    into_typed(records)
}

fn fetch_ids_typed<T: TableObject>(shared: &Shared, ids: &[i64]) -> Result<Vec<T>> {
    let records =
        shared.session(|s| s.fetch_by_ids(T::TABLE, ids, &mut ReadContext::default()))?;
    into_typed(records)
}

impl Manager {
    /// Every stored instance of `T`, fully populated.
    pub fn all_instances<T: TableObject>(&self) -> Result<Vec<T>> {
        fetch_typed(&self.shared, &QueryOptions::default(), false)
    }

    /// Instances of `T` matching `options`.
    pub fn fetch<T: TableObject>(&self, options: &QueryOptions) -> Result<Vec<T>> {
        fetch_typed(&self.shared, options, false)
    }

    /// Like [`fetch`](Self::fetch), but only loads the join properties
    /// named in `options.join_properties_to_populate` when it is non-empty.
    pub fn fetch_sparse<T: TableObject>(&self, options: &QueryOptions) -> Result<Vec<T>> {
        fetch_typed(&self.shared, options, true)
    }

    pub fn fetch_by_id<T: TableObject>(&self, id: i64) -> Result<Option<T>> {
        Ok(fetch_ids_typed(&self.shared, &[id])?.into_iter().next())
    }

    /// Instances with the given ids, in the order given.
    pub fn fetch_by_ids<T: TableObject>(&self, ids: &[i64]) -> Result<Vec<T>> {
        fetch_ids_typed(&self.shared, ids)
    }

    /// Row ids of every stored instance of `T`.
    pub fn all_ids<T: TableObject>(&self) -> Result<Vec<i64>> {
        self.shared.session(|s| s.all_ids(T::TABLE))
    }

    /// Queued [`fetch`](Self::fetch) or [`fetch_sparse`](Self::fetch_sparse).
    ///
    /// `completion` runs on the queue worker.
    pub fn fetch_queued<T, F>(&self, options: QueryOptions, sparse: bool, completion: F) -> Result<()>
    where
        T: TableObject,
        F: FnOnce(Result<Vec<T>>) + Send + 'static,
    {
        let shared = Arc::clone(&self.shared);
        self.queue
            .submit(move || completion(fetch_typed(&shared, &options, sparse)))
    }

    pub fn fetch_by_id_queued<T, F>(&self, id: i64, completion: F) -> Result<()>
    where
        T: TableObject,
        F: FnOnce(Result<Option<T>>) + Send + 'static,
    {
        let shared = Arc::clone(&self.shared);
        self.queue.submit(move || {
            completion(fetch_ids_typed(&shared, &[id]).map(|found| found.into_iter().next()))
        })
    }

    pub fn all_instances_queued<T, F>(&self, completion: F) -> Result<()>
    where
        T: TableObject,
        F: FnOnce(Result<Vec<T>>) + Send + 'static,
    {
        self.fetch_queued(QueryOptions::default(), false, completion)
    }

    pub fn all_ids_queued<T, F>(&self, completion: F) -> Result<()>
    where
        T: TableObject,
        F: FnOnce(Result<Vec<i64>>) + Send + 'static,
    {
        let shared = Arc::clone(&self.shared);
        self.queue
            .submit(move || completion(shared.session(|s| s.all_ids(T::TABLE))))
    }
}
