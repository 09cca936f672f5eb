//! Inserts, updates and deletes.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rusqlite::types::Value as SqlValue;

use crate::error::{OrmError, Result};
use crate::executor::Executor;
use crate::manager::{Manager, Session};
use crate::map::{JoinMap, PersistenceMap};
use crate::record::{keys, AsAny, Record, RecordMeta, TableObject};
use crate::types::{StorageKind, Value};

fn record_type(record: &dyn Record) -> TypeId {
    AsAny::as_any(record).type_id()
}

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

fn id_list(ids: &[i64]) -> String {
    ids.iter().map(i64::to_string).collect::<Vec<_>>().join(",")
}

/// Bookkeeping overwritten during one save, keyed by table and id.
///
/// Holds each touched instance's meta as it was before the save, so a
/// save that rolls back can put the in-memory instances back.
#[derive(Debug, Default)]
struct SaveLedger {
    prior: HashMap<(&'static str, i64), RecordMeta>,
}

impl SaveLedger {
    fn remember(&mut self, table: &'static str, id: i64, meta: RecordMeta) {
        self.prior.entry((table, id)).or_insert(meta);
    }

    fn is_empty(&self) -> bool {
        self.prior.is_empty()
    }
}

impl Session<'_> {
    /// Saves a homogeneous batch, inserting new instances and updating
    /// stored ones.
    ///
    /// The whole save, including unsaved referenced instances, commits
    /// atomically. On failure nothing is written and ids and timestamps
    /// on the instances are restored.
    pub(crate) fn save_records(&self, records: &mut [&mut dyn Record]) -> Result<()> {
        let mut ledger = SaveLedger::default();
        let result = self
            .ex
            .savepoint("tablemap_save", |_| self.save_level(records, 0, &mut ledger));
        if let Err(err) = &result {
            if !ledger.is_empty() {
                tracing::debug!(
                    "Save failed ({}); restoring {} instance(s)",
                    err,
                    ledger.prior.len()
                );
                for record in records.iter_mut() {
                    self.restore(&mut ledger, &mut **record, 0);
                }
            }
        }
        result
    }

    /// Saves one level of the save tree inside its own savepoint.
    fn save_level(
        &self,
        records: &mut [&mut dyn Record],
        depth: usize,
        ledger: &mut SaveLedger,
    ) -> Result<()> {
        let Some(first) = records.first() else {
            return Ok(());
        };
        let table = first.table_name();
        let type_id = record_type(&**first);
        if let Some(other) = records
            .iter()
            .find(|r| r.table_name() != table || record_type(&***r) != type_id)
        {
            return Err(OrmError::HeterogeneousBatch {
                expected: table.to_string(),
                found: other.table_name().to_string(),
            });
        }
        if depth > self.config.max_relation_depth {
            tracing::warn!(
                "Nested save of {} exceeds relation depth {}",
                table,
                self.config.max_relation_depth
            );
            return Err(OrmError::DepthLimit {
                table: table.to_string(),
                limit: self.config.max_relation_depth,
            });
        }
        let map = self.registry.map_for(table)?;
        let joins = self.registry.joins(table)?;

        for record in records.iter_mut() {
            record.pre_save();
        }
        let savepoint = format!("tablemap_level_{}", depth);
        let result = self.ex.savepoint(&savepoint, |tx| {
            self.save_partitions(tx, map, joins, records, depth, ledger)
        });
        for record in records.iter_mut() {
            record.post_save();
        }
        result
    }

    fn save_partitions(
        &self,
        tx: &Executor<'_>,
        map: &PersistenceMap,
        joins: &HashMap<String, JoinMap>,
        records: &mut [&mut dyn Record],
        depth: usize,
        ledger: &mut SaveLedger,
    ) -> Result<()> {
        self.save_unsaved_related(map, records, depth, ledger)?;

        let (inserts, updates): (Vec<usize>, Vec<usize>) =
            (0..records.len()).partition(|&i| records[i].meta().is_new());
        let now = Utc::now();

        let ids = if inserts.is_empty() {
            Vec::new()
        } else {
            tx.savepoint("tablemap_inserts", |sp| {
                let mut ids = Vec::with_capacity(inserts.len());
                for &i in &inserts {
                    let record = &*records[i];
                    let id = insert_row(sp, map, record, now)?;
                    sync_joins(sp, map, joins, record, id, true)?;
                    ids.push(id);
                }
                Ok(ids)
            })?
        };
        if !updates.is_empty() {
            tx.savepoint("tablemap_updates", |sp| {
                for &i in &updates {
                    let record = &*records[i];
                    update_row(sp, map, record, now)?;
                    sync_joins(sp, map, joins, record, record.meta().id, false)?;
                }
                Ok(())
            })?;
        }

        // written back once this level's statements succeeded
        for (&i, &id) in inserts.iter().zip(&ids) {
            let table = records[i].table_name();
            let meta = records[i].meta_mut();
            ledger.remember(table, id, meta.clone());
            meta.id = id;
            meta.created_time = Some(meta.created_time.unwrap_or(now));
            meta.modified_time = Some(now);
        }
        for &i in &updates {
            let table = records[i].table_name();
            let meta = records[i].meta_mut();
            ledger.remember(table, meta.id, meta.clone());
            meta.modified_time = Some(now);
        }
        if !inserts.is_empty() {
            tracing::debug!("Inserted {} row(s) into {}", inserts.len(), map.table());
        }
        if !updates.is_empty() {
            tracing::debug!("Updated {} row(s) in {}", updates.len(), map.table());
        }
        Ok(())
    }

    /// Saves referenced instances that have no id yet, deepest first.
    fn save_unsaved_related(
        &self,
        map: &PersistenceMap,
        records: &mut [&mut dyn Record],
        depth: usize,
        ledger: &mut SaveLedger,
    ) -> Result<()> {
        for (property, persistence) in map.join_properties() {
            if persistence.kind.entity_ref().is_none() {
                continue;
            }
            for record in records.iter_mut() {
                let Some(related) = record.related_mut(property) else {
                    continue;
                };
                let mut unsaved: Vec<&mut dyn Record> = related
                    .into_iter()
                    .filter(|r| r.meta().is_new())
                    .collect();
                if !unsaved.is_empty() {
                    self.save_level(&mut unsaved, depth + 1, ledger)?;
                }
            }
        }
        Ok(())
    }

    /// Puts back the meta of `record` and the instances it references as
    /// recorded in `ledger`.
    fn restore(&self, ledger: &mut SaveLedger, record: &mut dyn Record, depth: usize) {
        if let Some(prior) = ledger.prior.remove(&(record.table_name(), record.meta().id)) {
            *record.meta_mut() = prior;
        }
        if ledger.is_empty() || depth > self.config.max_relation_depth {
            return;
        }
        let Ok(map) = self.registry.map_for(record.table_name()) else {
            return;
        };
        for (property, persistence) in map.join_properties() {
            if persistence.kind.entity_ref().is_none() {
                continue;
            }
            if let Some(related) = record.related_mut(property) {
                for nested in related {
                    self.restore(ledger, nested, depth + 1);
                }
            }
        }
    }

    /// Deletes the rows with `ids` from `table` and its join tables.
    pub(crate) fn delete_ids(&self, table: &str, ids: &[i64]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }
        let map = self.registry.map_for(table)?;
        let joins = self.registry.joins(table)?;
        let list = id_list(ids);
        self.ex.transaction(|tx| {
            tx.execute(
                &format!("DELETE FROM {} WHERE {} IN ({})", map.table(), keys::ID, list),
                &[],
            )?;
            for join in joins.values() {
                tx.execute(
                    &format!(
                        "DELETE FROM {} WHERE {} IN ({})",
                        join.join_table_name, join.parent_key_column, list
                    ),
                    &[],
                )?;
            }
            Ok(())
        })?;
        tracing::debug!("Deleted {} row(s) from {}", ids.len(), table);
        Ok(())
    }

    /// Empties `table` and its join tables and drops their indices.
    pub(crate) fn delete_all(&self, table: &str) -> Result<()> {
        let map = self.registry.map_for(table)?;
        let joins = self.registry.joins(table)?;
        self.ex.transaction(|tx| {
            for join in joins.values() {
                tx.execute(&format!("DELETE FROM {}", join.join_table_name), &[])?;
                tx.execute_batch(&format!(
                    "DROP INDEX IF EXISTS {}",
                    join.parent_index_name(map.table())
                ))?;
            }
            if let Some(indexer) = map.indexer() {
                tx.execute_batch(&format!(
                    "DROP INDEX IF EXISTS {}",
                    indexer.index_name(map.table())
                ))?;
            }
            tx.execute(&format!("DELETE FROM {}", map.table()), &[])?;
            Ok(())
        })?;
        if self.config.vacuum_after_delete_all {
            self.ex.execute_batch("VACUUM")?;
        }
        tracing::info!("Deleted all rows from {}", table);
        Ok(())
    }
}

/// Value written for an inline property, or `None` to leave the column out.
///
/// An update never writes a creation time the instance does not carry.
fn inline_value(
    record: &dyn Record,
    property: &str,
    now: DateTime<Utc>,
    inserting: bool,
) -> Option<Value> {
    match property {
        keys::ID => None,
        keys::MODIFIED_TIME => Some(Value::Date(now)),
        keys::CREATED_TIME if inserting => Some(record.meta().created_time.unwrap_or(now).into()),
        keys::CREATED_TIME => record.meta().created_time.map(Value::Date),
        _ => {
            let value = record.value(property);
            if value.is_none() {
                tracing::trace!("{}.{} is not readable", record.table_name(), property);
            }
            value
        }
    }
}

fn inline_columns<'m>(
    map: &'m PersistenceMap,
    record: &dyn Record,
    now: DateTime<Utc>,
    inserting: bool,
) -> (Vec<&'m str>, Vec<SqlValue>) {
    let mut columns = Vec::new();
    let mut params = Vec::new();
    for (name, _) in map.inline_properties() {
        if let Some(value) = inline_value(record, name, now, inserting) {
            columns.push(map.column_for_property(name).unwrap_or(name));
            params.push(value.to_sql());
        }
    }
    (columns, params)
}

fn insert_row(
    tx: &Executor<'_>,
    map: &PersistenceMap,
    record: &dyn Record,
    now: DateTime<Utc>,
) -> Result<i64> {
    let (columns, params) = inline_columns(map, record, now, true);
    let sql = if columns.is_empty() {
        format!("INSERT INTO {} DEFAULT VALUES", map.table())
    } else {
        format!(
            "INSERT INTO {} ({}) VALUES ({})",
            map.table(),
            columns.join(", "),
            placeholders(columns.len())
        )
    };
    tx.execute(&sql, &params)?;
    Ok(tx.last_insert_rowid())
}

fn update_row(
    tx: &Executor<'_>,
    map: &PersistenceMap,
    record: &dyn Record,
    now: DateTime<Utc>,
) -> Result<()> {
    let (columns, mut params) = inline_columns(map, record, now, false);
    let assignments: Vec<String> = columns.iter().map(|c| format!("{} = ?", c)).collect();
    let sql = format!(
        "UPDATE {} SET {} WHERE {} = ?",
        map.table(),
        assignments.join(", "),
        keys::ID
    );
    params.push(SqlValue::Integer(record.meta().id));
    let affected = tx.execute(&sql, &params)?;
    if affected == 0 {
        tracing::debug!("No row {} in {} to update", record.meta().id, map.table());
    }
    Ok(())
}

/// Stored elements of one join-backed property, or `None` when unreadable.
fn join_elements(record: &dyn Record, property: &str, kind: &StorageKind) -> Option<Vec<SqlValue>> {
    match kind {
        StorageKind::Object(_) | StorageKind::ObjectArray(_) => {
            let related = record.related(property)?;
            Some(
                related
                    .into_iter()
                    .filter_map(|r| {
                        let id = r.meta().id;
                        if id == 0 {
                            tracing::warn!(
                                "Unsaved {} in {}.{} not stored",
                                r.table_name(),
                                record.table_name(),
                                property
                            );
                            None
                        } else {
                            Some(SqlValue::Integer(id))
                        }
                    })
                    .collect(),
            )
        }
        _ => Some(match record.value(property)? {
            Value::Null => Vec::new(),
            Value::Array(items) => items.iter().map(Value::to_sql).collect(),
            single => vec![single.to_sql()],
        }),
    }
}

/// Rewrites the join rows of `record`, stored under `id`.
///
/// `fresh` rows have no join rows yet, so nothing is deleted first.
fn sync_joins(
    tx: &Executor<'_>,
    map: &PersistenceMap,
    joins: &HashMap<String, JoinMap>,
    record: &dyn Record,
    id: i64,
    fresh: bool,
) -> Result<()> {
    for (property, persistence) in map.join_properties() {
        let column = map.column_for_property(property).unwrap_or(property);
        let Some(join) = joins.get(column) else {
            tracing::warn!("No join map for {}.{}", map.table(), property);
            continue;
        };
        let Some(elements) = join_elements(record, property, &persistence.kind) else {
            continue;
        };
        if !fresh {
            tx.execute(
                &format!(
                    "DELETE FROM {} WHERE {} = ?",
                    join.join_table_name, join.parent_key_column
                ),
                &[SqlValue::Integer(id)],
            )?;
        }
        let sql = format!(
            "INSERT INTO {} ({}, {}) VALUES (?, ?)",
            join.join_table_name, join.parent_key_column, join.join_column_name
        );
        for element in elements {
            tx.execute(&sql, &[SqlValue::Integer(id), element])?;
        }
    }
    Ok(())
}

impl Manager {
    /// Inserts `record` if it has no id yet and updates it otherwise.
    pub fn save<T: TableObject>(&self, record: &mut T) -> Result<()> {
        self.save_record(record)
    }

    pub fn save_record(&self, record: &mut dyn Record) -> Result<()> {
        self.shared.session(|s| s.save_records(&mut [record]))
    }

    /// Saves every instance in `records`.
    pub fn save_all<T: TableObject>(&self, records: &mut [T]) -> Result<()> {
        let mut batch: Vec<&mut dyn Record> =
            records.iter_mut().map(|r| r as &mut dyn Record).collect();
        self.save_batch(&mut batch)
    }

    /// Saves a batch of instances of one entity type.
    ///
    /// A batch mixing types fails with [`OrmError::HeterogeneousBatch`]
    /// before anything is written.
    pub fn save_batch(&self, records: &mut [&mut dyn Record]) -> Result<()> {
        self.shared.session(|s| s.save_records(records))
    }

    /// Queued [`save`](Self::save); `completion` receives the saved instance.
    pub fn save_queued<T, F>(&self, record: T, completion: F) -> Result<()>
    where
        T: TableObject,
        F: FnOnce(Result<T>) + Send + 'static,
    {
        let shared = Arc::clone(&self.shared);
        self.queue.submit(move || {
            let mut record = record;
            let result = shared.session(|s| s.save_records(&mut [&mut record as &mut dyn Record]));
            completion(result.map(|()| record))
        })
    }

    /// Queued [`save_all`](Self::save_all).
    pub fn save_all_queued<T, F>(&self, records: Vec<T>, completion: F) -> Result<()>
    where
        T: TableObject,
        F: FnOnce(Result<Vec<T>>) + Send + 'static,
    {
        let shared = Arc::clone(&self.shared);
        self.queue.submit(move || {
            let mut records = records;
            let result = {
                let mut batch: Vec<&mut dyn Record> =
                    records.iter_mut().map(|r| r as &mut dyn Record).collect();
                shared.session(|s| s.save_records(&mut batch))
            };
            completion(result.map(|()| records))
        })
    }

    /// Deletes `record`'s row and join rows. Unsaved records are ignored.
    pub fn delete<T: TableObject>(&self, record: &T) -> Result<()> {
        self.delete_many(std::slice::from_ref(record))
    }

    pub fn delete_many<T: TableObject>(&self, records: &[T]) -> Result<()> {
        let ids: Vec<i64> = records
            .iter()
            .map(|r| r.meta().id)
            .filter(|&id| id != 0)
            .collect();
        self.shared.session(|s| s.delete_ids(T::TABLE, &ids))
    }

    /// Queued [`delete_many`](Self::delete_many).
    pub fn delete_many_queued<T, F>(&self, records: Vec<T>, completion: F) -> Result<()>
    where
        T: TableObject,
        F: FnOnce(Result<()>) + Send + 'static,
    {
        let ids: Vec<i64> = records
            .iter()
            .map(|r| r.meta().id)
            .filter(|&id| id != 0)
            .collect();
        let shared = Arc::clone(&self.shared);
        self.queue
            .submit(move || completion(shared.session(|s| s.delete_ids(T::TABLE, &ids))))
    }

    /// Deletes every instance of `T`.
    pub fn delete_all<T: TableObject>(&self) -> Result<()> {
        self.shared.session(|s| s.delete_all(T::TABLE))
    }
}
