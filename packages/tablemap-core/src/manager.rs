//! Manager: store handle, registry of mapped types and table utilities.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use rusqlite::types::Value as SqlValue;
use rusqlite::Connection;

use crate::config::ManagerConfig;
use crate::error::{OrmError, Result};
use crate::executor::{Executor, LastError, Row, SerialQueue};
use crate::map::{EntityDefinition, JoinMap, PersistenceMap};
use crate::record::{make_default, Record, RecordFactory, TableObject};
use crate::schema::{SchemaReport, SchemaValidator};
use crate::version::DbVersion;

/// Persistence maps, join maps and factories of every registered type.
#[derive(Default)]
pub(crate) struct Registry {
    maps: HashMap<String, PersistenceMap>,
    joins: HashMap<String, HashMap<String, JoinMap>>,
    factories: HashMap<String, RecordFactory>,
}

impl Registry {
    pub(crate) fn map_for(&self, table: &str) -> Result<&PersistenceMap> {
        self.maps
            .get(table)
            .filter(|m| m.is_initialized())
            .ok_or_else(|| OrmError::UnknownEntity(table.to_string()))
    }

    /// Join maps of `table`, keyed by element column name.
    pub(crate) fn joins(&self, table: &str) -> Result<&HashMap<String, JoinMap>> {
        self.joins
            .get(table)
            .ok_or_else(|| OrmError::UnknownEntity(table.to_string()))
    }

    /// Fresh default instance of the type registered for `table`.
    pub(crate) fn instantiate(&self, table: &str) -> Result<Box<dyn Record>> {
        self.factories
            .get(table)
            .map(|factory| factory())
            .ok_or_else(|| OrmError::UnknownEntity(table.to_string()))
    }
}

/// State shared between the manager and its queue worker.
pub(crate) struct Shared {
    conn: Mutex<Connection>,
    registry: RwLock<Registry>,
    config: ManagerConfig,
    errors: LastError,
}

impl Shared {
    /// Runs `f` with the registry read-locked and the connection held.
    pub(crate) fn session<R>(&self, f: impl FnOnce(&Session<'_>) -> R) -> R {
        let registry = self.registry.read();
        let conn = self.conn.lock();
        let session = Session {
            ex: Executor::new(&conn, &self.errors),
            registry: &registry,
            config: &self.config,
        };
        f(&session)
    }
}

/// Everything one operation needs, borrowed for its duration.
pub(crate) struct Session<'a> {
    pub(crate) ex: Executor<'a>,
    pub(crate) registry: &'a Registry,
    pub(crate) config: &'a ManagerConfig,
}

/// Entry point of the mapping engine.
///
/// Owns the store connection, the registry of mapped types and a serial
/// queue for background operations. Synchronous calls and queued jobs
/// share one connection and never run concurrently.
pub struct Manager {
    pub(crate) shared: Arc<Shared>,
    pub(crate) queue: SerialQueue,
}

impl Manager {
    /// Opens the store described by `config` and registers the version table.
    pub fn open(config: ManagerConfig) -> Result<Self> {
        let conn = match &config.path {
            Some(path) => Connection::open(path)?,
            None => Connection::open_in_memory()?,
        };
        conn.busy_timeout(config.busy_timeout())?;
        if config.wal_journal {
            let mode: String = conn.query_row("PRAGMA journal_mode=WAL", [], |row| row.get(0))?;
            tracing::debug!("Journal mode: {}", mode);
        }

        let manager = Self {
            shared: Arc::new(Shared {
                conn: Mutex::new(conn),
                registry: RwLock::new(Registry::default()),
                config,
                errors: LastError::default(),
            }),
            queue: SerialQueue::spawn("tablemap-queue")?,
        };
        manager.register::<DbVersion>()?;

        match &manager.shared.config.path {
            Some(path) => tracing::info!("Opened store at {}", path.display()),
            None => tracing::info!("Opened in-memory store"),
        }
        Ok(manager)
    }

    /// Opens a private in-memory store.
    pub fn in_memory() -> Result<Self> {
        Self::open(ManagerConfig::in_memory())
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.shared.config
    }

    /// Adds property declarations to `table`'s map ahead of registration.
    ///
    /// Fails with [`OrmError::MapFrozen`] once the type is registered.
    pub fn add_persistence_map_contents(
        &self,
        table: &str,
        definition: EntityDefinition,
    ) -> Result<()> {
        let mut registry = self.shared.registry.write();
        let base = registry
            .maps
            .get(table)
            .cloned()
            .unwrap_or_else(|| PersistenceMap::register(table));
        let (contents, indexer) = definition.into_parts();
        let map = base.append(contents, indexer)?;
        registry.maps.insert(table.to_string(), map);
        Ok(())
    }

    /// Registers `T`, freezing its map and reconciling the store schema.
    ///
    /// Registering an already registered type only re-runs reconciliation,
    /// which issues no statements against an up-to-date store.
    pub fn register<T: TableObject>(&self) -> Result<SchemaReport> {
        let table = T::TABLE;
        let mut registry = self.shared.registry.write();
        let map = match registry.maps.get(table) {
            Some(map) if map.is_initialized() => map.clone(),
            existing => {
                let base = existing
                    .cloned()
                    .unwrap_or_else(|| PersistenceMap::register(table));
                let (contents, indexer) = T::definition().into_parts();
                let mut map = base.append(contents, indexer)?;
                map.mark_initialized();
                map
            }
        };

        let sample = T::default();
        let (report, joins) = {
            let conn = self.shared.conn.lock();
            let ex = Executor::new(&conn, &self.shared.errors);
            SchemaValidator::new(&ex).validate(&map, &sample)
        };
        tracing::debug!(
            "Registered {} ({} properties, {} join tables)",
            table,
            map.len(),
            joins.len()
        );

        registry.maps.insert(table.to_string(), map);
        registry.joins.insert(table.to_string(), joins);
        registry
            .factories
            .insert(table.to_string(), make_default::<T> as RecordFactory);
        Ok(report)
    }

    /// Primary table name of `T`.
    pub fn table_name<T: TableObject>(&self) -> &'static str {
        T::TABLE
    }

    pub fn is_registered(&self, table: &str) -> bool {
        self.shared.registry.read().map_for(table).is_ok()
    }

    /// Copy of `table`'s persistence map.
    pub fn persistence_map(&self, table: &str) -> Option<PersistenceMap> {
        self.shared.registry.read().maps.get(table).cloned()
    }

    /// Copy of `table`'s join maps, keyed by element column.
    pub fn join_maps(&self, table: &str) -> HashMap<String, JoinMap> {
        self.shared
            .registry
            .read()
            .joins
            .get(table)
            .cloned()
            .unwrap_or_default()
    }

    /// Number of rows in `table`.
    pub fn count_for_table(&self, table: &str) -> Result<i64> {
        let sql = format!("SELECT COUNT(*) FROM {}", table);
        self.shared.session(|s| {
            s.ex.query_ids(&sql, &[])?
                .first()
                .copied()
                .ok_or_else(|| OrmError::NotFound(table.to_string()))
        })
    }

    pub fn vacuum(&self) -> Result<()> {
        self.shared.session(|s| s.ex.execute_batch("VACUUM"))
    }

    pub fn drop_index(&self, name: &str) -> Result<()> {
        let sql = format!("DROP INDEX IF EXISTS {}", name);
        self.shared.session(|s| s.ex.execute_batch(&sql))
    }

    /// Compares the stored schema version with `version`.
    ///
    /// Returns whether the stored version is at least `version`, and the
    /// stored version (0 when none is stored).
    pub fn has_latest_version(&self, version: f64) -> Result<(bool, f64)> {
        let sql = format!("SELECT MAX({}) FROM {}", DbVersion::VERSION, DbVersion::TABLE);
        let stored = self.shared.session(|s| s.ex.query(&sql, &[]))?;
        let stored = match stored.first().and_then(|row| row.columns().next()) {
            Some((_, SqlValue::Real(v))) => *v,
            Some((_, SqlValue::Integer(v))) => *v as f64,
            _ => 0.0,
        };
        Ok((stored >= version, stored))
    }

    /// Stores `version` unless an equal or newer version is already stored.
    pub fn set_current_version(&self, version: f64) -> Result<()> {
        let (latest, stored) = self.has_latest_version(version)?;
        if latest {
            tracing::debug!("Stored version {} is current", stored);
            return Ok(());
        }
        let mut marker = self
            .all_instances::<DbVersion>()?
            .into_iter()
            .next()
            .unwrap_or_default();
        marker.version = version;
        self.save(&mut marker)
    }

    /// Message of the most recent failed statement.
    pub fn error_message(&self) -> String {
        self.shared.errors.get()
    }

    /// Runs raw SQL that returns no rows.
    pub fn execute_sql(&self, sql: &str) -> Result<()> {
        self.shared.session(|s| s.ex.execute_batch(sql))
    }

    /// Runs a raw query and returns its rows.
    pub fn query_sql(&self, sql: &str) -> Result<Vec<Row>> {
        self.shared.session(|s| s.ex.query(sql, &[]))
    }

    /// Blocks until every queued operation submitted so far has completed.
    pub fn flush_queue(&self) -> Result<()> {
        self.queue.flush()
    }
}
