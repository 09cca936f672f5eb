//! Statement execution against the store connection.
//!
//! Every statement that fails is logged together with its SQL and the
//! driver's message, and the message is kept as the manager's last error.

pub mod queue;

pub use queue::SerialQueue;

use std::collections::HashMap;

use parking_lot::Mutex;
use rusqlite::types::Value as SqlValue;
use rusqlite::{params_from_iter, Connection, Transaction, TransactionBehavior};

use crate::error::{OrmError, Result};

/// Most recent statement failure message.
#[derive(Debug, Default)]
pub struct LastError(Mutex<String>);

impl LastError {
    pub fn set(&self, message: impl Into<String>) {
        *self.0.lock() = message.into();
    }

    pub fn get(&self) -> String {
        self.0.lock().clone()
    }
}

/// One result row, column names paired with stored values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    columns: Vec<(String, SqlValue)>,
}

impl Row {
    pub fn get(&self, column: &str) -> Option<&SqlValue> {
        self.columns
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    /// First column as an integer, if it holds one.
    pub fn first_int(&self) -> Option<i64> {
        match self.columns.first() {
            Some((_, SqlValue::Integer(i))) => Some(*i),
            Some((_, SqlValue::Real(f))) => Some(*f as i64),
            _ => None,
        }
    }

    pub fn columns(&self) -> impl Iterator<Item = (&str, &SqlValue)> {
        self.columns.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn into_columns(self) -> Vec<(String, SqlValue)> {
        self.columns
    }
}

/// Borrowed view of the connection used by one operation.
pub struct Executor<'c> {
    conn: &'c Connection,
    errors: &'c LastError,
}

impl<'c> Executor<'c> {
    pub fn new(conn: &'c Connection, errors: &'c LastError) -> Self {
        Self { conn, errors }
    }

    fn fail(&self, sql: &str, err: rusqlite::Error) -> OrmError {
        let message = err.to_string();
        tracing::error!("Statement failed: {} ({})", sql, message);
        self.errors.set(message.clone());
        OrmError::Statement {
            sql: sql.to_string(),
            message,
        }
    }

    /// Runs a row-returning statement and materializes every row.
    pub fn query(&self, sql: &str, params: &[SqlValue]) -> Result<Vec<Row>> {
        tracing::debug!("query: {}", sql);
        let mut stmt = self.conn.prepare(sql).map_err(|e| self.fail(sql, e))?;
        let names: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let mut rows = stmt
            .query(params_from_iter(params.iter()))
            .map_err(|e| self.fail(sql, e))?;

        let mut out = Vec::new();
        while let Some(row) = rows.next().map_err(|e| self.fail(sql, e))? {
            let mut columns = Vec::with_capacity(names.len());
            for (i, name) in names.iter().enumerate() {
                let value: SqlValue = row.get(i).map_err(|e| self.fail(sql, e))?;
                columns.push((name.clone(), value));
            }
            out.push(Row { columns });
        }
        Ok(out)
    }

    /// First column of every row, as integers. Non-integer cells are skipped.
    pub fn query_ids(&self, sql: &str, params: &[SqlValue]) -> Result<Vec<i64>> {
        Ok(self
            .query(sql, params)?
            .iter()
            .filter_map(Row::first_int)
            .collect())
    }

    /// Runs a statement and returns the number of affected rows.
    pub fn execute(&self, sql: &str, params: &[SqlValue]) -> Result<usize> {
        tracing::debug!("execute: {}", sql);
        let mut stmt = self
            .conn
            .prepare_cached(sql)
            .map_err(|e| self.fail(sql, e))?;
        stmt.execute(params_from_iter(params.iter()))
            .map_err(|e| self.fail(sql, e))
    }

    /// Runs one or more statements without parameters.
    pub fn execute_batch(&self, sql: &str) -> Result<()> {
        tracing::debug!("execute_batch: {}", sql);
        self.conn.execute_batch(sql).map_err(|e| self.fail(sql, e))
    }

    pub fn last_insert_rowid(&self) -> i64 {
        self.conn.last_insert_rowid()
    }

    /// Table name to creation statement, for every user table.
    pub fn creation_strings(&self) -> Result<HashMap<String, String>> {
        let rows = self.query(
            "SELECT name, sql FROM sqlite_master WHERE type = 'table'",
            &[],
        )?;
        let mut catalog = HashMap::with_capacity(rows.len());
        for row in rows {
            if let (Some(SqlValue::Text(name)), Some(SqlValue::Text(sql))) =
                (row.get("name"), row.get("sql"))
            {
                if name == "sqlite_sequence" {
                    continue;
                }
                catalog.insert(name.clone(), sql.clone());
            }
        }
        Ok(catalog)
    }

    /// Column names of `table` as reported by the store catalog.
    pub fn table_columns(&self, table: &str) -> Result<Vec<String>> {
        let sql = format!("PRAGMA table_info({})", table);
        Ok(self
            .query(&sql, &[])?
            .iter()
            .filter_map(|row| match row.get("name") {
                Some(SqlValue::Text(name)) => Some(name.clone()),
                _ => None,
            })
            .collect())
    }

    /// Runs `f` inside a transaction, committing on `Ok` and rolling back on `Err`.
    pub fn transaction<T>(&self, f: impl FnOnce(&Executor<'_>) -> Result<T>) -> Result<T> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Deferred)
            .map_err(|e| self.fail("BEGIN", e))?;
        let result = {
            let inner = Executor {
                conn: &tx,
                errors: self.errors,
            };
            f(&inner)
        };
        match result {
            Ok(value) => {
                tx.commit().map_err(|e| self.fail("COMMIT", e))?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback) = tx.rollback() {
                    tracing::warn!("Rollback failed: {}", rollback);
                }
                Err(err)
            }
        }
    }

    /// Runs `f` inside the savepoint `name`, releasing it on `Ok` and
    /// rolling back to it on `Err`.
    ///
    /// Savepoints nest. The outermost one opens and commits a transaction
    /// of its own, so `f` must not call [`transaction`](Self::transaction).
    pub fn savepoint<T>(&self, name: &str, f: impl FnOnce(&Executor<'_>) -> Result<T>) -> Result<T> {
        self.execute_batch(&format!("SAVEPOINT {}", name))?;
        let result = f(self).and_then(|value| {
            self.execute_batch(&format!("RELEASE {}", name))?;
            Ok(value)
        });
        if result.is_err() {
            if let Err(rollback) = self
                .conn
                .execute_batch(&format!("ROLLBACK TO {0}; RELEASE {0}", name))
            {
                tracing::warn!("Rollback to {} failed: {}", name, rollback);
            }
        }
        result
    }
}
