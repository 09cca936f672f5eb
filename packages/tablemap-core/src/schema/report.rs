/// Statement that the store rejected during reconciliation.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaFailure {
    pub sql: String,
    pub message: String,
}

/// Outcome of reconciling one persistence map with the store.
///
/// Reconciliation does not stop at the first failure, so a report may hold
/// both successful statements and failures.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchemaReport {
    pub table: String,
    /// Primary table was created by this run
    pub created_table: bool,
    /// Columns added to the primary table
    pub added_columns: Vec<String>,
    /// Join tables created by this run
    pub created_join_tables: Vec<String>,
    /// Columns added to existing join tables, as `table.column`
    pub repaired_join_columns: Vec<String>,
    /// Every statement that succeeded, in execution order
    pub statements: Vec<String>,
    /// Properties skipped because they are not readable on the type
    pub warnings: Vec<String>,
    pub failures: Vec<SchemaFailure>,
}

impl SchemaReport {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            ..Self::default()
        }
    }

    /// True when no statement failed.
    pub fn is_ok(&self) -> bool {
        self.failures.is_empty()
    }

    /// Number of `ALTER TABLE` statements that ran.
    pub fn alter_count(&self) -> usize {
        self.statements
            .iter()
            .filter(|s| s.starts_with("ALTER TABLE"))
            .count()
    }

    pub(crate) fn warn(&mut self, message: String) {
        tracing::warn!("{}", message);
        self.warnings.push(message);
    }

    pub(crate) fn record(&mut self, sql: &str, result: crate::error::Result<()>) -> bool {
        match result {
            Ok(()) => {
                self.statements.push(sql.to_string());
                true
            }
            Err(err) => {
                let message = match err {
                    crate::error::OrmError::Statement { message, .. } => message,
                    other => other.to_string(),
                };
                self.failures.push(SchemaFailure {
                    sql: sql.to_string(),
                    message,
                });
                false
            }
        }
    }
}
