/// Secondary index declaration for a primary table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Indexer {
    pub columns: Vec<String>,
    pub unique: bool,
}

impl Indexer {
    pub fn new<S: Into<String>>(columns: impl IntoIterator<Item = S>) -> Self {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            unique: false,
        }
    }

    pub fn unique<S: Into<String>>(columns: impl IntoIterator<Item = S>) -> Self {
        Self {
            unique: true,
            ..Self::new(columns)
        }
    }

    /// Name of the index this declaration creates on `table`.
    pub fn index_name(&self, table: &str) -> String {
        let mut name = format!("{}_", table);
        for column in self.columns.iter().filter(|c| !c.is_empty()) {
            name.push_str(column);
        }
        name
    }

    /// Index creation statement, or `None` when no usable column is declared.
    pub fn create_statement(&self, table: &str) -> Option<String> {
        let columns: Vec<&str> = self
            .columns
            .iter()
            .map(String::as_str)
            .filter(|c| !c.is_empty())
            .collect();
        if columns.is_empty() {
            tracing::warn!(
                "Indexer for table {} has no column names; no index statement generated",
                table
            );
            return None;
        }
        let create = if self.unique {
            "CREATE UNIQUE INDEX IF NOT EXISTS"
        } else {
            "CREATE INDEX IF NOT EXISTS"
        };
        Some(format!(
            "{} {} ON {} ({})",
            create,
            self.index_name(table),
            table,
            columns.join(",")
        ))
    }
}
