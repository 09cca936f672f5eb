//! Schema reconciliation between persistence maps and the live store.

pub mod introspect;
pub mod report;
pub mod table_builder;
pub mod validator;

pub use introspect::creation_string_columns;
pub use report::{SchemaFailure, SchemaReport};
pub use table_builder::{create_join_table_statement, create_table_statement};
pub use validator::SchemaValidator;
