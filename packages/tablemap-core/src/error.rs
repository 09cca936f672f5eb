//! Mapping engine error types.

use thiserror::Error;

/// Errors surfaced by the mapping engine.
///
/// Schema reconciliation never returns these; it reports problems through
/// [`crate::schema::SchemaReport`] instead.
#[derive(Error, Debug)]
pub enum OrmError {
    /// Statement failed inside the store driver
    #[error("SQL error: {message} (statement: {sql})")]
    Statement { sql: String, message: String },

    /// Driver error outside of a tracked statement
    #[error("Store error: {0}")]
    Store(#[from] rusqlite::Error),

    /// Entity type has not been registered with the manager
    #[error("Entity type '{0}' is not registered")]
    UnknownEntity(String),

    /// Persistence map is frozen and cannot accept more properties
    #[error("Persistence map for '{0}' is initialized and cannot be extended")]
    MapFrozen(String),

    /// Batch contains instances of more than one entity type
    #[error("Batch contains mixed entity types: '{expected}' and '{found}'")]
    HeterogeneousBatch { expected: String, found: String },

    /// Row could not be turned into a typed instance
    #[error("Mapping error for '{table}': {message}")]
    Mapping { table: String, message: String },

    /// Relation graph deeper than the configured limit
    #[error("Relation depth limit {limit} exceeded while processing '{table}'")]
    DepthLimit { table: String, limit: usize },

    /// A statement produced no row where one was required
    #[error("No row returned for '{0}'")]
    NotFound(String),

    /// Serial queue worker has shut down
    #[error("Execution queue closed")]
    QueueClosed,

    /// Invalid configuration value or file
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, OrmError>;
