use async_trait::async_trait;
use thiserror::Error;

use super::{Cursor, Datum, Query};

/// What the database produced for a query.
#[derive(Debug)]
pub enum Response {
    /// A single value, possibly `null`.
    Datum(Datum),
    /// A sequence of rows that still has to be drained.
    Sequence(Cursor),
}

/// Failures reported by the database driver, either when running a query or
/// while draining its cursor.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DriverError {
    #[error("Database `{0}` does not exist.")]
    DbNotFound(String),

    #[error("Database `{0}` already exists.")]
    DbExists(String),

    #[error("Table `{db}.{table}` does not exist.")]
    TableNotFound { db: String, table: String },

    #[error("Table `{db}.{table}` already exists.")]
    TableExists { db: String, table: String },

    /// The query was well formed but made no sense for the data it met.
    #[error("{0}")]
    Logic(String),

    /// The cursor failed after some rows were already produced.
    #[error("cursor failed: {0}")]
    Stream(String),
}

/// A handle to the database.
///
/// Implementations must be usable from several evaluations at once; the
/// evaluator only ever borrows the connection for the duration of one run.
#[async_trait]
pub trait Connection: Send + Sync {
    async fn run(&self, query: &Query) -> Result<Response, DriverError>;
}
