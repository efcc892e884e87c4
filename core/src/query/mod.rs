//! The database the evaluator hands deferred queries to.
//!
//! Evaluated code builds [`Query`] values lazily through `r`. When a unit's
//! result is a query, the evaluator runs it on the context's [`Connection`] and
//! waits for either a single [`Datum`] or a [`Cursor`] of rows.

mod connection;
mod cursor;
mod memory;
mod term;

pub use connection::{Connection, DriverError, Response};
pub use cursor::Cursor;
pub use memory::MemoryConnection;
pub use term::{Query, QueryError, Term, TermKind, build};

/// A JSON-shaped value as stored and returned by the database.
pub type Datum = serde_json::Value;
