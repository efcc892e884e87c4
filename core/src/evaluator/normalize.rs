//! Turns the raw result of a run into an [`Outcome`], running it against the
//! database first when it is a query.

use tracing::{debug, warn};

use crate::errors::RuntimeError;
use crate::evaluator::Outcome;
use crate::query::{Connection, Datum, Query, Response};
use crate::values::Value;

/// The closed set of shapes a run result can take.
enum Shape {
    Absent,
    Immediate(Value),
    Deferred(Query),
}

impl From<Value> for Shape {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Shape::Absent,
            Value::Query(query) => Shape::Deferred(query),
            other => Shape::Immediate(other),
        }
    }
}

/// Resolve `value` into an [`Outcome`].
///
/// Queries run on `connection`; a sequence response is drained completely
/// before returning. Failures from the driver become [`RuntimeError`]s
/// without a stack.
pub async fn normalize(value: Value, connection: &dyn Connection) -> Result<Outcome, RuntimeError> {
    let query = match Shape::from(value) {
        Shape::Absent => return Ok(Outcome::Empty),
        Shape::Immediate(value) => return Ok(Outcome::Immediate(value)),
        Shape::Deferred(query) => query,
    };

    debug!(%query, "Running query");
    let response = connection.run(&query).await.map_err(|err| {
        warn!(%query, error = %err, "Query failed");
        RuntimeError::driver(err)
    })?;

    match response {
        Response::Datum(Datum::Null) => Ok(Outcome::Empty),
        Response::Datum(datum) => Ok(Outcome::Resolved(Value::from(datum))),
        Response::Sequence(cursor) => {
            let rows = cursor.to_vec().await.map_err(|err| {
                warn!(%query, error = %err, "Draining cursor failed");
                RuntimeError::drain(err)
            })?;
            debug!(rows = rows.len(), "Drained cursor");
            Ok(Outcome::Sequence(rows.into_iter().map(Value::from).collect()))
        }
    }
}
