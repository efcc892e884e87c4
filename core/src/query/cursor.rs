use std::fmt;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures_util::stream::{self, BoxStream, Stream, StreamExt, TryStreamExt};

use super::{Datum, DriverError};

/// An asynchronous stream of result rows.
pub struct Cursor {
    rows: BoxStream<'static, Result<Datum, DriverError>>,
}

impl Cursor {
    pub fn new<S>(rows: S) -> Self
    where
        S: Stream<Item = Result<Datum, DriverError>> + Send + 'static,
    {
        Self { rows: rows.boxed() }
    }

    /// A cursor over rows that are already in memory.
    pub fn from_rows(rows: Vec<Datum>) -> Self {
        Self::new(stream::iter(rows.into_iter().map(Ok)))
    }

    /// Drain every remaining row. Fails on the first row error, dropping the
    /// rows collected so far.
    pub async fn to_vec(self) -> Result<Vec<Datum>, DriverError> {
        self.rows.try_collect().await
    }
}

impl Stream for Cursor {
    type Item = Result<Datum, DriverError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rows.poll_next_unpin(cx)
    }
}

impl fmt::Debug for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cursor").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_to_vec_keeps_order() {
        let cursor = Cursor::from_rows(vec![json!("a"), json!("b"), json!("c")]);
        assert_eq!(
            cursor.to_vec().await.unwrap(),
            vec![json!("a"), json!("b"), json!("c")]
        );
    }

    #[tokio::test]
    async fn test_to_vec_fails_on_row_error() {
        let rows = vec![
            Ok(json!(1)),
            Err(DriverError::Stream("connection reset".to_string())),
            Ok(json!(3)),
        ];
        let cursor = Cursor::new(stream::iter(rows));
        assert_eq!(
            cursor.to_vec().await,
            Err(DriverError::Stream("connection reset".to_string()))
        );
    }

    #[tokio::test]
    async fn test_cursor_is_a_stream() {
        let mut cursor = Cursor::from_rows(vec![json!(1)]);
        assert_eq!(cursor.next().await, Some(Ok(json!(1))));
        assert_eq!(cursor.next().await, None);
    }
}
