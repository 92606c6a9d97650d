//! The connection collaborator boundary.
//!
//! The engine only ever asks a connection to run parameterized SQL and
//! hand back rows or a scalar. Pooling, retries, and reconnection live
//! behind this trait, not in the engine.

use crate::dialect::Dialect;
use crate::error::Error;
use crate::row::Row;
use crate::value::Value;
use asupersync::{Cx, Outcome};
use std::future::Future;

/// A database connection (or something that behaves like one).
///
/// Every call takes a `Cx` and returns an `Outcome` so cancellation can
/// abort the in-flight round trip instead of returning partial results.
/// Implementations should check `cx.cancel_reason()` before touching the
/// wire.
pub trait Connection: Send + Sync {
    /// The dialect this connection speaks; compilation targets it.
    fn dialect(&self) -> Dialect;

    /// Run a statement and return all result rows.
    fn query(
        &self,
        cx: &Cx,
        sql: &str,
        params: &[Value],
    ) -> impl Future<Output = Outcome<Vec<Row>, Error>> + Send;

    /// Run a statement and return the first result row, if any.
    fn query_one(
        &self,
        cx: &Cx,
        sql: &str,
        params: &[Value],
    ) -> impl Future<Output = Outcome<Option<Row>, Error>> + Send;

    /// Run a statement and return the first column of the first row.
    ///
    /// `None` means the statement produced no rows at all.
    fn query_scalar(
        &self,
        cx: &Cx,
        sql: &str,
        params: &[Value],
    ) -> impl Future<Output = Outcome<Option<Value>, Error>> + Send;

    /// Run a statement and return the affected row count.
    fn execute(
        &self,
        cx: &Cx,
        sql: &str,
        params: &[Value],
    ) -> impl Future<Output = Outcome<u64, Error>> + Send;
}
