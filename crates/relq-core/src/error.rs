//! Error taxonomy.
//!
//! Builder-time mistakes (conflicting projections, bad limits, malformed
//! raw fragments) fail at the call that introduced them. Translation and
//! compilation errors are pure data errors and surface at the terminal
//! read, before any network call. Execution failures wrap the driver
//! error together with the compiled SQL and the bound parameters; the
//! `Display` form never prints parameter values.

use crate::value::Value;
use std::fmt;

/// Convenience alias used across the engine.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// All errors produced by the query engine.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// No descriptor was registered for the entity type.
    UnregisteredEntity { entity: &'static str },
    /// Conflicting projection modes (inclusive select and exclude on one query).
    InvalidProjection(String),
    /// Invalid caller input: non-positive take, malformed raw SQL fragment.
    InvalidArgument(String),
    /// The translator cannot lower a construct to SQL.
    UnsupportedExpression(String),
    /// The database reported a failure while executing compiled SQL.
    Execution(ExecutionError),
    /// The connection collaborator failed outside of statement execution.
    Connection(String),
    /// An in-flight operation was cancelled.
    Cancelled(String),
}

/// Execution failure details: driver message plus the statement that was
/// running, kept for diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionError {
    /// Driver-reported message.
    pub message: String,
    /// The compiled SQL text.
    pub sql: String,
    /// Bound parameters, in placeholder order.
    pub params: Vec<Value>,
}

impl ExecutionError {
    pub fn new(message: impl Into<String>, sql: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            message: message.into(),
            sql: sql.into(),
            params,
        }
    }
}

impl Error {
    /// Wrap a driver failure with the statement it was executing.
    pub fn execution(message: impl Into<String>, sql: impl Into<String>, params: &[Value]) -> Self {
        Error::Execution(ExecutionError::new(message, sql, params.to_vec()))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::UnregisteredEntity { entity } => {
                write!(f, "entity `{entity}` is not registered")
            }
            Error::InvalidProjection(msg) => write!(f, "invalid projection: {msg}"),
            Error::InvalidArgument(msg) => write!(f, "invalid argument: {msg}"),
            Error::UnsupportedExpression(msg) => write!(f, "unsupported expression: {msg}"),
            Error::Execution(e) => write!(
                f,
                "execution failed: {} (sql: {}; {} parameter(s))",
                e.message,
                e.sql,
                e.params.len()
            ),
            Error::Connection(msg) => write!(f, "connection error: {msg}"),
            Error::Cancelled(msg) => write!(f, "operation cancelled: {msg}"),
        }
    }
}

impl std::error::Error for Error {}
