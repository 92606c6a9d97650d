//! Core types and traits for relq.
//!
//! `relq-core` is the foundation layer for the engine. It defines the
//! contracts everything else builds on:
//!
//! - **Data model**: [`Value`], [`Row`], and [`FromRow`] carry query
//!   inputs and outputs across the engine and driver boundary.
//! - **Metadata**: [`Entity`] and [`ColumnInfo`] declare an entity's
//!   physical mapping; [`DescriptorRegistry`] caches the immutable
//!   [`EntityDescriptor`] built from it.
//! - **Dialects**: [`Dialect`] concentrates placeholder style, quoting,
//!   pagination syntax, and lock hints.
//! - **Collaborators**: [`Connection`] is the execution boundary.
//! - **Structured concurrency**: `Cx` and `Outcome` are re-exported from
//!   asupersync so every database operation is cancel-correct.
//!
//! Applications normally use the `relq` facade; reach for `relq-core`
//! directly when implementing a connection or extending the engine.

// Re-export asupersync primitives for structured concurrency
pub use asupersync::{Cx, Outcome};

pub mod connection;
pub mod descriptor;
pub mod dialect;
pub mod entity;
pub mod error;
pub mod row;
pub mod value;

pub use connection::Connection;
pub use descriptor::{DescriptorRegistry, EntityDescriptor};
pub use dialect::Dialect;
pub use entity::{ColumnInfo, Entity};
pub use error::{Error, ExecutionError, Result};
pub use row::{FromRow, Row};
pub use value::{EMPTY_UUID, FromValue, Value};
