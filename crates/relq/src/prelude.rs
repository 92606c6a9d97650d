//! The relq prelude: everything a typical caller needs.
//!
//! ```ignore
//! use relq::prelude::*;
//! ```

pub use crate::db::{Db, FixedTenant, TenantResolver};
pub use relq_core::{
    ColumnInfo, Connection, Cx, Dialect, Entity, Error, FromRow, FromValue, Outcome, Result, Row,
    Value,
};
pub use relq_query::{
    Agg, Expr, Field, PagedList, Pagination, QueryBuilder, Selection,
};
pub use relq_session::UnitOfWork;
