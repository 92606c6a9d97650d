//! relq: a typed relational query engine.
//!
//! Queries are described fluently over registered entity shapes, compiled
//! into parameterized SQL for the connection's dialect, executed, and
//! materialized back into typed results, with soft-delete and tenant
//! filters applied by default and unit-of-work participation for
//! transactional reads.
//!
//! # Quick start
//!
//! ```ignore
//! use relq::prelude::*;
//!
//! let db = Db::new(connection);
//! db.register::<Article>();
//! db.register::<Category>();
//!
//! let page = db
//!     .query::<Article>()?
//!     .inner_join::<Category>(Article::CATEGORY_ID.eq_field(Category::ID))
//!     .filter(Article::TITLE.contains("rust"))
//!     .order_by_desc(Article::ID)
//!     .to_pagination(&cx, &Pagination::new(1, 20))
//!     .await;
//! ```

pub mod db;
pub mod prelude;

pub use db::{Db, FixedTenant, TenantResolver};

// The working set, re-exported at the root.
pub use relq_core::{
    ColumnInfo, Connection, Cx, DescriptorRegistry, Dialect, EMPTY_UUID, Entity,
    EntityDescriptor, Error, ExecutionError, FromRow, FromValue, Outcome, Result, Row, Value,
};
pub use relq_query::{
    Agg, AggregateFn, CompiledQuery, EntityList, Expr, Field, GroupingQuery, Having, PagedList,
    Pagination, QueryBody, QueryBuilder, QuerySource, Selection,
};
pub use relq_session::UnitOfWork;
