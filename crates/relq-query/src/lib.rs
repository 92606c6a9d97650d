//! Typed query builder and dialect-aware SQL compiler for relq.
//!
//! The pipeline: builder operations mutate a [`QueryBody`]; typed
//! predicates ([`Expr`]) translate against the join context; a terminal
//! read drives the [`SelectCompiler`] to produce parameterized SQL for
//! the connection's [`Dialect`](relq_core::Dialect), executes it, and
//! materializes rows via [`FromRow`](relq_core::FromRow).
//!
//! Builders are cheap, single-flow objects; [`QueryBuilder::copy`] is the
//! branching primitive and [`QueryBuilder::use_uow`] the transactional
//! binding.

pub mod body;
pub mod builder;
pub mod compile;
pub mod expr;
pub mod group;
pub mod pagination;

pub use body::{
    Filter, JoinKind, Projection, QueryBody, QueryJoin, Selection, Sort, SortDir, SortSpec,
    SubQueryOp,
};
pub use builder::{EntityList, QueryBuilder, QuerySource};
pub use compile::{AggregateFn, CompiledQuery, SelectCompiler};
pub use expr::{AliasContext, ColumnRef, CompareOp, Expr, Field, Operand};
pub use group::{Agg, GroupingQuery, Having};
pub use pagination::{PagedList, Pagination};
