//! The typed fluent query builder.
//!
//! One generic builder covers every join arity: the type parameter `TS`
//! is a tuple of the joined entity types, in join order. Each join
//! operation moves the accumulated body into a builder of arity N+1;
//! `copy` is the only cloning operation. Terminal reads suspend only at
//! the database round trip and route through the bound unit of work when
//! one was set.
//!
//! # Example
//!
//! ```ignore
//! let articles = db
//!     .query::<Article>()?
//!     .inner_join::<Category>(Article::CATEGORY_ID.eq_field(Category::ID))
//!     .filter(Article::TITLE.eq("x"))
//!     .order_by_desc(Article::ID)
//!     .limit(0, 10)?
//!     .to_list(&cx)
//!     .await;
//! ```

use crate::body::{
    JoinKind, QueryBody, Selection, SortDir, SortSpec, SubQueryOp, validate_sort_field,
};
use crate::compile::{AggregateFn, CompiledQuery, SelectCompiler};
use crate::expr::{ColumnRef, Expr, Field};
use crate::group::GroupingQuery;
use crate::pagination::{PagedList, Pagination};
use asupersync::{Cx, Outcome};
use relq_core::{
    Connection, DescriptorRegistry, Dialect, EMPTY_UUID, Entity, Error, FromRow, FromValue,
    Result, Value,
};
use relq_session::UnitOfWork;
use std::any::TypeId;
use std::marker::PhantomData;
use std::sync::Arc;

/// Where a query executes: an ad-hoc connection, or a bound unit of work
/// whose connection must be used for every read.
#[derive(Debug)]
pub enum QuerySource<'a, C: Connection> {
    Connection(&'a C),
    Uow(&'a UnitOfWork<'a, C>),
}

impl<'a, C: Connection> Clone for QuerySource<'a, C> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<'a, C: Connection> Copy for QuerySource<'a, C> {}

impl<'a, C: Connection> QuerySource<'a, C> {
    /// The connection reads go through.
    pub fn connection(&self) -> &'a C {
        match *self {
            QuerySource::Connection(conn) => conn,
            QuerySource::Uow(uow) => uow.connection(),
        }
    }
}

/// The ordered list of joined entity types, implemented for tuples of
/// entities up to the maximum fan-out (8).
pub trait EntityList: Send + Sync + 'static {
    /// The root entity (first join, alias `T1`); terminal reads
    /// materialize into it by default.
    type Root: Entity;
    /// Number of joined entities.
    const ARITY: usize;
}

macro_rules! unit {
    ($t:ident) => {
        ()
    };
}

macro_rules! impl_entity_list {
    ($root:ident $(, $rest:ident)*) => {
        impl<$root: Entity $(, $rest: Entity)*> EntityList for ($root, $($rest,)*) {
            type Root = $root;
            const ARITY: usize = <[()]>::len(&[unit!($root) $(, unit!($rest))*]);
        }
    };
}

impl_entity_list!(E1);
impl_entity_list!(E1, E2);
impl_entity_list!(E1, E2, E3);
impl_entity_list!(E1, E2, E3, E4);
impl_entity_list!(E1, E2, E3, E4, E5);
impl_entity_list!(E1, E2, E3, E4, E5, E6);
impl_entity_list!(E1, E2, E3, E4, E5, E6, E7);
impl_entity_list!(E1, E2, E3, E4, E5, E6, E7, E8);

/// The fluent query surface over one `QueryBody`.
///
/// Not thread-safe; build and await within one logical flow, and use
/// [`QueryBuilder::copy`] to branch.
#[derive(Debug)]
pub struct QueryBuilder<'a, C: Connection, TS> {
    body: QueryBody,
    source: QuerySource<'a, C>,
    registry: Arc<DescriptorRegistry>,
    _entities: PhantomData<TS>,
}

impl<'a, C: Connection, E: Entity> QueryBuilder<'a, C, (E,)> {
    /// Root a new query at `E`. Fails when `E` was never registered.
    pub fn new(
        source: QuerySource<'a, C>,
        registry: Arc<DescriptorRegistry>,
        tenant: Option<Value>,
    ) -> Result<Self> {
        let descriptor = registry.get::<E>()?;
        let mut body = QueryBody::new(TypeId::of::<E>(), descriptor);
        body.tenant = tenant;
        Ok(Self {
            body,
            source,
            registry,
            _entities: PhantomData,
        })
    }
}

fn uuid_is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Uuid(u) => u == EMPTY_UUID,
        Value::Text(s) => s.is_empty() || s == EMPTY_UUID,
        _ => false,
    }
}

impl<'a, C: Connection, TS> QueryBuilder<'a, C, TS> {
    fn rebind<TS2>(self) -> QueryBuilder<'a, C, TS2> {
        QueryBuilder {
            body: self.body,
            source: self.source,
            registry: self.registry,
            _entities: PhantomData,
        }
    }

    fn push_join<J: Entity, TS2>(
        mut self,
        kind: JoinKind,
        on: Expr,
        table_name: Option<&str>,
        no_lock: bool,
    ) -> QueryBuilder<'a, C, TS2> {
        match self.registry.get::<J>() {
            Ok(descriptor) => self.body.add_join(
                TypeId::of::<J>(),
                descriptor,
                kind,
                on,
                table_name.map(str::to_string),
                no_lock,
            ),
            Err(e) => self.body.defer_error(e),
        }
        self.rebind()
    }

    /// Direct access to the accumulated query state.
    pub fn body(&self) -> &QueryBody {
        &self.body
    }

    // ==================== Where ====================

    /// Append a predicate; predicates are AND-conjoined in append order.
    pub fn filter(mut self, predicate: Expr) -> Self {
        self.body.set_where(predicate);
        self
    }

    /// Append a raw SQL predicate fragment.
    pub fn filter_raw(mut self, sql: &str) -> Result<Self> {
        self.body.set_where_raw(sql)?;
        Ok(self)
    }

    /// Append the predicate only when `condition` holds.
    pub fn filter_if(self, condition: bool, predicate: Expr) -> Self {
        if condition { self.filter(predicate) } else { self }
    }

    /// Append the raw fragment only when `condition` holds.
    pub fn filter_if_raw(self, condition: bool, sql: &str) -> Result<Self> {
        if condition { self.filter_raw(sql) } else { Ok(self) }
    }

    /// Append one of two predicates depending on `condition`. Both
    /// branches are mandatory; there is no silently-skipping else.
    pub fn filter_if_else(self, condition: bool, when_true: Expr, when_false: Expr) -> Self {
        self.filter(if condition { when_true } else { when_false })
    }

    /// Raw-fragment form of [`QueryBuilder::filter_if_else`].
    pub fn filter_if_else_raw(
        self,
        condition: bool,
        when_true: &str,
        when_false: &str,
    ) -> Result<Self> {
        self.filter_raw(if condition { when_true } else { when_false })
    }

    /// Append the predicate only when `value` is neither NULL nor an
    /// empty string.
    pub fn filter_not_null(self, value: impl Into<Value>, predicate: Expr) -> Self {
        if value.into().is_empty() { self } else { self.filter(predicate) }
    }

    /// Append `when_some` when `value` is non-empty, `when_none`
    /// otherwise.
    pub fn filter_not_null_else(
        self,
        value: impl Into<Value>,
        when_some: Expr,
        when_none: Expr,
    ) -> Self {
        if value.into().is_empty() {
            self.filter(when_none)
        } else {
            self.filter(when_some)
        }
    }

    /// Raw-fragment form of [`QueryBuilder::filter_not_null`].
    pub fn filter_not_null_raw(self, value: impl Into<Value>, sql: &str) -> Result<Self> {
        if value.into().is_empty() { Ok(self) } else { self.filter_raw(sql) }
    }

    /// Append the predicate only when the id is not the all-zero UUID
    /// sentinel (and not NULL/empty).
    pub fn filter_not_empty(self, id: impl Into<Value>, predicate: Expr) -> Self {
        if uuid_is_empty(&id.into()) { self } else { self.filter(predicate) }
    }

    /// Append `when_set` when the id is a real UUID, `when_empty`
    /// otherwise.
    pub fn filter_not_empty_else(
        self,
        id: impl Into<Value>,
        when_set: Expr,
        when_empty: Expr,
    ) -> Self {
        if uuid_is_empty(&id.into()) {
            self.filter(when_empty)
        } else {
            self.filter(when_set)
        }
    }

    /// Raw-fragment form of [`QueryBuilder::filter_not_empty`].
    pub fn filter_not_empty_raw(self, id: impl Into<Value>, sql: &str) -> Result<Self> {
        if uuid_is_empty(&id.into()) { Ok(self) } else { self.filter_raw(sql) }
    }

    // ==================== Sub-queries ====================

    fn sub_query<E: Entity, T, U>(
        mut self,
        field: Field<E, T>,
        op: SubQueryOp,
        sub: &QueryBuilder<'_, C, U>,
    ) -> Self {
        self.body.set_where_sub(field.to_ref(), op, sub.body.copy());
        self
    }

    /// `field = (sub-select)`
    pub fn sub_query_eq<E: Entity, T, U>(
        self,
        field: Field<E, T>,
        sub: &QueryBuilder<'_, C, U>,
    ) -> Self {
        self.sub_query(field, SubQueryOp::Eq, sub)
    }

    /// `field <> (sub-select)`
    pub fn sub_query_ne<E: Entity, T, U>(
        self,
        field: Field<E, T>,
        sub: &QueryBuilder<'_, C, U>,
    ) -> Self {
        self.sub_query(field, SubQueryOp::Ne, sub)
    }

    /// `field > (sub-select)`
    pub fn sub_query_gt<E: Entity, T, U>(
        self,
        field: Field<E, T>,
        sub: &QueryBuilder<'_, C, U>,
    ) -> Self {
        self.sub_query(field, SubQueryOp::Gt, sub)
    }

    /// `field >= (sub-select)`
    pub fn sub_query_ge<E: Entity, T, U>(
        self,
        field: Field<E, T>,
        sub: &QueryBuilder<'_, C, U>,
    ) -> Self {
        self.sub_query(field, SubQueryOp::Ge, sub)
    }

    /// `field < (sub-select)`
    pub fn sub_query_lt<E: Entity, T, U>(
        self,
        field: Field<E, T>,
        sub: &QueryBuilder<'_, C, U>,
    ) -> Self {
        self.sub_query(field, SubQueryOp::Lt, sub)
    }

    /// `field <= (sub-select)`
    pub fn sub_query_le<E: Entity, T, U>(
        self,
        field: Field<E, T>,
        sub: &QueryBuilder<'_, C, U>,
    ) -> Self {
        self.sub_query(field, SubQueryOp::Le, sub)
    }

    /// `field IN (sub-select)`. The embedded query keeps its own filters
    /// and projection exactly as its builder set them.
    pub fn sub_query_in<E: Entity, T, U>(
        self,
        field: Field<E, T>,
        sub: &QueryBuilder<'_, C, U>,
    ) -> Self {
        self.sub_query(field, SubQueryOp::In, sub)
    }

    /// `field NOT IN (sub-select)`
    pub fn sub_query_not_in<E: Entity, T, U>(
        self,
        field: Field<E, T>,
        sub: &QueryBuilder<'_, C, U>,
    ) -> Self {
        self.sub_query(field, SubQueryOp::NotIn, sub)
    }

    // ==================== Sort ====================

    /// Ascending sort. Only one ORDER BY clause is retained: calling any
    /// sort method again discards the previous one.
    pub fn order_by<E: Entity, T>(mut self, field: Field<E, T>) -> Self {
        self.body.set_sort(SortSpec::Field(field.to_ref()), SortDir::Asc);
        self
    }

    /// Descending sort; last-write-wins like [`QueryBuilder::order_by`].
    pub fn order_by_desc<E: Entity, T>(mut self, field: Field<E, T>) -> Self {
        self.body.set_sort(SortSpec::Field(field.to_ref()), SortDir::Desc);
        self
    }

    /// Ascending sort on a raw field name.
    pub fn order_by_raw(mut self, field: &str) -> Result<Self> {
        let field = validate_sort_field(field)?;
        self.body.set_sort(SortSpec::Raw(field), SortDir::Asc);
        Ok(self)
    }

    /// Descending sort on a raw field name.
    pub fn order_by_raw_desc(mut self, field: &str) -> Result<Self> {
        let field = validate_sort_field(field)?;
        self.body.set_sort(SortSpec::Raw(field), SortDir::Desc);
        Ok(self)
    }

    // ==================== Select / Limit ====================

    /// Project onto the given columns. Conflicts with `select_exclude`.
    pub fn select(mut self, columns: Selection) -> Result<Self> {
        self.body.set_select(columns.into_refs())?;
        Ok(self)
    }

    /// Project with a verbatim SELECT list.
    pub fn select_raw(mut self, sql: &str) -> Result<Self> {
        self.body.set_select_raw(sql)?;
        Ok(self)
    }

    /// Project onto all root columns except the given ones. Conflicts
    /// with `select`.
    pub fn select_exclude(mut self, columns: Selection) -> Result<Self> {
        self.body.set_select_exclude(columns.into_refs())?;
        Ok(self)
    }

    /// Skip/take limiting; `take` must be positive. Overwrites any
    /// previous limit.
    pub fn limit(mut self, skip: i64, take: i64) -> Result<Self> {
        self.body.set_limit(skip, take)?;
        Ok(self)
    }

    // ==================== Default filters ====================

    /// Keep soft-deleted rows in this query's results.
    pub fn include_deleted(mut self) -> Self {
        self.body.filter_deleted = false;
        self
    }

    /// Drop the tenant predicate for this query.
    pub fn all_tenants(mut self) -> Self {
        self.body.filter_tenant = false;
        self
    }

    // ==================== Composition ====================

    /// A structurally independent copy sharing the same source; mutating
    /// it never affects this builder.
    pub fn copy(&self) -> Self {
        QueryBuilder {
            body: self.body.copy(),
            source: self.source,
            registry: Arc::clone(&self.registry),
            _entities: PhantomData,
        }
    }

    /// Route every read of this query through the unit of work's bound
    /// connection.
    pub fn use_uow(mut self, uow: &'a UnitOfWork<'a, C>) -> Self {
        self.source = QuerySource::Uow(uow);
        self
    }
}

// ==================== Joins ====================

macro_rules! impl_joins {
    ($($E:ident),+) => {
        impl<'a, C: Connection, $($E: Entity),+> QueryBuilder<'a, C, ($($E,)+)> {
            /// Inner-join one more entity; the new entity gets the next
            /// positional alias.
            pub fn inner_join<J: Entity>(self, on: Expr) -> QueryBuilder<'a, C, ($($E,)+ J)> {
                self.push_join::<J, ($($E,)+ J)>(JoinKind::Inner, on, None, true)
            }

            /// Inner join with a custom physical table name and lock-hint
            /// flag. The override never changes the alias.
            pub fn inner_join_with<J: Entity>(
                self,
                on: Expr,
                table_name: Option<&str>,
                no_lock: bool,
            ) -> QueryBuilder<'a, C, ($($E,)+ J)> {
                self.push_join::<J, ($($E,)+ J)>(JoinKind::Inner, on, table_name, no_lock)
            }

            /// Left-join one more entity.
            pub fn left_join<J: Entity>(self, on: Expr) -> QueryBuilder<'a, C, ($($E,)+ J)> {
                self.push_join::<J, ($($E,)+ J)>(JoinKind::Left, on, None, true)
            }

            /// Left join with a custom table name and lock-hint flag.
            pub fn left_join_with<J: Entity>(
                self,
                on: Expr,
                table_name: Option<&str>,
                no_lock: bool,
            ) -> QueryBuilder<'a, C, ($($E,)+ J)> {
                self.push_join::<J, ($($E,)+ J)>(JoinKind::Left, on, table_name, no_lock)
            }

            /// Right-join one more entity.
            pub fn right_join<J: Entity>(self, on: Expr) -> QueryBuilder<'a, C, ($($E,)+ J)> {
                self.push_join::<J, ($($E,)+ J)>(JoinKind::Right, on, None, true)
            }

            /// Right join with a custom table name and lock-hint flag.
            pub fn right_join_with<J: Entity>(
                self,
                on: Expr,
                table_name: Option<&str>,
                no_lock: bool,
            ) -> QueryBuilder<'a, C, ($($E,)+ J)> {
                self.push_join::<J, ($($E,)+ J)>(JoinKind::Right, on, table_name, no_lock)
            }
        }
    };
}

impl_joins!(E1);
impl_joins!(E1, E2);
impl_joins!(E1, E2, E3);
impl_joins!(E1, E2, E3, E4);
impl_joins!(E1, E2, E3, E4, E5);
impl_joins!(E1, E2, E3, E4, E5, E6);
impl_joins!(E1, E2, E3, E4, E5, E6, E7);

// ==================== Terminal reads ====================

fn attach_statement(error: Error, compiled: &CompiledQuery) -> Error {
    match error {
        Error::Execution(mut ex) => {
            if ex.sql.is_empty() {
                ex.sql = compiled.sql.clone();
                ex.params = compiled.params.clone();
            }
            Error::Execution(ex)
        }
        Error::Connection(msg) => Error::execution(msg, &compiled.sql, &compiled.params),
        other => other,
    }
}

impl<'a, C: Connection, TS: EntityList> QueryBuilder<'a, C, TS> {
    fn dialect(&self) -> Dialect {
        self.source.connection().dialect()
    }

    /// Compile the current state to SQL without executing. Useful for
    /// diagnostics and tests.
    pub fn compile(&self) -> Result<CompiledQuery> {
        SelectCompiler::new(&self.body, self.dialect()).compile()
    }

    /// Fan out into a GROUP BY query over the given key columns.
    pub fn group_by(self, keys: Selection) -> GroupingQuery<'a, C> {
        GroupingQuery::new(self.body, keys, self.source)
    }

    async fn fetch_rows(
        &self,
        cx: &Cx,
        compiled: &CompiledQuery,
    ) -> Outcome<Vec<relq_core::Row>, Error> {
        match self
            .source
            .connection()
            .query(cx, &compiled.sql, &compiled.params)
            .await
        {
            Outcome::Ok(rows) => Outcome::Ok(rows),
            Outcome::Err(e) => Outcome::Err(attach_statement(e, compiled)),
            Outcome::Cancelled(r) => Outcome::Cancelled(r),
            Outcome::Panicked(p) => Outcome::Panicked(p),
        }
    }

    /// Read all matching rows as the root entity.
    pub async fn to_list(&self, cx: &Cx) -> Outcome<Vec<TS::Root>, Error> {
        self.to_list_as::<TS::Root>(cx).await
    }

    /// Read all matching rows into a projected result shape.
    #[tracing::instrument(level = "debug", skip(self, cx))]
    pub async fn to_list_as<T: FromRow>(&self, cx: &Cx) -> Outcome<Vec<T>, Error> {
        let compiled = match self.compile() {
            Ok(c) => c,
            Err(e) => return Outcome::Err(e),
        };
        let rows = match self.fetch_rows(cx, &compiled).await {
            Outcome::Ok(rows) => rows,
            Outcome::Err(e) => return Outcome::Err(e),
            Outcome::Cancelled(r) => return Outcome::Cancelled(r),
            Outcome::Panicked(p) => return Outcome::Panicked(p),
        };
        let mut items = Vec::with_capacity(rows.len());
        for row in &rows {
            match T::from_row(row) {
                Ok(item) => items.push(item),
                Err(e) => return Outcome::Err(e),
            }
        }
        Outcome::Ok(items)
    }

    /// Read the first matching row as the root entity, if any.
    pub async fn to_first(&self, cx: &Cx) -> Outcome<Option<TS::Root>, Error> {
        self.to_first_as::<TS::Root>(cx).await
    }

    /// Read the first matching row into a projected result shape.
    #[tracing::instrument(level = "debug", skip(self, cx))]
    pub async fn to_first_as<T: FromRow>(&self, cx: &Cx) -> Outcome<Option<T>, Error> {
        let mut body = self.body.copy();
        if body.limit.is_none() {
            if let Err(e) = body.set_limit(0, 1) {
                return Outcome::Err(e);
            }
        }
        let compiled = match SelectCompiler::new(&body, self.dialect()).compile() {
            Ok(c) => c,
            Err(e) => return Outcome::Err(e),
        };
        let row = match self
            .source
            .connection()
            .query_one(cx, &compiled.sql, &compiled.params)
            .await
        {
            Outcome::Ok(row) => row,
            Outcome::Err(e) => return Outcome::Err(attach_statement(e, &compiled)),
            Outcome::Cancelled(r) => return Outcome::Cancelled(r),
            Outcome::Panicked(p) => return Outcome::Panicked(p),
        };
        match row {
            Some(row) => match T::from_row(&row) {
                Ok(item) => Outcome::Ok(Some(item)),
                Err(e) => Outcome::Err(e),
            },
            None => Outcome::Ok(None),
        }
    }

    /// Count rows matching the current joins and predicates, ignoring
    /// sort and limit.
    #[tracing::instrument(level = "debug", skip(self, cx))]
    pub async fn to_count(&self, cx: &Cx) -> Outcome<i64, Error> {
        let compiled = match SelectCompiler::new(&self.body, self.dialect()).compile_count() {
            Ok(c) => c,
            Err(e) => return Outcome::Err(e),
        };
        let scalar = match self
            .source
            .connection()
            .query_scalar(cx, &compiled.sql, &compiled.params)
            .await
        {
            Outcome::Ok(v) => v.unwrap_or(Value::Null),
            Outcome::Err(e) => return Outcome::Err(attach_statement(e, &compiled)),
            Outcome::Cancelled(r) => return Outcome::Cancelled(r),
            Outcome::Panicked(p) => return Outcome::Panicked(p),
        };
        match i64::from_value(scalar) {
            Ok(n) => Outcome::Ok(n),
            Err(e) => Outcome::Err(e),
        }
    }

    /// Read one page as the root entity, with the total row count.
    pub async fn to_pagination(
        &self,
        cx: &Cx,
        paging: &Pagination,
    ) -> Outcome<PagedList<TS::Root>, Error> {
        self.to_pagination_as::<TS::Root>(cx, paging).await
    }

    /// Read one page into a projected result shape.
    ///
    /// Unless an explicit total override was supplied, a `COUNT(*)` over
    /// the same joins and predicates runs first to fill the page
    /// metadata.
    #[tracing::instrument(level = "debug", skip(self, cx))]
    pub async fn to_pagination_as<T: FromRow>(
        &self,
        cx: &Cx,
        paging: &Pagination,
    ) -> Outcome<PagedList<T>, Error> {
        let total = match paging.total_override {
            Some(total) => total,
            None => match self.to_count(cx).await {
                Outcome::Ok(n) => n,
                Outcome::Err(e) => return Outcome::Err(e),
                Outcome::Cancelled(r) => return Outcome::Cancelled(r),
                Outcome::Panicked(p) => return Outcome::Panicked(p),
            },
        };

        let mut body = self.body.copy();
        if let Err(e) = body.set_limit(paging.skip(), paging.take()) {
            return Outcome::Err(e);
        }
        let compiled = match SelectCompiler::new(&body, self.dialect()).compile() {
            Ok(c) => c,
            Err(e) => return Outcome::Err(e),
        };
        let rows = match self.fetch_rows(cx, &compiled).await {
            Outcome::Ok(rows) => rows,
            Outcome::Err(e) => return Outcome::Err(e),
            Outcome::Cancelled(r) => return Outcome::Cancelled(r),
            Outcome::Panicked(p) => return Outcome::Panicked(p),
        };
        let mut items = Vec::with_capacity(rows.len());
        for row in &rows {
            match T::from_row(row) {
                Ok(item) => items.push(item),
                Err(e) => return Outcome::Err(e),
            }
        }
        Outcome::Ok(PagedList {
            page: paging.page,
            size: paging.size,
            total,
            items,
        })
    }

    #[tracing::instrument(level = "debug", skip(self, cx))]
    async fn run_aggregate(
        &self,
        cx: &Cx,
        func: AggregateFn,
        column: ColumnRef,
    ) -> Outcome<Value, Error> {
        let compiled = match SelectCompiler::new(&self.body, self.dialect())
            .compile_aggregate(func, &column)
        {
            Ok(c) => c,
            Err(e) => return Outcome::Err(e),
        };
        match self
            .source
            .connection()
            .query_scalar(cx, &compiled.sql, &compiled.params)
            .await
        {
            Outcome::Ok(v) => Outcome::Ok(v.unwrap_or(Value::Null)),
            Outcome::Err(e) => Outcome::Err(attach_statement(e, &compiled)),
            Outcome::Cancelled(r) => Outcome::Cancelled(r),
            Outcome::Panicked(p) => Outcome::Panicked(p),
        }
    }

    async fn aggregate_as<V: FromValue>(
        &self,
        cx: &Cx,
        func: AggregateFn,
        column: ColumnRef,
    ) -> Outcome<V, Error> {
        match self.run_aggregate(cx, func, column).await {
            Outcome::Ok(value) => match V::from_value(value) {
                Ok(v) => Outcome::Ok(v),
                Err(e) => Outcome::Err(e),
            },
            Outcome::Err(e) => Outcome::Err(e),
            Outcome::Cancelled(r) => Outcome::Cancelled(r),
            Outcome::Panicked(p) => Outcome::Panicked(p),
        }
    }

    /// `MAX(field)` over the filtered rows; sort and limit are ignored.
    pub async fn to_max<E: Entity, T: FromValue>(
        &self,
        cx: &Cx,
        field: Field<E, T>,
    ) -> Outcome<T, Error> {
        self.aggregate_as(cx, AggregateFn::Max, field.to_ref()).await
    }

    /// `MIN(field)` over the filtered rows.
    pub async fn to_min<E: Entity, T: FromValue>(
        &self,
        cx: &Cx,
        field: Field<E, T>,
    ) -> Outcome<T, Error> {
        self.aggregate_as(cx, AggregateFn::Min, field.to_ref()).await
    }

    /// `SUM(field)` over the filtered rows; zero matching rows read as 0.
    pub async fn to_sum<E: Entity, T: FromValue>(
        &self,
        cx: &Cx,
        field: Field<E, T>,
    ) -> Outcome<T, Error> {
        self.aggregate_as(cx, AggregateFn::Sum, field.to_ref()).await
    }

    /// `AVG(field)` over the filtered rows; zero matching rows read as 0.
    pub async fn to_avg<E: Entity, T>(&self, cx: &Cx, field: Field<E, T>) -> Outcome<f64, Error> {
        self.aggregate_as(cx, AggregateFn::Avg, field.to_ref()).await
    }
}
