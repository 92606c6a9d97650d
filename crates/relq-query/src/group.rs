//! GROUP BY queries.
//!
//! `GroupingQuery` is the restricted builder produced by
//! `QueryBuilder::group_by`: it keeps the originating query's joins,
//! predicates, and default filters, and adds group keys, aggregate
//! selections, HAVING conditions, and its own sort/limit.
//!
//! # Example
//!
//! ```ignore
//! let rows = db.query::<Article>()?
//!     .group_by(Selection::of(Article::CATEGORY_ID))
//!     .agg(Agg::count().as_alias("articles"))
//!     .having(Agg::count().gt(5i64))
//!     .to_rows(&cx)
//!     .await;
//! ```

use crate::body::{QueryBody, Selection, SortDir, validate_sort_field};
use crate::builder::QuerySource;
use crate::compile::{AggregateFn, CompiledQuery, SelectCompiler};
use crate::expr::{ColumnRef, CompareOp};
use asupersync::{Cx, Outcome};
use relq_core::{Connection, Dialect, Error, FromRow, Result, Row, Value};

/// One aggregate selection: function, optional target column, alias.
#[derive(Debug, Clone)]
pub struct Agg {
    func: AggregateFn,
    column: Option<ColumnRef>,
    alias: String,
}

impl Agg {
    /// `COUNT(*)`, aliased `count` by default.
    pub fn count() -> Self {
        Self {
            func: AggregateFn::Count,
            column: None,
            alias: "count".to_string(),
        }
    }

    fn over<E: relq_core::Entity, T>(func: AggregateFn, field: crate::expr::Field<E, T>) -> Self {
        Self {
            func,
            column: Some(field.to_ref()),
            alias: field.name.to_string(),
        }
    }

    /// `SUM(field)`, aliased with the field name by default.
    pub fn sum<E: relq_core::Entity, T>(field: crate::expr::Field<E, T>) -> Self {
        Self::over(AggregateFn::Sum, field)
    }

    /// `AVG(field)`
    pub fn avg<E: relq_core::Entity, T>(field: crate::expr::Field<E, T>) -> Self {
        Self::over(AggregateFn::Avg, field)
    }

    /// `MAX(field)`
    pub fn max<E: relq_core::Entity, T>(field: crate::expr::Field<E, T>) -> Self {
        Self::over(AggregateFn::Max, field)
    }

    /// `MIN(field)`
    pub fn min<E: relq_core::Entity, T>(field: crate::expr::Field<E, T>) -> Self {
        Self::over(AggregateFn::Min, field)
    }

    /// Override the result column alias.
    pub fn as_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = alias.into();
        self
    }

    fn render(
        &self,
        ctx: &crate::expr::AliasContext,
        dialect: Dialect,
    ) -> Result<String> {
        match &self.column {
            None => Ok(format!("{}(*)", self.func.as_sql())),
            Some(col) => {
                let target = ctx.resolve(col, dialect)?;
                Ok(format!("{}({target})", self.func.as_sql()))
            }
        }
    }

    fn cmp(self, op: CompareOp, value: impl Into<Value>) -> Having {
        Having {
            agg: self,
            op,
            value: value.into(),
        }
    }

    /// `agg > value` HAVING condition.
    pub fn gt(self, value: impl Into<Value>) -> Having {
        self.cmp(CompareOp::Gt, value)
    }

    /// `agg >= value`
    pub fn ge(self, value: impl Into<Value>) -> Having {
        self.cmp(CompareOp::Ge, value)
    }

    /// `agg < value`
    pub fn lt(self, value: impl Into<Value>) -> Having {
        self.cmp(CompareOp::Lt, value)
    }

    /// `agg <= value`
    pub fn le(self, value: impl Into<Value>) -> Having {
        self.cmp(CompareOp::Le, value)
    }

    /// `agg = value`
    pub fn eq(self, value: impl Into<Value>) -> Having {
        self.cmp(CompareOp::Eq, value)
    }

    /// `agg <> value`
    pub fn ne(self, value: impl Into<Value>) -> Having {
        self.cmp(CompareOp::Ne, value)
    }
}

/// One HAVING condition; the comparison value is bound as a parameter.
#[derive(Debug, Clone)]
pub struct Having {
    agg: Agg,
    op: CompareOp,
    value: Value,
}

/// A GROUP BY query over the originating builder's joins and predicates.
pub struct GroupingQuery<'a, C: Connection> {
    body: QueryBody,
    keys: Vec<ColumnRef>,
    aggs: Vec<Agg>,
    having: Vec<Having>,
    sort: Option<(String, SortDir)>,
    limit: Option<(u64, u64)>,
    source: QuerySource<'a, C>,
}

impl<'a, C: Connection> GroupingQuery<'a, C> {
    pub(crate) fn new(body: QueryBody, keys: Selection, source: QuerySource<'a, C>) -> Self {
        Self {
            body,
            keys: keys.into_refs(),
            aggs: Vec::new(),
            having: Vec::new(),
            sort: None,
            limit: None,
            source,
        }
    }

    /// Add an aggregate result column.
    pub fn agg(mut self, agg: Agg) -> Self {
        self.aggs.push(agg);
        self
    }

    /// Add a HAVING condition; conditions are AND-conjoined.
    pub fn having(mut self, having: Having) -> Self {
        self.having.push(having);
        self
    }

    /// Ascending sort on a result column name; last-write-wins.
    pub fn order_by_raw(mut self, field: &str) -> Result<Self> {
        self.sort = Some((validate_sort_field(field)?, SortDir::Asc));
        Ok(self)
    }

    /// Descending sort on a result column name.
    pub fn order_by_raw_desc(mut self, field: &str) -> Result<Self> {
        self.sort = Some((validate_sort_field(field)?, SortDir::Desc));
        Ok(self)
    }

    /// Skip/take limiting over the grouped rows.
    pub fn limit(mut self, skip: i64, take: i64) -> Result<Self> {
        if take <= 0 {
            return Err(Error::InvalidArgument(format!(
                "limit take must be positive, got {take}"
            )));
        }
        if skip < 0 {
            return Err(Error::InvalidArgument(format!(
                "limit skip must not be negative, got {skip}"
            )));
        }
        self.limit = Some((skip as u64, take as u64));
        Ok(self)
    }

    /// Compile the grouped statement for this source's dialect.
    pub fn compile(&self) -> Result<CompiledQuery> {
        let dialect = self.source.connection().dialect();
        if self.keys.is_empty() {
            return Err(Error::InvalidArgument(
                "group_by requires at least one key column".to_string(),
            ));
        }

        let prepared = SelectCompiler::new(&self.body, dialect).into_prepared()?;
        let ctx = prepared.ctx;
        let mut params = prepared.params;

        let mut select_items = Vec::with_capacity(self.keys.len() + self.aggs.len());
        let mut group_items = Vec::with_capacity(self.keys.len());
        for key in &self.keys {
            let (alias, info) = ctx.resolve_entry(key)?;
            let reference = format!("{alias}.{}", dialect.quote_identifier(info.column_name));
            select_items.push(format!(
                "{reference} AS {}",
                dialect.quote_identifier(info.name)
            ));
            group_items.push(reference);
        }
        for agg in &self.aggs {
            select_items.push(format!(
                "{} AS {}",
                agg.render(&ctx, dialect)?,
                dialect.quote_identifier(&agg.alias)
            ));
        }

        let mut sql = format!(
            "SELECT {} FROM {}",
            select_items.join(", "),
            prepared.from_sql
        );
        if !prepared.where_sql.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&prepared.where_sql);
        }
        sql.push_str(" GROUP BY ");
        sql.push_str(&group_items.join(", "));

        if !self.having.is_empty() {
            let mut parts = Vec::with_capacity(self.having.len());
            for having in &self.having {
                params.push(having.value.clone());
                parts.push(format!(
                    "{} {} {}",
                    having.agg.render(&ctx, dialect)?,
                    having.op.as_sql(),
                    dialect.placeholder(params.len())
                ));
            }
            sql.push_str(" HAVING ");
            sql.push_str(&parts.join(" AND "));
        }

        let mut has_order = false;
        if let Some((field, dir)) = &self.sort {
            sql.push_str(&format!(" ORDER BY {field} {}", dir.as_sql()));
            has_order = true;
        }
        if let Some((skip, take)) = self.limit {
            if !has_order && dialect.pagination_requires_order() {
                sql.push_str(" ORDER BY (SELECT NULL)");
            }
            sql.push(' ');
            sql.push_str(&dialect.pagination(skip, take));
        }

        tracing::debug!(dialect = ?dialect, sql = %sql, "compiled grouped select");
        Ok(CompiledQuery { sql, params })
    }

    /// Execute and return the grouped rows untyped.
    #[tracing::instrument(level = "debug", skip(self, cx))]
    pub async fn to_rows(&self, cx: &Cx) -> Outcome<Vec<Row>, Error> {
        let compiled = match self.compile() {
            Ok(c) => c,
            Err(e) => return Outcome::Err(e),
        };
        match self
            .source
            .connection()
            .query(cx, &compiled.sql, &compiled.params)
            .await
        {
            Outcome::Ok(rows) => Outcome::Ok(rows),
            Outcome::Err(e) => Outcome::Err(e),
            Outcome::Cancelled(r) => Outcome::Cancelled(r),
            Outcome::Panicked(p) => Outcome::Panicked(p),
        }
    }

    /// Execute and materialize each grouped row into `T`.
    pub async fn to_list_as<T: FromRow>(&self, cx: &Cx) -> Outcome<Vec<T>, Error> {
        let rows = match self.to_rows(cx).await {
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
}
