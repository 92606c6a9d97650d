//! The dialect-aware SELECT compiler.
//!
//! Compilation walks a fixed phase order over one `QueryBody`:
//! `Draft -> JoinsResolved -> PredicatesResolved -> ProjectionResolved ->
//! Finalized`. Joins render first so on-condition parameters precede
//! predicate parameters; injected soft-delete/tenant predicates come
//! before caller predicates; sub-queries compile recursively into the
//! same parameter list so placeholder numbering stays continuous.

use crate::body::{Filter, Projection, QueryBody, SortSpec};
use crate::expr::{AliasContext, ColumnRef};
use relq_core::{Dialect, Error, Result, Value};

/// A finished statement: SQL text plus bound parameters in placeholder
/// order.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledQuery {
    pub sql: String,
    pub params: Vec<Value>,
}

/// Aggregate functions for terminal reads and grouping selections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateFn {
    Count,
    Max,
    Min,
    Sum,
    Avg,
}

impl AggregateFn {
    pub const fn as_sql(self) -> &'static str {
        match self {
            AggregateFn::Count => "COUNT",
            AggregateFn::Max => "MAX",
            AggregateFn::Min => "MIN",
            AggregateFn::Sum => "SUM",
            AggregateFn::Avg => "AVG",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Draft,
    JoinsResolved,
    PredicatesResolved,
    ProjectionResolved,
    Finalized,
}

/// Compiles one `QueryBody` for one dialect.
pub struct SelectCompiler<'b> {
    body: &'b QueryBody,
    dialect: Dialect,
    ctx: AliasContext,
    phase: Phase,
    params: Vec<Value>,
    from_sql: String,
    where_sql: String,
    select_sql: String,
}

/// Joins and predicates resolved, ready for a custom SELECT head (used
/// by the grouping compiler).
pub(crate) struct Prepared {
    pub ctx: AliasContext,
    pub params: Vec<Value>,
    pub from_sql: String,
    pub where_sql: String,
}

impl<'b> SelectCompiler<'b> {
    pub fn new(body: &'b QueryBody, dialect: Dialect) -> Self {
        Self::with_params(body, dialect, Vec::new())
    }

    /// Continue an outer compilation: parameters already bound by the
    /// enclosing query keep their positions.
    fn with_params(body: &'b QueryBody, dialect: Dialect, params: Vec<Value>) -> Self {
        Self {
            ctx: body.alias_context(),
            body,
            dialect,
            phase: Phase::Draft,
            params,
            from_sql: String::new(),
            where_sql: String::new(),
            select_sql: String::new(),
        }
    }

    /// Compile the full SELECT: projection, joins, predicates, sort,
    /// pagination.
    pub fn compile(mut self) -> Result<CompiledQuery> {
        self.check_deferred()?;
        self.resolve_joins()?;
        self.resolve_predicates()?;
        self.resolve_projection()?;
        self.finalize()
    }

    /// Compile the matching `COUNT(*)` statement: same joins and
    /// predicates, no projection, sort, or pagination.
    pub fn compile_count(mut self) -> Result<CompiledQuery> {
        self.check_deferred()?;
        self.resolve_joins()?;
        self.resolve_predicates()?;
        let mut sql = format!("SELECT COUNT(*) FROM {}", self.from_sql);
        if !self.where_sql.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&self.where_sql);
        }
        tracing::debug!(dialect = ?self.dialect, sql = %sql, "compiled count");
        Ok(CompiledQuery {
            sql,
            params: self.params,
        })
    }

    /// Compile a single-aggregate statement over one column, bypassing
    /// projection, sort, and pagination entirely.
    pub fn compile_aggregate(
        mut self,
        func: AggregateFn,
        column: &ColumnRef,
    ) -> Result<CompiledQuery> {
        self.check_deferred()?;
        self.resolve_joins()?;
        self.resolve_predicates()?;
        let target = self.ctx.resolve(column, self.dialect)?;
        let mut sql = format!(
            "SELECT {}({target}) FROM {}",
            func.as_sql(),
            self.from_sql
        );
        if !self.where_sql.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&self.where_sql);
        }
        tracing::debug!(dialect = ?self.dialect, sql = %sql, "compiled aggregate");
        Ok(CompiledQuery {
            sql,
            params: self.params,
        })
    }

    /// Resolve joins and predicates, handing the pieces to a caller that
    /// assembles its own SELECT head (grouping).
    pub(crate) fn into_prepared(mut self) -> Result<Prepared> {
        self.check_deferred()?;
        self.resolve_joins()?;
        self.resolve_predicates()?;
        Ok(Prepared {
            ctx: self.ctx,
            params: self.params,
            from_sql: self.from_sql,
            where_sql: self.where_sql,
        })
    }

    /// A deferred translation error fails the compile before any phase
    /// runs, and before any network call.
    fn check_deferred(&self) -> Result<()> {
        match &self.body.deferred {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }

    fn resolve_joins(&mut self) -> Result<()> {
        debug_assert_eq!(self.phase, Phase::Draft);
        let mut sql = String::new();
        for (i, join) in self.body.joins.iter().enumerate() {
            let table = self.dialect.quote_identifier(&join.table_name);
            let lock = if join.no_lock && self.dialect.supports_lock_hints() {
                self.dialect.lock_hint()
            } else {
                ""
            };
            if i == 0 {
                sql = format!("{table} AS {}{lock}", join.alias);
            } else {
                let on = join.on.as_ref().ok_or_else(|| {
                    Error::UnsupportedExpression(format!(
                        "join `{}` has no on-condition",
                        join.alias
                    ))
                })?;
                let on_sql = on.render(&self.ctx, self.dialect, &mut self.params)?;
                sql.push_str(&format!(
                    " {} {table} AS {}{lock} ON {on_sql}",
                    join.kind.as_sql(),
                    join.alias
                ));
            }
        }
        self.from_sql = sql;
        self.phase = Phase::JoinsResolved;
        Ok(())
    }

    fn resolve_predicates(&mut self) -> Result<()> {
        debug_assert_eq!(self.phase, Phase::JoinsResolved);
        let mut parts: Vec<String> = Vec::new();

        // Injected default filters first, in join order. Joined tables get
        // their own predicates; only the whole-query flags opt out.
        if self.body.filter_deleted {
            for join in &self.body.joins {
                if let Some(col) = join.descriptor.soft_delete_column {
                    parts.push(format!(
                        "{}.{} = {}",
                        join.alias,
                        self.dialect.quote_identifier(col),
                        self.dialect.bool_literal(false)
                    ));
                }
            }
        }
        if self.body.filter_tenant {
            if let Some(tenant) = &self.body.tenant {
                for join in &self.body.joins {
                    if let Some(col) = join.descriptor.tenant_column {
                        self.params.push(tenant.clone());
                        parts.push(format!(
                            "{}.{} = {}",
                            join.alias,
                            self.dialect.quote_identifier(col),
                            self.dialect.placeholder(self.params.len())
                        ));
                    }
                }
            }
        }

        // Caller predicates, AND-conjoined in append order.
        for filter in &self.body.filters {
            match filter {
                Filter::Expr(expr) => {
                    parts.push(expr.render(&self.ctx, self.dialect, &mut self.params)?);
                }
                Filter::Raw(sql) => parts.push(sql.clone()),
                Filter::Sub { column, op, body } => {
                    let lhs = self.ctx.resolve(column, self.dialect)?;
                    let sub_sql = compile_subquery(body, self.dialect, &mut self.params)?;
                    parts.push(format!("{lhs} {} ({sub_sql})", op.as_sql()));
                }
            }
        }

        self.where_sql = parts.join(" AND ");
        self.phase = Phase::PredicatesResolved;
        Ok(())
    }

    fn resolve_projection(&mut self) -> Result<()> {
        debug_assert_eq!(self.phase, Phase::PredicatesResolved);
        let root = self.body.root();
        self.select_sql = match &self.body.projection {
            None => default_projection(root, &[], self.dialect),
            Some(Projection::Columns(cols)) => {
                let mut parts = Vec::with_capacity(cols.len());
                for col in cols {
                    let (alias, info) = self.ctx.resolve_entry(col)?;
                    parts.push(column_item(alias, info, self.dialect));
                }
                parts.join(", ")
            }
            Some(Projection::Exclude(cols)) => {
                let mut excluded: Vec<&'static str> = Vec::with_capacity(cols.len());
                for col in cols {
                    if col.entity != root.entity {
                        return Err(Error::UnsupportedExpression(format!(
                            "select_exclude must reference the root entity, got `{}`",
                            col.entity_name
                        )));
                    }
                    // Resolve to verify the field exists.
                    self.ctx.resolve_entry(col)?;
                    excluded.push(col.field);
                }
                default_projection(root, &excluded, self.dialect)
            }
            Some(Projection::Raw(sql)) => sql.clone(),
        };
        self.phase = Phase::ProjectionResolved;
        Ok(())
    }

    fn finalize(mut self) -> Result<CompiledQuery> {
        debug_assert_eq!(self.phase, Phase::ProjectionResolved);
        let mut sql = format!("SELECT {} FROM {}", self.select_sql, self.from_sql);
        if !self.where_sql.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&self.where_sql);
        }

        let mut has_order = false;
        if let Some(sort) = &self.body.sort {
            let target = match &sort.spec {
                SortSpec::Field(col) => self.ctx.resolve(col, self.dialect)?,
                SortSpec::Raw(raw) => raw.clone(),
            };
            sql.push_str(&format!(" ORDER BY {target} {}", sort.dir.as_sql()));
            has_order = true;
        }

        if let Some((skip, take)) = self.body.limit {
            if !has_order && self.dialect.pagination_requires_order() {
                // OFFSET/FETCH is only grammatical after ORDER BY.
                sql.push_str(" ORDER BY (SELECT NULL)");
            }
            sql.push(' ');
            sql.push_str(&self.dialect.pagination(skip, take));
        }

        self.phase = Phase::Finalized;
        tracing::debug!(dialect = ?self.dialect, sql = %sql, "compiled select");
        Ok(CompiledQuery {
            sql,
            params: self.params,
        })
    }
}

/// Compile an embedded body into the enclosing parameter list so
/// placeholder numbering continues across the boundary.
fn compile_subquery(
    body: &QueryBody,
    dialect: Dialect,
    params: &mut Vec<Value>,
) -> Result<String> {
    let sub = SelectCompiler::with_params(body, dialect, std::mem::take(params));
    let compiled = sub.compile()?;
    *params = compiled.params;
    Ok(compiled.sql)
}

/// The default projection: every root column except the soft-delete flag
/// and any explicitly excluded fields.
fn default_projection(
    root: &crate::body::QueryJoin,
    excluded: &[&'static str],
    dialect: Dialect,
) -> String {
    root.descriptor
        .select_columns()
        .filter(|c| !excluded.contains(&c.name))
        .map(|c| column_item(&root.alias, c, dialect))
        .collect::<Vec<_>>()
        .join(", ")
}

fn column_item(alias: &str, info: &relq_core::ColumnInfo, dialect: Dialect) -> String {
    if info.column_name == info.name {
        format!("{alias}.{}", dialect.quote_identifier(info.column_name))
    } else {
        format!(
            "{alias}.{} AS {}",
            dialect.quote_identifier(info.column_name),
            dialect.quote_identifier(info.name)
        )
    }
}

// ==================== Tests ====================
