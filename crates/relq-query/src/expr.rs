//! Typed predicates and the expression-to-SQL translator.
//!
//! Entities declare [`Field`] constants; comparisons on fields produce
//! [`Expr`] trees; the translator lowers a tree against the query's join
//! context into a SQL fragment plus bound parameters. Literal values are
//! always parameterized, never spliced into the SQL text.
//!
//! # Example
//!
//! ```ignore
//! impl Article {
//!     pub const ID: Field<Article, i64> = Field::new("id");
//!     pub const TITLE: Field<Article, String> = Field::new("title");
//! }
//!
//! let predicate = Article::TITLE.eq("x").and(Article::ID.gt(10i64));
//! ```

use relq_core::{Dialect, Entity, EntityDescriptor, Error, Result, Value};
use std::any::TypeId;
use std::marker::PhantomData;
use std::sync::Arc;

/// A type-erased reference to one entity column.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnRef {
    /// Entity type identity, resolved to a join alias at translation time.
    pub entity: TypeId,
    /// Entity type name, for diagnostics.
    pub entity_name: &'static str,
    /// Rust field name (the descriptor maps it to the column name).
    pub field: &'static str,
}

/// A typed column handle: entity-tagged and value-typed.
///
/// `Field` is const-constructible so entities can expose their columns as
/// associated constants. All comparison methods build [`Expr`] trees.
pub struct Field<E, T> {
    /// Rust field name.
    pub name: &'static str,
    _marker: PhantomData<fn() -> (E, T)>,
}

impl<E, T> Clone for Field<E, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<E, T> Copy for Field<E, T> {}

impl<E, T> std::fmt::Debug for Field<E, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Field").field("name", &self.name).finish()
    }
}

impl<E, T> Field<E, T> {
    /// Create a field handle for the given Rust field name.
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _marker: PhantomData,
        }
    }
}

impl<E: Entity, T> Field<E, T> {
    /// Erase the typing into a plain column reference.
    pub fn to_ref(self) -> ColumnRef {
        ColumnRef {
            entity: TypeId::of::<E>(),
            entity_name: E::entity_name(),
            field: self.name,
        }
    }
}

impl<E: Entity, T: Into<Value>> Field<E, T> {
    fn cmp(self, op: CompareOp, value: impl Into<T>) -> Expr {
        Expr::Compare {
            column: self.to_ref(),
            op,
            rhs: Operand::Value(value.into().into()),
        }
    }

    fn cmp_field<E2: Entity>(self, op: CompareOp, other: Field<E2, T>) -> Expr {
        Expr::Compare {
            column: self.to_ref(),
            op,
            rhs: Operand::Column(other.to_ref()),
        }
    }

    /// `column = value`. Comparing against NULL lowers to `IS NULL`.
    pub fn eq(self, value: impl Into<T>) -> Expr {
        self.cmp(CompareOp::Eq, value)
    }

    /// `column <> value`. Comparing against NULL lowers to `IS NOT NULL`.
    pub fn ne(self, value: impl Into<T>) -> Expr {
        self.cmp(CompareOp::Ne, value)
    }

    /// `column > value`
    pub fn gt(self, value: impl Into<T>) -> Expr {
        self.cmp(CompareOp::Gt, value)
    }

    /// `column >= value`
    pub fn ge(self, value: impl Into<T>) -> Expr {
        self.cmp(CompareOp::Ge, value)
    }

    /// `column < value`
    pub fn lt(self, value: impl Into<T>) -> Expr {
        self.cmp(CompareOp::Lt, value)
    }

    /// `column <= value`
    pub fn le(self, value: impl Into<T>) -> Expr {
        self.cmp(CompareOp::Le, value)
    }

    /// `column = other_column`, the join on-condition building block.
    pub fn eq_field<E2: Entity>(self, other: Field<E2, T>) -> Expr {
        self.cmp_field(CompareOp::Eq, other)
    }

    /// `column <> other_column`
    pub fn ne_field<E2: Entity>(self, other: Field<E2, T>) -> Expr {
        self.cmp_field(CompareOp::Ne, other)
    }

    /// `column IN (v, ...)`. An empty list lowers to a constant-false
    /// predicate rather than invalid SQL.
    pub fn in_values(self, values: impl IntoIterator<Item = impl Into<T>>) -> Expr {
        Expr::In {
            column: self.to_ref(),
            values: values.into_iter().map(|v| v.into().into()).collect(),
            negated: false,
        }
    }

    /// `column NOT IN (v, ...)`. An empty list lowers to constant true.
    pub fn not_in(self, values: impl IntoIterator<Item = impl Into<T>>) -> Expr {
        Expr::In {
            column: self.to_ref(),
            values: values.into_iter().map(|v| v.into().into()).collect(),
            negated: true,
        }
    }
}

impl<E: Entity, T> Field<E, T> {
    /// `column IS NULL`
    pub fn is_null(self) -> Expr {
        Expr::IsNull {
            column: self.to_ref(),
            negated: false,
        }
    }

    /// `column IS NOT NULL`
    pub fn is_not_null(self) -> Expr {
        Expr::IsNull {
            column: self.to_ref(),
            negated: true,
        }
    }
}

impl<E: Entity> Field<E, String> {
    /// `column LIKE pattern`, pattern passed through verbatim as a bound
    /// parameter.
    pub fn like(self, pattern: impl Into<String>) -> Expr {
        Expr::Like {
            column: self.to_ref(),
            pattern: Value::Text(pattern.into()),
        }
    }

    /// `column LIKE '%needle%'` (needle bound, wildcards added here).
    pub fn contains(self, needle: impl Into<String>) -> Expr {
        Expr::Like {
            column: self.to_ref(),
            pattern: Value::Text(format!("%{}%", needle.into())),
        }
    }

    /// `column LIKE 'prefix%'`
    pub fn starts_with(self, prefix: impl Into<String>) -> Expr {
        Expr::Like {
            column: self.to_ref(),
            pattern: Value::Text(format!("{}%", prefix.into())),
        }
    }

    /// `column LIKE '%suffix'`
    pub fn ends_with(self, suffix: impl Into<String>) -> Expr {
        Expr::Like {
            column: self.to_ref(),
            pattern: Value::Text(format!("%{}", suffix.into())),
        }
    }
}

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
}

impl CompareOp {
    pub const fn as_sql(self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Ne => "<>",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
        }
    }
}

/// Right-hand side of a comparison.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Value(Value),
    Column(ColumnRef),
}

/// A boolean predicate tree over the joined entities.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// `column op operand`
    Compare {
        column: ColumnRef,
        op: CompareOp,
        rhs: Operand,
    },
    /// `column IS [NOT] NULL`
    IsNull { column: ColumnRef, negated: bool },
    /// `column LIKE pattern`
    Like { column: ColumnRef, pattern: Value },
    /// `column [NOT] IN (...)`
    In {
        column: ColumnRef,
        values: Vec<Value>,
        negated: bool,
    },
    /// `(lhs AND rhs)`
    And(Box<Expr>, Box<Expr>),
    /// `(lhs OR rhs)`
    Or(Box<Expr>, Box<Expr>),
    /// `NOT (inner)`
    Not(Box<Expr>),
    /// A raw SQL fragment, passed through verbatim.
    Raw(String),
}

impl Expr {
    /// A raw predicate fragment. The caller owns its correctness; the
    /// builder validates it is a single statement fragment.
    pub fn raw(sql: impl Into<String>) -> Self {
        Expr::Raw(sql.into())
    }

    /// Conjoin with another predicate.
    pub fn and(self, other: Expr) -> Self {
        Expr::And(Box::new(self), Box::new(other))
    }

    /// Disjoin with another predicate.
    pub fn or(self, other: Expr) -> Self {
        Expr::Or(Box::new(self), Box::new(other))
    }

    /// Negate this predicate.
    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Self {
        Expr::Not(Box::new(self))
    }

    /// Lower this predicate to a SQL fragment against the given join
    /// context, appending bound parameters to `params`.
    pub fn render(
        &self,
        ctx: &AliasContext,
        dialect: Dialect,
        params: &mut Vec<Value>,
    ) -> Result<String> {
        match self {
            Expr::Compare { column, op, rhs } => {
                let lhs = ctx.resolve(column, dialect)?;
                match rhs {
                    // NULL comparisons become IS [NOT] NULL instead of the
                    // never-true `= NULL`.
                    Operand::Value(Value::Null) => match op {
                        CompareOp::Eq => Ok(format!("{lhs} IS NULL")),
                        CompareOp::Ne => Ok(format!("{lhs} IS NOT NULL")),
                        _ => Err(Error::UnsupportedExpression(format!(
                            "cannot order-compare `{}.{}` against NULL",
                            column.entity_name, column.field
                        ))),
                    },
                    Operand::Value(v) => {
                        params.push(v.clone());
                        Ok(format!(
                            "{lhs} {} {}",
                            op.as_sql(),
                            dialect.placeholder(params.len())
                        ))
                    }
                    Operand::Column(other) => {
                        let rhs = ctx.resolve(other, dialect)?;
                        Ok(format!("{lhs} {} {rhs}", op.as_sql()))
                    }
                }
            }
            Expr::IsNull { column, negated } => {
                let lhs = ctx.resolve(column, dialect)?;
                if *negated {
                    Ok(format!("{lhs} IS NOT NULL"))
                } else {
                    Ok(format!("{lhs} IS NULL"))
                }
            }
            Expr::Like { column, pattern } => {
                let lhs = ctx.resolve(column, dialect)?;
                params.push(pattern.clone());
                Ok(format!("{lhs} LIKE {}", dialect.placeholder(params.len())))
            }
            Expr::In {
                column,
                values,
                negated,
            } => {
                if values.is_empty() {
                    // Empty membership set: constant predicate, no SQL error.
                    return Ok(if *negated { "1 = 1" } else { "1 = 0" }.to_string());
                }
                let lhs = ctx.resolve(column, dialect)?;
                let placeholders: Vec<String> = values
                    .iter()
                    .map(|v| {
                        params.push(v.clone());
                        dialect.placeholder(params.len())
                    })
                    .collect();
                let keyword = if *negated { "NOT IN" } else { "IN" };
                Ok(format!("{lhs} {keyword} ({})", placeholders.join(", ")))
            }
            Expr::And(lhs, rhs) => {
                let l = lhs.render(ctx, dialect, params)?;
                let r = rhs.render(ctx, dialect, params)?;
                Ok(format!("({l} AND {r})"))
            }
            Expr::Or(lhs, rhs) => {
                let l = lhs.render(ctx, dialect, params)?;
                let r = rhs.render(ctx, dialect, params)?;
                Ok(format!("({l} OR {r})"))
            }
            Expr::Not(inner) => {
                let i = inner.render(ctx, dialect, params)?;
                Ok(format!("NOT ({i})"))
            }
            Expr::Raw(sql) => Ok(sql.clone()),
        }
    }
}

/// The join context a predicate is translated against: entity type to
/// positional alias plus descriptor, in join order.
#[derive(Debug, Clone, Default)]
pub struct AliasContext {
    entries: Vec<(TypeId, String, Arc<EntityDescriptor>)>,
}

impl AliasContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one joined entity. Entries resolve first-match in join
    /// order, so self-joins bind to the earliest alias.
    pub fn push(&mut self, entity: TypeId, alias: String, descriptor: Arc<EntityDescriptor>) {
        self.entries.push((entity, alias, descriptor));
    }

    /// Resolve a column reference to its join alias and column metadata.
    pub fn resolve_entry(&self, column: &ColumnRef) -> Result<(&str, &relq_core::ColumnInfo)> {
        let (_, alias, descriptor) = self
            .entries
            .iter()
            .find(|(id, _, _)| *id == column.entity)
            .ok_or_else(|| {
                Error::UnsupportedExpression(format!(
                    "`{}.{}` does not reference a joined entity",
                    column.entity_name, column.field
                ))
            })?;
        let info = descriptor.column(column.field).ok_or_else(|| {
            Error::UnsupportedExpression(format!(
                "entity `{}` has no field `{}`",
                column.entity_name, column.field
            ))
        })?;
        Ok((alias.as_str(), info))
    }

    /// Resolve a column reference to `alias.quoted_column`.
    pub fn resolve(&self, column: &ColumnRef, dialect: Dialect) -> Result<String> {
        let (alias, info) = self.resolve_entry(column)?;
        Ok(format!(
            "{alias}.{}",
            dialect.quote_identifier(info.column_name)
        ))
    }

    /// Alias of the entity, if joined.
    pub fn alias_of(&self, entity: TypeId) -> Option<&str> {
        self.entries
            .iter()
            .find(|(id, _, _)| *id == entity)
            .map(|(_, alias, _)| alias.as_str())
    }
}
