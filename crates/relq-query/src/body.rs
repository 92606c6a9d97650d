//! Query state: joins, predicates, sort, projection, limit, filter flags.
//!
//! `QueryBody` is the builder-independent accumulator for one in-progress
//! query. It owns no SQL generation; the compiler reads it. Builders
//! mutate it in place; `copy` is the only cloning operation, producing a
//! structurally independent body (descriptors stay shared, they are
//! immutable).

use crate::expr::{AliasContext, ColumnRef, Expr};
use relq_core::{EntityDescriptor, Error, Result, Value};
use regex::Regex;
use std::any::TypeId;
use std::sync::{Arc, OnceLock};

/// Join kinds supported by the builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
    Right,
}

impl JoinKind {
    pub const fn as_sql(self) -> &'static str {
        match self {
            JoinKind::Inner => "INNER JOIN",
            JoinKind::Left => "LEFT JOIN",
            JoinKind::Right => "RIGHT JOIN",
        }
    }
}

/// One joined table. The first entry of a body is the root entity with
/// alias `T1`; every join appends the next `Tn`.
#[derive(Debug, Clone)]
pub struct QueryJoin {
    /// Descriptor of the joined entity (shared, immutable).
    pub descriptor: Arc<EntityDescriptor>,
    /// Entity type identity, for alias resolution.
    pub entity: TypeId,
    /// Positional alias: `T1`, `T2`, ...
    pub alias: String,
    /// Join kind; ignored for the root entry.
    pub kind: JoinKind,
    /// Physical table reference. A custom override replaces only this,
    /// never the alias.
    pub table_name: String,
    /// On-condition; `None` only for the root entry.
    pub on: Option<Expr>,
    /// Lock-hint flag, honored only by dialects that support hints.
    pub no_lock: bool,
}

/// Sub-query comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubQueryOp {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
    In,
    NotIn,
}

impl SubQueryOp {
    pub const fn as_sql(self) -> &'static str {
        match self {
            SubQueryOp::Eq => "=",
            SubQueryOp::Ne => "<>",
            SubQueryOp::Gt => ">",
            SubQueryOp::Ge => ">=",
            SubQueryOp::Lt => "<",
            SubQueryOp::Le => "<=",
            SubQueryOp::In => "IN",
            SubQueryOp::NotIn => "NOT IN",
        }
    }
}

/// One WHERE-clause entry, AND-conjoined in append order.
#[derive(Debug, Clone)]
pub enum Filter {
    /// A typed predicate, translated at compile time.
    Expr(Expr),
    /// A raw fragment, validated at append time.
    Raw(String),
    /// `column op (sub-select)`; the embedded body compiles recursively
    /// with its own joins, filters, and projection preserved.
    Sub {
        column: ColumnRef,
        op: SubQueryOp,
        body: Box<QueryBody>,
    },
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDir {
    Asc,
    Desc,
}

impl SortDir {
    pub const fn as_sql(self) -> &'static str {
        match self {
            SortDir::Asc => "ASC",
            SortDir::Desc => "DESC",
        }
    }
}

/// What is being sorted on.
#[derive(Debug, Clone)]
pub enum SortSpec {
    Field(ColumnRef),
    Raw(String),
}

/// The single retained ORDER BY clause; `set_sort` is last-write-wins.
#[derive(Debug, Clone)]
pub struct Sort {
    pub spec: SortSpec,
    pub dir: SortDir,
}

/// Projection modes. Inclusive selection and exclusion are mutually
/// exclusive on one query.
#[derive(Debug, Clone)]
pub enum Projection {
    /// Only these columns.
    Columns(Vec<ColumnRef>),
    /// All root columns except these.
    Exclude(Vec<ColumnRef>),
    /// Verbatim SELECT list.
    Raw(String),
}

/// A list of typed columns for `select`/`select_exclude`.
///
/// ```ignore
/// builder.select(Selection::of(Article::ID).col(Category::NAME))?
/// ```
#[derive(Debug, Clone, Default)]
pub struct Selection {
    cols: Vec<ColumnRef>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a selection from one field.
    pub fn of<E: relq_core::Entity, T>(field: crate::expr::Field<E, T>) -> Self {
        Self::new().col(field)
    }

    /// Append a field.
    pub fn col<E: relq_core::Entity, T>(mut self, field: crate::expr::Field<E, T>) -> Self {
        self.cols.push(field.to_ref());
        self
    }

    pub fn into_refs(self) -> Vec<ColumnRef> {
        self.cols
    }

    pub fn is_empty(&self) -> bool {
        self.cols.is_empty()
    }
}

fn raw_fragment_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // Single-statement fragments only: no statement separator.
    RE.get_or_init(|| Regex::new(r"^[^;]+$").expect("raw fragment regex"))
}

fn sort_field_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_.]*$").expect("sort field regex"))
}

/// Validate a raw predicate or SELECT fragment.
pub(crate) fn validate_raw_fragment(sql: &str) -> Result<String> {
    let trimmed = sql.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidArgument("raw SQL fragment is empty".to_string()));
    }
    if !raw_fragment_re().is_match(trimmed) {
        return Err(Error::InvalidArgument(
            "raw SQL fragment must be a single statement fragment".to_string(),
        ));
    }
    Ok(trimmed.to_string())
}

/// Validate a raw sort field name.
pub(crate) fn validate_sort_field(field: &str) -> Result<String> {
    let trimmed = field.trim();
    if !sort_field_re().is_match(trimmed) {
        return Err(Error::InvalidArgument(format!(
            "`{trimmed}` is not a valid sort field"
        )));
    }
    Ok(trimmed.to_string())
}

/// The mutable state of one in-progress query.
///
/// Not thread-safe; builders are single-flow by design. Branching
/// variants must go through [`QueryBody::copy`].
#[derive(Debug, Clone)]
pub struct QueryBody {
    /// Joined tables; first entry is the root entity.
    pub joins: Vec<QueryJoin>,
    /// WHERE entries, AND-conjoined in append order.
    pub filters: Vec<Filter>,
    /// The single retained sort, if any.
    pub sort: Option<Sort>,
    /// Projection, if any; `None` means all root columns minus internals.
    pub projection: Option<Projection>,
    /// Resolved skip/take pair.
    pub limit: Option<(u64, u64)>,
    /// Inject soft-delete predicates for joined tables that carry the flag.
    pub filter_deleted: bool,
    /// Inject tenant predicates for joined tables that carry the key.
    pub filter_tenant: bool,
    /// Tenant key snapshot taken when the query was created.
    pub tenant: Option<Value>,
    /// First translation-stage error, surfaced at the terminal operation.
    pub deferred: Option<Error>,
}

impl QueryBody {
    /// Create a body rooted at the given entity.
    pub fn new(entity: TypeId, descriptor: Arc<EntityDescriptor>) -> Self {
        let table_name = descriptor.table_name.to_string();
        Self {
            joins: vec![QueryJoin {
                descriptor,
                entity,
                alias: "T1".to_string(),
                kind: JoinKind::Inner,
                table_name,
                on: None,
                no_lock: true,
            }],
            filters: Vec::new(),
            sort: None,
            projection: None,
            limit: None,
            filter_deleted: true,
            filter_tenant: true,
            tenant: None,
            deferred: None,
        }
    }

    /// Append a join; the alias is strictly positional.
    pub fn add_join(
        &mut self,
        entity: TypeId,
        descriptor: Arc<EntityDescriptor>,
        kind: JoinKind,
        on: Expr,
        table_name: Option<String>,
        no_lock: bool,
    ) {
        let alias = format!("T{}", self.joins.len() + 1);
        let table_name = table_name.unwrap_or_else(|| descriptor.table_name.to_string());
        self.joins.push(QueryJoin {
            descriptor,
            entity,
            alias,
            kind,
            table_name,
            on: Some(on),
            no_lock,
        });
    }

    /// Append a typed predicate.
    pub fn set_where(&mut self, expr: Expr) {
        self.filters.push(Filter::Expr(expr));
    }

    /// Append a raw predicate fragment, validating it first.
    pub fn set_where_raw(&mut self, sql: &str) -> Result<()> {
        let fragment = validate_raw_fragment(sql)?;
        self.filters.push(Filter::Raw(fragment));
        Ok(())
    }

    /// Append a sub-query comparison.
    pub fn set_where_sub(&mut self, column: ColumnRef, op: SubQueryOp, body: QueryBody) {
        self.filters.push(Filter::Sub {
            column,
            op,
            body: Box::new(body),
        });
    }

    /// Overwrite the sort; only one ORDER BY clause is retained, last
    /// call wins.
    pub fn set_sort(&mut self, spec: SortSpec, dir: SortDir) {
        self.sort = Some(Sort { spec, dir });
    }

    /// Set an inclusive projection. Fails fast if an exclusion is already
    /// in place.
    pub fn set_select(&mut self, columns: Vec<ColumnRef>) -> Result<()> {
        if matches!(self.projection, Some(Projection::Exclude(_))) {
            return Err(Error::InvalidProjection(
                "select after select_exclude on the same query".to_string(),
            ));
        }
        if columns.is_empty() {
            return Err(Error::InvalidProjection("empty column selection".to_string()));
        }
        self.projection = Some(Projection::Columns(columns));
        Ok(())
    }

    /// Set a raw SELECT list. Counts as inclusive selection for the
    /// conflict rule.
    pub fn set_select_raw(&mut self, sql: &str) -> Result<()> {
        if matches!(self.projection, Some(Projection::Exclude(_))) {
            return Err(Error::InvalidProjection(
                "select after select_exclude on the same query".to_string(),
            ));
        }
        let fragment = validate_raw_fragment(sql)?;
        self.projection = Some(Projection::Raw(fragment));
        Ok(())
    }

    /// Set an exclusive projection. Fails fast if a selection is already
    /// in place.
    pub fn set_select_exclude(&mut self, columns: Vec<ColumnRef>) -> Result<()> {
        if matches!(
            self.projection,
            Some(Projection::Columns(_) | Projection::Raw(_))
        ) {
            return Err(Error::InvalidProjection(
                "select_exclude after select on the same query".to_string(),
            ));
        }
        if columns.is_empty() {
            return Err(Error::InvalidProjection("empty column exclusion".to_string()));
        }
        self.projection = Some(Projection::Exclude(columns));
        Ok(())
    }

    /// Overwrite the skip/take pair. `take` must be positive.
    pub fn set_limit(&mut self, skip: i64, take: i64) -> Result<()> {
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
        Ok(())
    }

    /// Record a translation-stage error; the first one wins and surfaces
    /// at the terminal operation.
    pub fn defer_error(&mut self, error: Error) {
        if self.deferred.is_none() {
            self.deferred = Some(error);
        }
    }

    /// A structurally independent clone: joins, filters, sort, limit, and
    /// projection are deep-copied; descriptors stay shared by reference.
    pub fn copy(&self) -> Self {
        self.clone()
    }

    /// Build the alias context for translating predicates against this
    /// body's joins.
    pub fn alias_context(&self) -> AliasContext {
        let mut ctx = AliasContext::new();
        for join in &self.joins {
            ctx.push(join.entity, join.alias.clone(), Arc::clone(&join.descriptor));
        }
        ctx
    }

    /// The root entity's join entry.
    pub fn root(&self) -> &QueryJoin {
        &self.joins[0]
    }
}
