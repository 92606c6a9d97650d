//! SQL dialect descriptors.
//!
//! The compiler is dialect-agnostic; everything dialect-specific funnels
//! through this enum: placeholder style, identifier quoting, boolean
//! literals, pagination syntax, and lock hints.

/// Supported SQL dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dialect {
    /// PostgreSQL: `$n` placeholders, double-quoted identifiers, LIMIT/OFFSET.
    #[default]
    Postgres,
    /// MySQL: `?` placeholders, backtick identifiers, LIMIT/OFFSET.
    Mysql,
    /// SQLite: `?n` placeholders, double-quoted identifiers, LIMIT/OFFSET.
    Sqlite,
    /// SQL Server: `@pn` placeholders, bracket identifiers, OFFSET/FETCH,
    /// and the only dialect honoring lock hints.
    SqlServer,
}

impl Dialect {
    /// Placeholder for the 1-based parameter position `n`.
    pub fn placeholder(&self, n: usize) -> String {
        match self {
            Dialect::Postgres => format!("${n}"),
            Dialect::Mysql => "?".to_string(),
            Dialect::Sqlite => format!("?{n}"),
            Dialect::SqlServer => format!("@p{n}"),
        }
    }

    /// Quote an identifier (table, column, alias).
    pub fn quote_identifier(&self, ident: &str) -> String {
        match self {
            Dialect::Postgres | Dialect::Sqlite => format!("\"{ident}\""),
            Dialect::Mysql => format!("`{ident}`"),
            Dialect::SqlServer => format!("[{ident}]"),
        }
    }

    /// Boolean literal for injected default-filter predicates.
    pub const fn bool_literal(&self, value: bool) -> &'static str {
        match self {
            Dialect::SqlServer => {
                if value { "1" } else { "0" }
            }
            _ => {
                if value { "TRUE" } else { "FALSE" }
            }
        }
    }

    /// The pagination clause for a resolved skip/take pair.
    pub fn pagination(&self, skip: u64, take: u64) -> String {
        match self {
            Dialect::Postgres | Dialect::Mysql | Dialect::Sqlite => {
                format!("LIMIT {take} OFFSET {skip}")
            }
            Dialect::SqlServer => {
                format!("OFFSET {skip} ROWS FETCH NEXT {take} ROWS ONLY")
            }
        }
    }

    /// Whether pagination is only valid after an ORDER BY clause.
    ///
    /// SQL Server's OFFSET/FETCH requires one; the compiler injects a
    /// constant sort when the query carries none.
    pub const fn pagination_requires_order(&self) -> bool {
        matches!(self, Dialect::SqlServer)
    }

    /// Whether per-join lock hints are part of this dialect's grammar.
    pub const fn supports_lock_hints(&self) -> bool {
        matches!(self, Dialect::SqlServer)
    }

    /// The lock-hint suffix appended after a table reference.
    ///
    /// Dialects without lock hints return an empty string so the flag is
    /// silently ignored rather than an error.
    pub const fn lock_hint(&self) -> &'static str {
        match self {
            Dialect::SqlServer => " WITH (NOLOCK)",
            _ => "",
        }
    }
}
