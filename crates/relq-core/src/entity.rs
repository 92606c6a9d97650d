//! Entity metadata.
//!
//! Entities declare their physical mapping through a static column list;
//! the descriptor registry turns that into the immutable descriptor the
//! query engine reads. Registration is an explicit startup call rather
//! than any runtime scanning.

use crate::row::FromRow;

/// Metadata about one entity column.
///
/// Built with the const builder methods so entity definitions read as a
/// declaration block:
///
/// ```ignore
/// const COLUMNS: &[ColumnInfo] = &[
///     ColumnInfo::new("id", "id").primary_key(true),
///     ColumnInfo::new("title", "title"),
///     ColumnInfo::new("deleted", "deleted").soft_delete(true),
/// ];
/// ```
#[derive(Debug, Clone)]
pub struct ColumnInfo {
    /// Rust field name
    pub name: &'static str,
    /// Database column name (may differ from the field name)
    pub column_name: &'static str,
    /// Whether the column is nullable
    pub nullable: bool,
    /// Whether this is (part of) the primary key
    pub primary_key: bool,
    /// Whether this is the soft-delete flag column
    pub soft_delete: bool,
    /// Whether this is the tenant key column
    pub tenant: bool,
}

impl ColumnInfo {
    /// Create a column with the minimal required data.
    pub const fn new(name: &'static str, column_name: &'static str) -> Self {
        Self {
            name,
            column_name,
            nullable: false,
            primary_key: false,
            soft_delete: false,
            tenant: false,
        }
    }

    /// Set the nullable flag.
    pub const fn nullable(mut self, value: bool) -> Self {
        self.nullable = value;
        self
    }

    /// Set the primary-key flag.
    pub const fn primary_key(mut self, value: bool) -> Self {
        self.primary_key = value;
        self
    }

    /// Mark this column as the soft-delete flag.
    pub const fn soft_delete(mut self, value: bool) -> Self {
        self.soft_delete = value;
        self
    }

    /// Mark this column as the tenant key.
    pub const fn tenant(mut self, value: bool) -> Self {
        self.tenant = value;
        self
    }
}

/// A queryable entity type.
///
/// The associated metadata must be stable for the process lifetime;
/// the descriptor registry caches it on first registration.
pub trait Entity: FromRow + Send + Sync + 'static {
    /// Physical table name.
    const TABLE_NAME: &'static str;

    /// Ordered column metadata.
    fn columns() -> &'static [ColumnInfo];

    /// Short type name used in error messages.
    fn entity_name() -> &'static str {
        let full = std::any::type_name::<Self>();
        full.rsplit("::").next().unwrap_or(full)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::row::Row;

    struct Thing;

    impl FromRow for Thing {
        fn from_row(_row: &Row) -> Result<Self, Error> {
            Ok(Thing)
        }
    }

    impl Entity for Thing {
        const TABLE_NAME: &'static str = "thing";

        fn columns() -> &'static [ColumnInfo] {
            static COLUMNS: &[ColumnInfo] = &[ColumnInfo::new("id", "id").primary_key(true)];
            COLUMNS
        }
    }

    #[test]
    fn entity_name_is_short() {
        assert_eq!(Thing::entity_name(), "Thing");
    }

    #[test]
    fn column_builder_flags() {
        let col = ColumnInfo::new("deleted", "deleted").soft_delete(true).nullable(true);
        assert!(col.soft_delete);
        assert!(col.nullable);
        assert!(!col.primary_key);
    }
}
