//! Entity descriptors and the descriptor registry.

use crate::entity::{ColumnInfo, Entity};
use crate::error::{Error, Result};
use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Immutable physical mapping of one registered entity type.
///
/// Created once at registration and shared by reference (`Arc`) with
/// every query against the entity; never mutated afterwards.
#[derive(Debug)]
pub struct EntityDescriptor {
    /// Short entity type name, for diagnostics.
    pub entity_name: &'static str,
    /// Physical table name.
    pub table_name: &'static str,
    /// Ordered column metadata.
    pub columns: &'static [ColumnInfo],
    /// Primary key column names, in declaration order.
    pub primary_key: Vec<&'static str>,
    /// The soft-delete flag column, if the entity has one.
    pub soft_delete_column: Option<&'static str>,
    /// The tenant key column, if the entity has one.
    pub tenant_column: Option<&'static str>,
}

impl EntityDescriptor {
    fn build<E: Entity>() -> Self {
        let columns = E::columns();
        Self {
            entity_name: E::entity_name(),
            table_name: E::TABLE_NAME,
            columns,
            primary_key: columns
                .iter()
                .filter(|c| c.primary_key)
                .map(|c| c.column_name)
                .collect(),
            soft_delete_column: columns.iter().find(|c| c.soft_delete).map(|c| c.column_name),
            tenant_column: columns.iter().find(|c| c.tenant).map(|c| c.column_name),
        }
    }

    /// Columns included in the default projection: everything except the
    /// soft-delete flag, which is internal to the engine.
    pub fn select_columns(&self) -> impl Iterator<Item = &ColumnInfo> {
        self.columns.iter().filter(|c| !c.soft_delete)
    }

    /// Look up a column by Rust field name.
    pub fn column(&self, name: &str) -> Option<&ColumnInfo> {
        self.columns.iter().find(|c| c.name == name)
    }
}

/// Registry of entity descriptors, keyed by entity type.
///
/// Registration is idempotent: re-registering a type returns the cached
/// descriptor, and `get` hands out the same `Arc` on every call.
#[derive(Debug, Default)]
pub struct DescriptorRegistry {
    descriptors: RwLock<HashMap<TypeId, Arc<EntityDescriptor>>>,
}

impl DescriptorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an entity type, building its descriptor on first call.
    pub fn register<E: Entity>(&self) -> Arc<EntityDescriptor> {
        if let Some(existing) = self.descriptors.read().expect("registry lock").get(&TypeId::of::<E>()) {
            return Arc::clone(existing);
        }
        let mut map = self.descriptors.write().expect("registry lock");
        Arc::clone(
            map.entry(TypeId::of::<E>())
                .or_insert_with(|| Arc::new(EntityDescriptor::build::<E>())),
        )
    }

    /// Fetch the descriptor for a registered entity type.
    pub fn get<E: Entity>(&self) -> Result<Arc<EntityDescriptor>> {
        self.descriptors
            .read()
            .expect("registry lock")
            .get(&TypeId::of::<E>())
            .map(Arc::clone)
            .ok_or(Error::UnregisteredEntity {
                entity: E::entity_name(),
            })
    }

    /// Fetch by type id, for callers that already erased the entity type.
    pub fn get_by_id(&self, id: TypeId, entity: &'static str) -> Result<Arc<EntityDescriptor>> {
        self.descriptors
            .read()
            .expect("registry lock")
            .get(&id)
            .map(Arc::clone)
            .ok_or(Error::UnregisteredEntity { entity })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::row::{FromRow, Row};

    struct Article;

    impl FromRow for Article {
        fn from_row(_row: &Row) -> Result<Self> {
            Ok(Article)
        }
    }

    impl Entity for Article {
        const TABLE_NAME: &'static str = "article";

        fn columns() -> &'static [ColumnInfo] {
            static COLUMNS: &[ColumnInfo] = &[
                ColumnInfo::new("id", "id").primary_key(true),
                ColumnInfo::new("title", "title"),
                ColumnInfo::new("deleted", "deleted").soft_delete(true),
                ColumnInfo::new("tenant_id", "tenant_id").tenant(true),
            ];
            COLUMNS
        }
    }

    #[test]
    fn registration_is_idempotent_and_cached() {
        let registry = DescriptorRegistry::new();
        let first = registry.register::<Article>();
        let second = registry.register::<Article>();
        let fetched = registry.get::<Article>().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert!(Arc::ptr_eq(&first, &fetched));
    }

    #[test]
    fn descriptor_derives_special_columns() {
        let registry = DescriptorRegistry::new();
        let descriptor = registry.register::<Article>();
        assert_eq!(descriptor.table_name, "article");
        assert_eq!(descriptor.primary_key, vec!["id"]);
        assert_eq!(descriptor.soft_delete_column, Some("deleted"));
        assert_eq!(descriptor.tenant_column, Some("tenant_id"));
        let select: Vec<_> = descriptor.select_columns().map(|c| c.column_name).collect();
        assert_eq!(select, vec!["id", "title", "tenant_id"]);
    }

    #[test]
    fn unregistered_entity_fails() {
        struct Other;
        impl FromRow for Other {
            fn from_row(_row: &Row) -> Result<Self> {
                Ok(Other)
            }
        }
        impl Entity for Other {
            const TABLE_NAME: &'static str = "other";
            fn columns() -> &'static [ColumnInfo] {
                static COLUMNS: &[ColumnInfo] = &[ColumnInfo::new("id", "id")];
                COLUMNS
            }
        }

        let registry = DescriptorRegistry::new();
        assert_eq!(
            registry.get::<Other>().unwrap_err(),
            Error::UnregisteredEntity { entity: "Other" }
        );
    }
}
