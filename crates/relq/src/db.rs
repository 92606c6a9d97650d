//! The `Db` entry point.
//!
//! `Db` owns the connection, the descriptor registry, and the tenant
//! context, and hands out query builders rooted at registered entities.
//! The tenant value is snapshotted into each query at creation, so the
//! translator never reaches for ambient state.

use relq_core::{Connection, DescriptorRegistry, Entity, EntityDescriptor, Result, Value};
use relq_query::{QueryBuilder, QuerySource};
use relq_session::UnitOfWork;
use std::sync::Arc;

/// Supplies the current tenant key for tenant-filter injection.
///
/// Typically backed by request-scoped session state; queries read it once
/// at creation time.
pub trait TenantResolver: Send + Sync {
    fn current_tenant(&self) -> Option<Value>;
}

/// A constant tenant key, for single-tenant-per-process deployments and
/// tests.
#[derive(Debug, Clone)]
pub struct FixedTenant(pub Value);

impl TenantResolver for FixedTenant {
    fn current_tenant(&self) -> Option<Value> {
        Some(self.0.clone())
    }
}

/// The query entry point: connection + descriptor registry + tenant
/// context.
pub struct Db<C: Connection> {
    connection: C,
    registry: Arc<DescriptorRegistry>,
    tenant: Option<Arc<dyn TenantResolver>>,
}

impl<C: Connection> Db<C> {
    /// Wrap a connection with an empty registry and no tenant context.
    pub fn new(connection: C) -> Self {
        Self {
            connection,
            registry: Arc::new(DescriptorRegistry::new()),
            tenant: None,
        }
    }

    /// Attach a tenant resolver; registered entities with a tenant column
    /// get the resolver's current value injected into every query.
    pub fn with_tenant_resolver(mut self, resolver: Arc<dyn TenantResolver>) -> Self {
        self.tenant = Some(resolver);
        self
    }

    /// Register an entity type; idempotent.
    pub fn register<E: Entity>(&self) -> Arc<EntityDescriptor> {
        tracing::debug!(
            entity = E::entity_name(),
            table = E::TABLE_NAME,
            "registering entity"
        );
        self.registry.register::<E>()
    }

    /// The shared descriptor registry.
    pub fn registry(&self) -> &Arc<DescriptorRegistry> {
        &self.registry
    }

    /// The underlying connection.
    pub fn connection(&self) -> &C {
        &self.connection
    }

    /// Start a query rooted at `E`. Fails with `UnregisteredEntity` when
    /// `E` was never registered.
    pub fn query<E: Entity>(&self) -> Result<QueryBuilder<'_, C, (E,)>> {
        let tenant = self.tenant.as_ref().and_then(|t| t.current_tenant());
        QueryBuilder::new(
            QuerySource::Connection(&self.connection),
            Arc::clone(&self.registry),
            tenant,
        )
    }

    /// Create an idle unit of work over this database's connection; call
    /// `begin` on it to open the transaction.
    pub fn unit_of_work(&self) -> UnitOfWork<'_, C> {
        UnitOfWork::new(&self.connection)
    }
}
