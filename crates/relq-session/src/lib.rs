//! Unit of work for relq.
//!
//! A [`UnitOfWork`] binds a transaction to a borrowed connection. Queries
//! routed through it (via the builder's `use_uow`) run on exactly that
//! connection, never a separate one, so reads stay consistent with the
//! transaction's writes.
//!
//! # Example
//!
//! ```ignore
//! let mut uow = UnitOfWork::new(&conn);
//! match uow.begin(&cx).await { Outcome::Ok(()) => {}, other => ... }
//!
//! let articles = db.query::<Article>()?
//!     .use_uow(&uow)
//!     .to_list(&cx)
//!     .await;
//!
//! uow.commit(&cx).await;
//! ```

use asupersync::{Cx, Outcome};
use relq_core::{Connection, Dialect, Error};

/// State of a unit of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UowState {
    /// Created, transaction not started yet.
    Idle,
    /// BEGIN issued, neither committed nor rolled back.
    Active,
    /// COMMIT issued.
    Committed,
    /// ROLLBACK issued.
    RolledBack,
}

/// A transactional unit of work bound to one connection.
///
/// Not thread-safe by design: one unit of work belongs to one logical
/// operation flow, like the query builders that bind to it.
#[derive(Debug)]
pub struct UnitOfWork<'c, C: Connection> {
    connection: &'c C,
    state: UowState,
}

impl<'c, C: Connection> UnitOfWork<'c, C> {
    /// Create an idle unit of work over a borrowed connection.
    pub fn new(connection: &'c C) -> Self {
        Self {
            connection,
            state: UowState::Idle,
        }
    }

    /// The bound connection. Everything routed through this unit of work
    /// must execute here.
    pub fn connection(&self) -> &'c C {
        self.connection
    }

    /// Whether a transaction is currently open.
    pub fn is_active(&self) -> bool {
        self.state == UowState::Active
    }

    /// Open the transaction. Calling `begin` on an active unit of work is
    /// a no-op, matching the idempotent begin of the session layer.
    #[tracing::instrument(level = "debug", skip_all)]
    pub async fn begin(&mut self, cx: &Cx) -> Outcome<(), Error> {
        if self.state == UowState::Active {
            return Outcome::Ok(());
        }
        let sql = match self.connection.dialect() {
            Dialect::SqlServer => "BEGIN TRANSACTION",
            _ => "BEGIN",
        };
        match self.connection.execute(cx, sql, &[]).await {
            Outcome::Ok(_) => {
                self.state = UowState::Active;
                Outcome::Ok(())
            }
            Outcome::Err(e) => Outcome::Err(e),
            Outcome::Cancelled(r) => Outcome::Cancelled(r),
            Outcome::Panicked(p) => Outcome::Panicked(p),
        }
    }

    /// Commit the transaction.
    #[tracing::instrument(level = "debug", skip_all)]
    pub async fn commit(&mut self, cx: &Cx) -> Outcome<(), Error> {
        if self.state != UowState::Active {
            return Outcome::Err(Error::InvalidArgument(
                "commit on a unit of work with no active transaction".to_string(),
            ));
        }
        match self.connection.execute(cx, "COMMIT", &[]).await {
            Outcome::Ok(_) => {
                self.state = UowState::Committed;
                Outcome::Ok(())
            }
            Outcome::Err(e) => Outcome::Err(e),
            Outcome::Cancelled(r) => Outcome::Cancelled(r),
            Outcome::Panicked(p) => Outcome::Panicked(p),
        }
    }

    /// Roll the transaction back.
    #[tracing::instrument(level = "debug", skip_all)]
    pub async fn rollback(&mut self, cx: &Cx) -> Outcome<(), Error> {
        if self.state != UowState::Active {
            return Outcome::Err(Error::InvalidArgument(
                "rollback on a unit of work with no active transaction".to_string(),
            ));
        }
        match self.connection.execute(cx, "ROLLBACK", &[]).await {
            Outcome::Ok(_) => {
                self.state = UowState::RolledBack;
                Outcome::Ok(())
            }
            Outcome::Err(e) => Outcome::Err(e),
            Outcome::Cancelled(r) => Outcome::Cancelled(r),
            Outcome::Panicked(p) => Outcome::Panicked(p),
        }
    }
}

impl<C: Connection> Drop for UnitOfWork<'_, C> {
    fn drop(&mut self) {
        if self.state == UowState::Active {
            // No async work in Drop; the transaction stays open until the
            // connection closes or the next transaction starts.
            tracing::warn!("unit of work dropped without commit or rollback");
        }
    }
}
