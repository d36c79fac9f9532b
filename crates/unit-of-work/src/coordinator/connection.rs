//! Connection-oriented coordinator.
//!
//! Holds one database connection with exactly one active transaction.
//! Saving commits it and rejecting rolls it back; either way a fresh
//! transaction is begun immediately so the unit of work stays usable.

use std::sync::Arc;

use async_trait::async_trait;
use common::constants::{
    ISOLATION_READ_COMMITTED, ISOLATION_READ_UNCOMMITTED, ISOLATION_REPEATABLE_READ,
    ISOLATION_SERIALIZABLE, VALID_ISOLATION_LEVELS,
};
use common::{AppError, AppResult, TransactionConfig};
use domain::EntityType;
use sea_orm::{
    AccessMode, DatabaseConnection, DatabaseTransaction, DbErr, IsolationLevel, TransactionTrait,
};
use tokio::sync::{RwLock, RwLockReadGuard};

use super::TransactionCoordinator;

/// Settings applied to every transaction begun by the coordinator.
#[derive(Debug, Clone, Default)]
pub struct TransactionOptions {
    pub isolation_level: Option<IsolationLevel>,
    pub access_mode: Option<AccessMode>,
}

impl TransactionOptions {
    /// Build options from configuration
    pub fn from_config(config: &TransactionConfig) -> AppResult<Self> {
        let isolation_level = match config.isolation_level.as_deref() {
            None => None,
            Some(ISOLATION_READ_UNCOMMITTED) => Some(IsolationLevel::ReadUncommitted),
            Some(ISOLATION_READ_COMMITTED) => Some(IsolationLevel::ReadCommitted),
            Some(ISOLATION_REPEATABLE_READ) => Some(IsolationLevel::RepeatableRead),
            Some(ISOLATION_SERIALIZABLE) => Some(IsolationLevel::Serializable),
            Some(other) => {
                return Err(AppError::configuration(format!(
                    "unknown isolation level '{}', expected one of {:?}",
                    other, VALID_ISOLATION_LEVELS
                )))
            }
        };

        let access_mode = if config.read_only {
            AccessMode::ReadOnly
        } else {
            AccessMode::ReadWrite
        };

        Ok(Self {
            isolation_level,
            access_mode: Some(access_mode),
        })
    }
}

/// The active transaction, shared between a coordinator and the
/// repositories that execute against it.
pub struct TransactionScope {
    current: RwLock<Option<DatabaseTransaction>>,
}

impl TransactionScope {
    fn new(txn: DatabaseTransaction) -> Self {
        Self {
            current: RwLock::new(Some(txn)),
        }
    }

    /// Borrow the active transaction.
    ///
    /// Fails with `NoActiveTransaction` after disposal or after a failed
    /// commit/rollback.
    pub async fn current(&self) -> AppResult<RwLockReadGuard<'_, DatabaseTransaction>> {
        RwLockReadGuard::try_map(self.current.read().await, Option::as_ref)
            .map_err(|_| AppError::NoActiveTransaction)
    }

    /// Check if a transaction is active
    pub async fn is_active(&self) -> bool {
        self.current.read().await.is_some()
    }
}

/// Coordinator over a single connection and its active transaction.
pub struct ConnectionCoordinator {
    db: Option<DatabaseConnection>,
    scope: Arc<TransactionScope>,
    options: TransactionOptions,
    disposed: bool,
}

impl ConnectionCoordinator {
    /// Acquire the connection and begin the first transaction
    pub async fn begin(db: DatabaseConnection, options: TransactionOptions) -> AppResult<Self> {
        let txn = begin_transaction(&db, &options).await?;
        tracing::debug!(?options, "Unit of work transaction started");

        Ok(Self {
            db: Some(db),
            scope: Arc::new(TransactionScope::new(txn)),
            options,
            disposed: false,
        })
    }

    /// Scope that repositories should execute against
    pub fn scope(&self) -> Arc<TransactionScope> {
        self.scope.clone()
    }

    fn ensure_active(&self) -> AppResult<()> {
        if self.disposed {
            return Err(AppError::disposed(std::any::type_name::<Self>()));
        }
        Ok(())
    }

    fn connection(&self) -> AppResult<&DatabaseConnection> {
        self.db
            .as_ref()
            .ok_or_else(|| AppError::disposed(std::any::type_name::<Self>()))
    }
}

async fn begin_transaction(
    db: &DatabaseConnection,
    options: &TransactionOptions,
) -> Result<DatabaseTransaction, DbErr> {
    db.begin_with_config(options.isolation_level.clone(), options.access_mode.clone())
        .await
}

#[async_trait]
impl TransactionCoordinator for ConnectionCoordinator {
    async fn save_changes(&mut self) -> AppResult<()> {
        self.ensure_active()?;
        let db = self.connection()?;

        let mut slot = self.scope.current.write().await;
        let txn = slot.take().ok_or(AppError::NoActiveTransaction)?;
        txn.commit().await?;
        tracing::info!("Transaction committed");

        *slot = Some(begin_transaction(db, &self.options).await?);
        Ok(())
    }

    async fn reject_all_changes(&mut self) -> AppResult<()> {
        self.ensure_active()?;
        let db = self.connection()?;

        let mut slot = self.scope.current.write().await;
        let txn = slot.take().ok_or(AppError::NoActiveTransaction)?;
        txn.rollback().await?;
        tracing::warn!("Transaction rolled back, all pending changes rejected");

        *slot = Some(begin_transaction(db, &self.options).await?);
        Ok(())
    }

    fn reject_changes(&mut self, entity: EntityType) -> AppResult<()> {
        self.ensure_active()?;
        tracing::debug!(%entity, "Per-entity rejection requested on a connection transaction");
        Err(AppError::unsupported(
            "reject_changes",
            std::any::type_name::<Self>(),
        ))
    }

    fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;

        // An uncommitted transaction is rolled back when dropped.
        match self.scope.current.try_write() {
            Ok(mut slot) => {
                if slot.take().is_some() {
                    tracing::debug!("Dropped uncommitted transaction");
                }
            }
            Err(_) => tracing::warn!("Transaction still borrowed by a repository during dispose"),
        }

        if self.db.take().is_some() {
            tracing::debug!("Connection released");
        }
    }

    fn is_disposed(&self) -> bool {
        self.disposed
    }
}

impl Drop for ConnectionCoordinator {
    fn drop(&mut self) {
        self.dispose();
    }
}
