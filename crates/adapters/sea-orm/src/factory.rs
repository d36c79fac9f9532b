//! Repository creation hook and per-operation unit of work construction.

use std::sync::Arc;

use common::{AppResult, TransactionConfig};
use sea_orm::IntoActiveModel;
use unit_of_work::{
    ConnectionCoordinator, ReadOnlyRepository, Registrations, Repository, RepositoryFactory,
    TransactionOptions, TransactionScope, UnitOfWork,
};

use crate::db::Database;
use crate::entity::SeaOrmEntity;
use crate::repository::{SeaOrmReadOnlyRepository, SeaOrmRepository};

/// Unit of work over one SeaORM transaction.
pub type SeaOrmUnitOfWork = UnitOfWork<ConnectionCoordinator, SeaOrmRepositoryFactory>;

/// Creates generic repositories bound to one transaction scope.
pub struct SeaOrmRepositoryFactory {
    scope: Arc<TransactionScope>,
}

impl SeaOrmRepositoryFactory {
    pub fn new(scope: Arc<TransactionScope>) -> Self {
        Self { scope }
    }
}

impl<M> RepositoryFactory<M> for SeaOrmRepositoryFactory
where
    M: SeaOrmEntity + IntoActiveModel<M::ActiveModel>,
{
    fn create_readonly(&self) -> Arc<dyn ReadOnlyRepository<M>> {
        Arc::new(SeaOrmReadOnlyRepository::<M>::new(self.scope.clone()))
    }

    fn create(&self) -> Arc<dyn Repository<M>> {
        Arc::new(SeaOrmRepository::<M>::new(self.scope.clone()))
    }
}

/// Starts one unit of work per logical operation.
#[derive(Clone)]
pub struct SeaOrmUnitOfWorkFactory {
    db: Database,
    options: TransactionOptions,
}

impl SeaOrmUnitOfWorkFactory {
    pub fn new(db: Database, options: TransactionOptions) -> Self {
        Self { db, options }
    }

    /// Create a factory using transaction settings from configuration
    pub fn from_config(db: Database, config: &TransactionConfig) -> AppResult<Self> {
        Ok(Self::new(db, TransactionOptions::from_config(config)?))
    }

    /// Begin a unit of work with no pre-registered repositories
    pub async fn begin(&self) -> AppResult<SeaOrmUnitOfWork> {
        self.begin_with(|_| Registrations::new()).await
    }

    /// Begin a unit of work, registering repositories built on its
    /// transaction scope.
    pub async fn begin_with<R>(&self, register: R) -> AppResult<SeaOrmUnitOfWork>
    where
        R: FnOnce(&Arc<TransactionScope>) -> Registrations,
    {
        let coordinator =
            ConnectionCoordinator::begin(self.db.get_connection(), self.options.clone()).await?;
        let scope = coordinator.scope();
        let registrations = register(&scope);

        Ok(UnitOfWork::with_registrations(
            coordinator,
            SeaOrmRepositoryFactory::new(scope),
            registrations,
        ))
    }
}
