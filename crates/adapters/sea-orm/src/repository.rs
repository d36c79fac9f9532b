//! Generic repositories executing against the unit of work transaction.

use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use common::{AppError, AppResult};
use sea_orm::{ActiveModelTrait, DbErr, EntityTrait, IntoActiveModel};
use unit_of_work::{ReadOnlyRepository, Repository, TransactionScope};

use crate::entity::SeaOrmEntity;

/// Read-only repository for model `M`
pub struct SeaOrmReadOnlyRepository<M: SeaOrmEntity> {
    scope: Arc<TransactionScope>,
    _model: PhantomData<fn() -> M>,
}

impl<M: SeaOrmEntity> SeaOrmReadOnlyRepository<M> {
    pub fn new(scope: Arc<TransactionScope>) -> Self {
        Self {
            scope,
            _model: PhantomData,
        }
    }
}

#[async_trait]
impl<M: SeaOrmEntity> ReadOnlyRepository<M> for SeaOrmReadOnlyRepository<M> {
    async fn read(&self) -> AppResult<Vec<M>> {
        read_all(&self.scope).await
    }
}

/// Read/write repository for model `M`.
///
/// Writes go to the active transaction and become visible to other
/// connections once the unit of work saves.
pub struct SeaOrmRepository<M: SeaOrmEntity> {
    scope: Arc<TransactionScope>,
    _model: PhantomData<fn() -> M>,
}

impl<M: SeaOrmEntity> SeaOrmRepository<M> {
    pub fn new(scope: Arc<TransactionScope>) -> Self {
        Self {
            scope,
            _model: PhantomData,
        }
    }
}

#[async_trait]
impl<M: SeaOrmEntity> ReadOnlyRepository<M> for SeaOrmRepository<M> {
    async fn read(&self) -> AppResult<Vec<M>> {
        read_all(&self.scope).await
    }
}

#[async_trait]
impl<M> Repository<M> for SeaOrmRepository<M>
where
    M: SeaOrmEntity + IntoActiveModel<M::ActiveModel>,
{
    async fn add(&self, item: M) -> AppResult<()> {
        let txn = self.scope.current().await?;
        item.into_active_model().insert(&*txn).await?;
        Ok(())
    }

    async fn update(&self, item: M) -> AppResult<()> {
        let txn = self.scope.current().await?;
        match item.into_active_model().reset_all().update(&*txn).await {
            Ok(_) => Ok(()),
            Err(DbErr::RecordNotUpdated) => Err(AppError::NotFound),
            Err(err) => Err(err.into()),
        }
    }

    async fn delete(&self, item: M) -> AppResult<()> {
        let txn = self.scope.current().await?;
        let result = item.into_active_model().delete(&*txn).await?;
        if result.rows_affected == 0 {
            return Err(AppError::NotFound);
        }
        Ok(())
    }
}

async fn read_all<M: SeaOrmEntity>(scope: &TransactionScope) -> AppResult<Vec<M>> {
    let txn = scope.current().await?;
    Ok(<M::Table as EntityTrait>::find().all(&*txn).await?)
}
