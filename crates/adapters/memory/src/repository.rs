//! Repositories over a [`MemoryContext`].

use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use common::AppResult;
use domain::Identified;
use unit_of_work::{ReadOnlyRepository, Repository, RepositoryFactory};

use crate::context::MemoryContext;

/// Reads committed rows of `E`
pub struct MemoryReadOnlyRepository<E> {
    context: MemoryContext,
    _entity: PhantomData<fn() -> E>,
}

impl<E> MemoryReadOnlyRepository<E> {
    pub fn new(context: MemoryContext) -> Self {
        Self {
            context,
            _entity: PhantomData,
        }
    }
}

#[async_trait]
impl<E: Identified + Clone> ReadOnlyRepository<E> for MemoryReadOnlyRepository<E> {
    async fn read(&self) -> AppResult<Vec<E>> {
        Ok(self.context.store().rows::<E>())
    }
}

/// Tracks writes to `E` until the unit of work saves or rejects them.
///
/// `add` fails with `Conflict` when an entity with the same identifier is
/// already tracked. Updating or deleting an untracked entity attaches it.
pub struct MemoryRepository<E> {
    context: MemoryContext,
    _entity: PhantomData<fn() -> E>,
}

impl<E> MemoryRepository<E> {
    pub fn new(context: MemoryContext) -> Self {
        Self {
            context,
            _entity: PhantomData,
        }
    }
}

#[async_trait]
impl<E: Identified + Clone> ReadOnlyRepository<E> for MemoryRepository<E> {
    async fn read(&self) -> AppResult<Vec<E>> {
        Ok(self.context.store().rows::<E>())
    }
}

#[async_trait]
impl<E: Identified + Clone> Repository<E> for MemoryRepository<E> {
    async fn add(&self, item: E) -> AppResult<()> {
        self.context.track::<E, _>(|set, _| set.track_added(item))
    }

    async fn update(&self, item: E) -> AppResult<()> {
        self.context.track::<E, _>(|set, tables| set.track_modified(item, tables))
    }

    async fn delete(&self, item: E) -> AppResult<()> {
        self.context.track::<E, _>(|set, tables| set.track_deleted(item, tables))
    }
}

/// Creates memory repositories sharing the context of one unit of work.
#[derive(Clone)]
pub struct MemoryRepositoryFactory {
    context: MemoryContext,
}

impl MemoryRepositoryFactory {
    pub fn new(context: MemoryContext) -> Self {
        Self { context }
    }
}

impl<E: Identified + Clone> RepositoryFactory<E> for MemoryRepositoryFactory {
    fn create_readonly(&self) -> Arc<dyn ReadOnlyRepository<E>> {
        Arc::new(MemoryReadOnlyRepository::<E>::new(self.context.clone()))
    }

    fn create(&self) -> Arc<dyn Repository<E>> {
        Arc::new(MemoryRepository::<E>::new(self.context.clone()))
    }
}
