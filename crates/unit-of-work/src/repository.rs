//! Repository contracts.
//!
//! Technology adapters implement these traits for one entity type against
//! one storage technology. The unit of work hands them out as trait objects
//! keyed by the exact contract type, so a `dyn ReadOnlyRepository<E>` is
//! never returned where a `dyn Repository<E>` was requested, and vice versa.

use std::sync::Arc;

use async_trait::async_trait;
use common::AppResult;
use domain::DomainEntity;

/// Read operations (Query)
#[async_trait]
pub trait ReadOnlyRepository<E: DomainEntity>: Send + Sync {
    /// Read all entities without tracking them
    async fn read(&self) -> AppResult<Vec<E>>;
}

/// Read and write operations (Command)
///
/// Writes are pending until the owning unit of work saves them.
#[async_trait]
pub trait Repository<E: DomainEntity>: ReadOnlyRepository<E> {
    /// Add a new entity
    async fn add(&self, item: E) -> AppResult<()>;

    /// Update an existing entity
    async fn update(&self, item: E) -> AppResult<()>;

    /// Delete an existing entity
    async fn delete(&self, item: E) -> AppResult<()>;
}

/// Creation hook supplied by a technology adapter.
///
/// Invoked by the unit of work only when no repository for `E` was
/// pre-registered and none has been created yet.
pub trait RepositoryFactory<E: DomainEntity>: Send {
    /// Create a read-only repository for `E`
    fn create_readonly(&self) -> Arc<dyn ReadOnlyRepository<E>>;

    /// Create a repository for `E`
    fn create(&self) -> Arc<dyn Repository<E>>;
}
