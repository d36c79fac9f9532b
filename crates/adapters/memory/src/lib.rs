//! In-memory adapter for the change-tracking unit of work.
//!
//! Committed rows live in a [`MemoryStore`] keyed by entity type and
//! identifier. Every unit of work begun from the store gets its own
//! [`MemoryContext`]; writes made through [`MemoryRepository`] are tracked
//! there and only reach the store when that unit of work saves.

mod context;
mod entity_set;
mod repository;
mod store;

pub use context::MemoryContext;
pub use repository::{MemoryReadOnlyRepository, MemoryRepository, MemoryRepositoryFactory};
pub use store::MemoryStore;

use unit_of_work::{Registrations, TrackedCoordinator, UnitOfWork};

/// Unit of work over a memory context.
pub type MemoryUnitOfWork = UnitOfWork<TrackedCoordinator<MemoryContext>, MemoryRepositoryFactory>;

impl MemoryStore {
    /// Begin a unit of work with a fresh change tracker
    pub fn begin(&self) -> MemoryUnitOfWork {
        self.begin_with(Registrations::new())
    }

    /// Begin a unit of work with pre-registered repositories
    pub fn begin_with(&self, registrations: Registrations) -> MemoryUnitOfWork {
        MemoryContext::new(self.clone()).begin_with(registrations)
    }
}

impl MemoryContext {
    /// Begin a unit of work that tracks changes in this context.
    ///
    /// The unit of work takes over the tracker; keep a clone only to
    /// inspect it.
    pub fn begin_with(self, registrations: Registrations) -> MemoryUnitOfWork {
        UnitOfWork::with_registrations(
            TrackedCoordinator::new(self.clone()),
            MemoryRepositoryFactory::new(self),
            registrations,
        )
    }
}
