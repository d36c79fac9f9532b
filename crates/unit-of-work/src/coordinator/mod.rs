//! Transaction coordinators.
//!
//! A coordinator exclusively owns the transactional resource of one unit of
//! work and decides how saving and rejecting are carried out:
//! - [`ConnectionCoordinator`]: one open connection with an always-active
//!   transaction that is committed or rolled back as a whole
//! - [`TrackedCoordinator`]: a change-tracking context whose pending
//!   entity states are flushed in a transaction and can be reverted

mod connection;
mod tracked;

pub use connection::{ConnectionCoordinator, TransactionOptions, TransactionScope};
pub use tracked::TrackedCoordinator;

use async_trait::async_trait;
use common::AppResult;
use domain::EntityType;

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Commit/rollback policy of a unit of work.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait TransactionCoordinator: Send {
    /// Persist every pending change as one unit
    async fn save_changes(&mut self) -> AppResult<()>;

    /// Discard every pending change
    async fn reject_all_changes(&mut self) -> AppResult<()>;

    /// Discard pending changes of one entity type
    fn reject_changes(&mut self, entity: EntityType) -> AppResult<()>;

    /// Release the transactional resource; repeated calls are no-ops
    fn dispose(&mut self);

    /// Check if the resource has been released
    fn is_disposed(&self) -> bool;
}
