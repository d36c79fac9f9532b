//! Unit of Work
//!
//! Groups repository access and transaction control for one logical
//! operation:
//! - `repository`: read-only and read/write repository contracts
//! - `registry`: contract-keyed repository lookup with lazy creation
//! - `coordinator`: commit/rollback policies (connection or change tracking)
//! - `unit_of_work`: the façade tying them together
//!
//! Technology adapters supply repositories, creation hooks and, for the
//! change-tracking variant, a [`tracking::TrackingContext`].

pub mod coordinator;
pub mod query;
pub mod registry;
pub mod repository;
pub mod tracking;
pub mod unit_of_work;

pub use coordinator::{
    ConnectionCoordinator, TrackedCoordinator, TransactionCoordinator, TransactionOptions,
    TransactionScope,
};
pub use query::QueryExt;
pub use registry::{ContractKey, Registrations, RepositoryRegistry};
pub use repository::{ReadOnlyRepository, Repository, RepositoryFactory};
pub use tracking::{EntityState, TrackedEntry, TrackingContext};
pub use unit_of_work::UnitOfWork;

#[cfg(any(test, feature = "test-utils"))]
pub use coordinator::MockTransactionCoordinator;
