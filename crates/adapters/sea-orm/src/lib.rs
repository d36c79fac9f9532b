//! SeaORM adapter for the connection-oriented unit of work.
//!
//! Repositories execute against the transaction held by a
//! [`unit_of_work::ConnectionCoordinator`], so everything written through one
//! unit of work is committed or rolled back together.

pub mod db;
pub mod entity;
pub mod factory;
pub mod repository;

pub use db::Database;
pub use entity::SeaOrmEntity;
pub use factory::{SeaOrmRepositoryFactory, SeaOrmUnitOfWork, SeaOrmUnitOfWorkFactory};
pub use repository::{SeaOrmReadOnlyRepository, SeaOrmRepository};
