//! Domain layer - Entity contracts shared by the unit of work and its adapters.
//!
//! This crate contains no persistence logic. Entities opt into persistence
//! by implementing [`DomainEntity`]; adapters that need a stable key also
//! require [`Identified`].

pub mod entity;

pub use entity::{DomainEntity, EntityType, Identified};
