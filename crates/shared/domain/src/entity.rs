//! Entity marker traits and runtime entity descriptors.

use std::any::TypeId;
use std::fmt::{self, Debug};
use std::hash::{Hash, Hasher};

use serde::Serialize;

/// Marker for types that can be persisted through a unit of work.
///
/// Repositories, change tracking and reversion are all keyed by the
/// concrete entity type, so implementors must be `'static`.
pub trait DomainEntity: Send + Sync + 'static {}

/// Entity with a stable identifier.
///
/// Change-tracking adapters use the identifier to deduplicate tracked
/// instances of the same row.
pub trait Identified: DomainEntity {
    type Id: Clone + Eq + Hash + Debug + Send + Sync + 'static;

    /// Get entity identifier
    fn id(&self) -> Self::Id;
}

/// Runtime descriptor of an entity type.
///
/// Equality and hashing use the [`TypeId`] only; the name is carried for
/// diagnostics.
#[derive(Clone, Copy, Serialize)]
pub struct EntityType {
    #[serde(skip)]
    id: TypeId,
    name: &'static str,
}

impl EntityType {
    /// Descriptor for entity type `E`
    pub fn of<E: DomainEntity>() -> Self {
        Self {
            id: TypeId::of::<E>(),
            name: std::any::type_name::<E>(),
        }
    }

    /// Check whether this descriptor names `E`
    pub fn is<E: DomainEntity>(&self) -> bool {
        self.id == TypeId::of::<E>()
    }

    /// Fully qualified type name
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for EntityType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for EntityType {}

impl Hash for EntityType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl Debug for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}
