//! Change tracking contract and the reversion algorithm.
//!
//! A tracking context (owned by a technology adapter) records every entity
//! it has loaded or been handed together with a lifecycle state. The unit of
//! work never creates entries; it only walks them and moves their state when
//! changes are rejected.

use std::fmt;

use async_trait::async_trait;
use common::AppResult;
use domain::EntityType;
use sea_orm::DbErr;

/// Lifecycle state of a tracked entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityState {
    /// Not tracked
    Detached,
    /// Tracked and identical to the stored row
    Unchanged,
    /// Pending insert
    Added,
    /// Pending update
    Modified,
    /// Pending delete
    Deleted,
}

impl EntityState {
    /// State name
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityState::Detached => "Detached",
            EntityState::Unchanged => "Unchanged",
            EntityState::Added => "Added",
            EntityState::Modified => "Modified",
            EntityState::Deleted => "Deleted",
        }
    }

    /// Check if the state carries a pending change
    pub fn is_pending(&self) -> bool {
        matches!(
            self,
            EntityState::Added | EntityState::Modified | EntityState::Deleted
        )
    }
}

impl fmt::Display for EntityState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A tracked entity record.
pub trait TrackedEntry {
    /// Runtime type of the tracked entity
    fn entity_type(&self) -> EntityType;

    /// Current lifecycle state
    fn state(&self) -> EntityState;

    /// Move the entry to `next`.
    ///
    /// Implementations reject `Deleted -> Unchanged`; a deleted entry must
    /// go through `Modified` first, which clears the pending deletion.
    fn set_state(&mut self, next: EntityState) -> AppResult<()>;
}

/// Visitor applied to tracked entries.
pub type EntryVisitor<'v> = dyn FnMut(&mut dyn TrackedEntry) -> AppResult<()> + 'v;

/// Persistence context that tracks entity lifecycle states.
#[async_trait]
pub trait TrackingContext: Send {
    /// Apply `visitor` to every tracked entry, or only to entries of `filter`.
    ///
    /// Entries the visitor leaves `Detached` are removed from tracking.
    fn visit_entries(
        &mut self,
        filter: Option<EntityType>,
        visitor: &mut EntryVisitor<'_>,
    ) -> AppResult<()>;

    /// Begin a technology-level transaction
    async fn begin(&mut self) -> Result<(), DbErr>;

    /// Write every pending change inside the current transaction
    async fn flush(&mut self) -> Result<(), DbErr>;

    /// Commit the current transaction and accept the flushed changes
    async fn commit(&mut self) -> Result<(), DbErr>;

    /// Roll back the current transaction
    async fn rollback(&mut self) -> Result<(), DbErr>;

    /// Release the underlying resource
    fn release(&mut self);
}

/// Revert one entry so it matches what is persisted.
///
/// `Modified` and `Deleted` entries become `Unchanged` (via `Modified`),
/// `Added` entries become `Detached`; anything else is left alone.
pub fn revert_entry(entry: &mut dyn TrackedEntry) -> AppResult<()> {
    match entry.state() {
        EntityState::Modified | EntityState::Deleted => {
            entry.set_state(EntityState::Modified)?;
            entry.set_state(EntityState::Unchanged)
        }
        EntityState::Added => entry.set_state(EntityState::Detached),
        EntityState::Unchanged | EntityState::Detached => Ok(()),
    }
}

/// Revert every entry of `context`, or only entries of `filter`.
pub fn revert_entries<C>(context: &mut C, filter: Option<EntityType>) -> AppResult<()>
where
    C: TrackingContext + ?Sized,
{
    context.visit_entries(filter, &mut |entry| revert_entry(entry))
}
