//! Per-entity-type change tracker.

use std::any::Any;
use std::collections::HashMap;

use common::{AppError, AppResult};
use domain::{EntityType, Identified};
use sea_orm::DbErr;
use unit_of_work::tracking::EntryVisitor;
use unit_of_work::{EntityState, TrackedEntry};

use crate::store::Tables;

/// Type-erased entity set, one per entity type in a context.
pub(crate) trait EntitySet: Send {
    fn visit(&mut self, visitor: &mut EntryVisitor<'_>) -> AppResult<()>;
    /// Write tracked changes into `tables`, remembering what they replaced
    fn flush(&mut self, tables: &mut Tables) -> Result<(), DbErr>;
    /// Put back the rows replaced by the last flush
    fn undo(&mut self, tables: &mut Tables);
    fn accept(&mut self);
    fn clear_tracking(&mut self);
    fn tracked_count(&self) -> usize;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn as_any(&self) -> &dyn Any;
}

/// Tracked instance of an entity.
pub(crate) struct TypedEntry<E> {
    current: E,
    original: Option<E>,
    state: EntityState,
}

impl<E: Identified + Clone> TrackedEntry for TypedEntry<E> {
    fn entity_type(&self) -> EntityType {
        EntityType::of::<E>()
    }

    fn state(&self) -> EntityState {
        self.state
    }

    fn set_state(&mut self, next: EntityState) -> AppResult<()> {
        match (self.state, next) {
            (EntityState::Deleted, EntityState::Unchanged) => Err(AppError::InvalidStateTransition {
                entity: self.entity_type(),
                from: self.state.as_str(),
                to: next.as_str(),
            }),
            (_, EntityState::Unchanged) => {
                if let Some(original) = &self.original {
                    self.current = original.clone();
                }
                self.state = EntityState::Unchanged;
                Ok(())
            }
            _ => {
                self.state = next;
                Ok(())
            }
        }
    }
}

/// Entries tracked for `E` by one context, plus the undo log of the
/// rows written by the current flush.
pub(crate) struct TypedSet<E: Identified> {
    entries: HashMap<E::Id, TypedEntry<E>>,
    undo: HashMap<E::Id, Option<E>>,
}

impl<E: Identified + Clone> TypedSet<E> {
    pub(crate) fn new() -> Self {
        Self {
            entries: HashMap::new(),
            undo: HashMap::new(),
        }
    }

    pub(crate) fn state_of(&self, id: &E::Id) -> EntityState {
        self.entries
            .get(id)
            .map_or(EntityState::Detached, |entry| entry.state)
    }

    pub(crate) fn current(&self, id: &E::Id) -> Option<&E> {
        self.entries.get(id).map(|entry| &entry.current)
    }

    pub(crate) fn track_added(&mut self, item: E) -> AppResult<()> {
        let id = item.id();
        if self.entries.contains_key(&id) {
            return Err(AppError::conflict(format!(
                "{} {:?}",
                EntityType::of::<E>(),
                id
            )));
        }

        self.entries.insert(
            id,
            TypedEntry {
                current: item,
                original: None,
                state: EntityState::Added,
            },
        );
        Ok(())
    }

    pub(crate) fn track_modified(&mut self, item: E, tables: &Tables) -> AppResult<()> {
        let id = item.id();
        match self.entries.get_mut(&id) {
            Some(entry) => {
                entry.current = item;
                if entry.state != EntityState::Added {
                    entry.state = EntityState::Modified;
                }
            }
            None => {
                let original = stored(tables, &id);
                self.entries.insert(
                    id,
                    TypedEntry {
                        current: item,
                        original,
                        state: EntityState::Modified,
                    },
                );
            }
        }
        Ok(())
    }

    pub(crate) fn track_deleted(&mut self, item: E, tables: &Tables) -> AppResult<()> {
        let id = item.id();
        match self.entries.get(&id).map(|entry| entry.state) {
            Some(EntityState::Added) => {
                self.entries.remove(&id);
            }
            Some(_) => {
                if let Some(entry) = self.entries.get_mut(&id) {
                    entry.state = EntityState::Deleted;
                }
            }
            None => {
                let original = stored(tables, &id);
                self.entries.insert(
                    id,
                    TypedEntry {
                        current: item,
                        original,
                        state: EntityState::Deleted,
                    },
                );
            }
        }
        Ok(())
    }
}

fn stored<E: Identified + Clone>(tables: &Tables, id: &E::Id) -> Option<E> {
    tables.table::<E>().and_then(|rows| rows.get(id)).cloned()
}

impl<E: Identified + Clone> EntitySet for TypedSet<E> {
    fn visit(&mut self, visitor: &mut EntryVisitor<'_>) -> AppResult<()> {
        let mut outcome = Ok(());
        for entry in self.entries.values_mut() {
            if let Err(err) = visitor(entry) {
                outcome = Err(err);
                break;
            }
        }
        self.entries.retain(|_, entry| entry.state != EntityState::Detached);
        outcome
    }

    fn flush(&mut self, tables: &mut Tables) -> Result<(), DbErr> {
        if self.entries.is_empty() {
            return Ok(());
        }
        let rows = tables
            .table_mut::<E>()
            .map_err(|err| DbErr::Custom(err.to_string()))?;

        for (id, entry) in &self.entries {
            match entry.state {
                EntityState::Added => {
                    if rows.contains_key(id) {
                        return Err(DbErr::RecordNotInserted);
                    }
                    self.undo.entry(id.clone()).or_insert(None);
                    rows.insert(id.clone(), entry.current.clone());
                }
                EntityState::Modified => {
                    let previous = rows.get(id).cloned().ok_or(DbErr::RecordNotUpdated)?;
                    self.undo.entry(id.clone()).or_insert(Some(previous));
                    rows.insert(id.clone(), entry.current.clone());
                }
                EntityState::Deleted => {
                    let previous = rows.remove(id).ok_or_else(|| {
                        DbErr::RecordNotFound(format!("{} {:?}", EntityType::of::<E>(), id))
                    })?;
                    self.undo.entry(id.clone()).or_insert(Some(previous));
                }
                EntityState::Unchanged | EntityState::Detached => {}
            }
        }
        Ok(())
    }

    fn undo(&mut self, tables: &mut Tables) {
        if self.undo.is_empty() {
            return;
        }
        let rows = match tables.table_mut::<E>() {
            Ok(rows) => rows,
            Err(err) => {
                tracing::error!("Undo of flushed rows failed: {}", err);
                return;
            }
        };

        for (id, previous) in self.undo.drain() {
            match previous {
                Some(row) => {
                    rows.insert(id, row);
                }
                None => {
                    rows.remove(&id);
                }
            }
        }
    }

    fn accept(&mut self) {
        self.undo.clear();
        self.entries.retain(|_, entry| entry.state != EntityState::Deleted);
        for entry in self.entries.values_mut() {
            entry.state = EntityState::Unchanged;
            entry.original = Some(entry.current.clone());
        }
    }

    fn clear_tracking(&mut self) {
        self.entries.clear();
        self.undo.clear();
    }

    fn tracked_count(&self) -> usize {
        self.entries.len()
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
