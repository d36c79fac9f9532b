//! Committed rows shared by every unit of work begun from a store.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use common::{AppError, AppResult};
use domain::{EntityType, Identified};
use parking_lot::{Mutex, MutexGuard};

/// Committed rows of one entity type, keyed by identifier.
pub(crate) type Table<E> = HashMap<<E as Identified>::Id, E>;

/// Type-erased tables, one per entity type.
#[derive(Default)]
pub(crate) struct Tables {
    tables: HashMap<EntityType, Box<dyn Any + Send>>,
}

impl Tables {
    pub(crate) fn table<E: Identified>(&self) -> Option<&Table<E>> {
        self.tables
            .get(&EntityType::of::<E>())
            .and_then(|table| table.downcast_ref::<Table<E>>())
    }

    pub(crate) fn table_mut<E: Identified>(&mut self) -> AppResult<&mut Table<E>> {
        let entity = EntityType::of::<E>();
        self.tables
            .entry(entity)
            .or_insert_with(|| Box::new(Table::<E>::new()))
            .downcast_mut::<Table<E>>()
            .ok_or_else(|| AppError::internal(format!("table for {} has an unexpected type", entity)))
    }
}

/// Shared handle to committed in-memory rows.
///
/// Clones refer to the same rows. Each unit of work begun from the store
/// gets its own [`MemoryContext`](crate::MemoryContext) tracking changes
/// against them.
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store committed rows
    pub fn seed<E: Identified + Clone>(&self, rows: impl IntoIterator<Item = E>) -> AppResult<()> {
        let mut tables = self.tables.lock();
        tables
            .table_mut::<E>()?
            .extend(rows.into_iter().map(|row| (row.id(), row)));
        Ok(())
    }

    /// Committed rows of `E`
    pub fn rows<E: Identified + Clone>(&self) -> Vec<E> {
        self.tables
            .lock()
            .table::<E>()
            .map(|table| table.values().cloned().collect())
            .unwrap_or_default()
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock()
    }
}
