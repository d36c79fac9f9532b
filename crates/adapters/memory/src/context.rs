//! In-memory change-tracking context.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::{AppError, AppResult};
use domain::{EntityType, Identified};
use parking_lot::Mutex;
use sea_orm::DbErr;
use unit_of_work::tracking::EntryVisitor;
use unit_of_work::{EntityState, TrackingContext};

use crate::entity_set::{EntitySet, TypedSet};
use crate::store::{MemoryStore, Tables};

#[derive(Default)]
struct ContextState {
    sets: HashMap<EntityType, Box<dyn EntitySet>>,
    in_transaction: bool,
    releases: usize,
}

impl ContextState {
    fn set_mut<E: Identified + Clone>(&mut self) -> AppResult<&mut TypedSet<E>> {
        let entity = EntityType::of::<E>();
        self.sets
            .entry(entity)
            .or_insert_with(|| Box::new(TypedSet::<E>::new()))
            .as_any_mut()
            .downcast_mut::<TypedSet<E>>()
            .ok_or_else(|| {
                AppError::internal(format!("entity set for {} has an unexpected type", entity))
            })
    }

    fn set<E: Identified + Clone>(&self) -> Option<&TypedSet<E>> {
        self.sets
            .get(&EntityType::of::<E>())
            .and_then(|set| set.as_any().downcast_ref::<TypedSet<E>>())
    }
}

/// Change tracker of one unit of work over a [`MemoryStore`].
///
/// Clones share the tracker, so the repositories and the coordinator of
/// one unit of work see the same entries. Separate contexts over the same
/// store track independently and only meet in the committed rows.
#[derive(Clone)]
pub struct MemoryContext {
    store: MemoryStore,
    state: Arc<Mutex<ContextState>>,
}

impl MemoryContext {
    /// Fresh tracker over `store`
    pub fn new(store: MemoryStore) -> Self {
        Self {
            store,
            state: Arc::new(Mutex::new(ContextState::default())),
        }
    }

    pub fn store(&self) -> &MemoryStore {
        &self.store
    }

    /// Tracking state of the `E` with identifier `id`; `Detached` when untracked
    pub fn state_of<E: Identified + Clone>(&self, id: &E::Id) -> EntityState {
        self.state
            .lock()
            .set::<E>()
            .map_or(EntityState::Detached, |set| set.state_of(id))
    }

    /// Current values of the tracked `E` with identifier `id`
    pub fn tracked<E: Identified + Clone>(&self, id: &E::Id) -> Option<E> {
        self.state
            .lock()
            .set::<E>()
            .and_then(|set| set.current(id).cloned())
    }

    /// Number of tracked entries across all entity types
    pub fn tracked_count(&self) -> usize {
        self.state
            .lock()
            .sets
            .values()
            .map(|set| set.tracked_count())
            .sum()
    }

    /// How many times the context has been released
    pub fn release_count(&self) -> usize {
        self.state.lock().releases
    }

    pub(crate) fn track<E, F>(&self, apply: F) -> AppResult<()>
    where
        E: Identified + Clone,
        F: FnOnce(&mut TypedSet<E>, &Tables) -> AppResult<()>,
    {
        let mut state = self.state.lock();
        let tables = self.store.lock();
        apply(state.set_mut::<E>()?, &tables)
    }
}

#[async_trait]
impl TrackingContext for MemoryContext {
    fn visit_entries(
        &mut self,
        filter: Option<EntityType>,
        visitor: &mut EntryVisitor<'_>,
    ) -> AppResult<()> {
        let mut state = self.state.lock();
        match filter {
            Some(entity) => match state.sets.get_mut(&entity) {
                Some(set) => set.visit(visitor),
                None => Ok(()),
            },
            None => {
                for set in state.sets.values_mut() {
                    set.visit(visitor)?;
                }
                Ok(())
            }
        }
    }

    async fn begin(&mut self) -> Result<(), DbErr> {
        let mut state = self.state.lock();
        if state.in_transaction {
            return Err(DbErr::Custom("a transaction is already active".to_string()));
        }
        state.in_transaction = true;
        Ok(())
    }

    async fn flush(&mut self) -> Result<(), DbErr> {
        let mut state = self.state.lock();
        let mut tables = self.store.lock();
        for set in state.sets.values_mut() {
            set.flush(&mut tables)?;
        }
        Ok(())
    }

    async fn commit(&mut self) -> Result<(), DbErr> {
        let mut state = self.state.lock();
        if !state.in_transaction {
            return Err(DbErr::Custom("no active transaction to commit".to_string()));
        }
        state.in_transaction = false;
        for set in state.sets.values_mut() {
            set.accept();
        }
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), DbErr> {
        let mut state = self.state.lock();
        if !state.in_transaction {
            return Err(DbErr::Custom("no active transaction to roll back".to_string()));
        }
        state.in_transaction = false;
        let mut tables = self.store.lock();
        for set in state.sets.values_mut() {
            set.undo(&mut tables);
        }
        Ok(())
    }

    fn release(&mut self) {
        let mut state = self.state.lock();
        state.releases += 1;
        for set in state.sets.values_mut() {
            set.clear_tracking();
        }
        tracing::debug!(releases = state.releases, "Memory context released");
    }
}
