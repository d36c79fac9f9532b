//! Repository registry - contract-keyed repository lookup.
//!
//! Bindings are matched on the exact contract type (`dyn Repository<E>`,
//! `dyn ReadOnlyRepository<E>` or any custom `?Sized` contract). Pre-registered
//! bindings are grouped once at construction so duplicate registrations are a
//! simple count check; repositories produced by a creation hook are cached for
//! the lifetime of the registry so callers always get the same instance.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use common::{AppError, AppResult};
use domain::DomainEntity;

use crate::repository::{ReadOnlyRepository, Repository};

/// Type-erased `Arc<C>` for some contract `C`.
type Binding = Arc<dyn Any + Send + Sync>;

/// Identity of a repository contract type.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContractKey {
    id: TypeId,
    name: &'static str,
}

impl ContractKey {
    /// Key for contract type `C`
    pub fn of<C: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<C>(),
            name: std::any::type_name::<C>(),
        }
    }

    /// Fully qualified contract type name
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl fmt::Debug for ContractKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Explicit list of pre-registered repository bindings.
///
/// Registration order is preserved and duplicates are kept; the registry
/// reports them instead of picking one.
#[derive(Default)]
pub struct Registrations {
    bindings: Vec<(ContractKey, Binding)>,
}

impl Registrations {
    /// Create an empty registration list
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a read-only repository for `E`
    pub fn readonly<E: DomainEntity>(self, repository: Arc<dyn ReadOnlyRepository<E>>) -> Self {
        self.custom::<dyn ReadOnlyRepository<E>>(repository)
    }

    /// Register a repository for `E`
    pub fn repository<E: DomainEntity>(self, repository: Arc<dyn Repository<E>>) -> Self {
        self.custom::<dyn Repository<E>>(repository)
    }

    /// Register a repository under an arbitrary contract type
    pub fn custom<R>(mut self, repository: Arc<R>) -> Self
    where
        R: ?Sized + Send + Sync + 'static,
    {
        self.bindings.push((ContractKey::of::<R>(), Arc::new(repository)));
        self
    }

    /// Number of bindings, duplicates included
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Check if nothing was registered
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

/// Per unit-of-work repository registry.
pub struct RepositoryRegistry {
    owner: &'static str,
    registered: HashMap<TypeId, Vec<Binding>>,
    created: HashMap<TypeId, Binding>,
}

impl RepositoryRegistry {
    /// Build a registry for the unit of work named `owner`
    pub fn new(owner: &'static str, registrations: Registrations) -> Self {
        let mut registered: HashMap<TypeId, Vec<Binding>> = HashMap::new();
        for (key, binding) in registrations.bindings {
            registered.entry(key.id).or_default().push(binding);
        }

        Self {
            owner,
            registered,
            created: HashMap::new(),
        }
    }

    /// Resolve the pre-registered binding for `C`, or create and cache one.
    ///
    /// `create` runs at most once per contract type for this registry.
    pub fn resolve_or_create<C, F>(&mut self, create: F) -> AppResult<Arc<C>>
    where
        C: ?Sized + Send + Sync + 'static,
        F: FnOnce() -> Arc<C>,
    {
        if let Some(repository) = self.registered::<C>()? {
            return Ok(repository);
        }

        let key = ContractKey::of::<C>();
        if let Some(binding) = self.created.get(&key.id) {
            return downcast(binding, key);
        }

        let repository = create();
        tracing::debug!(
            contract = key.name,
            unit_of_work = self.owner,
            "Created repository"
        );
        self.created.insert(key.id, Arc::new(repository.clone()));

        Ok(repository)
    }

    /// Resolve a binding for `C` that must have been pre-registered
    pub fn resolve_registered<C>(&self) -> AppResult<Arc<C>>
    where
        C: ?Sized + Send + Sync + 'static,
    {
        self.registered::<C>()?
            .ok_or_else(|| AppError::not_registered(ContractKey::of::<C>().name, self.owner))
    }

    /// Number of repositories created through the creation hook
    pub fn created_count(&self) -> usize {
        self.created.len()
    }

    /// Drop every binding held by the registry
    pub fn clear(&mut self) {
        self.registered.clear();
        self.created.clear();
    }

    fn registered<C>(&self) -> AppResult<Option<Arc<C>>>
    where
        C: ?Sized + Send + Sync + 'static,
    {
        let key = ContractKey::of::<C>();

        match self.registered.get(&key.id).map(Vec::as_slice) {
            None | Some([]) => Ok(None),
            Some([binding]) => downcast(binding, key).map(Some),
            Some(bindings) => Err(AppError::ambiguous(key.name, self.owner, bindings.len())),
        }
    }
}

fn downcast<C>(binding: &Binding, key: ContractKey) -> AppResult<Arc<C>>
where
    C: ?Sized + Send + Sync + 'static,
{
    (**binding)
        .downcast_ref::<Arc<C>>()
        .cloned()
        .ok_or_else(|| AppError::internal(format!("binding for {} has an unexpected type", key.name)))
}
