//! Unit of work façade.
//!
//! Composes a [`RepositoryRegistry`], a [`TransactionCoordinator`] and the
//! repository creation hook of a technology adapter. One instance is meant
//! for one logical operation and a single caller at a time.

use std::future::Future;
use std::sync::Arc;

use common::{AppError, AppResult};
use domain::{DomainEntity, EntityType};
use tokio::runtime::{Handle, RuntimeFlavor};

use crate::coordinator::TransactionCoordinator;
use crate::registry::{Registrations, RepositoryRegistry};
use crate::repository::{ReadOnlyRepository, Repository, RepositoryFactory};

/// A unit of work over coordinator `C` with repository creation hook `F`.
///
/// Dropping the unit of work disposes it.
pub struct UnitOfWork<C: TransactionCoordinator, F> {
    registry: RepositoryRegistry,
    coordinator: C,
    factory: F,
    disposed: bool,
}

impl<C: TransactionCoordinator, F> UnitOfWork<C, F> {
    /// Create a unit of work without pre-registered repositories
    pub fn new(coordinator: C, factory: F) -> Self {
        Self::with_registrations(coordinator, factory, Registrations::new())
    }

    /// Create a unit of work with pre-registered repositories
    pub fn with_registrations(coordinator: C, factory: F, registrations: Registrations) -> Self {
        tracing::debug!(
            unit_of_work = Self::name(),
            registrations = registrations.len(),
            "Unit of work created"
        );

        Self {
            registry: RepositoryRegistry::new(Self::name(), registrations),
            coordinator,
            factory,
            disposed: false,
        }
    }

    fn name() -> &'static str {
        std::any::type_name::<Self>()
    }

    fn ensure_active(&self) -> AppResult<()> {
        if self.disposed {
            return Err(AppError::disposed(Self::name()));
        }
        Ok(())
    }

    fn ensure_blockable(&self, operation: &'static str) -> AppResult<()> {
        self.ensure_active()?;
        match Handle::try_current() {
            Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::CurrentThread => {
                tracing::warn!(operation, "Blocking call on a current-thread runtime refused");
                Err(AppError::unsupported(
                    operation,
                    "a current-thread runtime (use the async variant)",
                ))
            }
            _ => Ok(()),
        }
    }

    /// Resolve the read-only repository for `E`.
    ///
    /// Returns the pre-registered binding when exactly one exists, fails with
    /// `AmbiguousRegistration` when several do, and otherwise creates one
    /// through the factory on first use and hands out that same instance
    /// afterwards.
    pub fn resolve_readonly<E>(&mut self) -> AppResult<Arc<dyn ReadOnlyRepository<E>>>
    where
        E: DomainEntity,
        F: RepositoryFactory<E>,
    {
        self.ensure_active()?;
        let factory = &self.factory;
        self.registry.resolve_or_create(|| factory.create_readonly())
    }

    /// Resolve the repository for `E`, with the same rules as
    /// [`UnitOfWork::resolve_readonly`].
    pub fn resolve<E>(&mut self) -> AppResult<Arc<dyn Repository<E>>>
    where
        E: DomainEntity,
        F: RepositoryFactory<E>,
    {
        self.ensure_active()?;
        let factory = &self.factory;
        self.registry.resolve_or_create(|| factory.create())
    }

    /// Resolve a custom repository contract.
    ///
    /// Custom contracts are never created on demand; a missing binding is
    /// `RepositoryNotFound`.
    pub fn resolve_custom<R>(&self) -> AppResult<Arc<R>>
    where
        R: ?Sized + Send + Sync + 'static,
    {
        self.ensure_active()?;
        self.registry.resolve_registered::<R>()
    }

    /// Persist all pending changes, blocking the current thread.
    ///
    /// A current-thread tokio runtime cannot be blocked on; there the call
    /// fails with `Unsupported` and [`UnitOfWork::save_changes_async`]
    /// should be used instead.
    pub fn save_changes(&mut self) -> AppResult<()> {
        self.ensure_blockable("save_changes")?;
        block_on(self.save_changes_async())
    }

    /// Persist all pending changes
    pub async fn save_changes_async(&mut self) -> AppResult<()> {
        self.ensure_active()?;
        self.coordinator.save_changes().await
    }

    /// Discard all pending changes, blocking the current thread.
    ///
    /// Fails with `Unsupported` on a current-thread tokio runtime, like
    /// [`UnitOfWork::save_changes`].
    pub fn reject_all_changes(&mut self) -> AppResult<()> {
        self.ensure_blockable("reject_all_changes")?;
        block_on(self.reject_all_changes_async())
    }

    /// Discard all pending changes
    pub async fn reject_all_changes_async(&mut self) -> AppResult<()> {
        self.ensure_active()?;
        self.coordinator.reject_all_changes().await
    }

    /// Discard pending changes of entities of type `E`
    pub fn reject_changes<E: DomainEntity>(&mut self) -> AppResult<()> {
        self.ensure_active()?;
        self.coordinator.reject_changes(EntityType::of::<E>())
    }

    /// Release the coordinator resource and every repository binding.
    ///
    /// Safe to call any number of times; only the first call has an effect.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;

        self.registry.clear();
        self.coordinator.dispose();
        tracing::debug!(unit_of_work = Self::name(), "Unit of work disposed");
    }

    /// Check if the unit of work has been disposed
    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// The transaction coordinator
    pub fn coordinator(&self) -> &C {
        &self.coordinator
    }
}

impl<C: TransactionCoordinator, F> Drop for UnitOfWork<C, F> {
    fn drop(&mut self) {
        self.dispose();
    }
}

fn block_on<T>(future: impl Future<Output = T>) -> T {
    match Handle::try_current() {
        Ok(handle) => tokio::task::block_in_place(|| handle.block_on(future)),
        Err(_) => futures::executor::block_on(future),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinator::MockTransactionCoordinator;
    use async_trait::async_trait;
    use mockall::mock;
    use mockall::predicate::eq;
    use sea_orm::DbErr;

    #[derive(Debug, Clone, PartialEq)]
    struct Order {
        id: u32,
    }
    impl DomainEntity for Order {}

    #[derive(Debug, Clone, PartialEq)]
    struct Customer;
    impl DomainEntity for Customer {}

    struct Orders;

    #[async_trait]
    impl ReadOnlyRepository<Order> for Orders {
        async fn read(&self) -> AppResult<Vec<Order>> {
            Ok(vec![Order { id: 1 }])
        }
    }

    #[async_trait]
    impl Repository<Order> for Orders {
        async fn add(&self, _item: Order) -> AppResult<()> {
            Ok(())
        }

        async fn update(&self, _item: Order) -> AppResult<()> {
            Ok(())
        }

        async fn delete(&self, _item: Order) -> AppResult<()> {
            Ok(())
        }
    }

    mock! {
        OrderFactory {}

        impl RepositoryFactory<Order> for OrderFactory {
            fn create_readonly(&self) -> Arc<dyn ReadOnlyRepository<Order>>;
            fn create(&self) -> Arc<dyn Repository<Order>>;
        }
    }

    mock! {
        OrderStore {}

        #[async_trait]
        impl ReadOnlyRepository<Order> for OrderStore {
            async fn read(&self) -> AppResult<Vec<Order>>;
        }

        #[async_trait]
        impl Repository<Order> for OrderStore {
            async fn add(&self, item: Order) -> AppResult<()>;
            async fn update(&self, item: Order) -> AppResult<()>;
            async fn delete(&self, item: Order) -> AppResult<()>;
        }
    }

    trait OrderLookup: Send + Sync {
        fn open_orders(&self) -> usize;
    }

    struct FixedLookup(usize);

    impl OrderLookup for FixedLookup {
        fn open_orders(&self) -> usize {
            self.0
        }
    }

    fn coordinator() -> MockTransactionCoordinator {
        let mut coordinator = MockTransactionCoordinator::new();
        coordinator.expect_dispose().times(1).return_const(());
        coordinator
    }

    #[test]
    fn test_resolve_creates_once_and_caches() {
        let mut factory = MockOrderFactory::new();
        factory
            .expect_create()
            .times(1)
            .returning(|| Arc::new(Orders));
        let mut uow = UnitOfWork::new(coordinator(), factory);

        let first = uow.resolve::<Order>().unwrap();
        let second = uow.resolve::<Order>().unwrap();
        let third = uow.resolve::<Order>().unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert!(Arc::ptr_eq(&second, &third));
    }

    #[test]
    fn test_registered_repository_skips_factory() {
        let mut factory = MockOrderFactory::new();
        factory.expect_create().never();
        let orders: Arc<dyn Repository<Order>> = Arc::new(Orders);
        let registrations = Registrations::new().repository(orders.clone());
        let mut uow = UnitOfWork::with_registrations(coordinator(), factory, registrations);

        let resolved = uow.resolve::<Order>().unwrap();

        assert!(Arc::ptr_eq(&resolved, &orders));
    }

    #[test]
    fn test_contract_types_are_matched_exactly() {
        let mut factory = MockOrderFactory::new();
        factory
            .expect_create_readonly()
            .times(1)
            .returning(|| Arc::new(Orders));
        let orders: Arc<dyn Repository<Order>> = Arc::new(Orders);
        let registrations = Registrations::new().repository(orders);
        let mut uow = UnitOfWork::with_registrations(coordinator(), factory, registrations);

        let readonly = uow.resolve_readonly::<Order>().unwrap();
        let again = uow.resolve_readonly::<Order>().unwrap();

        assert!(Arc::ptr_eq(&readonly, &again));
    }

    #[test]
    fn test_duplicate_registration_is_ambiguous() {
        let mut factory = MockOrderFactory::new();
        factory.expect_create().never();
        let registrations = Registrations::new()
            .repository::<Order>(Arc::new(Orders))
            .repository::<Order>(Arc::new(Orders));
        let mut uow = UnitOfWork::with_registrations(coordinator(), factory, registrations);

        let err = uow.resolve::<Order>().err().unwrap();

        assert!(matches!(
            err,
            AppError::AmbiguousRegistration { count: 2, unit_of_work, .. }
                if unit_of_work.contains("UnitOfWork")
        ));
    }

    #[test]
    fn test_custom_repository_resolution() {
        let lookup: Arc<dyn OrderLookup> = Arc::new(FixedLookup(3));
        let registrations = Registrations::new().custom(lookup.clone());
        let uow = UnitOfWork::with_registrations(coordinator(), (), registrations);

        let resolved = uow.resolve_custom::<dyn OrderLookup>().unwrap();

        assert!(Arc::ptr_eq(&resolved, &lookup));
        assert_eq!(resolved.open_orders(), 3);
    }

    #[test]
    fn test_missing_custom_repository_is_not_found() {
        let uow = UnitOfWork::new(coordinator(), ());

        let err = uow.resolve_custom::<dyn OrderLookup>().err().unwrap();

        match err {
            AppError::RepositoryNotFound {
                contract,
                unit_of_work,
            } => {
                assert!(contract.contains("OrderLookup"));
                assert!(unit_of_work.contains("UnitOfWork"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_resolved_repository_is_usable() {
        let mut store = MockOrderStore::new();
        store
            .expect_add()
            .with(eq(Order { id: 7 }))
            .times(1)
            .returning(|_| Ok(()));
        let registrations = Registrations::new().repository::<Order>(Arc::new(store));
        let mut uow = UnitOfWork::with_registrations(coordinator(), (), registrations);

        let orders = uow.resolve_custom::<dyn Repository<Order>>().unwrap();
        orders.add(Order { id: 7 }).await.unwrap();
    }

    #[tokio::test]
    async fn test_save_changes_delegates_to_coordinator() {
        let mut coordinator = coordinator();
        coordinator
            .expect_save_changes()
            .times(1)
            .returning(|| Ok(()));
        let mut uow = UnitOfWork::new(coordinator, ());

        uow.save_changes_async().await.unwrap();
    }

    #[test]
    fn test_save_changes_failure_is_surfaced_unchanged() {
        let mut coordinator = coordinator();
        coordinator
            .expect_save_changes()
            .times(1)
            .returning(|| Err(AppError::Persistence(DbErr::Custom("deadlock".to_string()))));
        let mut uow = UnitOfWork::new(coordinator, ());

        let err = tokio_test::block_on(uow.save_changes_async()).unwrap_err();

        assert!(matches!(err, AppError::Persistence(DbErr::Custom(ref msg)) if msg == "deadlock"));
    }

    #[test]
    fn test_blocking_save_without_runtime() {
        let mut coordinator = coordinator();
        coordinator
            .expect_save_changes()
            .times(1)
            .returning(|| Ok(()));
        let mut uow = UnitOfWork::new(coordinator, ());

        uow.save_changes().unwrap();
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_blocking_reject_inside_runtime() {
        let mut coordinator = coordinator();
        coordinator
            .expect_reject_all_changes()
            .times(1)
            .returning(|| Ok(()));
        let mut uow = UnitOfWork::new(coordinator, ());

        uow.reject_all_changes().unwrap();
    }

    #[tokio::test]
    async fn test_blocking_calls_on_current_thread_runtime_fail() {
        let mut coordinator = coordinator();
        coordinator.expect_save_changes().never();
        coordinator.expect_reject_all_changes().never();
        let mut uow = UnitOfWork::new(coordinator, ());

        let save = uow.save_changes().unwrap_err();
        let reject = uow.reject_all_changes().unwrap_err();

        assert!(matches!(
            save,
            AppError::Unsupported { operation: "save_changes", .. }
        ));
        assert!(matches!(
            reject,
            AppError::Unsupported { operation: "reject_all_changes", .. }
        ));
        assert!(save.to_string().contains("async"));
        assert!(!uow.is_disposed());
    }

    #[test]
    fn test_reject_changes_passes_entity_type() {
        let mut coordinator = coordinator();
        coordinator
            .expect_reject_changes()
            .with(eq(EntityType::of::<Customer>()))
            .times(1)
            .returning(|_| Ok(()));
        let mut uow = UnitOfWork::new(coordinator, ());

        uow.reject_changes::<Customer>().unwrap();
    }

    #[test]
    fn test_dispose_is_idempotent() {
        let mut uow = UnitOfWork::new(coordinator(), MockOrderFactory::new());

        uow.dispose();
        uow.dispose();
        uow.dispose();

        assert!(uow.is_disposed());
    }

    #[test]
    fn test_operations_after_dispose_fail() {
        let lookup: Arc<dyn OrderLookup> = Arc::new(FixedLookup(1));
        let registrations = Registrations::new().custom(lookup.clone());
        let mut factory = MockOrderFactory::new();
        factory.expect_create().never();
        let mut uow = UnitOfWork::with_registrations(coordinator(), factory, registrations);

        uow.dispose();

        assert_eq!(Arc::strong_count(&lookup), 1);
        assert!(matches!(uow.resolve::<Order>(), Err(AppError::Disposed { .. })));
        assert!(matches!(
            uow.resolve_custom::<dyn OrderLookup>(),
            Err(AppError::Disposed { .. })
        ));
        assert!(matches!(uow.save_changes(), Err(AppError::Disposed { .. })));
        assert!(matches!(
            uow.reject_changes::<Order>(),
            Err(AppError::Disposed { .. })
        ));
    }

    #[test]
    fn test_drop_disposes_coordinator() {
        let uow = UnitOfWork::new(coordinator(), ());
        drop(uow);
    }
}
