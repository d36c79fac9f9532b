//! Unit of work tests through the public API.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use common::{AppError, AppResult};
use domain::{DomainEntity, EntityType};
use sea_orm::DbErr;
use unit_of_work::{
    QueryExt, ReadOnlyRepository, Registrations, Repository, RepositoryFactory,
    TransactionCoordinator, UnitOfWork,
};

#[derive(Debug, Clone, PartialEq)]
struct Book {
    isbn: &'static str,
    title: &'static str,
}
impl DomainEntity for Book {}

#[derive(Debug, Clone, PartialEq)]
struct Author {
    name: &'static str,
}
impl DomainEntity for Author {}

/// Test coordinator that records what it was asked to do
#[derive(Default)]
struct RecordingCoordinator {
    log: Arc<Mutex<Vec<String>>>,
    fail_save: bool,
    disposed: bool,
}

impl RecordingCoordinator {
    fn record(&self, entry: impl Into<String>) {
        self.log.lock().unwrap().push(entry.into());
    }
}

#[async_trait]
impl TransactionCoordinator for RecordingCoordinator {
    async fn save_changes(&mut self) -> AppResult<()> {
        self.record("save");
        if self.fail_save {
            return Err(DbErr::Custom("unique violation".to_string()).into());
        }
        Ok(())
    }

    async fn reject_all_changes(&mut self) -> AppResult<()> {
        self.record("reject_all");
        Ok(())
    }

    fn reject_changes(&mut self, entity: EntityType) -> AppResult<()> {
        self.record(format!("reject {}", entity.name()));
        Ok(())
    }

    fn dispose(&mut self) {
        self.record("dispose");
        self.disposed = true;
    }

    fn is_disposed(&self) -> bool {
        self.disposed
    }
}

/// Shelf of books kept in memory; writes are applied immediately
#[derive(Default)]
struct Shelf {
    books: Mutex<Vec<Book>>,
}

#[async_trait]
impl ReadOnlyRepository<Book> for Shelf {
    async fn read(&self) -> AppResult<Vec<Book>> {
        Ok(self.books.lock().unwrap().clone())
    }
}

#[async_trait]
impl Repository<Book> for Shelf {
    async fn add(&self, item: Book) -> AppResult<()> {
        self.books.lock().unwrap().push(item);
        Ok(())
    }

    async fn update(&self, item: Book) -> AppResult<()> {
        let mut books = self.books.lock().unwrap();
        let slot = books
            .iter_mut()
            .find(|book| book.isbn == item.isbn)
            .ok_or(AppError::NotFound)?;
        *slot = item;
        Ok(())
    }

    async fn delete(&self, item: Book) -> AppResult<()> {
        self.books.lock().unwrap().retain(|book| book.isbn != item.isbn);
        Ok(())
    }
}

/// Creation hook that counts how often it is invoked
#[derive(Default)]
struct ShelfFactory {
    created: Arc<AtomicUsize>,
}

impl RepositoryFactory<Book> for ShelfFactory {
    fn create_readonly(&self) -> Arc<dyn ReadOnlyRepository<Book>> {
        self.created.fetch_add(1, Ordering::SeqCst);
        Arc::new(Shelf::default())
    }

    fn create(&self) -> Arc<dyn Repository<Book>> {
        self.created.fetch_add(1, Ordering::SeqCst);
        Arc::new(Shelf::default())
    }
}

trait Catalogue: Send + Sync {
    fn authors(&self) -> Vec<Author>;
}

struct StaticCatalogue;

impl Catalogue for StaticCatalogue {
    fn authors(&self) -> Vec<Author> {
        vec![Author { name: "Le Guin" }]
    }
}

#[tokio::test]
async fn test_repository_writes_and_save() {
    common::telemetry::try_init_for_tests();
    let coordinator = RecordingCoordinator::default();
    let log = coordinator.log.clone();
    let factory = ShelfFactory::default();
    let created = factory.created.clone();
    let mut uow = UnitOfWork::new(coordinator, factory);

    let books = uow.resolve::<Book>().unwrap();
    books
        .add(Book {
            isbn: "978-0441478125",
            title: "The Left Hand of Darkness",
        })
        .await
        .unwrap();
    books
        .update(Book {
            isbn: "978-0441478125",
            title: "The Left Hand of Darkness (Ace)",
        })
        .await
        .unwrap();
    uow.save_changes_async().await.unwrap();

    let again = uow.resolve::<Book>().unwrap();
    let found = again.single(|book| book.isbn == "978-0441478125").await.unwrap();
    assert_eq!(found.title, "The Left Hand of Darkness (Ace)");
    assert_eq!(created.load(Ordering::SeqCst), 1);

    drop(uow);
    assert_eq!(*log.lock().unwrap(), vec!["save", "dispose"]);
}

#[tokio::test]
async fn test_failed_save_surfaces_persistence_error() {
    let coordinator = RecordingCoordinator {
        fail_save: true,
        ..RecordingCoordinator::default()
    };
    let mut uow = UnitOfWork::new(coordinator, ShelfFactory::default());

    let err = uow.save_changes_async().await.unwrap_err();

    assert!(err.is_persistence());
    assert_eq!(err.code(), "PERSISTENCE_FAILURE");
    assert!(matches!(err, AppError::Persistence(DbErr::Custom(ref msg)) if msg == "unique violation"));
}

#[test]
fn test_readonly_and_readwrite_are_separate_contracts() {
    let factory = ShelfFactory::default();
    let created = factory.created.clone();
    let mut uow = UnitOfWork::new(RecordingCoordinator::default(), factory);

    let _readonly = uow.resolve_readonly::<Book>().unwrap();
    let _readwrite = uow.resolve::<Book>().unwrap();
    let _readonly_again = uow.resolve_readonly::<Book>().unwrap();

    assert_eq!(created.load(Ordering::SeqCst), 2);
}

#[test]
fn test_custom_contract_lookup() {
    let registrations = Registrations::new().custom::<dyn Catalogue>(Arc::new(StaticCatalogue));
    let uow = UnitOfWork::with_registrations(
        RecordingCoordinator::default(),
        ShelfFactory::default(),
        registrations,
    );

    let catalogue = uow.resolve_custom::<dyn Catalogue>().unwrap();

    assert_eq!(catalogue.authors(), vec![Author { name: "Le Guin" }]);
    assert!(matches!(
        uow.resolve_custom::<dyn ReadOnlyRepository<Author>>(),
        Err(AppError::RepositoryNotFound { .. })
    ));
}

#[test]
fn test_rejections_reach_coordinator() {
    let coordinator = RecordingCoordinator::default();
    let log = coordinator.log.clone();
    let mut uow = UnitOfWork::new(coordinator, ShelfFactory::default());

    uow.reject_changes::<Author>().unwrap();
    uow.reject_all_changes().unwrap();
    uow.dispose();
    uow.dispose();

    let log = log.lock().unwrap();
    assert_eq!(log.len(), 3);
    assert!(log[0].starts_with("reject ") && log[0].ends_with("Author"));
    assert_eq!(log[1], "reject_all");
    assert_eq!(log[2], "dispose");
    assert!(uow.coordinator().is_disposed());
}

#[test]
fn test_dispose_on_early_return() {
    fn failing_operation(log: Arc<Mutex<Vec<String>>>) -> AppResult<()> {
        let coordinator = RecordingCoordinator {
            log,
            ..RecordingCoordinator::default()
        };
        let uow = UnitOfWork::new(coordinator, ShelfFactory::default());
        uow.resolve_custom::<dyn Catalogue>()?;
        Ok(())
    }

    let log = Arc::new(Mutex::new(Vec::new()));

    assert!(failing_operation(log.clone()).is_err());
    assert_eq!(*log.lock().unwrap(), vec!["dispose"]);
}
