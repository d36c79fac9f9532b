//! Mapping between domain entities and SeaORM tables.

use domain::DomainEntity;
use sea_orm::{ActiveModelBehavior, ActiveModelTrait, EntityTrait, FromQueryResult};

/// A SeaORM model usable as a unit of work entity.
///
/// Implemented for the `Model` generated by `DeriveEntityModel`:
///
/// ```ignore
/// impl DomainEntity for book::Model {}
///
/// impl SeaOrmEntity for book::Model {
///     type Table = book::Entity;
///     type ActiveModel = book::ActiveModel;
/// }
/// ```
pub trait SeaOrmEntity: DomainEntity + Clone + FromQueryResult {
    /// Table entity whose rows are this model
    type Table: EntityTrait<Model = Self>;

    /// Active model used for writes
    type ActiveModel: ActiveModelTrait<Entity = Self::Table> + ActiveModelBehavior + Send + 'static;
}
