//! Query helpers over repository reads.
//!
//! Implemented for every [`ReadOnlyRepository`], including the read half of
//! every [`crate::Repository`]. The repository is the explicit executor;
//! there is no process-wide query executor to configure.

use async_trait::async_trait;
use common::{AppError, AppResult};
use domain::DomainEntity;

use crate::repository::ReadOnlyRepository;

/// Predicate-based lookups on top of [`ReadOnlyRepository::read`].
#[async_trait]
pub trait QueryExt<E: DomainEntity>: ReadOnlyRepository<E> {
    /// First matching entity, `NotFound` when nothing matches
    async fn first<P>(&self, predicate: P) -> AppResult<E>
    where
        P: Fn(&E) -> bool + Send + Sync,
    {
        self.first_or_none(predicate).await?.ok_or(AppError::NotFound)
    }

    /// First matching entity, if any
    async fn first_or_none<P>(&self, predicate: P) -> AppResult<Option<E>>
    where
        P: Fn(&E) -> bool + Send + Sync,
    {
        Ok(self.read().await?.into_iter().find(|item| predicate(item)))
    }

    /// The only matching entity.
    ///
    /// `NotFound` when nothing matches, `MultipleMatches` when more than one does.
    async fn single<P>(&self, predicate: P) -> AppResult<E>
    where
        P: Fn(&E) -> bool + Send + Sync,
    {
        self.single_or_none(predicate).await?.ok_or(AppError::NotFound)
    }

    /// The only matching entity, if any; `MultipleMatches` when more than one does
    async fn single_or_none<P>(&self, predicate: P) -> AppResult<Option<E>>
    where
        P: Fn(&E) -> bool + Send + Sync,
    {
        let mut matches: Vec<E> = self
            .read()
            .await?
            .into_iter()
            .filter(|item| predicate(item))
            .collect();

        match matches.len() {
            0 => Ok(None),
            1 => Ok(matches.pop()),
            count => Err(AppError::MultipleMatches(count)),
        }
    }

    /// Number of matching entities
    async fn count_where<P>(&self, predicate: P) -> AppResult<usize>
    where
        P: Fn(&E) -> bool + Send + Sync,
    {
        Ok(self.read().await?.iter().filter(|item| predicate(*item)).count())
    }

    /// Whether any entity matches
    async fn any<P>(&self, predicate: P) -> AppResult<bool>
    where
        P: Fn(&E) -> bool + Send + Sync,
    {
        Ok(self.read().await?.iter().any(|item| predicate(item)))
    }

    /// Whether every entity matches (true for an empty set)
    async fn all<P>(&self, predicate: P) -> AppResult<bool>
    where
        P: Fn(&E) -> bool + Send + Sync,
    {
        Ok(self.read().await?.iter().all(|item| predicate(item)))
    }
}

impl<E, R> QueryExt<E> for R
where
    E: DomainEntity,
    R: ReadOnlyRepository<E> + ?Sized,
{
}
