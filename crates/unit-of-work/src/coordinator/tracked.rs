//! Change-tracking coordinator.

use async_trait::async_trait;
use common::{AppError, AppResult};
use domain::EntityType;

use super::TransactionCoordinator;
use crate::tracking::{revert_entries, TrackingContext};

/// Coordinator over a change-tracking context.
///
/// Saving wraps the flush in a technology-level transaction. When the flush
/// or the commit fails the transaction is rolled back and every tracked
/// entry is reverted, so the context matches what is persisted again.
pub struct TrackedCoordinator<C: TrackingContext> {
    context: C,
    disposed: bool,
}

impl<C: TrackingContext> TrackedCoordinator<C> {
    pub fn new(context: C) -> Self {
        Self {
            context,
            disposed: false,
        }
    }

    /// The tracking context
    pub fn context(&self) -> &C {
        &self.context
    }

    fn ensure_active(&self) -> AppResult<()> {
        if self.disposed {
            return Err(AppError::disposed(std::any::type_name::<Self>()));
        }
        Ok(())
    }
}

#[async_trait]
impl<C: TrackingContext> TransactionCoordinator for TrackedCoordinator<C> {
    async fn save_changes(&mut self) -> AppResult<()> {
        self.ensure_active()?;
        self.context.begin().await?;

        let outcome = match self.context.flush().await {
            Ok(()) => self.context.commit().await,
            Err(err) => Err(err),
        };

        let Err(err) = outcome else {
            tracing::info!("Tracked changes committed");
            return Ok(());
        };

        tracing::warn!(error = %err, "Saving tracked changes failed, rolling back");
        if let Err(rollback_err) = self.context.rollback().await {
            tracing::error!("Transaction rollback failed: {}", rollback_err);
        }
        if let Err(revert_err) = revert_entries(&mut self.context, None) {
            tracing::error!("Reverting tracked entries failed: {}", revert_err);
        }

        Err(AppError::Persistence(err))
    }

    async fn reject_all_changes(&mut self) -> AppResult<()> {
        self.ensure_active()?;
        revert_entries(&mut self.context, None)?;
        tracing::debug!("Rejected all tracked changes");
        Ok(())
    }

    fn reject_changes(&mut self, entity: EntityType) -> AppResult<()> {
        self.ensure_active()?;
        revert_entries(&mut self.context, Some(entity))?;
        tracing::debug!(%entity, "Rejected tracked changes");
        Ok(())
    }

    fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        self.context.release();
        tracing::debug!("Tracking context released");
    }

    fn is_disposed(&self) -> bool {
        self.disposed
    }
}

impl<C: TrackingContext> Drop for TrackedCoordinator<C> {
    fn drop(&mut self) {
        self.dispose();
    }
}
