//! Unified error handling for repository resolution and persistence.
//!
//! Provides a single error type for:
//! - Registry failures (missing or ambiguous repository bindings)
//! - Persistence failures raised by the underlying storage technology
//! - Lifecycle violations (disposed unit of work, unsupported operations)

use domain::EntityType;
use thiserror::Error;

/// Application error types.
#[derive(Error, Debug)]
pub enum AppError {
    // Registry errors
    #[error("{contract} was not registered in {unit_of_work}")]
    RepositoryNotFound {
        contract: &'static str,
        unit_of_work: &'static str,
    },

    #[error("More than one {contract} was registered in {unit_of_work} ({count} bindings)")]
    AmbiguousRegistration {
        contract: &'static str,
        unit_of_work: &'static str,
        count: usize,
    },

    // Persistence errors are surfaced as raised by the storage technology
    #[error(transparent)]
    Persistence(#[from] sea_orm::DbErr),

    // Lifecycle errors
    #[error("{operation} is not supported by {coordinator}")]
    Unsupported {
        operation: &'static str,
        coordinator: &'static str,
    },

    #[error("{unit_of_work} has already been disposed")]
    Disposed { unit_of_work: &'static str },

    #[error("No active transaction")]
    NoActiveTransaction,

    #[error("Cannot change tracked {entity} from {from} to {to}")]
    InvalidStateTransition {
        entity: EntityType,
        from: &'static str,
        to: &'static str,
    },

    // Resource errors
    #[error("Resource not found")]
    NotFound,

    #[error("{0} already exists")]
    Conflict(String),

    #[error("Sequence contains {0} matching elements")]
    MultipleMatches(usize),

    // Configuration
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    // Internal
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Get stable error code
    pub fn code(&self) -> &'static str {
        match self {
            AppError::RepositoryNotFound { .. } => "REPOSITORY_NOT_FOUND",
            AppError::AmbiguousRegistration { .. } => "AMBIGUOUS_REGISTRATION",
            AppError::Persistence(_) => "PERSISTENCE_FAILURE",
            AppError::Unsupported { .. } => "UNSUPPORTED_OPERATION",
            AppError::Disposed { .. } => "DISPOSED",
            AppError::NoActiveTransaction => "NO_ACTIVE_TRANSACTION",
            AppError::InvalidStateTransition { .. } => "INVALID_STATE_TRANSITION",
            AppError::NotFound => "NOT_FOUND",
            AppError::Conflict(_) => "CONFLICT",
            AppError::MultipleMatches(_) => "MULTIPLE_MATCHES",
            AppError::Configuration(_) => "CONFIGURATION_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Check whether the error came from the storage technology
    pub fn is_persistence(&self) -> bool {
        matches!(self, AppError::Persistence(_))
    }
}

/// Result type alias
pub type AppResult<T> = Result<T, AppError>;

/// Extension trait for Option -> AppError conversion
pub trait OptionExt<T> {
    fn ok_or_not_found(self) -> AppResult<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_not_found(self) -> AppResult<T> {
        self.ok_or(AppError::NotFound)
    }
}

/// Convenience constructors
impl AppError {
    pub fn not_registered(contract: &'static str, unit_of_work: &'static str) -> Self {
        AppError::RepositoryNotFound {
            contract,
            unit_of_work,
        }
    }

    pub fn ambiguous(contract: &'static str, unit_of_work: &'static str, count: usize) -> Self {
        AppError::AmbiguousRegistration {
            contract,
            unit_of_work,
            count,
        }
    }

    pub fn unsupported(operation: &'static str, coordinator: &'static str) -> Self {
        AppError::Unsupported {
            operation,
            coordinator,
        }
    }

    pub fn disposed(unit_of_work: &'static str) -> Self {
        AppError::Disposed { unit_of_work }
    }

    pub fn conflict(entity: impl Into<String>) -> Self {
        AppError::Conflict(entity.into())
    }

    pub fn configuration(msg: impl Into<String>) -> Self {
        AppError::Configuration(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        AppError::Internal(msg.into())
    }
}
