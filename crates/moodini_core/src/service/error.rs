//! Errors returned by the service facades.

use crate::error::{CoreError, RepositoryError};
use crate::model::ValidationError;
use crate::types::{EntityId, Version};
use thiserror::Error;

/// Result type for service operations.
pub type ServiceResult<T> = Result<T, ServiceError>;

/// What a service call can fail with.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The entity does not exist, or the collection is empty when `id` is
    /// `None`.
    #[error("{collection} {} not found", .id.map_or_else(|| "entry".to_string(), |id| id.to_string()))]
    NotFound {
        /// Collection that was searched.
        collection: &'static str,
        /// Missing id.
        id: Option<EntityId>,
    },

    /// The caller's copy is stale; re-read and retry.
    #[error("{collection} {id} was modified concurrently: expected {expected}, found {actual}")]
    Conflict {
        /// Collection of the entity.
        collection: &'static str,
        /// Entity that conflicted.
        id: EntityId,
        /// Version the caller presented.
        expected: Version,
        /// Version currently stored.
        actual: Version,
    },

    /// The input failed validation.
    #[error(transparent)]
    Invalid(#[from] ValidationError),

    /// The store failed and the service should be shut down.
    #[error("fatal store error: {0}")]
    Fatal(CoreError),
}

impl ServiceError {
    /// Whether the error means the store can no longer be used.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Fatal(_))
    }
}

impl From<RepositoryError> for ServiceError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { collection, id } => Self::NotFound {
                collection,
                id: Some(id),
            },
            RepositoryError::Empty { collection } => Self::NotFound {
                collection,
                id: None,
            },
            RepositoryError::MissingId { .. } => {
                Self::Invalid(ValidationError::new("id", "must be set on update"))
            }
            RepositoryError::Conflict {
                collection,
                id,
                expected,
                actual,
            } => Self::Conflict {
                collection,
                id,
                expected,
                actual,
            },
        }
    }
}

impl From<CoreError> for ServiceError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Rejected(rejection) => rejection.into(),
            other => Self::Fatal(other),
        }
    }
}
