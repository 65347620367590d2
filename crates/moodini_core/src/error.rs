//! Error types for Moodini core.

use crate::types::{EntityId, Version};
use std::io;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Expected, caller-recoverable outcomes of a repository operation.
///
/// A repository returns these without touching its state, so a rejected
/// command is never journaled.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepositoryError {
    /// The referenced id does not exist.
    #[error("{collection} {id} not found")]
    NotFound {
        /// Collection that was searched.
        collection: &'static str,
        /// Missing id.
        id: EntityId,
    },

    /// The collection holds no entities.
    #[error("no {collection} stored")]
    Empty {
        /// Collection that was searched.
        collection: &'static str,
    },

    /// An update candidate carried no id.
    #[error("{collection} candidate has no id")]
    MissingId {
        /// Collection of the candidate.
        collection: &'static str,
    },

    /// The caller updated from a stale version.
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
}

impl RepositoryError {
    /// Creates a not-found error.
    #[must_use]
    pub fn not_found(collection: &'static str, id: EntityId) -> Self {
        Self::NotFound { collection, id }
    }
}

/// Errors that can occur in core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Storage backend error.
    #[error("storage error: {0}")]
    Storage(#[from] moodini_storage::StorageError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// CBOR encoding or decoding failed.
    #[error("codec error: {message}")]
    Codec {
        /// Description of the failure.
        message: String,
    },

    /// The journal is corrupted or cannot be replayed.
    #[error("journal corruption: {message}")]
    JournalCorruption {
        /// Description of the corruption.
        message: String,
    },

    /// The snapshot is corrupted or incompatible.
    #[error("snapshot corruption: {message}")]
    SnapshotCorruption {
        /// Description of the corruption.
        message: String,
    },

    /// Checksum mismatch detected.
    #[error("checksum mismatch: expected {expected:08x}, got {actual:08x}")]
    ChecksumMismatch {
        /// Stored checksum.
        expected: u32,
        /// Computed checksum.
        actual: u32,
    },

    /// The command was rejected by the repository; nothing was recorded.
    #[error(transparent)]
    Rejected(#[from] RepositoryError),

    /// The controller has been closed.
    #[error("controller is closed")]
    ControllerClosed,

    /// A previous journal write failed; the in-memory state can no longer
    /// be trusted to match what is on disk.
    #[error("controller is poisoned: {message}")]
    ControllerPoisoned {
        /// The failure that poisoned the controller.
        message: String,
    },

    /// A call that the current state cannot serve.
    #[error("invalid operation: {message}")]
    InvalidOperation {
        /// Description of the problem.
        message: String,
    },

    /// Another process holds the data directory.
    #[error("data directory locked: another process has exclusive access")]
    DirectoryLocked,

    /// The data directory cannot be used.
    #[error("invalid data directory: {message}")]
    InvalidDirectory {
        /// Description of the problem.
        message: String,
    },
}

impl CoreError {
    /// Creates a codec error.
    pub fn codec(message: impl Into<String>) -> Self {
        Self::Codec {
            message: message.into(),
        }
    }

    /// Creates a journal corruption error.
    pub fn journal_corruption(message: impl Into<String>) -> Self {
        Self::JournalCorruption {
            message: message.into(),
        }
    }

    /// Creates a snapshot corruption error.
    pub fn snapshot_corruption(message: impl Into<String>) -> Self {
        Self::SnapshotCorruption {
            message: message.into(),
        }
    }

    /// Creates an invalid directory error.
    pub fn invalid_directory(message: impl Into<String>) -> Self {
        Self::InvalidDirectory {
            message: message.into(),
        }
    }

    /// Creates an invalid operation error.
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::InvalidOperation {
            message: message.into(),
        }
    }

    /// Returns the repository rejection, if this is one.
    #[must_use]
    pub fn as_rejection(&self) -> Option<&RepositoryError> {
        match self {
            Self::Rejected(err) => Some(err),
            _ => None,
        }
    }
}
