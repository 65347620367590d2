//! # Moodini Core
//!
//! Versioned entity store behind Moodini.
//!
//! This crate provides:
//! - Versioned entity repositories with optimistic locking
//! - Lock-free id sequences and per-question vote tallies
//! - A prevalent controller: in-memory state, journaled commands, snapshots
//! - Question and user service facades
//!
//! ## Example
//!
//! ```rust
//! use moodini_core::{Answer, Question, QuestionService, ServiceError};
//!
//! let service = QuestionService::open_in_memory().unwrap();
//! let q = service.create(Question::new("How was your week?")).unwrap();
//!
//! let edited = service.update(q.with_text("How was your sprint?")).unwrap();
//! assert!(matches!(
//!     service.update(q.with_text("stale")),
//!     Err(ServiceError::Conflict { .. })
//! ));
//!
//! service.vote(edited.id.unwrap(), Answer::Fine).unwrap();
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod codec;
mod config;
mod controller;
#[cfg(feature = "std")]
mod dir;
mod error;
pub mod journal;
pub mod model;
pub mod repository;
mod sequence;
pub mod service;
pub mod snapshot;
mod stamp;
mod tally;
mod types;

pub use codec::{from_cbor, to_cbor};
pub use config::Config;
pub use controller::{Controller, ControllerStats, Prevalent};
#[cfg(feature = "std")]
pub use dir::StoreDir;
pub use error::{CoreError, CoreResult, RepositoryError};
pub use model::{Answer, Entity, Question, User, ValidationError};
pub use repository::{
    EntityRepository, QuestionCommand, QuestionOutcome, QuestionRepository, UserCommand,
    UserOutcome, UserRepository,
};
pub use sequence::Sequence;
pub use service::{QuestionService, ServiceError, ServiceResult, UserService};
pub use snapshot::{SnapshotInfo, SnapshotStore};
pub use stamp::{StampHasher, VersionStamp};
pub use tally::{Category, ConcurrentTally};
pub use types::{CommitSeq, EntityId, Version};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
