//! Domain entities stored by Moodini.

mod question;
mod user;

pub use question::{Answer, Question, MAX_QUESTION_LENGTH};
pub use user::{User, MAX_EMAIL_LENGTH, MAX_NAME_LENGTH};

use crate::stamp::StampHasher;
use crate::types::{EntityId, Version};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// A draft or stored entity rejected by validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {field}: {message}")]
pub struct ValidationError {
    /// Offending field.
    pub field: &'static str,
    /// What is wrong with it.
    pub message: String,
}

impl ValidationError {
    pub(crate) fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// A value that can live in an [`crate::EntityRepository`].
///
/// `id` is `None` on drafts and assigned once by the repository; `version`
/// is the optimistic-lock token and is overwritten on every write.
pub trait Entity: Clone + fmt::Debug + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Collection name, used in errors, logs and directory names.
    const COLLECTION: &'static str;

    /// Assigned id, `None` for drafts.
    fn id(&self) -> Option<EntityId>;

    /// Current version token.
    fn version(&self) -> Version;

    /// Returns the entity with its id and version replaced.
    #[must_use]
    fn with_identity(self, id: EntityId, version: Version) -> Self;

    /// Feeds every content field, but not id or version, into `hasher`.
    fn write_content(&self, hasher: &mut StampHasher);

    /// Checks field constraints.
    fn validate(&self) -> Result<(), ValidationError>;
}

pub(crate) fn check_text(
    field: &'static str,
    value: &str,
    max_chars: usize,
) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new(field, "must not be empty"));
    }
    let chars = value.chars().count();
    if chars > max_chars {
        return Err(ValidationError::new(
            field,
            format!("length {chars} exceeds {max_chars} characters"),
        ));
    }
    Ok(())
}
