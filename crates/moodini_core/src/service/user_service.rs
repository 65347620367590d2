//! Facade over the user store.

use super::{ServiceError, ServiceResult};
use crate::config::Config;
use crate::controller::Controller;
use crate::error::{CoreError, RepositoryError};
use crate::model::{Entity, User};
use crate::repository::{UserCommand, UserOutcome, UserRepository};
use crate::types::EntityId;

#[cfg(feature = "std")]
use std::path::Path;

/// User operations.
#[derive(Debug)]
pub struct UserService {
    controller: Controller<UserRepository>,
}

impl UserService {
    /// Wraps an open controller.
    #[must_use]
    pub fn new(controller: Controller<UserRepository>) -> Self {
        Self { controller }
    }

    /// Opens the user store below `root`.
    #[cfg(feature = "std")]
    pub fn open(root: &Path, config: Config) -> ServiceResult<Self> {
        Ok(Self::new(Controller::open(root, config)?))
    }

    /// Opens a non-persistent user store.
    pub fn open_in_memory() -> ServiceResult<Self> {
        Ok(Self::new(Controller::open_in_memory()?))
    }

    /// Stores a new user.
    pub fn create(&self, draft: User) -> ServiceResult<User> {
        draft.validate()?;
        stored(self.controller.command(UserCommand::Create(draft))?)
    }

    /// Reads one user.
    pub fn read(&self, id: EntityId) -> ServiceResult<User> {
        Ok(self.controller.query(|repo| repo.user(id))??)
    }

    /// Finds a user by email address, ignoring case.
    pub fn read_by_email(&self, email: &str) -> ServiceResult<Option<User>> {
        Ok(self.controller.query(|repo| repo.find_by_email(email))?)
    }

    /// All users, ascending by id.
    pub fn list(&self) -> ServiceResult<Vec<User>> {
        Ok(self.controller.query(UserRepository::users)?)
    }

    /// Replaces a user; `candidate.version` must be the stored version.
    pub fn update(&self, candidate: User) -> ServiceResult<User> {
        candidate.validate()?;
        let id = candidate.id.ok_or(RepositoryError::MissingId {
            collection: User::COLLECTION,
        })?;
        self.ensure_exists(id)?;
        stored(self.controller.command(UserCommand::Update(candidate))?)
    }

    /// Deletes a user and returns it.
    pub fn delete(&self, id: EntityId) -> ServiceResult<User> {
        self.ensure_exists(id)?;
        match self.controller.command(UserCommand::Delete(id))? {
            UserOutcome::Deleted(user) => Ok(user),
            other => Err(mismatch(&other)),
        }
    }

    /// Writes a snapshot and clears the journal.
    pub fn checkpoint(&self) -> ServiceResult<()> {
        Ok(self.controller.checkpoint()?)
    }

    /// Checkpoints and closes the store.
    pub fn close(&self) -> ServiceResult<()> {
        Ok(self.controller.close()?)
    }

    /// The underlying controller.
    #[must_use]
    pub fn controller(&self) -> &Controller<UserRepository> {
        &self.controller
    }

    fn ensure_exists(&self, id: EntityId) -> ServiceResult<()> {
        if self.controller.query(|repo| repo.user(id).is_ok())? {
            Ok(())
        } else {
            Err(RepositoryError::not_found(User::COLLECTION, id).into())
        }
    }
}

fn stored(outcome: UserOutcome) -> ServiceResult<User> {
    match outcome {
        UserOutcome::Stored(user) => Ok(user),
        other => Err(mismatch(&other)),
    }
}

fn mismatch(outcome: &UserOutcome) -> ServiceError {
    ServiceError::Fatal(CoreError::invalid_operation(format!(
        "unexpected user outcome {outcome:?}"
    )))
}
