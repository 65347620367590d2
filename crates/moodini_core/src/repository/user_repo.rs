//! Registered users.

use super::EntityRepository;
use crate::controller::Prevalent;
use crate::error::RepositoryError;
use crate::model::User;
use crate::types::EntityId;
use serde::{Deserialize, Serialize};

/// Mutations accepted by a [`UserRepository`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum UserCommand {
    /// Store a new user.
    Create(User),
    /// Replace a user, checked against its version.
    Update(User),
    /// Remove a user.
    Delete(EntityId),
}

/// Result of an applied [`UserCommand`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserOutcome {
    /// The user as stored after create or update.
    Stored(User),
    /// The user that was deleted.
    Deleted(User),
}

/// Prevalent state holding every user.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct UserRepository {
    users: EntityRepository<User>,
}

impl UserRepository {
    /// Looks up a user.
    pub fn user(&self, id: EntityId) -> Result<User, RepositoryError> {
        self.users.read(id)
    }

    /// All users, ascending by id.
    #[must_use]
    pub fn users(&self) -> Vec<User> {
        self.users.list()
    }

    /// Finds a user by email, ignoring ASCII case.
    #[must_use]
    pub fn find_by_email(&self, email: &str) -> Option<User> {
        self.users
            .list()
            .into_iter()
            .find(|user| user.email.eq_ignore_ascii_case(email.trim()))
    }

    /// Number of stored users.
    #[must_use]
    pub fn len(&self) -> usize {
        self.users.len()
    }

    /// Whether no users are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    /// Last user id ever issued.
    #[must_use]
    pub fn last_id(&self) -> i64 {
        self.users.last_id()
    }
}

impl Prevalent for UserRepository {
    const NAME: &'static str = "users";

    type Command = UserCommand;
    type Output = UserOutcome;

    fn execute(&mut self, command: &UserCommand) -> Result<UserOutcome, RepositoryError> {
        match command {
            UserCommand::Create(draft) => Ok(UserOutcome::Stored(self.users.create(draft.clone()))),
            UserCommand::Update(candidate) => {
                Ok(UserOutcome::Stored(self.users.update(candidate.clone())?))
            }
            UserCommand::Delete(id) => Ok(UserOutcome::Deleted(self.users.delete(*id)?)),
        }
    }
}
