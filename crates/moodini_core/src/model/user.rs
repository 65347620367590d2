//! Users who ask questions.

use super::{check_text, Entity, ValidationError};
use crate::stamp::StampHasher;
use crate::types::{EntityId, Version};
use serde::{Deserialize, Serialize};

/// Longest accepted first or last name, in characters.
pub const MAX_NAME_LENGTH: usize = 50;

/// Longest accepted email address, in characters.
pub const MAX_EMAIL_LENGTH: usize = 100;

/// A registered user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Assigned id, `None` until created.
    pub id: Option<EntityId>,
    /// Optimistic-lock token.
    pub version: Version,
    /// Given name.
    pub firstname: String,
    /// Family name.
    pub lastname: String,
    /// Contact address.
    pub email: String,
}

impl User {
    /// Creates a draft user.
    pub fn new(
        firstname: impl Into<String>,
        lastname: impl Into<String>,
        email: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            version: Version::default(),
            firstname: firstname.into(),
            lastname: lastname.into(),
            email: email.into(),
        }
    }

    /// `"firstname lastname"`.
    #[must_use]
    pub fn display_name(&self) -> String {
        format!("{} {}", self.firstname, self.lastname)
    }
}

impl Entity for User {
    const COLLECTION: &'static str = "users";

    fn id(&self) -> Option<EntityId> {
        self.id
    }

    fn version(&self) -> Version {
        self.version
    }

    fn with_identity(self, id: EntityId, version: Version) -> Self {
        Self {
            id: Some(id),
            version,
            ..self
        }
    }

    fn write_content(&self, hasher: &mut StampHasher) {
        hasher.write_str(&self.firstname);
        hasher.write_str(&self.lastname);
        hasher.write_str(&self.email);
    }

    fn validate(&self) -> Result<(), ValidationError> {
        check_text("firstname", &self.firstname, MAX_NAME_LENGTH)?;
        check_text("lastname", &self.lastname, MAX_NAME_LENGTH)?;
        check_text("email", &self.email, MAX_EMAIL_LENGTH)?;
        match self.email.split_once('@') {
            Some((local, domain))
                if !local.is_empty() && !domain.is_empty() && !domain.contains('@') =>
            {
                Ok(())
            }
            _ => Err(ValidationError::new("email", "not a valid address")),
        }
    }
}
