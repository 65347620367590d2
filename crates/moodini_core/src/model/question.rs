//! Mood questions and the answers users vote with.

use super::{check_text, Entity, ValidationError};
use crate::stamp::StampHasher;
use crate::types::{EntityId, Version};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Longest accepted question text, in characters.
pub const MAX_QUESTION_LENGTH: usize = 100;

/// A question users vote on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    /// Assigned id, `None` until created.
    pub id: Option<EntityId>,
    /// Optimistic-lock token.
    pub version: Version,
    /// The question itself.
    pub text: String,
}

impl Question {
    /// Creates a draft question.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            id: None,
            version: Version::default(),
            text: text.into(),
        }
    }

    /// Returns a copy with `text` replaced, keeping id and version.
    #[must_use]
    pub fn with_text(&self, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..self.clone()
        }
    }
}

impl Entity for Question {
    const COLLECTION: &'static str = "questions";

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
        hasher.write_str(&self.text);
    }

    fn validate(&self) -> Result<(), ValidationError> {
        check_text("text", &self.text, MAX_QUESTION_LENGTH)
    }
}

/// How a user feels about a question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Answer {
    /// Couldn't be better.
    Amped,
    /// Good.
    Good,
    /// Fine.
    Fine,
    /// Meh.
    Meh,
    /// Couldn't be worse.
    Pissed,
}

impl Answer {
    /// All answers, best mood first.
    pub const ALL: [Answer; 5] = [
        Answer::Amped,
        Answer::Good,
        Answer::Fine,
        Answer::Meh,
        Answer::Pissed,
    ];

    /// Display label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Amped => "Amped",
            Self::Good => "Good",
            Self::Fine => "Fine",
            Self::Meh => "Meh",
            Self::Pissed => "Pissed",
        }
    }
}

impl fmt::Display for Answer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Answer {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|answer| answer.label().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ValidationError::new("answer", format!("unknown answer `{s}`")))
    }
}
