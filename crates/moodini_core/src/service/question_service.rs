//! Facade over the question store.

use super::{ServiceError, ServiceResult};
use crate::config::Config;
use crate::controller::Controller;
use crate::error::{CoreError, RepositoryError};
use crate::model::{Answer, Entity, Question};
use crate::repository::{QuestionCommand, QuestionOutcome, QuestionRepository};
use crate::types::EntityId;
use std::collections::BTreeMap;

#[cfg(feature = "std")]
use std::path::Path;

/// Question operations: CRUD, voting and vote counts.
///
/// ```rust
/// use moodini_core::{Answer, Question, QuestionService};
///
/// let service = QuestionService::open_in_memory().unwrap();
/// let question = service.create(Question::new("How do you feel?")).unwrap();
/// let id = question.id.unwrap();
/// service.vote(id, Answer::Good).unwrap();
/// assert_eq!(service.votes(id).unwrap().get(&Answer::Good), Some(&1));
/// ```
#[derive(Debug)]
pub struct QuestionService {
    controller: Controller<QuestionRepository>,
}

impl QuestionService {
    /// Wraps an open controller.
    #[must_use]
    pub fn new(controller: Controller<QuestionRepository>) -> Self {
        Self { controller }
    }

    /// Opens the question store below `root`.
    #[cfg(feature = "std")]
    pub fn open(root: &Path, config: Config) -> ServiceResult<Self> {
        Ok(Self::new(Controller::open(root, config)?))
    }

    /// Opens a non-persistent question store.
    pub fn open_in_memory() -> ServiceResult<Self> {
        Ok(Self::new(Controller::open_in_memory()?))
    }

    /// Stores a new question and returns it with id and version.
    pub fn create(&self, draft: Question) -> ServiceResult<Question> {
        draft.validate()?;
        stored(self.controller.command(QuestionCommand::Create(draft))?)
    }

    /// Reads one question.
    pub fn read(&self, id: EntityId) -> ServiceResult<Question> {
        Ok(self.controller.query(|repo| repo.question(id))??)
    }

    /// All questions, ascending by id.
    pub fn list(&self) -> ServiceResult<Vec<Question>> {
        Ok(self.controller.query(QuestionRepository::questions)?)
    }

    /// The question with the highest id.
    pub fn read_latest(&self) -> ServiceResult<Question> {
        Ok(self.controller.query(QuestionRepository::latest)??)
    }

    /// Replaces a question; `candidate.version` must be the stored version.
    pub fn update(&self, candidate: Question) -> ServiceResult<Question> {
        candidate.validate()?;
        let id = candidate.id.ok_or(RepositoryError::MissingId {
            collection: Question::COLLECTION,
        })?;
        self.ensure_exists(id)?;
        stored(self.controller.command(QuestionCommand::Update(candidate))?)
    }

    /// Deletes a question and its votes, returning the deleted question.
    pub fn delete(&self, id: EntityId) -> ServiceResult<Question> {
        self.ensure_exists(id)?;
        match self.controller.command(QuestionCommand::Delete(id))? {
            QuestionOutcome::Deleted(question) => Ok(question),
            other => Err(mismatch(&other)),
        }
    }

    /// Counts a vote and returns the new count for `answer`.
    ///
    /// A vote racing a delete of the same question either lands before the
    /// delete or fails with `NotFound`.
    pub fn vote(&self, id: EntityId, answer: Answer) -> ServiceResult<u64> {
        self.ensure_exists(id)?;
        match self.controller.command(QuestionCommand::Vote {
            question: id,
            answer,
        })? {
            QuestionOutcome::Voted(count) => Ok(count),
            other => Err(mismatch(&other)),
        }
    }

    /// Vote counts for a question; answers nobody chose are absent.
    pub fn votes(&self, id: EntityId) -> ServiceResult<BTreeMap<Answer, u64>> {
        let counts = self.controller.query(|repo| {
            if repo.contains(id) {
                Ok(repo.votes(id))
            } else {
                Err(RepositoryError::not_found(Question::COLLECTION, id))
            }
        })??;
        Ok(counts)
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
    pub fn controller(&self) -> &Controller<QuestionRepository> {
        &self.controller
    }

    fn ensure_exists(&self, id: EntityId) -> ServiceResult<()> {
        if self.controller.query(|repo| repo.contains(id))? {
            Ok(())
        } else {
            Err(RepositoryError::not_found(Question::COLLECTION, id).into())
        }
    }
}

fn stored(outcome: QuestionOutcome) -> ServiceResult<Question> {
    match outcome {
        QuestionOutcome::Stored(question) => Ok(question),
        other => Err(mismatch(&other)),
    }
}

fn mismatch(outcome: &QuestionOutcome) -> ServiceError {
    ServiceError::Fatal(CoreError::invalid_operation(format!(
        "unexpected question outcome {outcome:?}"
    )))
}
