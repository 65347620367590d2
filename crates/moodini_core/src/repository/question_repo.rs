//! Questions and their vote tallies.

use super::EntityRepository;
use crate::controller::Prevalent;
use crate::error::RepositoryError;
use crate::model::{Answer, Entity, Question};
use crate::tally::ConcurrentTally;
use crate::types::EntityId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Mutations accepted by a [`QuestionRepository`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuestionCommand {
    /// Store a new question.
    Create(Question),
    /// Replace a question, checked against its version.
    Update(Question),
    /// Remove a question together with its votes.
    Delete(EntityId),
    /// Count one vote.
    Vote {
        /// Question voted on.
        question: EntityId,
        /// Chosen answer.
        answer: Answer,
    },
}

/// Result of an applied [`QuestionCommand`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuestionOutcome {
    /// The question as stored after create or update.
    Stored(Question),
    /// The question that was deleted.
    Deleted(Question),
    /// New count for the voted answer.
    Voted(u64),
}

/// Prevalent state holding every question and its votes.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct QuestionRepository {
    questions: EntityRepository<Question>,
    votes: ConcurrentTally<Answer>,
}

impl QuestionRepository {
    /// Looks up a question.
    pub fn question(&self, id: EntityId) -> Result<Question, RepositoryError> {
        self.questions.read(id)
    }

    /// All questions, ascending by id.
    #[must_use]
    pub fn questions(&self) -> Vec<Question> {
        self.questions.list()
    }

    /// The most recently created question still stored.
    pub fn latest(&self) -> Result<Question, RepositoryError> {
        self.questions.read_latest()
    }

    /// Whether a question exists.
    #[must_use]
    pub fn contains(&self, id: EntityId) -> bool {
        self.questions.contains(id)
    }

    /// Vote counts for a question; empty if it has no votes.
    #[must_use]
    pub fn votes(&self, id: EntityId) -> BTreeMap<Answer, u64> {
        self.votes.snapshot(id)
    }

    /// Number of stored questions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    /// Whether no questions are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    /// Last question id ever issued.
    #[must_use]
    pub fn last_id(&self) -> i64 {
        self.questions.last_id()
    }

    /// Number of questions that have at least one vote recorded.
    #[must_use]
    pub fn voted_count(&self) -> usize {
        self.votes.subject_count()
    }
}

impl Prevalent for QuestionRepository {
    const NAME: &'static str = "questions";

    type Command = QuestionCommand;
    type Output = QuestionOutcome;

    fn execute(&mut self, command: &QuestionCommand) -> Result<QuestionOutcome, RepositoryError> {
        match command {
            QuestionCommand::Create(draft) => {
                Ok(QuestionOutcome::Stored(self.questions.create(draft.clone())))
            }
            QuestionCommand::Update(candidate) => {
                Ok(QuestionOutcome::Stored(self.questions.update(candidate.clone())?))
            }
            QuestionCommand::Delete(id) => {
                let removed = self.questions.delete(*id)?;
                self.votes.remove(*id);
                Ok(QuestionOutcome::Deleted(removed))
            }
            QuestionCommand::Vote { question, answer } => {
                if !self.questions.contains(*question) {
                    return Err(RepositoryError::not_found(Question::COLLECTION, *question));
                }
                Ok(QuestionOutcome::Voted(self.votes.increment(*question, *answer)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create(repo: &mut QuestionRepository, text: &str) -> Question {
        match repo.execute(&QuestionCommand::Create(Question::new(text))) {
            Ok(QuestionOutcome::Stored(q)) => q,
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[test]
    fn vote_counts_per_answer() {
        let mut repo = QuestionRepository::default();
        let q = create(&mut repo, "How are you?");
        let id = q.id.unwrap();
        for _ in 0..3 {
            repo.execute(&QuestionCommand::Vote { question: id, answer: Answer::Good })
                .unwrap();
        }
        let outcome = repo
            .execute(&QuestionCommand::Vote { question: id, answer: Answer::Meh })
            .unwrap();
        assert_eq!(outcome, QuestionOutcome::Voted(1));
        let votes = repo.votes(id);
        assert_eq!(votes.get(&Answer::Good), Some(&3));
        assert_eq!(votes.get(&Answer::Meh), Some(&1));
        assert_eq!(votes.get(&Answer::Amped), None);
    }

    #[test]
    fn vote_on_missing_question_is_rejected() {
        let mut repo = QuestionRepository::default();
        let err = repo
            .execute(&QuestionCommand::Vote {
                question: EntityId::new(7),
                answer: Answer::Fine,
            })
            .unwrap_err();
        assert_eq!(err, RepositoryError::not_found("questions", EntityId::new(7)));
        assert_eq!(repo.voted_count(), 0);
    }

    #[test]
    fn delete_drops_votes() {
        let mut repo = QuestionRepository::default();
        let id = create(&mut repo, "Q").id.unwrap();
        repo.execute(&QuestionCommand::Vote { question: id, answer: Answer::Amped })
            .unwrap();
        assert_eq!(repo.voted_count(), 1);

        let outcome = repo.execute(&QuestionCommand::Delete(id)).unwrap();
        assert!(matches!(outcome, QuestionOutcome::Deleted(q) if q.text == "Q"));
        assert_eq!(repo.voted_count(), 0);
        assert!(repo.votes(id).is_empty());
        assert!(repo
            .execute(&QuestionCommand::Vote { question: id, answer: Answer::Amped })
            .is_err());
    }

    #[test]
    fn state_survives_cbor_roundtrip() {
        let mut repo = QuestionRepository::default();
        let id = create(&mut repo, "Q1").id.unwrap();
        create(&mut repo, "Q2");
        repo.execute(&QuestionCommand::Delete(EntityId::new(2))).unwrap();
        repo.execute(&QuestionCommand::Vote { question: id, answer: Answer::Pissed })
            .unwrap();

        let mut bytes = Vec::new();
        ciborium::into_writer(&repo, &mut bytes).unwrap();
        let mut restored: QuestionRepository = ciborium::from_reader(bytes.as_slice()).unwrap();

        assert_eq!(restored.questions(), repo.questions());
        assert_eq!(restored.votes(id), repo.votes(id));
        assert_eq!(create(&mut restored, "Q3").id, Some(EntityId::new(3)));
    }
}
