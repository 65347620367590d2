//! Repositories and the prevalent state machines built on them.
//!
//! [`EntityRepository`] is the generic id → entity store. The question and
//! user repositories wrap it (plus a vote tally for questions) together
//! with a serializable command enum, which is what a
//! [`crate::Controller`] journals and replays.

mod entity_repo;
mod question_repo;
mod user_repo;

pub use entity_repo::EntityRepository;
pub use question_repo::{QuestionCommand, QuestionOutcome, QuestionRepository};
pub use user_repo::{UserCommand, UserOutcome, UserRepository};
