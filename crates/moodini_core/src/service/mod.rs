//! Service facades.
//!
//! A service owns the controller of one collection and exposes the
//! operations callers use: drafts are validated first, reads go through
//! queries, writes go through commands. Repository rejections surface as
//! [`ServiceError::NotFound`] or [`ServiceError::Conflict`]; anything that
//! leaves the store unusable is [`ServiceError::Fatal`].

mod error;
mod question_service;
mod user_service;

pub use error::{ServiceError, ServiceResult};
pub use question_service::QuestionService;
pub use user_service::UserService;
