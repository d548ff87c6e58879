//! Question provider boundary.
//!
//! Rooms only ever see the [`QuestionProvider`] trait. The bundled implementation
//! is [`QuestionBank`], backed by a JSON file loaded at startup.

mod bank;

use async_trait::async_trait;

pub use bank::{QuestionBank, RawQuestion};

use crate::types::Question;

pub type QuestionResult<T> = Result<T, QuestionError>;

#[derive(Debug, thiserror::Error)]
pub enum QuestionError {
    #[error("failed to read question file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse question file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("no usable questions available")]
    Empty,
}

/// Source of shuffled question decks
#[async_trait]
pub trait QuestionProvider: Send + Sync {
    /// Draw up to `count` questions, options already shuffled
    async fn fetch(&self, count: usize) -> QuestionResult<Vec<Question>>;

    fn name(&self) -> &str;
}
