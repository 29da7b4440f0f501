//! Command-level error taxonomy.
//!
//! Every variant maps to a fixed user-facing reply; internal detail
//! stays in the logs. A failed command never affects other commands
//! or other users.

use thiserror::Error;

use crate::ai::AiError;

/// Failure of a single note or question command.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("extraction output did not conform to the record schema: {0}")]
    Parse(String),
    #[error("synthesized query was malformed: {0}")]
    Synthesis(String),
    #[error("query rejected by safety policy: {0}")]
    UnsafeQuery(String),
    #[error("query execution failed: {0}")]
    Execution(String),
    #[error("insert violated a record invariant: {0}")]
    Persistence(String),
    #[error("model call failed: {0}")]
    Model(#[from] AiError),
}

impl PipelineError {
    /// Fixed reply for the chat surface. Never raw backend text.
    pub fn user_reply(&self) -> &'static str {
        match self {
            PipelineError::Parse(_) => {
                "I couldn't turn that note into structured exercise records. Nothing was saved — try rephrasing it."
            }
            PipelineError::Synthesis(_) => {
                "I couldn't turn that question into a lookup. Try asking it another way."
            }
            PipelineError::UnsafeQuery(_) => {
                "That question produced a lookup I'm not allowed to run."
            }
            PipelineError::Execution(_) => {
                "Something went wrong while reading your records. Nothing was changed."
            }
            PipelineError::Persistence(_) => {
                "Those exercises couldn't be saved. Nothing was recorded."
            }
            PipelineError::Model(_) => {
                "The assistant is temporarily unavailable. Please try again in a moment."
            }
        }
    }
}

/// Store-level failures, converted into the command taxonomy at the
/// pipeline boundary.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("insert rejected: {0}")]
    Persistence(String),
    #[error("query failed: {0}")]
    Execution(String),
}

impl From<StoreError> for PipelineError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Persistence(msg) => PipelineError::Persistence(msg),
            StoreError::Execution(msg) => PipelineError::Execution(msg),
        }
    }
}
