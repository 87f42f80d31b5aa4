//! Error types for the dispatcher.

use parley_core::error::ParleyError;

/// Errors rejecting a chat request before it reaches a flow or the compiler.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("message cannot be empty")]
    EmptyMessage,
    #[error("message exceeds maximum length of {0} characters")]
    MessageTooLong(usize),
    #[error("session id cannot be empty")]
    MissingSessionId,
    #[error("storage error: {0}")]
    StorageError(String),
}

impl From<ParleyError> for ChatError {
    fn from(err: ParleyError) -> Self {
        ChatError::StorageError(err.to_string())
    }
}
