//! The error type for trees that break IR invariants.

/// Result of operations that walk or build an IR tree.
pub type GlintResult<T> = Result<T, InternalError>;

/// A tree violates an IR invariant.
///
/// Either the producer of the tree has a bug or an entry was damaged in a
/// way the bounds checks cannot see. User input never causes one.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("malformed IR: {message}")]
pub struct InternalError {
    /// What was violated.
    pub message: String,
}

impl InternalError {
    /// Wraps `message`.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<String> for InternalError {
    fn from(message: String) -> Self {
        Self { message }
    }
}
