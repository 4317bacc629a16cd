//! Error types for chain construction and execution.

use crate::exception::Exception;
use thiserror::Error;

/// Main error type for chain operations.
#[derive(Debug, Error)]
pub enum ChainError {
    #[error("The step '{0}' isn't in this state chain.")]
    StepNotFound(String),

    #[error("The name '{name}' matches {count} steps in this state chain")]
    AmbiguousName { name: String, count: usize },

    #[error("Invalid step: {0}")]
    InvalidStep(String),

    #[error("Invalid position: {index} (chain has {len} steps)")]
    InvalidPosition { index: usize, len: usize },

    #[error("Step '{step}' is missing required arguments: {}", missing.join(", "))]
    MissingArguments { step: String, missing: Vec<String> },

    #[error("Step '{step}' received an unusable value for '{name}': {reason}")]
    InvalidArgument {
        step: String,
        name: String,
        reason: String,
    },

    #[error("'{0}' is reserved and cannot be stored as a state field")]
    ReservedName(String),

    #[error("Modification left steps unaccounted for: {}", unaccounted.join(", "))]
    IncompleteModification { unaccounted: Vec<String> },

    #[error(
        "Chain changed during modification (added: {}; removed: {})",
        added.join(", "),
        removed.join(", ")
    )]
    ConcurrentModification {
        added: Vec<String>,
        removed: Vec<String>,
    },

    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A step failed and no handler cleared the failure.
    #[error(transparent)]
    Step(Exception),
}

impl ChainError {
    /// The unhandled step failure, if this error is one.
    pub fn exception(&self) -> Option<&Exception> {
        match self {
            ChainError::Step(exception) => Some(exception),
            _ => None,
        }
    }

    /// Consume the error, returning the unhandled step failure if there is one.
    pub fn into_exception(self) -> Option<Exception> {
        match self {
            ChainError::Step(exception) => Some(exception),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for ChainError {
    fn from(e: serde_json::Error) -> Self {
        ChainError::Serialization(e.to_string())
    }
}

impl From<Exception> for ChainError {
    fn from(exception: Exception) -> Self {
        ChainError::Step(exception)
    }
}

/// Result type for chain operations.
pub type Result<T> = std::result::Result<T, ChainError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_arguments_message_names_fields() {
        let err = ChainError::MissingArguments {
            step: "bloo".to_string(),
            missing: vec!["baz".to_string(), "buz".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "Step 'bloo' is missing required arguments: baz, buz"
        );
    }

    #[test]
    fn test_step_error_is_transparent() {
        let exception = Exception::new("bar", anyhow::anyhow!("name 'heck' is not defined"));
        let err = ChainError::from(exception);
        assert_eq!(err.to_string(), "name 'heck' is not defined");
        assert_eq!(err.exception().map(|e| e.step()), Some("bar"));
    }
}
