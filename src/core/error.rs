use thiserror::Error;

use crate::command::CommandOutcome;

#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("command \"{0}\" not found")]
    CommandNotFound(String),

    /// Signals the command handler that another attempt may succeed.
    /// Never leaves the handler boundary.
    #[error("retriable error: {0}")]
    Retriable(String),

    /// Terminal failure after retries (and undo, when supported) are
    /// exhausted. Carries the aggregated per-attempt errors in `message`
    /// and the compensating undo outcome when one was produced.
    #[error("{message}")]
    FailedOperation {
        message: String,
        undo_result: Option<CommandOutcome>,
    },

    #[error("interface \"{0}\" not registered")]
    InterfaceNotFound(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, DispatchError>;

impl<T> From<std::sync::PoisonError<T>> for DispatchError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<std::io::Error> for DispatchError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for DispatchError {
    fn from(err: serde_json::Error) -> Self {
        Self::Config(err.to_string())
    }
}
