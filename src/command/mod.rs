mod handler;
mod outcome;
mod registry;

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::core::{DispatchError, Result};

pub use handler::CommandHandler;
pub use outcome::{CommandOutcome, render_list};
pub use registry::{CommandDescriptor, CommandRegistry, matches_to_kwargs};

/// The argument payload a command operates on.
///
/// Receivers are built once per dispatch from the envelope's positional
/// and keyword arguments, then handed to the command that consumes them.
pub trait Receiver: Sized + Send {
    fn from_args(args: &[String], kwargs: &BTreeMap<String, String>) -> Result<Self>;
}

/// A named unit of work producing a [`CommandOutcome`].
///
/// One instance is constructed per invocation and dropped once its
/// outcome has been produced; commands hold no state across dispatches.
/// Implementations that can compensate a failed execution override
/// `can_undo` and `undo`; the defaults refuse rather than pretending to
/// succeed.
#[async_trait]
pub trait Command: Send {
    fn can_undo(&self) -> bool {
        false
    }

    async fn execute(&mut self) -> Result<CommandOutcome>;

    async fn undo(&mut self) -> Result<CommandOutcome> {
        Err(DispatchError::FailedOperation {
            message: "undo is not supported by this command".into(),
            undo_result: None,
        })
    }

    async fn redo(&mut self) -> Result<CommandOutcome> {
        Err(DispatchError::FailedOperation {
            message: "redo is not supported by this command".into(),
            undo_result: None,
        })
    }
}
