use std::collections::BTreeMap;

use crate::command::{Command, CommandOutcome, CommandRegistry, render_list};
use crate::core::{DispatchError, Result};

/// Default number of additional attempts after the first failure.
pub const DEFAULT_RETRY_LIMIT: usize = 3;

/// Wraps one command instance and drives it through bounded retries,
/// with a compensating undo when the command supports it.
pub struct CommandHandler {
    command: Box<dyn Command>,
    retry_limit: usize,
}

impl CommandHandler {
    /// Resolve `name` through the registry and build the command from the
    /// supplied arguments. Fails with `CommandNotFound` for unregistered
    /// names; receiver construction errors propagate as-is.
    pub fn new(
        registry: &CommandRegistry,
        name: &str,
        args: &[String],
        kwargs: &BTreeMap<String, String>,
        retry_limit: usize,
    ) -> Result<Self> {
        let descriptor = registry.get(name)?;
        Ok(Self {
            command: descriptor.build(args, kwargs)?,
            retry_limit,
        })
    }

    /// Execute the wrapped command.
    ///
    /// The command runs up to `retry_limit + 1` times; only
    /// [`DispatchError::Retriable`] triggers another attempt, anything
    /// else propagates immediately. The first produced outcome returns
    /// at once. Exhaustion raises [`DispatchError::FailedOperation`]
    /// reporting every collected attempt error; when the command supports
    /// undo, `undo` runs exactly once first and its outcome rides along.
    pub async fn execute(&mut self) -> Result<CommandOutcome> {
        let mut errors: Vec<String> = Vec::new();
        let mut retries = 0usize;
        while retries <= self.retry_limit {
            match self.command.execute().await {
                Ok(outcome) => return Ok(outcome),
                Err(DispatchError::Retriable(reason)) => {
                    retries += 1;
                    errors.push(reason);
                }
                Err(other) => return Err(other),
            }
        }

        let undo_result = if self.command.can_undo() {
            Some(match self.command.undo().await {
                Ok(outcome) => outcome,
                Err(err) => CommandOutcome::failure(format!("undo failed: {err}")),
            })
        } else {
            None
        };

        Err(DispatchError::FailedOperation {
            message: format!(
                "operation failed after {} retries: {}",
                self.retry_limit,
                render_list(&errors)
            ),
            undo_result,
        })
    }
}
