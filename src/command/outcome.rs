use crate::core::DispatchError;

/// Value produced exactly once per command invocation.
///
/// Every command reports back through one of these, whether it succeeded
/// or not; raw errors are converted into a failed outcome before they
/// reach any queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutcome {
    pub success: bool,
    pub message: String,
    pub errors: Vec<String>,
}

impl CommandOutcome {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            errors: Vec::new(),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            errors: Vec::new(),
        }
    }

    /// Convert a terminal dispatch error into a failed outcome. The undo
    /// evidence attached to a `FailedOperation` is folded into `errors`.
    pub fn from_error(err: &DispatchError) -> Self {
        match err {
            DispatchError::FailedOperation {
                message,
                undo_result,
            } => {
                let mut outcome = Self::failure(message.clone());
                if let Some(undo) = undo_result {
                    let verdict = if undo.success { "succeeded" } else { "failed" };
                    outcome
                        .errors
                        .push(format!("undo {}: {}", verdict, undo.message));
                }
                outcome
            }
            other => Self::failure(other.to_string()),
        }
    }

    /// Byte form of the message for transport to an interface.
    pub fn message_bytes(&self) -> &[u8] {
        self.message.as_bytes()
    }
}

/// Render a list of strings the way results and errors are shown to
/// humans: `['first', 'second']`, or `[]` when empty.
pub fn render_list(items: &[String]) -> String {
    let quoted: Vec<String> = items.iter().map(|item| format!("'{item}'")).collect();
    format!("[{}]", quoted.join(", "))
}
