//! Built-in command plug-ins. Each plug-in supplies a command type, a
//! receiver type, and a clap parser, and registers itself by name.

mod echo;

pub use echo::{Echo, EchoPayload};

use crate::command::CommandRegistry;
use crate::core::Result;

/// Register every built-in command.
pub fn register_builtins(registry: &CommandRegistry) -> Result<()> {
    echo::register(registry)
}
