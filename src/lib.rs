// ============================================================================
// cmdrelay: asynchronous command-dispatch runtime
// ============================================================================
//
// Interact surfaces (a console today, network surfaces tomorrow) submit
// named commands; the command engine executes them with bounded
// concurrency and retry semantics and delivers each outcome back to the
// surface that originated it, correlated by a deterministic command id.

pub mod command;
pub mod config;
pub mod core;
pub mod engine;
pub mod interact;
pub mod plugins;

// Re-export the main types for convenience
pub use crate::command::{Command, CommandHandler, CommandOutcome, CommandRegistry, Receiver};
pub use crate::config::{EngineConfig, InteractConfig, InterfaceConf};
pub use crate::core::{DispatchError, Result};
pub use crate::engine::{CommandEngine, InteractEngine};
pub use crate::interact::{
    ConsoleInterface, Delivery, DeliveryHandle, Envelope, InteractInterface, InterfaceRegistry,
};
