use std::any::TypeId;
use std::collections::BTreeMap;
use std::io::Write;
use std::sync::Arc;

use async_trait::async_trait;
use log::info;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use crate::command::{CommandRegistry, matches_to_kwargs};
use crate::core::{DispatchError, Result};
use crate::interact::registry::InterfaceFactory;
use crate::interact::{DeliveryHandle, Envelope, InteractInterface, InterfaceState};

/// Delivery handle that decodes messages and writes them to stdout.
pub struct StdoutHandle;

#[async_trait]
impl DeliveryHandle for StdoutHandle {
    fn ident(&self) -> String {
        "stdout".to_string()
    }

    async fn post(&self, message: &[u8]) -> Result<()> {
        println!("{}", String::from_utf8_lossy(message));
        Ok(())
    }
}

const DEFAULT_PROMPT: &str = "Enter command: ";

/// Plain-text console interface: reads command lines from stdin and
/// renders results to stdout. All submissions share the single stdout
/// handle (`has_threads` stays false).
pub struct ConsoleInterface {
    state: InterfaceState,
    commands: Arc<CommandRegistry>,
    main: Arc<dyn DeliveryHandle>,
    prompt: String,
}

impl ConsoleInterface {
    pub fn new(
        name: &str,
        command_tx: mpsc::UnboundedSender<Envelope>,
        commands: Arc<CommandRegistry>,
    ) -> Self {
        Self {
            state: InterfaceState::new(name, command_tx),
            commands,
            main: Arc::new(StdoutHandle),
            prompt: DEFAULT_PROMPT.to_string(),
        }
    }

    /// Build from configured constructor options. `prompt` replaces the
    /// input prompt; any other key is a configuration error.
    pub fn from_options(
        name: &str,
        command_tx: mpsc::UnboundedSender<Envelope>,
        commands: Arc<CommandRegistry>,
        options: &BTreeMap<String, serde_json::Value>,
    ) -> Result<Self> {
        let mut console = Self::new(name, command_tx, commands);
        for (key, value) in options {
            match key.as_str() {
                "prompt" => {
                    console.prompt = value
                        .as_str()
                        .ok_or_else(|| {
                            DispatchError::Config(
                                "console option \"prompt\" must be a string".into(),
                            )
                        })?
                        .to_string();
                }
                other => {
                    return Err(DispatchError::Config(format!(
                        "unknown console option \"{other}\""
                    )));
                }
            }
        }
        Ok(console)
    }
}

#[async_trait]
impl InteractInterface for ConsoleInterface {
    fn state(&self) -> &InterfaceState {
        &self.state
    }

    fn main_thread(&self) -> Arc<dyn DeliveryHandle> {
        Arc::clone(&self.main)
    }

    async fn post_message(&self, message: &[u8], thread: &Arc<dyn DeliveryHandle>) -> Result<()> {
        thread.post(message).await
    }

    /// Line grammar: `<command-name> [ <token> ... ]`. Empty input and
    /// unknown names are reported and never enqueued; parser usage
    /// errors are printed and the loop continues.
    async fn listen(self: Arc<Self>) -> Result<()> {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            print!("{}", self.prompt);
            std::io::stdout().flush().ok();

            let Some(line) = lines.next_line().await? else {
                // stdin closed; park instead of spinning the supervisor
                info!("console input closed, listener parked");
                std::future::pending::<()>().await;
                unreachable!();
            };
            let line = line.trim();
            if line.is_empty() {
                self.post(b"No command entered").await?;
                continue;
            }

            let mut tokens = line.split_whitespace().map(str::to_string);
            let name = tokens.next().unwrap_or_default();
            let rest: Vec<String> = tokens.collect();

            let descriptor = match self.commands.get(&name) {
                Ok(descriptor) => descriptor,
                Err(DispatchError::CommandNotFound(_)) => {
                    self.post(format!("Command {name} not found").as_bytes())
                        .await?;
                    continue;
                }
                Err(other) => return Err(other),
            };

            let argv = std::iter::once(name.clone()).chain(rest);
            let matches = match descriptor.parser.clone().try_get_matches_from(argv) {
                Ok(matches) => matches,
                Err(err) => {
                    self.post(err.to_string().as_bytes()).await?;
                    continue;
                }
            };

            Arc::clone(&self).receive_command(
                &name,
                Vec::new(),
                matches_to_kwargs(&matches),
                Some(self.main_thread()),
                None,
            )?;
        }
    }
}

/// Default-interface factory for the interface registry: builds a console
/// wired to the shared command queue.
pub fn console_factory(commands: Arc<CommandRegistry>) -> Box<InterfaceFactory> {
    Box::new(move |name, command_tx| {
        let iface: Arc<dyn InteractInterface> =
            Arc::new(ConsoleInterface::new(name, command_tx, Arc::clone(&commands)));
        (TypeId::of::<ConsoleInterface>(), iface)
    })
}
