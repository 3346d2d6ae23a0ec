use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use log::{error, info, warn};
use tokio::task::JoinHandle;
use tokio::time::sleep;

use crate::command::CommandRegistry;
use crate::config::{InteractConfig, InterfaceConf};
use crate::core::{DispatchError, Result};
use crate::engine::supervise;
use crate::interact::{ConsoleInterface, InterfaceRegistry};

/// Builds the configured interact interfaces and keeps their listener
/// tasks alive.
pub struct InteractEngine {
    config: InteractConfig,
    interfaces: Arc<InterfaceRegistry>,
    commands: Arc<CommandRegistry>,
    supervision_interval: Duration,
}

impl InteractEngine {
    pub fn new(
        config: InteractConfig,
        interfaces: Arc<InterfaceRegistry>,
        commands: Arc<CommandRegistry>,
        supervision_interval: Duration,
    ) -> Self {
        Self {
            config,
            interfaces,
            commands,
            supervision_interval,
        }
    }

    /// Construct and register every configured interface; returns the
    /// names flagged to start listening. An empty configuration falls
    /// back to the default interface alone.
    fn build_interfaces(&self) -> Result<Vec<String>> {
        if self.config.interacts.is_empty() {
            self.interfaces.get(None)?;
            return Ok(vec!["default".to_string()]);
        }

        let mut starters = Vec::new();
        for conf in &self.config.interacts {
            let name = self.build_interface(conf)?;
            if conf.start {
                starters.push(name);
            }
        }
        Ok(starters)
    }

    fn build_interface(&self, conf: &InterfaceConf) -> Result<String> {
        match conf.interface_type.as_deref() {
            None | Some("console") => {
                let name = conf
                    .name
                    .clone()
                    .unwrap_or_else(|| "ConsoleInterface".to_string());
                let iface = Arc::new(ConsoleInterface::from_options(
                    &name,
                    self.interfaces.command_queue()?,
                    Arc::clone(&self.commands),
                    &conf.options,
                )?);
                self.interfaces.register(iface, Some(&name))?;
                Ok(name)
            }
            Some(other) => Err(DispatchError::Config(format!(
                "unknown interface type \"{other}\""
            ))),
        }
    }

    fn start_listener(
        &self,
        name: &str,
        listeners: &mut HashMap<String, JoinHandle<()>>,
    ) -> Result<()> {
        let iface = self.interfaces.get(Some(name))?;
        let label = name.to_string();
        info!("starting listener \"{label}\"");
        listeners.insert(
            name.to_string(),
            tokio::spawn(async move {
                if let Err(err) = iface.listen().await {
                    error!("listener \"{label}\" exited: {err}");
                }
            }),
        );
        Ok(())
    }

    /// Build the interfaces, start every flagged listener, and respawn
    /// any listener whose task has died.
    async fn execute(self: Arc<Self>) -> Result<()> {
        let starters = self.build_interfaces()?;
        let mut listeners: HashMap<String, JoinHandle<()>> = HashMap::new();
        for name in &starters {
            self.start_listener(name, &mut listeners)?;
        }
        loop {
            sleep(self.supervision_interval).await;
            for name in &starters {
                let dead = listeners
                    .get(name)
                    .map(JoinHandle::is_finished)
                    .unwrap_or(true);
                if dead {
                    warn!("listener \"{name}\" died, restarting");
                    self.start_listener(name, &mut listeners)?;
                }
            }
        }
    }

    /// Run the engine under supervision. Never returns.
    pub async fn run(self: Arc<Self>) {
        let interval = self.supervision_interval;
        let factory = {
            let engine = Arc::clone(&self);
            move || {
                let engine = Arc::clone(&engine);
                async move { engine.execute().await }
            }
        };
        supervise("interact", interval, factory).await;
    }
}
