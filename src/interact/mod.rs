mod console;
mod registry;

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::command::{CommandOutcome, render_list};
use crate::core::{DispatchError, Result};

pub use console::{ConsoleInterface, StdoutHandle, console_factory};
pub use registry::{InterfaceFactory, InterfaceRegistry};

/// Delivery endpoint for rendered results. Interfaces hand one of these
/// out per submission (or share a single main handle when they have no
/// per-submission threads).
#[async_trait]
pub trait DeliveryHandle: Send + Sync {
    /// Stable identity used inside command ids.
    fn ident(&self) -> String;

    async fn post(&self, message: &[u8]) -> Result<()>;
}

/// An in-flight command submission with its routing metadata.
#[derive(Clone)]
pub struct Envelope {
    pub command: String,
    pub args: Vec<String>,
    pub kwargs: BTreeMap<String, String>,
    pub thread: Arc<dyn DeliveryHandle>,
    pub callback: Arc<dyn InteractInterface>,
}

impl Envelope {
    /// Deterministic deduplication key. The format is fixed and must stay
    /// bit-reproducible: two envelopes with identical fields always
    /// produce identical ids.
    pub fn command_id(&self) -> String {
        let args = self
            .args
            .iter()
            .map(|arg| format!("arg::{arg}"))
            .collect::<Vec<_>>()
            .join(",");
        let kwargs = self
            .kwargs
            .iter()
            .map(|(key, value)| format!("kw_arg::{key}--{value}"))
            .collect::<Vec<_>>()
            .join(",");
        format!(
            "cmd:{};args:{};kw_args:{};thread:{};iface:{}",
            self.command,
            args,
            kwargs,
            self.thread.ident(),
            self.callback.ident()
        )
    }
}

/// Outbound unit: one produced outcome on its way back to the interface
/// that originated the command.
pub struct Delivery {
    pub command_id: String,
    pub outcome: CommandOutcome,
    pub callback: Arc<dyn InteractInterface>,
}

/// Shared per-interface state: its registry identity, the inbound command
/// queue handle, and the inventory of in-flight envelopes keyed by
/// command id.
///
/// The inventory lock is held only for insert-or-skip and remove; queue
/// pushes always happen outside it.
pub struct InterfaceState {
    name: String,
    command_tx: mpsc::UnboundedSender<Envelope>,
    inventory: Mutex<HashMap<String, Envelope>>,
}

impl InterfaceState {
    pub fn new(name: impl Into<String>, command_tx: mpsc::UnboundedSender<Envelope>) -> Self {
        Self {
            name: name.into(),
            command_tx,
            inventory: Mutex::new(HashMap::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Insert-or-skip under the lock. Returns `true` when the envelope
    /// was admitted and should be enqueued, `false` for an in-flight
    /// duplicate.
    pub fn admit(&self, command_id: &str, envelope: Envelope) -> Result<bool> {
        let mut inventory = self.inventory.lock()?;
        if inventory.contains_key(command_id) {
            return Ok(false);
        }
        inventory.insert(command_id.to_string(), envelope);
        Ok(true)
    }

    pub fn resolve(&self, command_id: &str) -> Result<Option<Envelope>> {
        let inventory = self.inventory.lock()?;
        Ok(inventory.get(command_id).cloned())
    }

    /// Remove the inventory entry, closing the dedup window for this id.
    pub fn settle(&self, command_id: &str) -> Result<()> {
        let mut inventory = self.inventory.lock()?;
        inventory.remove(command_id);
        Ok(())
    }

    pub fn in_flight(&self) -> usize {
        self.inventory.lock().map(|inv| inv.len()).unwrap_or(0)
    }

    pub fn enqueue(&self, envelope: Envelope) -> Result<()> {
        self.command_tx
            .send(envelope)
            .map_err(|_| DispatchError::Internal("command queue closed".into()))
    }
}

/// A pluggable front-end that submits commands and renders results.
///
/// Implementations provide the four capability methods plus shared
/// [`InterfaceState`]; submission deduplication and result posting come
/// as provided methods so every interface behaves identically there.
#[async_trait]
pub trait InteractInterface: Send + Sync {
    fn state(&self) -> &InterfaceState;

    /// Whether each submission gets its own delivery handle. When false
    /// everything shares the main handle.
    fn has_threads(&self) -> bool {
        false
    }

    fn main_thread(&self) -> Arc<dyn DeliveryHandle>;

    fn spawn_thread(&self) -> Arc<dyn DeliveryHandle> {
        self.main_thread()
    }

    async fn post_message(&self, message: &[u8], thread: &Arc<dyn DeliveryHandle>) -> Result<()>;

    /// Blocking input loop; runs in its own supervised task.
    async fn listen(self: Arc<Self>) -> Result<()>;

    /// Identity used inside command ids; the registry name.
    fn ident(&self) -> String {
        self.state().name().to_string()
    }

    /// Post to a fresh handle when the interface has per-submission
    /// threads, otherwise to the main handle.
    async fn post(&self, message: &[u8]) -> Result<()> {
        let thread = if self.has_threads() {
            self.spawn_thread()
        } else {
            self.main_thread()
        };
        self.post_message(message, &thread).await
    }

    /// Accept a command submission and schedule it for execution.
    ///
    /// A missing thread handle defaults to the main handle; a missing
    /// callback defaults to the receiving interface itself. While an
    /// envelope with the same command id is still unresolved the
    /// duplicate is silently dropped; the queue push happens outside the
    /// inventory lock.
    fn receive_command(
        self: Arc<Self>,
        command: &str,
        args: Vec<String>,
        kwargs: BTreeMap<String, String>,
        thread: Option<Arc<dyn DeliveryHandle>>,
        callback: Option<Arc<dyn InteractInterface>>,
    ) -> Result<()>
    where
        Self: Sized + 'static,
    {
        let thread = thread.unwrap_or_else(|| self.main_thread());
        let callback = callback.unwrap_or_else(|| {
            let this: Arc<dyn InteractInterface> = Arc::<Self>::clone(&self);
            this
        });
        let envelope = Envelope {
            command: command.to_string(),
            args,
            kwargs,
            thread,
            callback,
        };
        let command_id = envelope.command_id();
        if self.state().admit(&command_id, envelope.clone())? {
            self.state().enqueue(envelope)?;
        }
        Ok(())
    }

    /// Deliver a produced outcome back to the submission's origin handle
    /// and free its command id for reuse.
    async fn post_command_result(&self, command_id: &str, outcome: CommandOutcome) -> Result<()> {
        let envelope = self.state().resolve(command_id)?.ok_or_else(|| {
            DispatchError::Internal(format!("no in-flight envelope for {command_id}"))
        })?;
        let mut shown_args = envelope.args.clone();
        shown_args.extend(
            envelope
                .kwargs
                .iter()
                .map(|(key, value)| format!("{key}: {value}")),
        );
        let text = render_outcome(&outcome, &envelope.command, &shown_args);
        self.post_message(text.as_bytes(), &envelope.thread).await?;
        self.state().settle(command_id)?;
        Ok(())
    }
}

/// Human-readable rendering of an outcome for delivery back to a thread.
pub fn render_outcome(outcome: &CommandOutcome, call: &str, shown_args: &[String]) -> String {
    let mut message = call.to_string();
    if !shown_args.is_empty() {
        message.push_str(&format!(" with args {}", render_list(shown_args)));
    }
    if outcome.success {
        message.push_str(&format!(" succeeded with message: {}", outcome.message));
        if !outcome.errors.is_empty() {
            message.push_str(&format!(
                " but had the following errors: {}",
                render_list(&outcome.errors)
            ));
        }
    } else {
        message.push_str(&format!(" failed with message: {}", outcome.message));
        if !outcome.errors.is_empty() {
            message.push_str(&format!(
                " and had the following errors: {}",
                render_list(&outcome.errors)
            ));
        }
    }
    message
}
