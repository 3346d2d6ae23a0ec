use std::sync::Arc;

use log::{debug, warn};
use tokio::sync::{Mutex, Semaphore, mpsc};

use crate::command::{CommandHandler, CommandOutcome, CommandRegistry};
use crate::config::EngineConfig;
use crate::core::{DispatchError, Result};
use crate::engine::supervise;
use crate::interact::{Delivery, Envelope};

/// Central command execution engine.
///
/// Owns the inbound envelope queue and the outbound delivery queue, and
/// runs two supervised loops: dispatch (pop an envelope, hand it to a
/// bounded worker, post the outcome) and emission (pop a delivery, hand
/// it back to the originating interface). Completion order is not
/// submission order; consumers correlate via command id.
pub struct CommandEngine {
    registry: Arc<CommandRegistry>,
    config: EngineConfig,
    inbound_tx: mpsc::UnboundedSender<Envelope>,
    inbound_rx: Arc<Mutex<mpsc::UnboundedReceiver<Envelope>>>,
    outbound_tx: mpsc::UnboundedSender<Delivery>,
    outbound_rx: Arc<Mutex<mpsc::UnboundedReceiver<Delivery>>>,
    workers: Arc<Semaphore>,
}

impl CommandEngine {
    pub fn new(registry: Arc<CommandRegistry>, config: EngineConfig) -> Self {
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let workers = Arc::new(Semaphore::new(config.max_workers));
        Self {
            registry,
            config,
            inbound_tx,
            inbound_rx: Arc::new(Mutex::new(inbound_rx)),
            outbound_tx,
            outbound_rx: Arc::new(Mutex::new(outbound_rx)),
            workers,
        }
    }

    /// Producer handle for the inbound command queue.
    pub fn command_queue(&self) -> mpsc::UnboundedSender<Envelope> {
        self.inbound_tx.clone()
    }

    /// Producer handle for the outbound delivery queue.
    pub fn result_queue(&self) -> mpsc::UnboundedSender<Delivery> {
        self.outbound_tx.clone()
    }

    /// Run both loops under supervision. Never returns.
    pub async fn run(self: Arc<Self>) {
        let interval = self.config.supervision_interval;
        let dispatch = {
            let engine = Arc::clone(&self);
            move || {
                let engine = Arc::clone(&engine);
                async move { engine.dispatch_loop().await }
            }
        };
        let emission = {
            let engine = Arc::clone(&self);
            move || {
                let engine = Arc::clone(&engine);
                async move { engine.emission_loop().await }
            }
        };
        tokio::join!(
            supervise("command dispatch", interval, dispatch),
            supervise("result emission", interval, emission),
        );
    }

    /// Pull envelopes and fire them at the worker pool. Submission is
    /// fire-and-forget: the loop only waits for a free worker permit,
    /// never for command completion.
    async fn dispatch_loop(self: Arc<Self>) -> Result<()> {
        let mut inbound = self.inbound_rx.lock().await;
        while let Some(envelope) = inbound.recv().await {
            let command_id = envelope.command_id();
            debug!("dispatching {command_id}");
            let permit = Arc::clone(&self.workers)
                .acquire_owned()
                .await
                .map_err(|_| DispatchError::Internal("worker pool closed".into()))?;
            let registry = Arc::clone(&self.registry);
            let outbound = self.outbound_tx.clone();
            let retry_limit = self.config.retry_limit;
            tokio::spawn(async move {
                let _permit = permit;
                let Envelope {
                    command,
                    args,
                    kwargs,
                    callback,
                    ..
                } = envelope;
                // run the handler in its own task so a panicking command
                // still produces a failed outcome instead of a lost slot
                let worker = tokio::spawn(async move {
                    let mut handler =
                        CommandHandler::new(&registry, &command, &args, &kwargs, retry_limit)?;
                    handler.execute().await
                });
                let outcome = match worker.await {
                    Ok(Ok(outcome)) => outcome,
                    Ok(Err(err)) => CommandOutcome::from_error(&err),
                    Err(join_err) => {
                        CommandOutcome::failure(format!("command task aborted: {join_err}"))
                    }
                };
                let delivery = Delivery {
                    command_id,
                    outcome,
                    callback,
                };
                if outbound.send(delivery).is_err() {
                    warn!("result queue closed, dropping an outcome");
                }
            });
        }
        Ok(())
    }

    /// Pull deliveries and hand each back to its originating interface.
    /// A failed delivery is logged and skipped; it must not stall the
    /// loop.
    async fn emission_loop(self: Arc<Self>) -> Result<()> {
        let mut outbound = self.outbound_rx.lock().await;
        while let Some(delivery) = outbound.recv().await {
            let Delivery {
                command_id,
                outcome,
                callback,
            } = delivery;
            if let Err(err) = callback.post_command_result(&command_id, outcome).await {
                warn!("result delivery for {command_id} failed: {err}");
            }
        }
        Ok(())
    }
}
