mod command;
mod interact;

use std::future::Future;
use std::time::Duration;

use log::{error, warn};
use tokio::time::sleep;

use crate::core::Result;

pub use command::CommandEngine;
pub use interact::InteractEngine;

/// Keep one long-running loop alive: spawn it, poll its handle on a
/// fixed interval, and respawn a fresh instance whenever the previous
/// one has terminated for any reason, panics included. Only the
/// in-flight item that killed a loop is lost.
pub(crate) async fn supervise<F, Fut>(label: &str, interval: Duration, factory: F)
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    let mut handle = tokio::spawn(factory());
    loop {
        sleep(interval).await;
        if handle.is_finished() {
            match handle.await {
                Ok(Ok(())) => warn!("{label} loop exited cleanly, respawning"),
                Ok(Err(err)) => error!("{label} loop failed: {err}, respawning"),
                Err(join_err) => error!("{label} loop aborted: {join_err}, respawning"),
            }
            handle = tokio::spawn(factory());
        }
    }
}
