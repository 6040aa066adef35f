use std::time::Duration;

use async_trait::async_trait;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::Error;

/// Work repeated on a fixed cadence for the lifetime of a scan.
#[async_trait]
pub trait PeriodicTask: Send {
    fn name(&self) -> &'static str;

    /// One round of work. `cancel` lets a long tick stop early.
    async fn tick(&mut self, cancel: &CancellationToken) -> Result<(), Error>;

    /// Last round after the lifetime token fired.
    async fn finish(&mut self) {}
}

/// Runs `task.tick` right away and then once per `interval` until `cancel`
/// fires (followed by `task.finish`) or a tick returns an error.
pub async fn periodic<T: PeriodicTask>(mut task: T, cancel: CancellationToken, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        if let Err(err) = task.tick(&cancel).await {
            warn!("{} stopped: {}", task.name(), err);
            return;
        }
    }

    task.finish().await;
    debug!("{} finished", task.name());
}
