use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::artifacts::{csv_error_line, AppendLog, SnapshotFile};
use crate::periodic::PeriodicTask;
use crate::{Error, ScanCounters};

/// A probe failure on its way to the error log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorRecord {
    pub target: Ipv4Addr,
    pub message: String,
}

/// Bounded queue between failing tasks and the [`ErrorFlusher`]. A full
/// queue makes senders wait; records are never dropped while it is open.
pub fn error_queue(
    capacity: usize,
) -> (mpsc::Sender<ErrorRecord>, mpsc::Receiver<ErrorRecord>) {
    mpsc::channel(capacity.max(1))
}

pub struct ErrorFlusher {
    queue: mpsc::Receiver<ErrorRecord>,
    log: Arc<AppendLog>,
    drain_window: Duration,
}

impl ErrorFlusher {
    pub fn new(
        queue: mpsc::Receiver<ErrorRecord>,
        log: Arc<AppendLog>,
        drain_window: Duration,
    ) -> Self {
        ErrorFlusher {
            queue,
            log,
            drain_window,
        }
    }

    fn write(&self, record: ErrorRecord) {
        self.log
            .append_line(&csv_error_line(&record.target.to_string(), &record.message));
    }
}

#[async_trait]
impl PeriodicTask for ErrorFlusher {
    fn name(&self) -> &'static str {
        "error flusher"
    }

    async fn tick(&mut self, cancel: &CancellationToken) -> Result<(), Error> {
        let deadline = Instant::now() + self.drain_window;
        let mut written = 0usize;

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep_until(deadline) => break,
                record = self.queue.recv() => match record {
                    Some(record) => {
                        self.write(record);
                        written += 1;
                    }
                    None => break,
                },
            }
        }

        if written > 0 {
            debug!("flushed {} error records", written);
        }
        self.log.sync();
        Ok(())
    }

    async fn finish(&mut self) {
        // Runs after every sender has exited; close so the drain ends.
        self.queue.close();
        while let Some(record) = self.queue.recv().await {
            self.write(record);
        }
        self.log.sync();
    }
}

pub struct ProgressReporter {
    counters: Arc<ScanCounters>,
    file: Arc<SnapshotFile>,
}

impl ProgressReporter {
    pub fn new(counters: Arc<ScanCounters>, file: Arc<SnapshotFile>) -> Self {
        ProgressReporter { counters, file }
    }

    pub fn write_snapshot(&self) {
        let progress = self.counters.snapshot();
        let result = serde_json::to_vec(&progress)
            .map_err(std::io::Error::from)
            .and_then(|json| self.file.overwrite(&json));

        if let Err(err) = result {
            debug!("{}: snapshot failed: {}", self.file.path().display(), err);
        }
    }
}

#[async_trait]
impl PeriodicTask for ProgressReporter {
    fn name(&self) -> &'static str {
        "progress reporter"
    }

    async fn tick(&mut self, _cancel: &CancellationToken) -> Result<(), Error> {
        self.write_snapshot();
        Ok(())
    }

    async fn finish(&mut self) {
        self.write_snapshot();
    }
}
