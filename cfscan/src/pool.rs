//! Bounded-concurrency executor with fail-fast latching.
//!
//! At most `capacity` submitted tasks run at once. The first task that
//! returns an error latches the pool into the failed state: later `submit`
//! calls become no-ops and `wait` reports that first error.
//!
//! The failed check and the slot acquisition in `submit` are two separate
//! steps, so one more task may still start right after the latch is set.
//! Early exit is best effort, not a hard guarantee.

use std::future::Future;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use tokio::sync::{mpsc, Mutex, Semaphore};
use tokio_util::{sync::CancellationToken, task::TaskTracker};
use tracing::debug;

use crate::Error;

pub struct WorkerPool {
    capacity: usize,
    slots: Arc<Semaphore>,
    tracker: TaskTracker,
    cancel: CancellationToken,
    failed: Arc<AtomicBool>,
    errors_tx: mpsc::Sender<Error>,
    errors_rx: Mutex<mpsc::Receiver<Error>>,
}

impl WorkerPool {
    pub fn new(capacity: usize, cancel: CancellationToken) -> Result<Self, Error> {
        if capacity == 0 {
            return Err(Error::InvalidCapacity);
        }

        let (errors_tx, errors_rx) = mpsc::channel(capacity);

        Ok(WorkerPool {
            capacity,
            slots: Arc::new(Semaphore::new(capacity)),
            tracker: TaskTracker::new(),
            cancel,
            failed: Arc::new(AtomicBool::new(false)),
            errors_tx,
            errors_rx: Mutex::new(errors_rx),
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_failed(&self) -> bool {
        self.failed.load(Ordering::SeqCst)
    }

    /// Waits for a free slot, then runs `task` on its own tokio task.
    ///
    /// Returns immediately without running anything once the pool has
    /// failed. Fails with [`Error::Cancelled`] if the lifetime token is
    /// cancelled while waiting for a slot.
    pub async fn submit<F>(&self, task: F) -> Result<(), Error>
    where
        F: Future<Output = Result<(), Error>> + Send + 'static,
    {
        if self.is_failed() {
            return Ok(());
        }

        let permit = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Err(Error::Cancelled),
            permit = self.slots.clone().acquire_owned() => permit.map_err(|_| Error::PoolClosed)?,
        };

        let latch = self.latch();
        self.tracker.spawn(async move {
            let result = task.await;
            drop(permit);
            latch.observe(result);
        });

        Ok(())
    }

    /// Runs `task` without taking a slot. Used for the producer loop so its
    /// blocking `submit` calls never hold one of the worker slots.
    pub fn schedule<F>(&self, task: F)
    where
        F: Future<Output = Result<(), Error>> + Send + 'static,
    {
        let latch = self.latch();
        self.tracker.spawn(async move {
            latch.observe(task.await);
        });
    }

    /// Waits until every scheduled and submitted task has finished and
    /// returns the first failure, if any.
    pub async fn wait(&self) -> Result<(), Error> {
        self.tracker.close();
        self.tracker.wait().await;

        match self.errors_rx.lock().await.try_recv() {
            Ok(err) => Err(err),
            Err(_) => Ok(()),
        }
    }

    fn latch(&self) -> Latch {
        Latch {
            failed: self.failed.clone(),
            errors_tx: self.errors_tx.clone(),
        }
    }
}

struct Latch {
    failed: Arc<AtomicBool>,
    errors_tx: mpsc::Sender<Error>,
}

impl Latch {
    fn observe(&self, result: Result<(), Error>) {
        let Err(err) = result else {
            return;
        };

        // Only the task that flips the flag enqueues, so the queue never fills.
        if !self.failed.swap(true, Ordering::SeqCst) {
            debug!("worker pool latched failure: {}", err);
            let _ = self.errors_tx.try_send(err);
        } else {
            debug!("worker pool ignoring later failure: {}", err);
        }
    }
}
