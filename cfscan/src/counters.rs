use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Progress counters shared by every task and reporter of one scan.
#[derive(Debug)]
pub struct ScanCounters {
    total: u64,
    checked: AtomicU64,
    errored: AtomicU64,
    found: AtomicU64,
}

/// Point-in-time view of the counters, as written to the progress file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Progress {
    pub checked: u64,
    pub errored: u64,
    pub found: u64,
    pub left: u64,
}

impl ScanCounters {
    pub fn new(total: u64) -> Self {
        ScanCounters {
            total,
            checked: AtomicU64::new(0),
            errored: AtomicU64::new(0),
            found: AtomicU64::new(0),
        }
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    // `checked` is always bumped before `errored`/`found` for the same target,
    // and `snapshot` reads it last, so a snapshot never shows more outcomes
    // than checks.

    pub fn record_checked(&self) {
        self.checked.fetch_add(1, Ordering::SeqCst);
    }

    pub fn record_errored(&self) {
        self.checked.fetch_add(1, Ordering::SeqCst);
        self.errored.fetch_add(1, Ordering::SeqCst);
    }

    pub fn record_found(&self) {
        self.checked.fetch_add(1, Ordering::SeqCst);
        self.found.fetch_add(1, Ordering::SeqCst);
    }

    pub fn snapshot(&self) -> Progress {
        let found = self.found.load(Ordering::SeqCst);
        let errored = self.errored.load(Ordering::SeqCst);
        let checked = self.checked.load(Ordering::SeqCst);

        Progress {
            checked,
            errored,
            found,
            left: self.total.saturating_sub(checked),
        }
    }
}
