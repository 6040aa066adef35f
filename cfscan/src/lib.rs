//! Finds origin servers hidden behind a CDN by probing candidate IPv4
//! addresses with a fixed Host header and looking for a reference response.

pub mod artifacts;
pub mod config;
pub mod counters;
mod error;
pub mod periodic;
pub mod pool;
pub mod probe;
pub mod ranges;
pub mod reporters;
pub mod scan;

pub use artifacts::Artifacts;
pub use config::{ScanConfig, ScanOptions};
pub use counters::{Progress, ScanCounters};
pub use error::{Error, ProbeError};
pub use pool::WorkerPool;
pub use probe::{Probe, ReqwestProbe};
pub use scan::{run_scan, ScanReport};
