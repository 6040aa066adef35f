use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::artifacts::{AppendLog, Artifacts};
use crate::periodic::periodic;
use crate::probe::{contains_bytes, Probe, ReqwestProbe};
use crate::reporters::{error_queue, ErrorFlusher, ErrorRecord, ProgressReporter};
use crate::{Error, Progress, ScanConfig, ScanCounters, WorkerPool};

/// Everything a per-target task needs, shared by all of them.
pub struct ScanContext {
    pub probe: Arc<dyn Probe>,
    pub host: String,
    pub timeout: Duration,
    pub expected: Vec<u8>,
    pub counters: Arc<ScanCounters>,
    pub checked_log: Arc<AppendLog>,
    pub found_log: Arc<AppendLog>,
    pub errors: mpsc::Sender<ErrorRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanReport {
    pub progress: Progress,
    pub cancelled: bool,
    pub elapsed: Duration,
}

/// Literal text when given, otherwise the body of the reference URL.
pub async fn desired_response(
    config: &ScanConfig,
    probe: &ReqwestProbe,
) -> Result<Vec<u8>, Error> {
    if let Some(text) = &config.look_for_text {
        return Ok(text.as_bytes().to_vec());
    }

    let body = probe
        .fetch_reference(config.timeout)
        .await
        .map_err(Error::Reference)?;
    info!("fetched {} bytes from {}", body.len(), probe.reference_url());
    Ok(body)
}

/// Probes one target. Probe failures are recorded, never returned.
pub async fn check_target(ctx: Arc<ScanContext>, target: Ipv4Addr) -> Result<(), Error> {
    let address = target.to_string();
    ctx.checked_log.append_line(&address);

    match ctx.probe.probe(target, &ctx.host, ctx.timeout).await {
        Err(err) => {
            debug!("{}: {}", address, err);
            let record = ErrorRecord {
                target,
                message: err.to_string(),
            };
            // The flusher outlives every task, so this only fails if it panicked.
            if ctx.errors.send(record).await.is_err() {
                warn!("{}: error flusher is gone: {}", address, err);
            }
            ctx.counters.record_errored();
        }
        Ok(body) if contains_bytes(&body, &ctx.expected) => {
            info!("{}: response matches", address);
            ctx.counters.record_found();
            ctx.found_log.append_line(&address);
        }
        Ok(_) => ctx.counters.record_checked(),
    }

    Ok(())
}

/// Submits one task per target, in order. Stops at the first scheduling
/// failure; tasks already submitted keep running.
pub async fn produce(
    pool: Arc<WorkerPool>,
    ctx: Arc<ScanContext>,
    targets: Vec<Ipv4Addr>,
) -> Result<(), Error> {
    for target in targets {
        pool.submit(check_target(ctx.clone(), target)).await?;
    }

    debug!("producer done");
    Ok(())
}

/// Runs a whole scan: reporters, producer and workers.
///
/// `cancel` is the run's lifetime; cancelling it stops the producer at its
/// next slot wait. Tasks already running finish on their own, bounded by the
/// request timeout. Reporters run on their own token, which is cancelled only
/// once every task has exited, so their final round sees all outcomes.
pub async fn run_scan(
    config: ScanConfig,
    probe: Arc<dyn Probe>,
    expected: Vec<u8>,
    artifacts: &Artifacts,
    cancel: CancellationToken,
) -> Result<ScanReport, Error> {
    let started = Instant::now();
    let grace = config.grace_period();
    let pool = Arc::new(WorkerPool::new(config.workers, cancel.child_token())?);

    let counters = Arc::new(ScanCounters::new(config.targets.len() as u64));
    let (errors_tx, errors_rx) = error_queue(config.workers);

    let flusher = ErrorFlusher::new(errors_rx, artifacts.errors.clone(), config.drain_window);
    let reporter = ProgressReporter::new(counters.clone(), artifacts.progress.clone());
    let reporters_done = CancellationToken::new();
    let reporters = vec![
        tokio::spawn(periodic(flusher, reporters_done.clone(), config.interval)),
        tokio::spawn(periodic(reporter, reporters_done.clone(), config.interval)),
    ];

    let ctx = Arc::new(ScanContext {
        probe,
        host: config.host,
        timeout: config.timeout,
        expected,
        counters: counters.clone(),
        checked_log: artifacts.checked.clone(),
        found_log: artifacts.found.clone(),
        errors: errors_tx,
    });

    info!(
        "scanning {} IPs with {} workers",
        counters.total(),
        pool.capacity()
    );
    pool.schedule(produce(pool.clone(), ctx, config.targets));

    let result = pool.wait().await;
    reporters_done.cancel();

    match tokio::time::timeout(grace, join_all(reporters)).await {
        Ok(joined) => {
            for joined in joined {
                if let Err(err) = joined {
                    warn!("reporter task failed: {}", err);
                }
            }
        }
        Err(_) => warn!("reporters did not finish within {:?}", grace),
    }

    result?;

    Ok(ScanReport {
        progress: counters.snapshot(),
        cancelled: cancel.is_cancelled(),
        elapsed: started.elapsed(),
    })
}
