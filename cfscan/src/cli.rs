use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use cfscan::{
    ranges, run_scan, scan::desired_response, Artifacts, Error, ReqwestProbe, ScanConfig,
    ScanOptions,
};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

pub fn targets(ips: &str) -> Result<()> {
    let targets = ranges::parse_ranges(ips)?;
    for target in targets {
        println!("{}", target);
    }
    Ok(())
}

pub fn scan(options: ScanOptions) -> Result<()> {
    let config = ScanConfig::from_options(options)?;
    println!("{} IPs to be checked", config.targets.len());

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    let scan_start = Instant::now();
    let report = runtime.block_on(async move {
        let probe = ReqwestProbe::new(config.reference_url.clone(), config.port)?;
        let expected = desired_response(&config, &probe).await?;

        let artifacts = Artifacts::create(&config.output_dir, &config.prefix)?;
        artifacts.write_reference(&expected)?;
        info!("writing results to {}_*", config.output_dir.join(&config.prefix).display());

        let cancel = CancellationToken::new();
        let on_signal = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("interrupted, waiting for in-flight requests");
                on_signal.cancel();
            }
        });

        run_scan(config, Arc::new(probe), expected, &artifacts, cancel).await
    });
    let scan_duration = scan_start.elapsed();

    let report = match report {
        Ok(report) => report,
        Err(err @ Error::Cancelled) => {
            warn!("scan stopped early after {:?}", scan_duration);
            return Err(err.into());
        }
        Err(err) => return Err(err.into()),
    };

    if report.cancelled {
        warn!("scan interrupted after every IP was submitted");
    }
    info!("Scan completed in {:?}", report.elapsed);
    println!(
        "checked: {}, errored: {}, found: {}, left: {}",
        report.progress.checked, report.progress.errored, report.progress.found, report.progress.left
    );

    Ok(())
}
