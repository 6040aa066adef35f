use std::net::Ipv4Addr;
use std::path::PathBuf;
use std::time::Duration;

use url::Url;

use crate::{ranges, Error};

/// Stands in for a missing `--url`; only its root path reaches the targets.
const ROOT_URL: &str = "http://localhost/";

/// Raw scan options as typed on the command line.
#[derive(clap::Args, Debug, Clone)]
pub struct ScanOptions {
    /// Comma-separated list of IP ranges (CIDR, hyphen range or single IP)
    #[arg(long)]
    pub ips: String,

    /// Host header to use in requests to IPs
    #[arg(long)]
    pub host: String,

    /// Reference URL to compare against; its path and query are requested
    /// on every IP. Optional when --look-for-text is given
    #[arg(long)]
    pub url: Option<String>,

    /// Text to look for instead of the reference URL's body
    #[arg(long)]
    pub look_for_text: Option<String>,

    /// Request timeout in seconds
    #[arg(long, default_value_t = 10)]
    pub timeout: u64,

    /// Number of concurrent workers
    #[arg(long, default_value_t = 50)]
    pub workers: usize,

    /// Port probed on every IP
    #[arg(long, default_value_t = 80)]
    pub port: u16,

    /// Seconds between error log flushes and progress snapshots
    #[arg(long, default_value_t = 10)]
    pub interval: u64,

    /// Directory receiving the output files
    #[arg(long, default_value = ".")]
    pub output_dir: PathBuf,

    /// Output file prefix [default: cf_<timestamp>]
    #[arg(long)]
    pub prefix: Option<String>,
}

/// Validated scan settings.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    pub targets: Vec<Ipv4Addr>,
    pub host: String,
    pub reference_url: Url,
    pub look_for_text: Option<String>,
    pub timeout: Duration,
    pub workers: usize,
    pub port: u16,
    pub interval: Duration,
    /// How long one error flush keeps waiting for records.
    pub drain_window: Duration,
    pub output_dir: PathBuf,
    pub prefix: String,
}

impl ScanConfig {
    pub fn from_options(options: ScanOptions) -> Result<Self, Error> {
        if options.host.trim().is_empty() {
            return Err(Error::EmptyHost);
        }
        if options.ips.trim().is_empty() {
            return Err(Error::EmptyRanges);
        }
        let look_for_text = options.look_for_text.filter(|text| !text.is_empty());
        let reference_url = match options.url.as_deref().map(str::trim) {
            Some(url) if !url.is_empty() => Url::parse(url)?,
            _ if look_for_text.is_some() => Url::parse(ROOT_URL)?,
            _ => return Err(Error::MissingUrl),
        };
        if options.workers == 0 {
            return Err(Error::InvalidCapacity);
        }
        if options.timeout == 0 {
            return Err(Error::InvalidTimeout);
        }

        let targets = ranges::parse_ranges(&options.ips)?;
        if targets.is_empty() {
            return Err(Error::NoTargets);
        }

        let interval = Duration::from_secs(options.interval.max(1));

        Ok(ScanConfig {
            targets,
            host: options.host,
            reference_url,
            look_for_text,
            timeout: Duration::from_secs(options.timeout),
            workers: options.workers,
            port: options.port,
            interval,
            drain_window: interval / 2,
            output_dir: options.output_dir,
            prefix: options
                .prefix
                .unwrap_or_else(crate::artifacts::default_prefix),
        })
    }

    /// Extra time allowed after the run for the reporters' final writes.
    pub fn grace_period(&self) -> Duration {
        self.interval + Duration::from_secs(1)
    }
}
