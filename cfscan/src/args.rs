use clap::Parser;
use cfscan::ScanOptions;

#[derive(Parser, Debug)]
#[command(author, version, about = "Find origin servers hidden behind a CDN", long_about = None)]
pub enum Args {
    /// Probe every IP and record the ones serving the reference response
    Scan(ScanOptions),
    /// Print the expanded IP list without probing anything
    Targets {
        /// Comma-separated list of IP ranges (CIDR, hyphen range or single IP)
        #[arg(long)]
        ips: String,
    },
}
