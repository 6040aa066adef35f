use anyhow::Result;
use args::Args;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod args;
mod cli;

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = Args::parse();

    match args {
        Args::Scan(options) => cli::scan(options)?,
        Args::Targets { ips } => cli::targets(&ips)?,
    }

    Ok(())
}
