use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tracing::info;

use panda_tune::{Support, Tunable, new_io_tune_tuner};

/// Benchmark the data directories and write the I/O properties file
#[derive(clap::Parser, Clone, Debug)]
#[clap(author, version, about, long_about = None)]
struct IoTuneCli {
    /// Directories to evaluate
    #[clap(
        long = "directories",
        value_delimiter = ',',
        default_value = "/var/lib/redpanda/data"
    )]
    directories: Vec<PathBuf>,
    /// Output I/O properties file
    #[clap(long, default_value = "/etc/redpanda/io-config.yaml")]
    config_file: PathBuf,
    /// Benchmark duration in seconds
    #[clap(long, default_value_t = 30)]
    duration: u64,
    /// Process timeout in seconds
    #[clap(long, default_value_t = 3600)]
    timeout: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    panda_tune::init_tracing("info");
    let cli = IoTuneCli::parse();

    let tuner = new_io_tune_tuner(
        cli.directories,
        cli.config_file,
        Duration::from_secs(cli.duration),
        Duration::from_secs(cli.timeout),
    );
    if let Support::Unsupported(reason) = tuner.check_if_supported() {
        info!("Skipping I/O tuning: {}", reason);
        return Ok(());
    }

    let res = tuner.tune().await;
    if let Some(e) = res.error() {
        anyhow::bail!("I/O tuning failed: {e}");
    }
    info!("I/O tuning finished");
    Ok(())
}
