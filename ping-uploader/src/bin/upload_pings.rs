//! Drain a pending pings directory from the command line.
//!
//! Runs a single upload pass by default, or keeps running passes with
//! `--watch` until interrupted.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use directories::ProjectDirs;
use ping_uploader::logging::{init_logging, LoggingConfig};
use ping_uploader::{CorruptFilePolicy, QueueProcessor, UploadWorker, UploaderConfig};
use tokio::sync::watch;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Collection endpoint base URL
    #[arg(long)]
    endpoint: String,

    /// Data directory containing `pending_pings`
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Value for the `X-Debug-ID` header
    #[arg(long)]
    debug_view_tag: Option<String>,

    /// Log every ping before it is sent
    #[arg(long)]
    log_pings: bool,

    /// Move undecodable files to `quarantined_pings` instead of deleting them
    #[arg(long)]
    quarantine: bool,

    /// Number of pings uploaded concurrently
    #[arg(long, default_value_t = 1)]
    concurrency: usize,

    /// Keep running passes every N seconds
    #[arg(long)]
    watch: Option<u64>,

    /// Emit logs as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let logging = if args.log_pings {
        LoggingConfig::development()
    } else {
        LoggingConfig::default()
    };
    init_logging(logging.with_json_format(args.json))?;

    let data_dir = match args.data_dir {
        Some(dir) => dir,
        None => ProjectDirs::from("org", "telemetry", "ping-uploader")
            .map(|dirs| dirs.data_dir().to_path_buf())
            .ok_or("Could not determine data directory; pass --data-dir")?,
    };

    let mut config = UploaderConfig::new(&data_dir, args.endpoint)?
        .with_log_pings(args.log_pings)
        .with_max_concurrent_uploads(args.concurrency);
    if let Some(tag) = args.debug_view_tag {
        config = config.with_debug_view_tag(tag)?;
    }
    if args.quarantine {
        config = config.with_corrupt_file_policy(CorruptFilePolicy::Quarantine);
    }

    let processor = QueueProcessor::with_http(config)?;

    match args.watch {
        None => {
            let stats = processor.process().await;
            println!(
                "{} uploaded, {} rejected, {} kept for retry, {} could not be deleted",
                stats.uploaded, stats.client_errors, stats.recoverable_failures, stats.delete_failures
            );
        }
        Some(secs) => {
            let (shutdown_tx, shutdown_rx) = watch::channel(false);
            let worker = UploadWorker::new(processor, Duration::from_secs(secs), shutdown_rx);
            let handle = tokio::spawn(worker.run());

            tokio::signal::ctrl_c().await?;
            shutdown_tx.send(true)?;
            let stats = handle.await?;
            println!(
                "{} passes, {} uploaded, {} rejected",
                stats.passes, stats.totals.uploaded, stats.totals.client_errors
            );
        }
    }

    Ok(())
}
