use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{info, instrument};

use crate::processor::{ProcessStats, QueueProcessor};

/// Background driver that runs upload passes on a fixed interval.
///
/// The processor itself never schedules anything; this is one possible
/// caller. A pass in progress always runs to completion before shutdown is
/// observed.
pub struct UploadWorker {
    processor: QueueProcessor,
    shutdown: watch::Receiver<bool>,
    upload_interval: Duration,
    stats: WorkerStats,
}

/// Statistics accumulated across all passes of a worker.
#[derive(Debug, Clone, Default)]
pub struct WorkerStats {
    pub passes: u64,
    pub totals: ProcessStats,
}

impl UploadWorker {
    pub fn new(
        processor: QueueProcessor,
        upload_interval: Duration,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            processor,
            shutdown,
            upload_interval,
            stats: WorkerStats::default(),
        }
    }

    /// Run passes until shutdown is signalled.
    ///
    /// The first pass starts immediately. Returns the accumulated statistics.
    #[instrument(skip(self))]
    pub async fn run(mut self) -> WorkerStats {
        info!("Upload worker started");
        let mut ticker = interval(self.upload_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let pass = self.processor.process().await;
                    self.stats.passes += 1;
                    self.stats.totals.merge(&pass);
                }
                changed = self.shutdown.changed() => {
                    if changed.is_err() || *self.shutdown.borrow() {
                        info!("Shutdown signal received");
                        break;
                    }
                }
            }
        }

        info!(
            "Upload worker stopped after {} passes: {} uploaded, {} discarded, {} retained",
            self.stats.passes,
            self.stats.totals.uploaded,
            self.stats.totals.client_errors + self.stats.totals.malformed_names,
            self.stats.totals.recoverable_failures
        );
        self.stats
    }
}
