//! Periodic label refresh
//!
//! The poller is the only owner of the snapshot writer. A failed cycle keeps
//! the previous snapshot, bumps the refresh error counter and is logged; it is
//! never fatal.

use prometheus::IntCounter;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::client::LabelSource;
use crate::error::{ExporterError, Result};
use crate::snapshot::SnapshotWriter;

pub struct LabelPoller {
    source: Arc<dyn LabelSource>,
    snapshot: SnapshotWriter,
    refresh_errors: IntCounter,
    period: Duration,
}

impl LabelPoller {
    /// Fails with a configuration error when `period` is zero
    pub fn new(
        source: Arc<dyn LabelSource>,
        snapshot: SnapshotWriter,
        refresh_errors: IntCounter,
        period: Duration,
    ) -> Result<Self> {
        if period.is_zero() {
            return Err(ExporterError::ConfigError(
                "refresh period must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            source,
            snapshot,
            refresh_errors,
            period,
        })
    }

    /// Run one refresh cycle, returning the number of labels now in the snapshot
    pub async fn refresh(&mut self) -> Result<usize> {
        match self.source.list_labels().await {
            Ok(labels) => {
                let count = labels.len();
                if count == 0 {
                    warn!("No labels found, label snapshot is now empty");
                } else {
                    debug!(labels = ?labels, "Fetched labels");
                }
                self.snapshot.replace(labels);
                Ok(count)
            }
            Err(e) => {
                self.refresh_errors.inc();
                warn!(
                    error = %e,
                    refresh_errors = self.refresh_errors.get(),
                    "Label refresh failed, keeping previous snapshot"
                );
                Err(e)
            }
        }
    }

    /// Refresh immediately, then once per period until `shutdown` is cancelled
    pub async fn run(mut self, shutdown: CancellationToken) {
        tokio::select! {
            biased;
            _ = shutdown.cancelled() => return,
            result = self.refresh() => log_refresh(result),
        }
        self.run_periodic(shutdown).await;
    }

    /// Refresh once per period, the first time one period from now
    ///
    /// For callers that already ran the initial [`refresh`](Self::refresh).
    pub async fn run_periodic(mut self, shutdown: CancellationToken) {
        let start = tokio::time::Instant::now() + self.period;
        let mut ticker = tokio::time::interval_at(start, self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(period = ?self.period, "Starting label refresh loop");

        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {}
            }

            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                result = self.refresh() => log_refresh(result),
            }
        }

        info!("Label refresh loop stopped");
    }
}

fn log_refresh(result: Result<usize>) {
    // Failures are logged by refresh itself
    if let Ok(count) = result {
        info!(labels = count, "Refreshed label snapshot");
    }
}
