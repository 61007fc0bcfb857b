//! Background worker that periodically snapshots dirty indexes.

use crate::repo::IndexRepository;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{Instant, interval_at};

/// Single exporter loop. Only one worker is spawned per process, so
/// exports never run concurrently with each other.
pub struct SnapshotWorker {
    repo: Arc<IndexRepository>,
    interval: Duration,
}

impl SnapshotWorker {
    pub const fn new(repo: Arc<IndexRepository>, interval: Duration) -> Self {
        Self { repo, interval }
    }

    /// Tick until the shutdown signal flips, then export one last time so
    /// a clean shutdown loses nothing.
    ///
    /// Uses `interval_at` so the first tick fires a full interval after
    /// start; the startup import already matches the on-disk state.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = interval_at(Instant::now() + self.interval, self.interval);

        loop {
            tokio::select! {
                _ = ticker.tick() => self.export(),
                _ = shutdown.changed() => {
                    tracing::info!("Snapshot worker shutting down");
                    self.export();
                    return;
                }
            }
        }
    }

    fn export(&self) {
        match self.repo.export_dirty() {
            Ok(0) => tracing::trace!("No dirty indexes"),
            Ok(count) => tracing::info!(count, "Exported snapshots"),
            Err(err) => tracing::warn!(error = %err, "Snapshot sweep reported an error"),
        }
    }
}
