use crate::services::staging::StagingArea;
use tokio::sync::watch;
use tokio::time::{Duration, sleep};

/// Periodically removes staging files that were never released, e.g. after a crash.
pub struct BackgroundWorker {
    staging: StagingArea,
    max_age: Duration,
    interval: Duration,
    shutdown: watch::Receiver<bool>,
}

impl BackgroundWorker {
    pub fn new(staging: StagingArea, max_age: Duration, shutdown: watch::Receiver<bool>) -> Self {
        Self {
            staging,
            max_age,
            // Check a few times per max_age, but not more than once a minute
            interval: (max_age / 4).max(Duration::from_secs(60)),
            shutdown,
        }
    }

    pub async fn run(mut self) {
        tracing::info!("🚀 Staging sweeper started (every {:?})", self.interval);

        // Leftovers from a previous run
        self.perform_cleanup().await;

        loop {
            tokio::select! {
                _ = self.shutdown.changed() => {
                    tracing::info!("🛑 Staging sweeper shutting down");
                    break;
                }
                _ = sleep(self.interval) => {
                    self.perform_cleanup().await;
                }
            }
        }
    }

    pub async fn perform_cleanup(&self) -> usize {
        match self.staging.sweep(self.max_age).await {
            Ok(0) => 0,
            Ok(removed) => {
                tracing::info!("🧹 Removed {} stale staging file(s)", removed);
                removed
            }
            Err(e) => {
                tracing::error!("Staging sweep failed: {}", e);
                0
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_worker_sweeps_and_stops_on_shutdown() {
        let dir = tempfile::tempdir().unwrap();
        let staging = StagingArea::for_destination(dir.path(), true);
        let root = staging.root().to_path_buf();
        std::mem::forget(staging.stage("orphan.txt", b"x").await.unwrap());

        let (tx, rx) = watch::channel(false);
        let worker = BackgroundWorker::new(staging, Duration::ZERO, rx);
        let handle = tokio::spawn(worker.run());

        // The startup sweep runs before the first select
        tokio::time::sleep(Duration::from_millis(100)).await;
        tx.send(true).unwrap();
        handle.await.unwrap();

        assert_eq!(std::fs::read_dir(root).unwrap().count(), 0);
    }
}
