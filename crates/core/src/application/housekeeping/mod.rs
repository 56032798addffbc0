// Housekeeping Scheduler
// Periodic cleanup of outdated piggyback files and silent sources

mod shutdown;

pub use shutdown::{shutdown_channel, ShutdownSender, ShutdownToken};

use crate::application::piggyback::{CleanupStats, PiggybackService};
use crate::domain::CacheAgeSetting;
use crate::error::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;
use tracing::{error, info};

/// Default interval between two cleanup passes (10 minutes)
pub const DEFAULT_HOUSEKEEPING_INTERVAL: Duration = Duration::from_secs(600);

/// Housekeeping scheduler
///
/// Runs `cleanup_piggyback_files` in the background until shutdown
pub struct HousekeepingScheduler {
    service: Arc<PiggybackService>,
    setting: CacheAgeSetting,
    every: Duration,
}

impl HousekeepingScheduler {
    /// Create a new housekeeping scheduler
    ///
    /// # Arguments
    /// * `service` - Piggyback service
    /// * `setting` - Cache-age setting applied by every pass
    /// * `every` - How often to run cleanup
    pub fn new(service: Arc<PiggybackService>, setting: CacheAgeSetting, every: Duration) -> Self {
        Self {
            service,
            setting,
            every,
        }
    }

    /// Run housekeeping loop (background task)
    ///
    /// The first pass runs immediately. Failed passes are logged and retried
    /// on the next tick.
    pub async fn run(self, mut shutdown: ShutdownToken) -> usize {
        info!(
            interval_secs = self.every.as_secs(),
            "Housekeeping scheduler started"
        );

        let mut tick = interval(self.every);
        let mut passes = 0;

        loop {
            tokio::select! {
                _ = tick.tick() => {}
                _ = shutdown.wait() => break,
            }

            match self.service.cleanup_piggyback_files(self.setting).await {
                Ok(stats) => {
                    info!(
                        removed_source_statuses = stats.removed_source_statuses,
                        removed_payload_files = stats.removed_payload_files,
                        removed_target_dirs = stats.removed_target_dirs,
                        "Scheduled housekeeping completed"
                    );
                }
                Err(e) => {
                    error!(error = ?e, "Scheduled housekeeping failed");
                }
            }
            passes += 1;
        }

        info!(passes = passes, "Housekeeping scheduler stopped");
        passes
    }

    /// Run housekeeping immediately (for manual trigger)
    pub async fn run_now(&self) -> Result<CleanupStats> {
        info!("Running manual housekeeping...");
        self.service.cleanup_piggyback_files(self.setting).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DEFAULT_MAX_CACHE_AGE;
    use crate::port::piggyback_repository::mocks::InMemoryPiggybackRepository;
    use crate::port::time_provider::mocks::FixedTimeProvider;
    use chrono::{TimeZone, Utc};

    fn scheduler() -> (HousekeepingScheduler, Arc<InMemoryPiggybackRepository>) {
        let clock = Arc::new(FixedTimeProvider::new(
            Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
        ));
        let repo = Arc::new(InMemoryPiggybackRepository::new(clock.clone()));
        let service = Arc::new(PiggybackService::new(
            repo.clone(),
            clock,
            DEFAULT_MAX_CACHE_AGE,
        ));
        let scheduler = HousekeepingScheduler::new(
            service,
            CacheAgeSetting::UseDefault,
            Duration::from_millis(10),
        );
        (scheduler, repo)
    }

    #[tokio::test]
    async fn test_run_now() {
        let (scheduler, repo) = scheduler();
        // payload without any stamp: source is not sending
        repo.put_payload(
            "host-a",
            "source1",
            "x\n",
            Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
        );

        let stats = scheduler.run_now().await.unwrap();
        assert_eq!(stats.removed_payload_files, 1);
        assert_eq!(stats.removed_target_dirs, 1);
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let (scheduler, _) = scheduler();
        let (tx, rx) = shutdown_channel();

        let handle = tokio::spawn(scheduler.run(rx));
        tokio::time::sleep(Duration::from_millis(50)).await;
        tx.shutdown();

        let passes = tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("scheduler did not stop")
            .unwrap();
        assert!(passes >= 1);
    }
}
