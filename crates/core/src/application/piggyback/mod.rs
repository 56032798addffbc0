// Piggyback Service - Core use cases for the piggyback freshness cache

pub mod cleanup;
pub mod raw_data;
pub mod store;
pub mod topology;

pub use cleanup::CleanupStats;
pub use store::render_payload;

use crate::domain::{CacheAgeSetting, HostName, MaxAge, RawDataInfo};
use crate::error::Result;
use crate::port::{PiggybackRepository, TimeProvider};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

/// Piggyback Service
///
/// Stateless facade over the repository: every call re-reads the store, so
/// the filesystem stays the single source of truth.
pub struct PiggybackService {
    repo: Arc<dyn PiggybackRepository>,
    time_provider: Arc<dyn TimeProvider>,
    default_max_age: Duration,
}

impl PiggybackService {
    /// Create a new service
    ///
    /// # Arguments
    /// * `repo` - Piggyback repository
    /// * `time_provider` - Clock used to compute payload ages
    /// * `default_max_age` - Process-wide maximum payload age for `CacheAgeSetting::UseDefault`
    pub fn new(
        repo: Arc<dyn PiggybackRepository>,
        time_provider: Arc<dyn TimeProvider>,
        default_max_age: Duration,
    ) -> Self {
        Self {
            repo,
            time_provider,
            default_max_age,
        }
    }

    pub fn default_max_age(&self) -> Duration {
        self.default_max_age
    }

    fn resolve(&self, setting: CacheAgeSetting) -> MaxAge {
        setting.resolve(self.default_max_age)
    }

    /// Store payload lines per target for `source` and stamp the source
    pub async fn store<I, T, L, S>(&self, source: &str, payloads: I) -> Result<()>
    where
        I: IntoIterator<Item = (T, L)>,
        T: Into<HostName>,
        L: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let payloads = payloads
            .into_iter()
            .map(|(target, lines)| (target.into(), lines.into_iter().map(Into::into).collect()))
            .collect();
        store::execute(self.repo.as_ref(), source, payloads).await
    }

    /// Classified raw data for a target host
    pub async fn get_raw_data(
        &self,
        target: &str,
        setting: CacheAgeSetting,
    ) -> Result<Vec<RawDataInfo>> {
        raw_data::get_raw_data(
            self.repo.as_ref(),
            self.time_provider.as_ref(),
            target,
            self.resolve(setting),
        )
        .await
    }

    /// True if any piggyback file exists for the target, fresh or not
    pub async fn has_raw_data(&self, target: &str) -> Result<bool> {
        raw_data::has_raw_data(self.repo.as_ref(), target).await
    }

    /// Source hosts that deposited data for the target
    pub async fn get_source_hostnames(&self, target: &str) -> Result<Vec<HostName>> {
        raw_data::get_source_hostnames(self.repo.as_ref(), target).await
    }

    /// All (source, target) pairs whose source is still sending
    pub async fn get_source_and_target_hosts(
        &self,
        setting: CacheAgeSetting,
    ) -> Result<BTreeSet<(HostName, HostName)>> {
        topology::get_source_and_target_hosts(
            self.repo.as_ref(),
            self.time_provider.as_ref(),
            self.resolve(setting),
        )
        .await
    }

    /// Remove a source's liveness stamp
    pub async fn remove_source_status_file(&self, source: &str) -> Result<bool> {
        cleanup::remove_source_status_file(self.repo.as_ref(), source).await
    }

    /// Remove outdated stamps, payload files and empty target directories
    pub async fn cleanup_piggyback_files(&self, setting: CacheAgeSetting) -> Result<CleanupStats> {
        cleanup::cleanup_piggyback_files(
            self.repo.as_ref(),
            self.time_provider.as_ref(),
            self.resolve(setting),
        )
        .await
    }
}
