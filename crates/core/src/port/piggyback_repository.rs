// Piggyback Repository Port (Interface)

use crate::domain::HostName;
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::PathBuf;

/// A payload file deposited by `source` for `target`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadFile {
    pub target: HostName,
    pub source: HostName,
    pub path: PathBuf,
    pub modified: DateTime<Utc>,
}

/// Liveness stamp of a source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceStatus {
    pub source: HostName,
    pub path: PathBuf,
    pub modified: DateTime<Utc>,
}

/// Storage interface for piggyback payloads and source liveness stamps.
///
/// Read methods treat entries that vanish mid-operation as absent. Only
/// genuine I/O failures are returned as errors.
#[async_trait]
pub trait PiggybackRepository: Send + Sync {
    /// List payload files of a target (no target directory: empty list)
    async fn list_payload_files(&self, target: &str) -> Result<Vec<PayloadFile>>;

    /// List all target hosts that have a directory in the store
    async fn list_target_hosts(&self) -> Result<Vec<HostName>>;

    /// Read a payload file (None if it disappeared since listing)
    async fn read_payload(&self, file: &PayloadFile) -> Result<Option<String>>;

    /// Look up the liveness stamp of a source
    async fn source_status(&self, source: &str) -> Result<Option<SourceStatus>>;

    /// List all liveness stamps
    async fn list_source_statuses(&self) -> Result<Vec<SourceStatus>>;

    /// Atomically replace the payload file of every (target, content) pair,
    /// then stamp the source.
    ///
    /// Payloads written by this call end up with the same mtime as the stamp,
    /// and the stamp becomes visible only after all payloads are in place.
    /// The stamp is written even if `payloads` is empty.
    async fn store_payloads(&self, source: &str, payloads: Vec<(HostName, String)>) -> Result<()>;

    /// Remove the liveness stamp of a source (false if there was none)
    async fn remove_source_status(&self, source: &str) -> Result<bool>;

    /// Remove a payload file (false if it was already gone)
    async fn remove_payload_file(&self, file: &PayloadFile) -> Result<bool>;

    /// Remove a target directory if it holds no payload files anymore
    async fn remove_target_if_empty(&self, target: &str) -> Result<bool>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use crate::port::TimeProvider;
    use std::collections::{BTreeMap, BTreeSet};
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct State {
        targets: BTreeSet<HostName>,
        payloads: BTreeMap<(HostName, HostName), (String, DateTime<Utc>)>,
        statuses: BTreeMap<HostName, DateTime<Utc>>,
    }

    /// In-memory repository; mtimes come from the injected clock
    pub struct InMemoryPiggybackRepository {
        state: Mutex<State>,
        time_provider: Arc<dyn TimeProvider>,
    }

    impl InMemoryPiggybackRepository {
        pub fn new(time_provider: Arc<dyn TimeProvider>) -> Self {
            Self {
                state: Mutex::new(State::default()),
                time_provider,
            }
        }

        /// Place a payload with an explicit mtime, bypassing the stamp
        pub fn put_payload(&self, target: &str, source: &str, content: &str, modified: DateTime<Utc>) {
            let mut state = self.state.lock().unwrap();
            state.targets.insert(target.to_string());
            state.payloads.insert(
                (target.to_string(), source.to_string()),
                (content.to_string(), modified),
            );
        }

        pub fn put_status(&self, source: &str, modified: DateTime<Utc>) {
            let mut state = self.state.lock().unwrap();
            state.statuses.insert(source.to_string(), modified);
        }

        pub fn has_target(&self, target: &str) -> bool {
            self.state.lock().unwrap().targets.contains(target)
        }

        fn path(target: &str, source: &str) -> PathBuf {
            PathBuf::from(format!("/piggyback/{}/{}", target, source))
        }

        fn status_path(source: &str) -> PathBuf {
            PathBuf::from(format!("/piggyback_sources/{}", source))
        }
    }

    #[async_trait]
    impl PiggybackRepository for InMemoryPiggybackRepository {
        async fn list_payload_files(&self, target: &str) -> Result<Vec<PayloadFile>> {
            let state = self.state.lock().unwrap();
            Ok(state
                .payloads
                .iter()
                .filter(|((t, _), _)| t == target)
                .map(|((t, s), (_, modified))| PayloadFile {
                    target: t.clone(),
                    source: s.clone(),
                    path: Self::path(t, s),
                    modified: *modified,
                })
                .collect())
        }

        async fn list_target_hosts(&self) -> Result<Vec<HostName>> {
            Ok(self.state.lock().unwrap().targets.iter().cloned().collect())
        }

        async fn read_payload(&self, file: &PayloadFile) -> Result<Option<String>> {
            let state = self.state.lock().unwrap();
            Ok(state
                .payloads
                .get(&(file.target.clone(), file.source.clone()))
                .map(|(content, _)| content.clone()))
        }

        async fn source_status(&self, source: &str) -> Result<Option<SourceStatus>> {
            let state = self.state.lock().unwrap();
            Ok(state.statuses.get(source).map(|modified| SourceStatus {
                source: source.to_string(),
                path: Self::status_path(source),
                modified: *modified,
            }))
        }

        async fn list_source_statuses(&self) -> Result<Vec<SourceStatus>> {
            let state = self.state.lock().unwrap();
            Ok(state
                .statuses
                .iter()
                .map(|(source, modified)| SourceStatus {
                    source: source.clone(),
                    path: Self::status_path(source),
                    modified: *modified,
                })
                .collect())
        }

        async fn store_payloads(&self, source: &str, payloads: Vec<(HostName, String)>) -> Result<()> {
            let now = self.time_provider.now();
            let mut state = self.state.lock().unwrap();
            for (target, content) in payloads {
                state.targets.insert(target.clone());
                state
                    .payloads
                    .insert((target, source.to_string()), (content, now));
            }
            state.statuses.insert(source.to_string(), now);
            Ok(())
        }

        async fn remove_source_status(&self, source: &str) -> Result<bool> {
            Ok(self.state.lock().unwrap().statuses.remove(source).is_some())
        }

        async fn remove_payload_file(&self, file: &PayloadFile) -> Result<bool> {
            let mut state = self.state.lock().unwrap();
            Ok(state
                .payloads
                .remove(&(file.target.clone(), file.source.clone()))
                .is_some())
        }

        async fn remove_target_if_empty(&self, target: &str) -> Result<bool> {
            let mut state = self.state.lock().unwrap();
            if state.payloads.keys().any(|(t, _)| t == target) {
                return Ok(false);
            }
            Ok(state.targets.remove(target))
        }
    }
}
