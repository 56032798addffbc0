// Relationship scan: which sources currently feed which targets

use super::raw_data::classify_target;
use crate::domain::{HostName, MaxAge};
use crate::error::Result;
use crate::port::{PiggybackRepository, TimeProvider};
use std::collections::BTreeSet;
use tracing::debug;

/// Collect all (source, target) pairs whose source is still sending.
///
/// Stale relationships (too old, not updated) are kept; pairs whose source
/// has no liveness stamp are dropped.
pub async fn get_source_and_target_hosts(
    repo: &dyn PiggybackRepository,
    time_provider: &dyn TimeProvider,
    max_age: MaxAge,
) -> Result<BTreeSet<(HostName, HostName)>> {
    let mut pairs = BTreeSet::new();

    for target in repo.list_target_hosts().await? {
        for (file, verdict) in classify_target(repo, time_provider, &target, max_age).await? {
            if verdict.outcome.is_alive() {
                pairs.insert((file.source, target.clone()));
            }
        }
    }

    debug!(pairs = pairs.len(), "Piggyback relationships scanned");

    Ok(pairs)
}
