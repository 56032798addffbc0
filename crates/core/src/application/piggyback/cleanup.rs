// Housekeeping Use Cases: liveness stamp removal and outdated file cleanup

use super::raw_data::classify_target;
use crate::domain::{validate_host_name, MaxAge};
use crate::error::Result;
use crate::port::{PiggybackRepository, TimeProvider};
use serde::Serialize;
use tracing::{debug, info};

/// What a cleanup pass removed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CleanupStats {
    pub removed_source_statuses: usize,
    pub removed_payload_files: usize,
    pub removed_target_dirs: usize,
}

/// Remove the liveness stamp of a source. Payload files stay in place.
pub async fn remove_source_status_file(
    repo: &dyn PiggybackRepository,
    source: &str,
) -> Result<bool> {
    validate_host_name(source)?;

    let removed = repo.remove_source_status(source).await?;
    if removed {
        info!(source = %source, "Removed piggyback source status");
    }

    Ok(removed)
}

/// Remove outdated piggyback state:
///
/// 1. liveness stamps older than `max_age` (sources that went silent)
/// 2. payload files that do not classify as processed
/// 3. target directories left empty
pub async fn cleanup_piggyback_files(
    repo: &dyn PiggybackRepository,
    time_provider: &dyn TimeProvider,
    max_age: MaxAge,
) -> Result<CleanupStats> {
    let mut stats = CleanupStats::default();
    let now = time_provider.now();

    for status in repo.list_source_statuses().await? {
        if max_age.is_exceeded_by(now - status.modified)
            && repo.remove_source_status(&status.source).await?
        {
            debug!(source = %status.source, "Removed outdated source status");
            stats.removed_source_statuses += 1;
        }
    }

    for target in repo.list_target_hosts().await? {
        for (file, verdict) in classify_target(repo, time_provider, &target, max_age).await? {
            if verdict.outcome.is_success() {
                continue;
            }
            if repo.remove_payload_file(&file).await? {
                debug!(
                    path = %file.path.display(),
                    reason = %verdict.reason,
                    "Removed outdated piggyback file"
                );
                stats.removed_payload_files += 1;
            }
        }

        if repo.remove_target_if_empty(&target).await? {
            stats.removed_target_dirs += 1;
        }
    }

    info!(
        removed_source_statuses = stats.removed_source_statuses,
        removed_payload_files = stats.removed_payload_files,
        removed_target_dirs = stats.removed_target_dirs,
        "Piggyback cleanup completed"
    );

    Ok(stats)
}
