// Freshness evaluation of a target host's piggyback files

use crate::domain::{classify, validate_host_name, HostName, MaxAge, RawDataInfo, Verdict};
use crate::error::Result;
use crate::port::{PayloadFile, PiggybackRepository, TimeProvider};
use tracing::debug;

/// Classify every payload file of a target without reading its content
pub(crate) async fn classify_target(
    repo: &dyn PiggybackRepository,
    time_provider: &dyn TimeProvider,
    target: &str,
    max_age: MaxAge,
) -> Result<Vec<(PayloadFile, Verdict)>> {
    let files = repo.list_payload_files(target).await?;
    let now = time_provider.now();

    let mut classified = Vec::with_capacity(files.len());
    for file in files {
        let status = repo.source_status(&file.source).await?;
        let verdict = classify(
            &file.source,
            file.modified,
            status.map(|s| s.modified),
            now,
            max_age,
        );

        debug!(
            target_host = %target,
            source = %file.source,
            outcome = %verdict.outcome,
            "Piggyback file classified"
        );

        classified.push((file, verdict));
    }

    Ok(classified)
}

/// Classified raw data of all sources that deposited files for `target`
pub async fn get_raw_data(
    repo: &dyn PiggybackRepository,
    time_provider: &dyn TimeProvider,
    target: &str,
    max_age: MaxAge,
) -> Result<Vec<RawDataInfo>> {
    validate_host_name(target)?;

    let mut infos = Vec::new();
    for (file, verdict) in classify_target(repo, time_provider, target, max_age).await? {
        match repo.read_payload(&file).await? {
            Some(raw_data) => infos.push(RawDataInfo::new(file.source, file.path, verdict, raw_data)),
            None => {
                debug!(path = %file.path.display(), "Piggyback file vanished before read, skipping");
            }
        }
    }

    infos.sort_by(|a, b| a.source_hostname.cmp(&b.source_hostname));
    Ok(infos)
}

/// True if any source deposited a file for `target`, fresh or not
pub async fn has_raw_data(repo: &dyn PiggybackRepository, target: &str) -> Result<bool> {
    validate_host_name(target)?;
    Ok(!repo.list_payload_files(target).await?.is_empty())
}

/// Sources that deposited a file for `target`, fresh or not
pub async fn get_source_hostnames(
    repo: &dyn PiggybackRepository,
    target: &str,
) -> Result<Vec<HostName>> {
    validate_host_name(target)?;
    let mut sources: Vec<HostName> = repo
        .list_payload_files(target)
        .await?
        .into_iter()
        .map(|f| f.source)
        .collect();
    sources.sort();
    Ok(sources)
}
