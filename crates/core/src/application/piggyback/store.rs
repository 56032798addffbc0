// Store Use Case: deposit a source's payloads and stamp its liveness

use crate::domain::{validate_host_name, HostName};
use crate::error::Result;
use crate::port::PiggybackRepository;
use tracing::info;

/// Render payload lines as stored on disk: newline-joined, newline-terminated
pub fn render_payload<I, S>(lines: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out = String::new();
    for line in lines {
        out.push_str(line.as_ref());
        out.push('\n');
    }
    if out.is_empty() {
        out.push('\n');
    }
    out
}

/// Execute store use case
///
/// # Arguments
///
/// * `repo` - Piggyback repository
/// * `source` - Source host that collected the data
/// * `payloads` - Payload lines per target host (may be empty; the source is stamped anyway)
pub async fn execute(
    repo: &dyn PiggybackRepository,
    source: &str,
    payloads: Vec<(HostName, Vec<String>)>,
) -> Result<()> {
    validate_host_name(source)?;
    for (target, _) in &payloads {
        validate_host_name(target)?;
    }

    let target_count = payloads.len();
    let rendered: Vec<(HostName, String)> = payloads
        .into_iter()
        .map(|(target, lines)| (target, render_payload(&lines)))
        .collect();

    repo.store_payloads(source, rendered).await?;

    info!(source = %source, targets = target_count, "Stored piggyback data");

    Ok(())
}
