// Freshness classification of a single piggyback file
//
// Two clocks are compared: the payload file mtime and the mtime of the
// source's status file. Clock skew between the writing source and the
// reading host is not compensated.

use super::cache_age::MaxAge;
use super::host::HostName;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Outcome of classifying one piggyback file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Outcome {
    Processed,
    NotSending,
    NotUpdated,
    TooOld,
}

impl Outcome {
    pub fn is_success(self) -> bool {
        self == Outcome::Processed
    }

    /// Whether the (source, target) relationship is still known to exist.
    /// Stale data counts, a silent source does not.
    pub fn is_alive(self) -> bool {
        self != Outcome::NotSending
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::Processed => write!(f, "PROCESSED"),
            Outcome::NotSending => write!(f, "NOT_SENDING"),
            Outcome::NotUpdated => write!(f, "NOT_UPDATED"),
            Outcome::TooOld => write!(f, "TOO_OLD"),
        }
    }
}

/// Classification result with its operator-facing reason
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub outcome: Outcome,
    pub reason: String,
}

/// Classify a piggyback file. First matching rule wins:
///
/// 1. the source has no status file: not sending
/// 2. the status file is strictly newer than the payload: not updated
/// 3. the payload is older than `max_age`: too old
/// 4. otherwise: processed
pub fn classify(
    source: &str,
    payload_modified: DateTime<Utc>,
    status_modified: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    max_age: MaxAge,
) -> Verdict {
    let Some(status_modified) = status_modified else {
        return Verdict {
            outcome: Outcome::NotSending,
            reason: format!("Source '{}' not sending piggyback data", source),
        };
    };

    if status_modified > payload_modified {
        return Verdict {
            outcome: Outcome::NotUpdated,
            reason: format!("Piggyback file not updated by source '{}'", source),
        };
    }

    let age = now - payload_modified;
    if max_age.is_exceeded_by(age) {
        let age_secs = Duration::from_secs(age.num_seconds().max(0) as u64);
        return Verdict {
            outcome: Outcome::TooOld,
            reason: format!(
                "Piggyback file too old: {} (allowed: {})",
                humantime::format_duration(age_secs),
                max_age
            ),
        };
    }

    Verdict {
        outcome: Outcome::Processed,
        reason: format!("Successfully processed from source '{}'", source),
    }
}

/// Classified piggyback file as handed to the consumer of a target's data.
///
/// `raw_data` is filled in regardless of the outcome; callers decide whether
/// stale data is still worth surfacing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawDataInfo {
    pub source_hostname: HostName,
    pub file_path: PathBuf,
    pub successfully_processed: bool,
    pub reason: String,
    pub outcome: Outcome,
    pub raw_data: String,
}

impl RawDataInfo {
    pub fn new(
        source_hostname: impl Into<HostName>,
        file_path: impl Into<PathBuf>,
        verdict: Verdict,
        raw_data: String,
    ) -> Self {
        Self {
            source_hostname: source_hostname.into(),
            file_path: file_path.into(),
            successfully_processed: verdict.outcome.is_success(),
            reason: verdict.reason,
            outcome: verdict.outcome,
            raw_data,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const HOUR: MaxAge = MaxAge::Limit(Duration::from_secs(3600));

    fn t(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn test_not_sending_wins_regardless_of_age() {
        let verdict = classify("source1", t(0), None, t(0), HOUR);
        assert_eq!(verdict.outcome, Outcome::NotSending);
        assert_eq!(verdict.reason, "Source 'source1' not sending piggyback data");

        let verdict = classify("source1", t(0), None, t(100_000), MaxAge::Never);
        assert_eq!(verdict.outcome, Outcome::NotSending);
    }

    #[test]
    fn test_not_updated_when_status_is_newer() {
        let verdict = classify("source1", t(0), Some(t(10)), t(10), HOUR);
        assert_eq!(verdict.outcome, Outcome::NotUpdated);
        assert_eq!(verdict.reason, "Piggyback file not updated by source 'source1'");
    }

    #[test]
    fn test_not_updated_takes_precedence_over_too_old() {
        let verdict = classify("source1", t(0), Some(t(10)), t(10), MaxAge::Never);
        assert_eq!(verdict.outcome, Outcome::NotUpdated);
    }

    #[test]
    fn test_equal_timestamps_are_processed() {
        let verdict = classify("source1", t(0), Some(t(0)), t(5), HOUR);
        assert_eq!(verdict.outcome, Outcome::Processed);
        assert_eq!(verdict.reason, "Successfully processed from source 'source1'");
    }

    #[test]
    fn test_too_old() {
        let verdict = classify("source1", t(0), Some(t(0)), t(3605), HOUR);
        assert_eq!(verdict.outcome, Outcome::TooOld);
        assert_eq!(verdict.reason, "Piggyback file too old: 1h 5s (allowed: 1h)");
    }

    #[test]
    fn test_never_rejects_fresh_files() {
        let verdict = classify("source1", t(0), Some(t(0)), t(0), MaxAge::Never);
        assert_eq!(verdict.outcome, Outcome::TooOld);
        assert!(verdict.reason.starts_with("Piggyback file too old:"));
    }

    #[test]
    fn test_future_mtime_is_not_too_old() {
        let verdict = classify("source1", t(60), Some(t(60)), t(0), HOUR);
        assert_eq!(verdict.outcome, Outcome::Processed);
    }

    #[test]
    fn test_outcome_flags() {
        assert!(Outcome::Processed.is_success());
        assert!(!Outcome::TooOld.is_success());
        assert!(Outcome::TooOld.is_alive());
        assert!(Outcome::NotUpdated.is_alive());
        assert!(!Outcome::NotSending.is_alive());
    }

    #[test]
    fn test_raw_data_info_serialization() {
        let verdict = classify("source1", t(0), Some(t(0)), t(1), HOUR);
        let info = RawDataInfo::new(
            "source1",
            "/piggyback/host-a/source1",
            verdict,
            "<<<check_mk>>>\n".to_string(),
        );
        assert!(info.successfully_processed);

        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["outcome"], "PROCESSED");
        assert_eq!(json["source_hostname"], "source1");
    }
}
