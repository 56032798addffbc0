// Cache-age settings: how old a piggyback file may get before it is discarded

use super::error::{DomainError, Result};
use super::host::HostName;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Default maximum age of a piggyback file (1 hour)
pub const DEFAULT_MAX_CACHE_AGE: Duration = Duration::from_secs(3600);

/// Per-call cache-age setting
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheAgeSetting {
    /// No override for this target, use the process-wide default
    #[default]
    UseDefault,
    /// Maximum allowed payload age in seconds
    MaxAge(u64),
    /// Never accept any payload, however recent
    Never,
}

impl CacheAgeSetting {
    /// Build a setting from a signed configuration value (negative = never)
    pub fn from_seconds(secs: i64) -> Self {
        if secs < 0 {
            CacheAgeSetting::Never
        } else {
            CacheAgeSetting::MaxAge(secs as u64)
        }
    }

    /// Resolve against the process-wide default
    pub fn resolve(self, default_max_age: Duration) -> MaxAge {
        match self {
            CacheAgeSetting::UseDefault => MaxAge::Limit(default_max_age),
            CacheAgeSetting::MaxAge(secs) => MaxAge::Limit(Duration::from_secs(secs)),
            CacheAgeSetting::Never => MaxAge::Never,
        }
    }
}

impl FromStr for CacheAgeSetting {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("default") {
            return Ok(CacheAgeSetting::UseDefault);
        }
        s.parse::<i64>()
            .map(CacheAgeSetting::from_seconds)
            .map_err(|_| DomainError::InvalidCacheAge(format!("not a number of seconds: {s:?}")))
    }
}

/// Effective maximum age after resolving a [`CacheAgeSetting`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaxAge {
    Limit(Duration),
    Never,
}

impl MaxAge {
    /// True if a payload of the given age must be rejected.
    ///
    /// Negative ages (file mtime ahead of our clock) never exceed a limit.
    pub fn is_exceeded_by(&self, age: chrono::Duration) -> bool {
        match self {
            MaxAge::Never => true,
            MaxAge::Limit(limit) => match age.to_std() {
                Ok(age) => age > *limit,
                Err(_) => false,
            },
        }
    }
}

impl fmt::Display for MaxAge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MaxAge::Limit(limit) => write!(f, "{}", humantime::format_duration(*limit)),
            MaxAge::Never => write!(f, "none"),
        }
    }
}

/// Cache-age configuration: process-wide default plus per-target overrides
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheAgeConfig {
    pub default_max_age: Duration,
    pub overrides: HashMap<HostName, CacheAgeSetting>,
}

impl Default for CacheAgeConfig {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CACHE_AGE)
    }
}

impl CacheAgeConfig {
    pub fn new(default_max_age: Duration) -> Self {
        Self {
            default_max_age,
            overrides: HashMap::new(),
        }
    }

    pub fn with_override(mut self, target: impl Into<HostName>, setting: CacheAgeSetting) -> Self {
        self.overrides.insert(target.into(), setting);
        self
    }

    /// Setting to pass into a read operation for this target
    pub fn setting_for(&self, target: &str) -> CacheAgeSetting {
        self.overrides
            .get(target)
            .copied()
            .unwrap_or(CacheAgeSetting::UseDefault)
    }

    /// Parse `host=secs` pairs separated by commas (e.g. `host-a=600,host-b=-1`)
    pub fn parse_overrides(spec: &str) -> Result<HashMap<HostName, CacheAgeSetting>> {
        let mut overrides = HashMap::new();

        for pair in spec.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let (host, secs) = pair.split_once('=').ok_or_else(|| {
                DomainError::InvalidCacheAge(format!("expected host=seconds, got {pair:?}"))
            })?;
            let host = host.trim();
            super::host::validate_host_name(host)?;
            overrides.insert(host.to_string(), secs.parse()?);
        }

        Ok(overrides)
    }
}
