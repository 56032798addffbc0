// Domain Layer - Pure business logic and entities

pub mod cache_age;
pub mod classification;
pub mod error;
pub mod host;

// Re-exports
pub use cache_age::{CacheAgeConfig, CacheAgeSetting, MaxAge, DEFAULT_MAX_CACHE_AGE};
pub use classification::{classify, Outcome, RawDataInfo, Verdict};
pub use error::DomainError;
pub use host::{is_hidden_entry, validate_host_name, HostName};
