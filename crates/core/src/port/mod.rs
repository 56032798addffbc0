// Port Layer - Interfaces for external dependencies

pub mod piggyback_repository;
pub mod time_provider;

// Re-exports
pub use piggyback_repository::{PayloadFile, PiggybackRepository, SourceStatus};
pub use time_provider::TimeProvider;
