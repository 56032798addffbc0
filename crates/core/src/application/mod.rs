// Application Layer - Use Cases and Business Logic

pub mod housekeeping;
pub mod piggyback;

// Re-exports
pub use housekeeping::{shutdown_channel, HousekeepingScheduler, ShutdownSender, ShutdownToken};
pub use piggyback::{CleanupStats, PiggybackService};
