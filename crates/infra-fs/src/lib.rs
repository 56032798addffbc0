// Piggyback Infrastructure - Filesystem Adapter
// Implements: PiggybackRepository over <piggyback-dir>/<target>/<source> + <source-dir>/<source>

mod atomic_write;
mod fs_repository;
mod layout;

pub use atomic_write::write_atomic;
pub use fs_repository::FsPiggybackRepository;
pub use layout::{FsLayout, DEFAULT_PIGGYBACK_DIR, DEFAULT_SOURCE_STATUS_DIR};
