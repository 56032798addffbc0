// Domain Error Types

use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum DomainError {
    #[error("Invalid host name {name:?}: {reason}")]
    InvalidHostName { name: String, reason: &'static str },

    #[error("Invalid cache age setting: {0}")]
    InvalidCacheAge(String),
}

pub type Result<T> = std::result::Result<T, DomainError>;
