// Host names used as path components of the piggyback tree

use super::error::{DomainError, Result};

/// Host name (source or target)
pub type HostName = String;

/// Check that a host name can safely be used as a single path component.
///
/// Names starting with a dot are rejected because the store reserves them
/// for in-flight temporary files, and every read path skips them.
pub fn validate_host_name(name: &str) -> Result<()> {
    let reason = if name.is_empty() {
        "must not be empty"
    } else if name == "." || name == ".." {
        "must not be a relative path component"
    } else if name.starts_with('.') {
        "must not start with '.'"
    } else if name.contains('/') || name.contains('\\') {
        "must not contain path separators"
    } else if name.contains('\0') {
        "must not contain NUL bytes"
    } else {
        return Ok(());
    };

    Err(DomainError::InvalidHostName {
        name: name.to_string(),
        reason,
    })
}

/// True for directory entries the store never created itself (temp files etc.)
pub fn is_hidden_entry(name: &str) -> bool {
    name.starts_with('.')
}
