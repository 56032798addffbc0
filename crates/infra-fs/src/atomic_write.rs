// Crash-safe file replacement: temp file in the target directory + rename

use piggyback_core::error::{AppError, Result};
use std::io::Write;
use std::path::Path;

/// Atomically replace `path` with `bytes`.
///
/// The temp file is created next to the destination (same filesystem) with
/// a dot-prefixed random name, so readers listing the directory skip it and
/// never observe a partially written payload.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = path
        .parent()
        .ok_or_else(|| AppError::Internal(format!("no parent directory: {}", path.display())))?;

    let mut temp = tempfile::NamedTempFile::new_in(dir).map_err(|e| AppError::storage(dir, e))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        temp.as_file()
            .set_permissions(std::fs::Permissions::from_mode(0o644))
            .map_err(|e| AppError::storage(temp.path(), e))?;
    }

    temp.write_all(bytes)
        .map_err(|e| AppError::storage(temp.path(), e))?;
    temp.as_file()
        .sync_all()
        .map_err(|e| AppError::storage(temp.path(), e))?;

    temp.persist(path)
        .map_err(|e| AppError::storage(path, e.error))?;

    Ok(())
}
