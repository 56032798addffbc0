// Filesystem PiggybackRepository Implementation

use crate::atomic_write::write_atomic;
use crate::layout::FsLayout;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use filetime::FileTime;
use piggyback_core::domain::{is_hidden_entry, HostName};
use piggyback_core::error::{AppError, Result};
use piggyback_core::port::{PayloadFile, PiggybackRepository, SourceStatus};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Piggyback store on the local filesystem
pub struct FsPiggybackRepository {
    layout: FsLayout,
}

impl FsPiggybackRepository {
    pub fn new(layout: FsLayout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> &FsLayout {
        &self.layout
    }
}

/// A visible directory entry with its metadata
struct Entry {
    name: String,
    path: PathBuf,
    metadata: std::fs::Metadata,
}

/// List non-hidden entries of a directory.
///
/// A missing directory and entries that vanish while listing are not errors.
async fn list_dir(dir: &Path) -> Result<Vec<Entry>> {
    let mut read_dir = match tokio::fs::read_dir(dir).await {
        Ok(read_dir) => read_dir,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(AppError::storage(dir, e)),
    };

    let mut entries = Vec::new();
    while let Some(entry) = read_dir
        .next_entry()
        .await
        .map_err(|e| AppError::storage(dir, e))?
    {
        let Ok(name) = entry.file_name().into_string() else {
            debug!(path = %entry.path().display(), "Skipping non UTF-8 entry");
            continue;
        };
        if is_hidden_entry(&name) {
            continue;
        }

        let path = entry.path();
        let metadata = match tokio::fs::metadata(&path).await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %path.display(), "Entry vanished while listing");
                continue;
            }
            Err(e) => return Err(AppError::storage(&path, e)),
        };

        entries.push(Entry {
            name,
            path,
            metadata,
        });
    }

    entries.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(entries)
}

fn modified(path: &Path, metadata: &std::fs::Metadata) -> Result<DateTime<Utc>> {
    metadata
        .modified()
        .map(DateTime::<Utc>::from)
        .map_err(|e| AppError::storage(path, e))
}

/// Remove a file, reporting whether it existed
async fn remove_file(path: &Path) -> Result<bool> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(AppError::storage(path, e)),
    }
}

/// True if the directory holds any entry, hidden ones included
async fn has_any_entry(dir: &Path) -> std::io::Result<bool> {
    let mut read_dir = tokio::fs::read_dir(dir).await?;
    Ok(read_dir.next_entry().await?.is_some())
}

/// Blocking part of `store_payloads`: payload writes, then the stamp
fn store_blocking(layout: &FsLayout, source: &str, payloads: Vec<(HostName, String)>) -> Result<()> {
    let mut written = Vec::with_capacity(payloads.len());

    for (target, content) in payloads {
        let dir = layout.target_dir(&target);
        std::fs::create_dir_all(&dir).map_err(|e| AppError::storage(&dir, e))?;

        let path = layout.payload_path(&target, source);
        write_atomic(&path, content.as_bytes())?;
        written.push(path);
    }

    let status_dir = &layout.source_status_dir;
    std::fs::create_dir_all(status_dir).map_err(|e| AppError::storage(status_dir, e))?;

    // The stamp is created after all payloads, so its mtime is the newest.
    // Payloads of this run inherit it and never look "not updated".
    let stamp =
        tempfile::NamedTempFile::new_in(status_dir).map_err(|e| AppError::storage(status_dir, e))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        stamp
            .as_file()
            .set_permissions(std::fs::Permissions::from_mode(0o644))
            .map_err(|e| AppError::storage(stamp.path(), e))?;
    }

    let stamp_metadata = stamp
        .as_file()
        .metadata()
        .map_err(|e| AppError::storage(stamp.path(), e))?;
    let stamp_mtime = FileTime::from_last_modification_time(&stamp_metadata);

    for path in &written {
        match filetime::set_file_mtime(path, stamp_mtime) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %path.display(), "Piggyback file vanished before mtime update");
            }
            Err(e) => return Err(AppError::storage(path, e)),
        }
    }

    let status_path = layout.source_status_path(source);
    stamp
        .persist(&status_path)
        .map_err(|e| AppError::storage(&status_path, e.error))?;

    Ok(())
}

#[async_trait]
impl PiggybackRepository for FsPiggybackRepository {
    async fn list_payload_files(&self, target: &str) -> Result<Vec<PayloadFile>> {
        let dir = self.layout.target_dir(target);

        let mut files = Vec::new();
        for entry in list_dir(&dir).await? {
            if !entry.metadata.is_file() {
                continue;
            }
            files.push(PayloadFile {
                target: target.to_string(),
                modified: modified(&entry.path, &entry.metadata)?,
                source: entry.name,
                path: entry.path,
            });
        }

        Ok(files)
    }

    async fn list_target_hosts(&self) -> Result<Vec<HostName>> {
        Ok(list_dir(&self.layout.piggyback_dir)
            .await?
            .into_iter()
            .filter(|entry| entry.metadata.is_dir())
            .map(|entry| entry.name)
            .collect())
    }

    async fn read_payload(&self, file: &PayloadFile) -> Result<Option<String>> {
        let bytes = match tokio::fs::read(&file.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(AppError::storage(&file.path, e)),
        };

        match String::from_utf8(bytes) {
            Ok(content) => Ok(Some(content)),
            Err(e) => {
                warn!(path = %file.path.display(), "Piggyback file is not valid UTF-8, decoding lossily");
                Ok(Some(String::from_utf8_lossy(e.as_bytes()).into_owned()))
            }
        }
    }

    async fn source_status(&self, source: &str) -> Result<Option<SourceStatus>> {
        let path = self.layout.source_status_path(source);
        match tokio::fs::metadata(&path).await {
            Ok(metadata) => Ok(Some(SourceStatus {
                source: source.to_string(),
                modified: modified(&path, &metadata)?,
                path,
            })),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::storage(&path, e)),
        }
    }

    async fn list_source_statuses(&self) -> Result<Vec<SourceStatus>> {
        let mut statuses = Vec::new();
        for entry in list_dir(&self.layout.source_status_dir).await? {
            if !entry.metadata.is_file() {
                continue;
            }
            statuses.push(SourceStatus {
                modified: modified(&entry.path, &entry.metadata)?,
                source: entry.name,
                path: entry.path,
            });
        }
        Ok(statuses)
    }

    async fn store_payloads(&self, source: &str, payloads: Vec<(HostName, String)>) -> Result<()> {
        let layout = self.layout.clone();
        let source = source.to_string();

        tokio::task::spawn_blocking(move || store_blocking(&layout, &source, payloads))
            .await
            .map_err(|e| AppError::Internal(format!("store task failed: {}", e)))?
    }

    async fn remove_source_status(&self, source: &str) -> Result<bool> {
        remove_file(&self.layout.source_status_path(source)).await
    }

    async fn remove_payload_file(&self, file: &PayloadFile) -> Result<bool> {
        remove_file(&file.path).await
    }

    async fn remove_target_if_empty(&self, target: &str) -> Result<bool> {
        let dir = self.layout.target_dir(target);

        // Hidden entries count: a temp file means a writer is busy here
        match has_any_entry(&dir).await {
            Ok(false) => {}
            Ok(true) => return Ok(false),
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(AppError::storage(&dir, e)),
        }

        match tokio::fs::remove_dir(&dir).await {
            Ok(()) => {
                debug!(target_host = %target, "Removed empty piggyback directory");
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => {
                // A writer may have filled the directory in the meantime
                match has_any_entry(&dir).await {
                    Ok(true) => Ok(false),
                    _ => Err(AppError::storage(&dir, e)),
                }
            }
        }
    }
}
