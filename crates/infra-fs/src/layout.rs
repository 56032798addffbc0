// On-disk layout of the piggyback store

use std::path::{Path, PathBuf};

pub const DEFAULT_PIGGYBACK_DIR: &str = "~/.piggyback/piggyback";
pub const DEFAULT_SOURCE_STATUS_DIR: &str = "~/.piggyback/piggyback_sources";

/// Root directories of the piggyback store
///
/// ```text
/// <piggyback_dir>/<target>/<source>   payload file
/// <source_status_dir>/<source>        liveness stamp
/// ```
///
/// Both roots should live on the same filesystem. Payload mtimes are copied
/// from the stamp on every store; a payload filesystem with coarser timestamp
/// resolution truncates them below the stamp, and fresh data then reads as
/// "not updated".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FsLayout {
    pub piggyback_dir: PathBuf,
    pub source_status_dir: PathBuf,
}

impl Default for FsLayout {
    fn default() -> Self {
        Self {
            piggyback_dir: shellexpand::tilde(DEFAULT_PIGGYBACK_DIR).into_owned().into(),
            source_status_dir: shellexpand::tilde(DEFAULT_SOURCE_STATUS_DIR)
                .into_owned()
                .into(),
        }
    }
}

impl FsLayout {
    pub fn new(piggyback_dir: impl Into<PathBuf>, source_status_dir: impl Into<PathBuf>) -> Self {
        Self {
            piggyback_dir: piggyback_dir.into(),
            source_status_dir: source_status_dir.into(),
        }
    }

    /// Layout from user-supplied paths, expanding a leading `~`
    pub fn from_config(piggyback_dir: &str, source_status_dir: &str) -> Self {
        Self::new(
            shellexpand::tilde(piggyback_dir).into_owned(),
            shellexpand::tilde(source_status_dir).into_owned(),
        )
    }

    /// Both directories below a common root (`piggyback/`, `piggyback_sources/`)
    pub fn under(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self::new(root.join("piggyback"), root.join("piggyback_sources"))
    }

    pub fn target_dir(&self, target: &str) -> PathBuf {
        self.piggyback_dir.join(target)
    }

    pub fn payload_path(&self, target: &str, source: &str) -> PathBuf {
        self.target_dir(target).join(source)
    }

    pub fn source_status_path(&self, source: &str) -> PathBuf {
        self.source_status_dir.join(source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths() {
        let layout = FsLayout::under("/var/lib/monitoring");
        assert_eq!(
            layout.payload_path("host-a", "source1"),
            PathBuf::from("/var/lib/monitoring/piggyback/host-a/source1")
        );
        assert_eq!(
            layout.source_status_path("source1"),
            PathBuf::from("/var/lib/monitoring/piggyback_sources/source1")
        );
    }

    #[test]
    fn test_under_keeps_both_roots_below_one_directory() {
        let layout = FsLayout::under("/var/lib/monitoring");
        assert_eq!(layout.piggyback_dir.parent(), layout.source_status_dir.parent());
    }

    #[test]
    fn test_from_config_keeps_absolute_paths() {
        let layout = FsLayout::from_config("/srv/pb", "/srv/pb_sources");
        assert_eq!(layout, FsLayout::new("/srv/pb", "/srv/pb_sources"));
    }

    #[test]
    fn test_default_layout() {
        let layout = FsLayout::default();
        assert!(layout.piggyback_dir.ends_with(".piggyback/piggyback"));
        assert!(layout.source_status_dir.ends_with(".piggyback/piggyback_sources"));
    }
}
