//! Discovery of pending ping files on disk.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};

use crate::error::{UploadError, UploadResult};

static PING_FILE_NAME: Lazy<Regex> = Lazy::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(
        r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$",
    )
    .expect("Hard-coded regex pattern should be valid")
});

/// Returns true if `name` is a bare UUID, the only names the ping writer produces.
pub fn is_valid_ping_file_name(name: &str) -> bool {
    PING_FILE_NAME.is_match(name)
}

/// A file found in the pending directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingEntry {
    pub path: PathBuf,
    pub file_name: String,
    modified: Option<SystemTime>,
}

impl PendingEntry {
    /// Whether the file name is a ping identifier.
    pub fn has_valid_name(&self) -> bool {
        is_valid_ping_file_name(&self.file_name)
    }
}

/// The flat directory holding pings that have not been uploaded yet.
#[derive(Debug, Clone)]
pub struct PingDirectory {
    path: PathBuf,
}

impl PingDirectory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create the directory (and parents) if it is missing.
    ///
    /// Failures are logged rather than returned; a subsequent [`list`](Self::list)
    /// reports whether the directory is actually usable.
    pub async fn ensure_exists(&self) -> bool {
        match tokio::fs::create_dir_all(&self.path).await {
            Ok(()) => true,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Failed to create pending pings directory");
                false
            }
        }
    }

    /// List the regular files directly inside the directory.
    ///
    /// Subdirectories are skipped. Entries are ordered oldest first by
    /// modification time, then by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be read.
    pub async fn list(&self) -> UploadResult<Vec<PendingEntry>> {
        let mut dir = tokio::fs::read_dir(&self.path)
            .await
            .map_err(|e| UploadError::io(&self.path, e))?;

        let mut entries = Vec::new();
        loop {
            let entry = match dir.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => return Err(UploadError::io(&self.path, e)),
            };

            let metadata = match entry.metadata().await {
                Ok(metadata) => metadata,
                Err(e) => {
                    debug!(path = %entry.path().display(), error = %e, "Skipping unreadable entry");
                    continue;
                }
            };
            if !metadata.is_file() {
                continue;
            }

            entries.push(PendingEntry {
                path: entry.path(),
                file_name: entry.file_name().to_string_lossy().into_owned(),
                modified: metadata.modified().ok(),
            });
        }

        entries.sort_by(|a, b| {
            a.modified
                .cmp(&b.modified)
                .then_with(|| a.file_name.cmp(&b.file_name))
        });
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_valid_ping_file_names() {
        assert!(is_valid_ping_file_name("123e4567-e89b-12d3-a456-426614174000"));
        assert!(is_valid_ping_file_name("123E4567-E89B-12D3-A456-426614174000"));
    }

    #[test]
    fn test_invalid_ping_file_names() {
        assert!(!is_valid_ping_file_name("not-a-uuid.txt"));
        assert!(!is_valid_ping_file_name(""));
        assert!(!is_valid_ping_file_name("123e4567-e89b-12d3-a456-426614174000.json"));
        assert!(!is_valid_ping_file_name("123e4567e89b12d3a456426614174000"));
        assert!(!is_valid_ping_file_name("g23e4567-e89b-12d3-a456-426614174000"));
    }

    #[tokio::test]
    async fn test_ensure_exists_creates_nested_directory() {
        let temp_dir = tempfile::tempdir().unwrap();
        let directory = PingDirectory::new(temp_dir.path().join("a/b/pending_pings"));

        assert!(directory.ensure_exists().await);
        assert!(directory.path().is_dir());
        // Idempotent.
        assert!(directory.ensure_exists().await);
    }

    #[tokio::test]
    async fn test_list_skips_subdirectories() {
        let temp_dir = tempfile::tempdir().unwrap();
        let directory = PingDirectory::new(temp_dir.path());

        std::fs::write(temp_dir.path().join("123e4567-e89b-12d3-a456-426614174000"), "a\nb").unwrap();
        std::fs::write(temp_dir.path().join("stray.txt"), "x").unwrap();
        std::fs::create_dir(temp_dir.path().join("nested")).unwrap();
        std::fs::write(temp_dir.path().join("nested/inner"), "x").unwrap();

        let entries = directory.list().await.unwrap();
        let mut names: Vec<_> = entries.iter().map(|e| e.file_name.as_str()).collect();
        names.sort_unstable();
        assert_eq!(names, vec!["123e4567-e89b-12d3-a456-426614174000", "stray.txt"]);
        assert_eq!(entries.iter().filter(|e| e.has_valid_name()).count(), 1);
    }

    #[tokio::test]
    async fn test_list_missing_directory_fails() {
        let temp_dir = tempfile::tempdir().unwrap();
        let directory = PingDirectory::new(temp_dir.path().join("missing"));

        assert!(matches!(directory.list().await, Err(UploadError::Io { .. })));
    }

    proptest! {
        #[test]
        fn prop_generated_uuids_are_valid(name in "[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}") {
            prop_assert!(is_valid_ping_file_name(&name));
        }

        #[test]
        fn prop_names_with_extensions_are_invalid(stem in "[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}", ext in "[a-z]{1,4}") {
            let name = format!("{stem}.{ext}");
            prop_assert!(!is_valid_ping_file_name(&name));
        }
    }
}
