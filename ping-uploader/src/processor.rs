//! Drains the pending pings directory.
//!
//! Every file goes through the same causal chain: read, decode, upload,
//! decide, delete. Files are independent of each other, so chains for
//! different files may run concurrently. Nothing here returns an error to
//! the caller; each failure becomes a [`FileOutcome`] and a log line.

use std::path::Path;
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tracing::{debug, error, info, instrument, warn};

use crate::client::{UploadClient, UploadDisposition};
use crate::codec::{self, CorruptPingFile};
use crate::config::UploaderConfig;
use crate::directory::{PendingEntry, PingDirectory};
use crate::error::{UploadError, UploadResult};
use crate::policy::{CorruptFileAction, UploadPolicy};
use crate::transport::Transport;

/// Terminal state of one ping file after a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOutcome {
    Uploaded,
    DiscardedClientError,
    DiscardedMalformedName,
    DiscardedCorrupt,
    QuarantinedCorrupt,
    RetainedRecoverable,
    RetainedCorrupt,
    RetainedReadFailure,
    /// The file was due for deletion but could not be removed.
    RetainedDeleteFailure,
}

/// Counters for a processing pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessStats {
    pub uploaded: u64,
    pub client_errors: u64,
    pub recoverable_failures: u64,
    pub malformed_names: u64,
    pub corrupt: u64,
    pub read_failures: u64,
    /// Files left in place because deleting them failed.
    pub delete_failures: u64,
    /// Passes that stopped early because the directory could not be listed.
    pub listing_failures: u64,
}

impl ProcessStats {
    fn record(&mut self, outcome: FileOutcome) {
        match outcome {
            FileOutcome::Uploaded => self.uploaded += 1,
            FileOutcome::DiscardedClientError => self.client_errors += 1,
            FileOutcome::DiscardedMalformedName => self.malformed_names += 1,
            FileOutcome::DiscardedCorrupt
            | FileOutcome::QuarantinedCorrupt
            | FileOutcome::RetainedCorrupt => self.corrupt += 1,
            FileOutcome::RetainedRecoverable => self.recoverable_failures += 1,
            FileOutcome::RetainedReadFailure => self.read_failures += 1,
            FileOutcome::RetainedDeleteFailure => self.delete_failures += 1,
        }
    }

    /// Add another pass's counters to these.
    pub fn merge(&mut self, other: &ProcessStats) {
        self.uploaded += other.uploaded;
        self.client_errors += other.client_errors;
        self.recoverable_failures += other.recoverable_failures;
        self.malformed_names += other.malformed_names;
        self.corrupt += other.corrupt;
        self.read_failures += other.read_failures;
        self.delete_failures += other.delete_failures;
        self.listing_failures += other.listing_failures;
    }
}

/// Uploads everything in the pending pings directory.
#[derive(Clone)]
pub struct QueueProcessor {
    config: Arc<UploaderConfig>,
    directory: PingDirectory,
    client: UploadClient,
    policy: UploadPolicy,
}

impl QueueProcessor {
    /// Create a processor that posts through `transport`.
    pub fn new(config: UploaderConfig, transport: Arc<dyn Transport>) -> Self {
        let config = Arc::new(config);
        Self {
            directory: PingDirectory::new(config.pending_pings_dir()),
            client: UploadClient::new(config.clone(), transport),
            policy: UploadPolicy::new(config.corrupt_file_policy()),
            config,
        }
    }

    /// Create a processor that posts over HTTP.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn with_http(config: UploaderConfig) -> UploadResult<Self> {
        let config = Arc::new(config);
        Ok(Self {
            directory: PingDirectory::new(config.pending_pings_dir()),
            client: UploadClient::with_http(config.clone())?,
            policy: UploadPolicy::new(config.corrupt_file_policy()),
            config,
        })
    }

    pub fn directory(&self) -> &PingDirectory {
        &self.directory
    }

    /// Run one pass over the pending directory.
    ///
    /// Files added after the directory has been listed are left for the next pass.
    #[instrument(skip(self), fields(dir = %self.directory.path().display()))]
    pub async fn process(&self) -> ProcessStats {
        let mut stats = ProcessStats::default();

        self.directory.ensure_exists().await;
        let entries = match self.directory.list().await {
            Ok(entries) => entries,
            Err(e) => {
                error!(error = %e, "Failed to list pending pings");
                stats.listing_failures += 1;
                return stats;
            }
        };

        if entries.is_empty() {
            debug!("No pending pings");
            return stats;
        }

        debug!(count = entries.len(), "Processing pending pings");
        let outcomes: Vec<FileOutcome> = stream::iter(entries)
            .map(|entry| self.process_file(entry))
            .buffer_unordered(self.config.max_concurrent_uploads())
            .collect()
            .await;

        for outcome in outcomes {
            stats.record(outcome);
        }

        info!(
            uploaded = stats.uploaded,
            client_errors = stats.client_errors,
            retained = stats.recoverable_failures,
            malformed_names = stats.malformed_names,
            corrupt = stats.corrupt,
            unreadable = stats.read_failures,
            delete_failures = stats.delete_failures,
            "Upload pass finished"
        );
        stats
    }

    /// Take a single pending file through read, decode, upload and disposition.
    pub async fn process_file(&self, entry: PendingEntry) -> FileOutcome {
        if !entry.has_valid_name() {
            debug!(file = %entry.file_name, "Removing file with non-ping name");
            return remove_or_retain(&entry.path, FileOutcome::DiscardedMalformedName).await;
        }

        let content = match tokio::fs::read(&entry.path).await {
            Ok(content) => content,
            Err(e) => {
                warn!(file = %entry.file_name, error = %UploadError::io(&entry.path, e), "Failed to read ping file");
                return FileOutcome::RetainedReadFailure;
            }
        };

        let payload = match codec::decode_bytes(&content) {
            Ok(payload) => payload,
            Err(e) => return self.handle_corrupt(&entry, e).await,
        };

        let attempt = self.client.upload_payload(&payload).await;
        let decision = self.policy.decide(attempt.disposition);

        match attempt.disposition {
            UploadDisposition::Success => {
                debug!(file = %entry.file_name, status = ?attempt.status, "Ping uploaded");
            }
            UploadDisposition::ClientError => {
                warn!(
                    file = %entry.file_name,
                    error = ?attempt.error.as_ref().map(ToString::to_string),
                    "Server rejected ping, discarding"
                );
            }
            UploadDisposition::ServerOrTransportError => {
                warn!(
                    file = %entry.file_name,
                    error = ?attempt.error.as_ref().map(ToString::to_string),
                    "Recoverable upload failure, keeping ping for the next pass"
                );
            }
        }

        let outcome = match attempt.disposition {
            UploadDisposition::Success => FileOutcome::Uploaded,
            UploadDisposition::ClientError => FileOutcome::DiscardedClientError,
            UploadDisposition::ServerOrTransportError => FileOutcome::RetainedRecoverable,
        };

        if decision.delete_file {
            remove_or_retain(&entry.path, outcome).await
        } else {
            outcome
        }
    }

    async fn handle_corrupt(&self, entry: &PendingEntry, cause: CorruptPingFile) -> FileOutcome {
        let cause = UploadError::from(cause);
        match self.policy.decide_corrupt() {
            CorruptFileAction::Delete => {
                warn!(file = %entry.file_name, error = %cause, "Discarding corrupt ping file");
                remove_or_retain(&entry.path, FileOutcome::DiscardedCorrupt).await
            }
            CorruptFileAction::Quarantine => {
                warn!(file = %entry.file_name, error = %cause, "Quarantining corrupt ping file");
                match self.quarantine(entry).await {
                    Ok(()) => FileOutcome::QuarantinedCorrupt,
                    Err(e) => {
                        warn!(file = %entry.file_name, error = %e, "Quarantine failed, discarding instead");
                        remove_or_retain(&entry.path, FileOutcome::DiscardedCorrupt).await
                    }
                }
            }
            CorruptFileAction::Keep => {
                warn!(file = %entry.file_name, error = %cause, "Corrupt ping file left in place");
                FileOutcome::RetainedCorrupt
            }
        }
    }

    async fn quarantine(&self, entry: &PendingEntry) -> UploadResult<()> {
        let quarantine_dir = self.config.quarantine_dir();
        tokio::fs::create_dir_all(&quarantine_dir)
            .await
            .map_err(|e| UploadError::io(&quarantine_dir, e))?;

        let target = quarantine_dir.join(&entry.file_name);
        tokio::fs::rename(&entry.path, &target)
            .await
            .map_err(|e| UploadError::io(&entry.path, e))
    }
}

/// Delete a ping file. A file that is already gone counts as deleted.
async fn remove_file(path: &Path) -> UploadResult<()> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(UploadError::io(path, e)),
    }
}

/// Delete `path` and report `deleted`, or keep the file on disk if removal fails.
async fn remove_or_retain(path: &Path, deleted: FileOutcome) -> FileOutcome {
    match remove_file(path).await {
        Ok(()) => deleted,
        Err(e) => {
            error!(error = %e, intended = ?deleted, "Failed to delete ping file, keeping it");
            FileOutcome::RetainedDeleteFailure
        }
    }
}
