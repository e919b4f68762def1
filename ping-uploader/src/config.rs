use std::path::{Path, PathBuf};
use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{UploadError, UploadResult};

/// Name of the directory, under the data path, holding pings awaiting upload.
pub const PENDING_PINGS_DIRECTORY: &str = "pending_pings";

/// Name of the sibling directory that receives undecodable ping files.
pub const QUARANTINED_PINGS_DIRECTORY: &str = "quarantined_pings";

/// Per-request transport timeout.
pub const UPLOAD_TIMEOUT: Duration = Duration::from_millis(10_000);

static DEBUG_TAG_PATTERN: Lazy<Regex> = Lazy::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"^[a-zA-Z0-9-]{1,20}$").expect("Hard-coded regex pattern should be valid")
});

/// What to do with a ping file whose content cannot be decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CorruptFilePolicy {
    /// Remove the file; re-reading it will never succeed.
    #[default]
    Delete,
    /// Move the file into the quarantine directory for later inspection.
    Quarantine,
    /// Leave the file in the pending directory.
    Retain,
}

/// Configuration for the ping uploader.
///
/// Immutable for the duration of one processing pass.
#[derive(Debug, Clone)]
pub struct UploaderConfig {
    data_path: PathBuf,
    server_endpoint: String,
    user_agent: String,
    sdk_version: String,
    debug_view_tag: Option<String>,
    log_pings: bool,
    max_logged_body_len: usize,
    corrupt_file_policy: CorruptFilePolicy,
    max_concurrent_uploads: usize,
    upload_interval: Duration,
}

impl UploaderConfig {
    /// Create a new configuration rooted at `data_path`, uploading to `server_endpoint`.
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint is not an `http://` or `https://` URL.
    pub fn new(
        data_path: impl AsRef<Path>,
        server_endpoint: impl Into<String>,
    ) -> UploadResult<Self> {
        let server_endpoint = server_endpoint.into();
        if !(server_endpoint.starts_with("http://") || server_endpoint.starts_with("https://")) {
            return Err(UploadError::Configuration {
                message: format!("Server endpoint must be an http(s) URL: {server_endpoint}"),
            });
        }

        let sdk_version = env!("CARGO_PKG_VERSION").to_string();
        Ok(Self {
            data_path: data_path.as_ref().to_path_buf(),
            server_endpoint: server_endpoint.trim_end_matches('/').to_string(),
            user_agent: format!("ping-uploader/{sdk_version}"),
            sdk_version,
            debug_view_tag: None,
            log_pings: false,
            max_logged_body_len: 4096,
            corrupt_file_policy: CorruptFilePolicy::default(),
            max_concurrent_uploads: 1,
            upload_interval: Duration::from_secs(60),
        })
    }

    /// Set the `User-Agent` header value.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Set the version reported in `X-Client-Version`.
    pub fn with_sdk_version(mut self, sdk_version: impl Into<String>) -> Self {
        self.sdk_version = sdk_version.into();
        self
    }

    /// Tag outgoing pings with `X-Debug-ID`.
    ///
    /// # Errors
    ///
    /// Returns an error unless the tag is 1-20 alphanumeric characters or dashes.
    pub fn with_debug_view_tag(mut self, tag: impl Into<String>) -> UploadResult<Self> {
        let tag = tag.into();
        if !DEBUG_TAG_PATTERN.is_match(&tag) {
            return Err(UploadError::Configuration {
                message: format!("Invalid debug view tag: {tag:?}"),
            });
        }
        self.debug_view_tag = Some(tag);
        Ok(self)
    }

    /// Log each outgoing ping's path and body before it is sent.
    pub fn with_log_pings(mut self, enabled: bool) -> Self {
        self.log_pings = enabled;
        self
    }

    /// Truncate logged ping bodies beyond this many bytes.
    pub fn with_max_logged_body_len(mut self, len: usize) -> Self {
        self.max_logged_body_len = len;
        self
    }

    pub fn with_corrupt_file_policy(mut self, policy: CorruptFilePolicy) -> Self {
        self.corrupt_file_policy = policy;
        self
    }

    /// Set how many ping files may be in flight at once. Zero is treated as one.
    pub fn with_max_concurrent_uploads(mut self, max: usize) -> Self {
        self.max_concurrent_uploads = max.max(1);
        self
    }

    /// Set the delay between passes of the [`UploadWorker`](crate::worker::UploadWorker).
    pub fn with_upload_interval(mut self, interval: Duration) -> Self {
        self.upload_interval = interval;
        self
    }

    pub fn data_path(&self) -> &Path {
        &self.data_path
    }

    /// Directory holding pings awaiting upload.
    pub fn pending_pings_dir(&self) -> PathBuf {
        self.data_path.join(PENDING_PINGS_DIRECTORY)
    }

    /// Directory receiving quarantined ping files.
    pub fn quarantine_dir(&self) -> PathBuf {
        self.data_path.join(QUARANTINED_PINGS_DIRECTORY)
    }

    pub fn server_endpoint(&self) -> &str {
        &self.server_endpoint
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    pub fn sdk_version(&self) -> &str {
        &self.sdk_version
    }

    pub fn debug_view_tag(&self) -> Option<&str> {
        self.debug_view_tag.as_deref()
    }

    pub fn log_pings(&self) -> bool {
        self.log_pings
    }

    pub fn max_logged_body_len(&self) -> usize {
        self.max_logged_body_len
    }

    pub fn corrupt_file_policy(&self) -> CorruptFilePolicy {
        self.corrupt_file_policy
    }

    pub fn max_concurrent_uploads(&self) -> usize {
        self.max_concurrent_uploads
    }

    pub fn upload_interval(&self) -> Duration {
        self.upload_interval
    }
}
