//! Maps upload dispositions to what happens to the local ping file.
//!
//! There is no retry counter: a ping that should be retried simply stays in
//! the pending directory, and the cadence of whoever calls
//! [`QueueProcessor::process`](crate::processor::QueueProcessor::process)
//! provides the backoff.

use crate::client::UploadDisposition;
use crate::config::CorruptFilePolicy;

/// What to do with a ping file after an upload attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PolicyDecision {
    pub delete_file: bool,
}

/// What to do with a ping file that could not be decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorruptFileAction {
    Delete,
    Quarantine,
    Keep,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct UploadPolicy {
    corrupt_files: CorruptFilePolicy,
}

impl UploadPolicy {
    pub fn new(corrupt_files: CorruptFilePolicy) -> Self {
        Self { corrupt_files }
    }

    /// Success and client errors are terminal; everything else is retried later.
    pub fn decide(&self, disposition: UploadDisposition) -> PolicyDecision {
        let delete_file = match disposition {
            UploadDisposition::Success | UploadDisposition::ClientError => true,
            UploadDisposition::ServerOrTransportError => false,
        };
        PolicyDecision { delete_file }
    }

    pub fn decide_corrupt(&self) -> CorruptFileAction {
        match self.corrupt_files {
            CorruptFilePolicy::Delete => CorruptFileAction::Delete,
            CorruptFilePolicy::Quarantine => CorruptFileAction::Quarantine,
            CorruptFilePolicy::Retain => CorruptFileAction::Keep,
        }
    }
}
