//! On-disk ping file format.
//!
//! A ping file is plain text:
//!
//! ```text
//! /submit/<app>/<ping>/<version>/<doc-id>
//! {"ping": "body"}
//! {"headers": {"X-Source-Tags": "automation"}}
//! ```
//!
//! Line 1 is the URL path suffix and line 2 the serialized body. The third
//! line is optional metadata; anything after it is ignored.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Reasons a ping file cannot be turned into an upload request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CorruptPingFile {
    #[error("Corrupt ping file: expected at least 2 lines, found {found}")]
    TooFewLines { found: usize },

    #[error("Corrupt ping file: content is not valid UTF-8")]
    InvalidUtf8,
}

/// A decoded ping, ready to be handed to the upload client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PingPayload {
    pub path: String,
    pub body: String,
    /// Extra request headers carried by the metadata line.
    pub headers: BTreeMap<String, String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct PingMetadata {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    headers: BTreeMap<String, String>,
}

impl PingPayload {
    pub fn new(path: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            body: body.into(),
            headers: BTreeMap::new(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Serializes the payload into the on-disk text format.
    ///
    /// The metadata line is only written when there are headers to carry.
    pub fn encode(&self) -> String {
        if self.headers.is_empty() {
            return encode(&self.path, &self.body);
        }

        let metadata = PingMetadata {
            headers: self.headers.clone(),
        };
        // A map of strings always serializes.
        let metadata = serde_json::to_string(&metadata).unwrap_or_default();
        format!("{}\n{}\n{}", self.path, self.body, metadata)
    }
}

/// Joins a path suffix and body into the two-line file format.
pub fn encode(path: &str, body: &str) -> String {
    format!("{path}\n{body}")
}

/// Parses ping file content.
///
/// Succeeds as soon as there are two lines. A parseable metadata line adds
/// headers; a malformed one is ignored. The path and metadata lines tolerate
/// a CRLF ending; the body is taken verbatim.
pub fn decode(content: &str) -> Result<PingPayload, CorruptPingFile> {
    let mut lines = content.split('\n');

    let (path, body) = match (lines.next(), lines.next()) {
        (Some(path), Some(body)) => (strip_cr(path), body),
        (first, _) => {
            return Err(CorruptPingFile::TooFewLines {
                found: usize::from(first.is_some()),
            })
        }
    };

    let mut payload = PingPayload::new(path, body);

    if let Some(metadata) = lines.next().map(strip_cr).filter(|line| !line.trim().is_empty()) {
        match serde_json::from_str::<PingMetadata>(metadata) {
            Ok(metadata) => payload.headers = metadata.headers,
            Err(e) => debug!(error = %e, "Ignoring unparseable ping metadata line"),
        }
    }

    let trailing = lines.filter(|line| !line.is_empty()).count();
    if trailing > 0 {
        debug!(trailing, "Ignoring trailing lines in ping file");
    }

    Ok(payload)
}

fn strip_cr(line: &str) -> &str {
    line.strip_suffix('\r').unwrap_or(line)
}

/// Parses raw file bytes, rejecting content that is not UTF-8.
pub fn decode_bytes(content: &[u8]) -> Result<PingPayload, CorruptPingFile> {
    let text = std::str::from_utf8(content).map_err(|_| CorruptPingFile::InvalidUtf8)?;
    decode(text)
}
