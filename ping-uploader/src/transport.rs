//! The network capability the upload client posts through.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{redirect, Client};

use crate::config::UPLOAD_TIMEOUT;
use crate::error::{UploadError, UploadResult};

/// A single outgoing ping request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    pub timeout: Duration,
}

impl UploadRequest {
    /// Value of the first header named `name`, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Sends an [`UploadRequest`] and reports the HTTP status code.
///
/// `Err` means the request never produced a response.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn post(&self, request: &UploadRequest) -> UploadResult<u16>;
}

/// [`Transport`] backed by a `reqwest` client.
///
/// The client has no cookie store, so every request is stateless. Redirects
/// are not followed: a 3xx is reported as-is and the ping stays on disk.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Create a transport with the default upload timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new() -> UploadResult<Self> {
        let client = Client::builder()
            .timeout(UPLOAD_TIMEOUT)
            .redirect(redirect::Policy::none())
            .build()
            .map_err(|e| UploadError::Configuration {
                message: format!("Failed to create HTTP client: {e}"),
            })?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post(&self, request: &UploadRequest) -> UploadResult<u16> {
        let mut builder = self
            .client
            .post(&request.url)
            .timeout(request.timeout)
            .body(request.body.clone());

        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder.send().await.map_err(|e| UploadError::Transport {
            message: e.to_string(),
        })?;

        Ok(response.status().as_u16())
    }
}
