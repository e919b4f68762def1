use std::sync::Arc;

use chrono::Utc;
use reqwest::header::{HeaderName, HeaderValue};
use tracing::{debug, instrument};

use crate::codec::PingPayload;
use crate::config::{UploaderConfig, UPLOAD_TIMEOUT};
use crate::error::{UploadError, UploadResult};
use crate::logging::truncate_field;
use crate::transport::{HttpTransport, Transport, UploadRequest};

/// How an upload attempt ended, as far as the local copy is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadDisposition {
    /// 2xx: the server accepted the ping.
    Success,
    /// 4xx: the request is malformed and will never be accepted.
    ClientError,
    /// 5xx, any other status, or no response at all.
    ServerOrTransportError,
}

impl UploadDisposition {
    /// Classifies the HTTP status of an attempt; `None` means no response was received.
    pub fn from_status(status: Option<u16>) -> Self {
        match status {
            Some(200..=299) => UploadDisposition::Success,
            Some(400..=499) => UploadDisposition::ClientError,
            _ => UploadDisposition::ServerOrTransportError,
        }
    }
}

/// Result of one upload attempt.
#[derive(Debug)]
pub struct UploadAttempt {
    pub disposition: UploadDisposition,
    pub status: Option<u16>,
    /// The error behind a non-success disposition, kept for logging.
    pub error: Option<UploadError>,
}

impl UploadAttempt {
    fn from_transport_result(result: UploadResult<u16>) -> Self {
        match result {
            Ok(status) => {
                let disposition = UploadDisposition::from_status(Some(status));
                let error = match disposition {
                    UploadDisposition::Success => None,
                    _ => Some(UploadError::Status { status }),
                };
                Self {
                    disposition,
                    status: Some(status),
                    error,
                }
            }
            Err(e) => Self {
                disposition: UploadDisposition::ServerOrTransportError,
                status: None,
                error: Some(e),
            },
        }
    }
}

/// Posts pings to the collection endpoint.
#[derive(Clone)]
pub struct UploadClient {
    config: Arc<UploaderConfig>,
    transport: Arc<dyn Transport>,
}

impl UploadClient {
    pub fn new(config: Arc<UploaderConfig>, transport: Arc<dyn Transport>) -> Self {
        Self { config, transport }
    }

    /// Create a client that posts over HTTP.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn with_http(config: Arc<UploaderConfig>) -> UploadResult<Self> {
        Ok(Self::new(config, Arc::new(HttpTransport::new()?)))
    }

    /// Upload one ping body to `server_endpoint + path`.
    pub async fn upload(&self, path: &str, body: &str) -> UploadAttempt {
        self.upload_payload(&PingPayload::new(path, body)).await
    }

    /// Upload a decoded ping, including any headers from its metadata line.
    #[instrument(skip(self, payload), fields(path = %payload.path))]
    pub async fn upload_payload(&self, payload: &PingPayload) -> UploadAttempt {
        let request = self.build_request(payload);

        if self.config.log_pings() {
            debug!(
                url = %request.url,
                body = %truncate_field(&payload.body, self.config.max_logged_body_len()),
                "Uploading ping"
            );
        }

        let attempt = UploadAttempt::from_transport_result(self.transport.post(&request).await);
        debug!(status = ?attempt.status, disposition = ?attempt.disposition, "Upload attempt finished");
        attempt
    }

    /// Build the request for `payload` without sending it.
    pub fn build_request(&self, payload: &PingPayload) -> UploadRequest {
        let mut headers = vec![
            (
                "Content-Type".to_string(),
                "application/json; charset=utf-8".to_string(),
            ),
            ("User-Agent".to_string(), self.config.user_agent().to_string()),
            ("Date".to_string(), http_date()),
            ("X-Client-Type".to_string(), "Glean".to_string()),
            (
                "X-Client-Version".to_string(),
                self.config.sdk_version().to_string(),
            ),
        ];
        if let Some(tag) = self.config.debug_view_tag() {
            headers.push(("X-Debug-ID".to_string(), tag.to_string()));
        }

        for (name, value) in &payload.headers {
            let fixed = headers
                .iter()
                .any(|(existing, _)| existing.eq_ignore_ascii_case(name));
            if fixed {
                continue;
            }
            // reqwest rejects these at send time, on every attempt.
            if HeaderName::from_bytes(name.as_bytes()).is_err()
                || HeaderValue::from_str(value).is_err()
            {
                debug!(header = %name, "Dropping invalid metadata header");
                continue;
            }
            headers.push((name.clone(), value.clone()));
        }

        UploadRequest {
            url: format!("{}{}", self.config.server_endpoint(), payload.path),
            headers,
            body: payload.body.clone().into_bytes(),
            timeout: UPLOAD_TIMEOUT,
        }
    }

    pub fn config(&self) -> &UploaderConfig {
        &self.config
    }
}

/// Current time as `EEE, dd MMM yyyy HH:mm:ss z` in GMT.
fn http_date() -> String {
    Utc::now().format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct FixedTransport {
        result: fn() -> UploadResult<u16>,
        requests: Mutex<Vec<UploadRequest>>,
    }

    #[async_trait]
    impl Transport for FixedTransport {
        async fn post(&self, request: &UploadRequest) -> UploadResult<u16> {
            self.requests.lock().unwrap().push(request.clone());
            (self.result)()
        }
    }

    fn make_client(result: fn() -> UploadResult<u16>) -> (UploadClient, Arc<FixedTransport>) {
        let config = UploaderConfig::new("/data", "https://incoming.example.com")
            .unwrap()
            .with_user_agent("test-agent")
            .with_sdk_version("1.2.3");
        let transport = Arc::new(FixedTransport {
            result,
            requests: Mutex::new(Vec::new()),
        });
        (
            UploadClient::new(Arc::new(config), transport.clone()),
            transport,
        )
    }

    #[test]
    fn test_disposition_from_status() {
        assert_eq!(UploadDisposition::from_status(Some(200)), UploadDisposition::Success);
        assert_eq!(UploadDisposition::from_status(Some(299)), UploadDisposition::Success);
        assert_eq!(UploadDisposition::from_status(Some(400)), UploadDisposition::ClientError);
        assert_eq!(UploadDisposition::from_status(Some(404)), UploadDisposition::ClientError);
        assert_eq!(UploadDisposition::from_status(Some(499)), UploadDisposition::ClientError);
        for status in [Some(100), Some(301), Some(500), Some(503), None] {
            assert_eq!(
                UploadDisposition::from_status(status),
                UploadDisposition::ServerOrTransportError
            );
        }
    }

    #[test]
    fn test_build_request_headers() {
        let (client, _) = make_client(|| Ok(200));
        let request = client.build_request(&PingPayload::new("/submit/app/metric/1", "{}"));

        assert_eq!(request.url, "https://incoming.example.com/submit/app/metric/1");
        assert_eq!(request.header("Content-Type"), Some("application/json; charset=utf-8"));
        assert_eq!(request.header("User-Agent"), Some("test-agent"));
        assert_eq!(request.header("X-Client-Type"), Some("Glean"));
        assert_eq!(request.header("X-Client-Version"), Some("1.2.3"));
        assert_eq!(request.header("X-Debug-ID"), None);
        assert_eq!(request.timeout, UPLOAD_TIMEOUT);
        assert_eq!(request.body, b"{}");

        let date = request.header("Date").unwrap();
        assert!(date.ends_with(" GMT"));
        assert!(chrono::NaiveDateTime::parse_from_str(date, "%a, %d %b %Y %H:%M:%S GMT").is_ok());
    }

    #[test]
    fn test_build_request_debug_tag_and_metadata_headers() {
        let config = UploaderConfig::new("/data", "https://incoming.example.com")
            .unwrap()
            .with_debug_view_tag("my-tag")
            .unwrap();
        let client = UploadClient::new(Arc::new(config), Arc::new(HttpTransport::new().unwrap()));
        let payload = PingPayload::new("/submit/a/b/1", "{}")
            .with_header("X-Source-Tags", "automation")
            .with_header("x-client-type", "spoofed")
            .with_header("Bad Header", "x");

        let request = client.build_request(&payload);
        assert_eq!(request.header("Bad Header"), None);
        assert_eq!(request.header("X-Debug-ID"), Some("my-tag"));
        assert_eq!(request.header("X-Source-Tags"), Some("automation"));
        assert_eq!(request.header("X-Client-Type"), Some("Glean"));
    }

    #[tokio::test]
    async fn test_upload_success_has_no_error() {
        let (client, transport) = make_client(|| Ok(202));
        let attempt = client.upload("/submit/a/b/1", "{\"ping\":true}").await;

        assert_eq!(attempt.disposition, UploadDisposition::Success);
        assert_eq!(attempt.status, Some(202));
        assert!(attempt.error.is_none());
        assert_eq!(transport.requests.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_upload_client_error_surfaces_status() {
        let (client, _) = make_client(|| Ok(404));
        let attempt = client.upload("/submit/a/b/1", "{}").await;

        assert_eq!(attempt.disposition, UploadDisposition::ClientError);
        assert!(matches!(attempt.error, Some(UploadError::Status { status: 404 })));
    }

    #[tokio::test]
    async fn test_upload_transport_error_is_recoverable() {
        let (client, _) = make_client(|| {
            Err(UploadError::Transport {
                message: "connection refused".to_string(),
            })
        });
        let attempt = client.upload("/submit/a/b/1", "{}").await;

        assert_eq!(attempt.disposition, UploadDisposition::ServerOrTransportError);
        assert_eq!(attempt.status, None);
        assert!(matches!(attempt.error, Some(UploadError::Transport { .. })));
    }
}
