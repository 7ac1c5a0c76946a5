use async_trait::async_trait;
use bytes::Bytes;
use std::time::Duration;

/// Low-level faults reported by a webhook transport
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportFault {
    #[error("request timed out")]
    Timeout,
    #[error("endpoint unreachable: {0}")]
    Unreachable(String),
    #[error("unexpected status {0}")]
    Status(u16),
    #[error("transfer failed: {0}")]
    Transfer(String),
}

/// One-shot JSON POST returning the raw response body.
///
/// The body is handed back as opaque bytes regardless of the declared
/// content type; interpreting it is the caller's concern.
#[async_trait]
pub trait WebhookTransport: Send + Sync {
    async fn post_json(
        &self,
        url: &str,
        body: &serde_json::Value,
    ) -> Result<Bytes, TransportFault>;
}

/// reqwest-backed transport used outside of tests
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Build a transport whose requests are bounded by `attempt_timeout`
    pub fn new(attempt_timeout: Duration) -> Result<Self, TransportFault> {
        let client = reqwest::Client::builder()
            .timeout(attempt_timeout)
            .build()
            .map_err(|e| TransportFault::Transfer(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl WebhookTransport for HttpTransport {
    async fn post_json(
        &self,
        url: &str,
        body: &serde_json::Value,
    ) -> Result<Bytes, TransportFault> {
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(classify_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportFault::Status(status.as_u16()));
        }

        response.bytes().await.map_err(classify_reqwest_error)
    }
}

fn classify_reqwest_error(error: reqwest::Error) -> TransportFault {
    if error.is_timeout() {
        TransportFault::Timeout
    } else if error.is_connect() {
        TransportFault::Unreachable(error.to_string())
    } else {
        TransportFault::Transfer(error.to_string())
    }
}
