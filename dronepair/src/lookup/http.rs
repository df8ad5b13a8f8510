//! HTTP client abstraction for testability

use std::future::Future;
use std::time::Duration;

use super::types::LookupError;

/// Default transport-level timeout. The resolver applies its own, tighter
/// deadline on top of this.
pub const DEFAULT_CLIENT_TIMEOUT_SECS: u64 = 30;

/// Status and body of an HTTP response.
///
/// Non-success statuses are returned as values, not errors, so the caller
/// can tell a 429 apart from other failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// A 200 response with the given body.
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        Self {
            status: 200,
            body: body.into(),
        }
    }

    /// An empty response with the given status.
    pub fn status(status: u16) -> Self {
        Self {
            status,
            body: Vec::new(),
        }
    }

    /// Whether the status is 2xx.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Trait for async HTTP client operations.
///
/// This abstraction allows for dependency injection and easier testing
/// by enabling mock HTTP clients in tests.
pub trait AsyncHttpClient: Send + Sync {
    /// Performs an HTTP GET request.
    ///
    /// # Arguments
    ///
    /// * `url` - The fully encoded URL to request
    ///
    /// # Returns
    ///
    /// The response status and body, or an error if the request could not
    /// be completed at the transport level.
    fn get(&self, url: &str) -> impl Future<Output = Result<HttpResponse, LookupError>> + Send;
}

/// Real HTTP client implementation using reqwest.
#[derive(Debug, Clone)]
pub struct ReqwestClient {
    client: reqwest::Client,
}

impl ReqwestClient {
    /// Creates a new ReqwestClient with default configuration.
    pub fn new() -> Result<Self, LookupError> {
        Self::with_timeout(Duration::from_secs(DEFAULT_CLIENT_TIMEOUT_SECS))
    }

    /// Creates a new ReqwestClient with custom timeout.
    pub fn with_timeout(timeout: Duration) -> Result<Self, LookupError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("dronepair/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| LookupError::Client(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }
}

impl AsyncHttpClient for ReqwestClient {
    async fn get(&self, url: &str) -> Result<HttpResponse, LookupError> {
        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                LookupError::Timeout {
                    endpoint: url.to_string(),
                    after: Duration::from_secs(DEFAULT_CLIENT_TIMEOUT_SECS),
                }
            } else {
                LookupError::Unavailable {
                    endpoint: url.to_string(),
                    reason: format!("Request failed: {}", e),
                }
            }
        })?;

        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map(|b| b.to_vec())
            .map_err(|e| LookupError::Unavailable {
                endpoint: url.to_string(),
                reason: format!("Failed to read response: {}", e),
            })?;

        Ok(HttpResponse { status, body })
    }
}
