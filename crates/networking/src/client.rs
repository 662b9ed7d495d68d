//! HTTP client wrapper
//!
//! Thin wrapper over `reqwest` providing request timeouts, a shared
//! connection pool, JSON helpers, and an error taxonomy that separates
//! transient failures (worth retrying) from permanent ones.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

/// Errors surfaced by [`HttpClient`]
#[derive(Debug, Error)]
pub enum NetworkError {
    /// Connection or transport failure before a response arrived
    #[error("Transport error: {0}")]
    Transport(String),

    /// The request exceeded the configured timeout
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// The server answered with a non-success status
    #[error("HTTP {status}: {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body, truncated for logging
        body: String,
    },

    /// The response body could not be decoded
    #[error("Decode error: {0}")]
    Decode(#[from] serde_json::Error),
}

impl NetworkError {
    /// Whether retrying the request could plausibly succeed.
    ///
    /// Timeouts, transport failures, rate limiting, and server-side errors
    /// are transient; client errors and decode failures are not.
    pub fn is_transient(&self) -> bool {
        match self {
            NetworkError::Transport(_) | NetworkError::Timeout(_) => true,
            NetworkError::Status { status, .. } => {
                matches!(status, 408 | 425 | 429 | 500 | 502 | 503 | 504 | 522 | 524)
            }
            NetworkError::Decode(_) => false,
        }
    }
}

/// Configuration for [`HttpClient`]
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Per-request timeout
    pub timeout: Duration,
    /// User agent sent with every request
    pub user_agent: String,
    /// Idle connections kept per host
    pub pool_max_idle_per_host: usize,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: format!("Pawcart/{}", env!("CARGO_PKG_VERSION")),
            pool_max_idle_per_host: 8,
        }
    }
}

impl HttpClientConfig {
    /// Create a config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the per-request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the user agent
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Set the idle connection pool size per host
    pub fn with_pool_max_idle_per_host(mut self, count: usize) -> Self {
        self.pool_max_idle_per_host = count;
        self
    }
}

/// Shared HTTP client
///
/// Wraps a pooled `reqwest::Client`; cheap to clone and share across API
/// clients.
#[derive(Debug, Clone)]
pub struct HttpClient {
    inner: reqwest::Client,
    config: HttpClientConfig,
}

impl HttpClient {
    /// Build a client from the given configuration
    pub fn new(config: HttpClientConfig) -> Result<Self, NetworkError> {
        let inner = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .build()
            .map_err(|e| NetworkError::Transport(e.to_string()))?;

        Ok(Self { inner, config })
    }

    /// The configuration this client was built with
    pub fn config(&self) -> &HttpClientConfig {
        &self.config
    }

    /// GET a JSON resource
    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, NetworkError> {
        let response = self
            .inner
            .get(url)
            .send()
            .await
            .map_err(|e| self.map_reqwest_error(e))?;
        self.decode(response).await
    }

    /// GET a JSON resource with query parameters
    pub async fn get_json_query<T: DeserializeOwned>(
        &self,
        url: &str,
        params: &[(&str, &str)],
    ) -> Result<T, NetworkError> {
        let response = self
            .inner
            .get(url)
            .query(params)
            .send()
            .await
            .map_err(|e| self.map_reqwest_error(e))?;
        self.decode(response).await
    }

    /// POST a JSON body and decode a JSON response
    pub async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<T, NetworkError> {
        let response = self
            .inner
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| self.map_reqwest_error(e))?;
        self.decode(response).await
    }

    /// DELETE a resource, discarding any response body
    pub async fn delete(&self, url: &str) -> Result<(), NetworkError> {
        let response = self
            .inner
            .delete(url)
            .send()
            .await
            .map_err(|e| self.map_reqwest_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = truncate_body(response.text().await.unwrap_or_default());
            return Err(NetworkError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }

    async fn decode<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, NetworkError> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| self.map_reqwest_error(e))?;

        if !status.is_success() {
            return Err(NetworkError::Status {
                status: status.as_u16(),
                body: truncate_body(body),
            });
        }

        serde_json::from_str(&body).map_err(NetworkError::Decode)
    }

    fn map_reqwest_error(&self, error: reqwest::Error) -> NetworkError {
        if error.is_timeout() {
            NetworkError::Timeout(self.config.timeout)
        } else {
            NetworkError::Transport(error.to_string())
        }
    }
}

// Bodies in error messages are for logs, not for machine consumption.
fn truncate_body(body: String) -> String {
    const MAX: usize = 512;
    if body.len() > MAX {
        let mut end = MAX;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &body[..end])
    } else {
        body
    }
}
