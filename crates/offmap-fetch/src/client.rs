//! Transport abstraction and the HTTP client behind it.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;

/// Configuration for the HTTP transport.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Idle connections kept per host.
    pub pool_size: usize,
    /// Request timeout.
    pub timeout: Duration,
    /// Maximum retry attempts for failed requests.
    pub max_retries: u32,
    /// Base delay for exponential backoff (in milliseconds).
    pub base_delay_ms: u64,
    /// Maximum delay between retries (in milliseconds).
    pub max_delay_ms: u64,
    /// User agent string.
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            pool_size: 8,
            timeout: Duration::from_secs(60),
            max_retries: 3,
            base_delay_ms: 250,
            max_delay_ms: 10_000,
            user_agent: format!("offmap/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Errors that prevent a response from being obtained at all.
#[derive(Error, Debug)]
pub enum TransportError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The network could not be reached.
    #[error("Connection failed: {0}")]
    Connection(String),
}

/// A completed HTTP exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response body.
    pub body: Bytes,
}

impl FetchResponse {
    /// Creates a response.
    #[must_use]
    pub const fn new(status: u16, body: Bytes) -> Self {
        Self { status, body }
    }

    /// Returns true for 2xx status codes.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }
}

/// Fetches resources by URL.
///
/// Implementations must tolerate many concurrent calls. Any status code is a
/// successful exchange; only failures to obtain a response are errors.
#[async_trait]
pub trait Transport: Send + Sync + std::fmt::Debug {
    /// Fetches a single URL.
    async fn fetch(&self, url: &str) -> Result<FetchResponse, TransportError>;
}

/// HTTP transport with connection pooling and retry logic.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    config: ClientConfig,
}

impl HttpTransport {
    /// Creates a new transport with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(config: ClientConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .pool_max_idle_per_host(config.pool_size)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_nodelay(true)
            .tcp_keepalive(Duration::from_secs(60))
            .timeout(config.timeout)
            .connect_timeout(Duration::from_secs(10))
            .user_agent(&config.user_agent)
            .gzip(true)
            .build()?;
        Ok(Self { client, config })
    }

    /// Creates a transport with default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn with_defaults() -> Result<Self, reqwest::Error> {
        Self::new(ClientConfig::default())
    }

    /// Returns the transport configuration.
    #[must_use]
    pub const fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Returns how long to wait before retry number `attempt` (from 1).
    ///
    /// Doubles from `base_delay_ms` up to `max_delay_ms`, then spreads
    /// retries by up to a quarter of the delay in either direction.
    fn retry_delay(&self, attempt: u32) -> Duration {
        let doubled = self
            .config
            .base_delay_ms
            .saturating_mul(1u64 << attempt.min(10));
        let capped = doubled.min(self.config.max_delay_ms);

        let spread = capped / 4;
        let delay = if spread == 0 {
            capped
        } else {
            let offset = (u64::from(attempt) * 17) % (spread * 2);
            (capped + offset).saturating_sub(spread)
        };
        Duration::from_millis(delay.max(50))
    }

    fn should_retry_error(error: &reqwest::Error) -> bool {
        !error.is_builder() && (error.is_timeout() || error.is_connect() || error.is_request())
    }

    fn should_retry_status(status: reqwest::StatusCode) -> bool {
        status.is_server_error() || status.as_u16() == 429
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn fetch(&self, url: &str) -> Result<FetchResponse, TransportError> {
        let mut attempt = 0;

        loop {
            let result = self.client.get(url).send().await;
            let retry = match &result {
                Ok(response) => Self::should_retry_status(response.status()),
                Err(e) => Self::should_retry_error(e),
            };

            if retry && attempt < self.config.max_retries {
                attempt += 1;
                let delay = self.retry_delay(attempt);
                match &result {
                    Ok(response) => {
                        tracing::debug!(url, status = response.status().as_u16(), ?delay, "retrying");
                    }
                    Err(e) => tracing::debug!(url, error = %e, ?delay, "retrying after transport error"),
                }
                tokio::time::sleep(delay).await;
                continue;
            }

            let response = result?;
            let status = response.status().as_u16();
            let body = response.bytes().await?;
            return Ok(FetchResponse::new(status, body));
        }
    }
}
