//! HTTP client with retry and rate limiting
//!
//! Every request waits on the connection's rate limiter first. 429 and 5xx
//! responses, timeouts and connection errors are retried with backoff;
//! anything else that is not 2xx ends the request.

use super::rate_limit::{RateLimiter, RateLimiterConfig, RateLimiterPool};
use super::{ApiClient, ApiResponse};
use crate::auth::{AuthConfig, Authenticator};
use crate::config::ConnectionConfig;
use crate::error::{Error, Result};
use crate::types::BackoffType;
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};

/// Configuration for the HTTP client
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Base URL for relative paths
    pub base_url: Option<String>,
    /// Request timeout
    pub timeout: Duration,
    /// Maximum number of retries
    pub max_retries: u32,
    /// Initial delay for backoff
    pub initial_backoff: Duration,
    /// Maximum delay for backoff
    pub max_backoff: Duration,
    /// Type of backoff strategy
    pub backoff_type: BackoffType,
    /// Own rate limiter, ignored when a shared limiter is set
    pub rate_limit: Option<RateLimiterConfig>,
    /// Headers sent with every request
    pub default_headers: HashMap<String, String>,
    /// User agent string
    pub user_agent: String,
    /// Proxy URL
    pub proxy: Option<String>,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout: Duration::from_secs(30),
            max_retries: 3,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(60),
            backoff_type: BackoffType::Exponential,
            rate_limit: Some(RateLimiterConfig::default()),
            default_headers: HashMap::from([(
                "Accept".to_string(),
                "application/json".to_string(),
            )]),
            user_agent: format!("freshrelease-connector/{}", env!("CARGO_PKG_VERSION")),
            proxy: None,
        }
    }
}

impl HttpClientConfig {
    /// Create a new config builder
    pub fn builder() -> HttpClientConfigBuilder {
        HttpClientConfigBuilder::default()
    }
}

/// Builder for HTTP client config
#[derive(Default)]
pub struct HttpClientConfigBuilder {
    config: HttpClientConfig,
}

impl HttpClientConfigBuilder {
    /// Set the base URL
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = Some(url.into());
        self
    }

    /// Set the request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set max retries
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.config.max_retries = retries;
        self
    }

    /// Set backoff configuration
    pub fn backoff(mut self, backoff_type: BackoffType, initial: Duration, max: Duration) -> Self {
        self.config.backoff_type = backoff_type;
        self.config.initial_backoff = initial;
        self.config.max_backoff = max;
        self
    }

    /// Give the client its own rate limiter
    pub fn rate_limit(mut self, config: RateLimiterConfig) -> Self {
        self.config.rate_limit = Some(config);
        self
    }

    /// Disable the client's own rate limiter
    pub fn no_rate_limit(mut self) -> Self {
        self.config.rate_limit = None;
        self
    }

    /// Add a default header
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.default_headers.insert(key.into(), value.into());
        self
    }

    /// Set user agent
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.config.user_agent = agent.into();
        self
    }

    /// Route requests through a proxy
    pub fn proxy(mut self, proxy: impl Into<String>) -> Self {
        self.config.proxy = Some(proxy.into());
        self
    }

    /// Build the config
    pub fn build(self) -> HttpClientConfig {
        self.config
    }
}

/// Outcome of one attempt
enum Attempt {
    Done(Response),
    /// Retry after the given delay, remembering the error in case it was the last try
    Retry(Duration, Error),
    Fail(Error),
}

/// HTTP client with retry and rate limiting
pub struct HttpClient {
    client: Client,
    config: HttpClientConfig,
    authenticator: Option<Authenticator>,
    rate_limiter: Option<RateLimiter>,
}

impl HttpClient {
    /// Create a new HTTP client with custom configuration
    pub fn with_config(config: HttpClientConfig) -> Result<Self> {
        let mut builder = Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent);
        if let Some(proxy) = &config.proxy {
            builder = builder.proxy(reqwest::Proxy::all(proxy)?);
        }

        Ok(Self {
            client: builder.build()?,
            rate_limiter: config.rate_limit.as_ref().map(RateLimiter::new),
            authenticator: None,
            config,
        })
    }

    /// Create the client of a connection
    ///
    /// The rate limiter comes from the pool, so every client built for the
    /// same connection draws from one budget.
    pub fn for_connection(connection: &ConnectionConfig, pool: &RateLimiterPool) -> Result<Self> {
        connection.validate()?;

        let http = &connection.http;
        let mut builder = HttpClientConfig::builder()
            .base_url(connection.base_url())
            .timeout(Duration::from_secs(http.timeout_seconds))
            .max_retries(http.max_retries)
            .backoff(
                http.backoff,
                Duration::from_millis(http.initial_backoff_ms),
                Duration::from_secs(60),
            )
            .no_rate_limit();
        if let Some(proxy) = connection.proxy.as_deref().filter(|p| !p.is_empty()) {
            builder = builder.proxy(proxy);
        }

        let limiter = pool.get_or_create(
            connection.id,
            &RateLimiterConfig::per_hour(connection.rate_limit_per_hour),
        );
        let auth = Authenticator::new(AuthConfig::from(&connection.auth))?;

        Ok(Self::with_config(builder.build())?
            .with_authenticator(auth)
            .with_rate_limiter(limiter))
    }

    /// Set the authenticator
    #[must_use]
    pub fn with_authenticator(mut self, authenticator: Authenticator) -> Self {
        self.authenticator = Some(authenticator);
        self
    }

    /// Use a shared rate limiter
    #[must_use]
    pub fn with_rate_limiter(mut self, limiter: RateLimiter) -> Self {
        self.rate_limiter = Some(limiter);
        self
    }

    /// Check if rate limiting is enabled
    pub fn has_rate_limiter(&self) -> bool {
        self.rate_limiter.is_some()
    }

    /// GET a path, retrying transient failures
    ///
    /// Non-2xx responses that are not retried, or that exhaust the retries,
    /// come back as [`Error::HttpStatus`].
    pub async fn fetch(&self, path: &str, query: &[(String, String)]) -> Result<Response> {
        let url = self.build_url(path);
        let max_retries = self.config.max_retries;
        let mut attempt = 0;

        loop {
            if let Some(limiter) = &self.rate_limiter {
                limiter.wait().await;
            }

            match self.attempt(&url, query, attempt).await {
                Attempt::Done(response) => {
                    debug!("GET {} -> {}", response.url(), response.status());
                    return Ok(response);
                }
                Attempt::Retry(delay, err) if attempt < max_retries => {
                    warn!(
                        "{err}, attempt {}/{}, retrying in {:?}",
                        attempt + 1,
                        max_retries + 1,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Attempt::Retry(_, err) | Attempt::Fail(err) => return Err(err),
            }
        }
    }

    async fn attempt(&self, url: &str, query: &[(String, String)], attempt: u32) -> Attempt {
        let mut req = self.client.get(url);
        for (key, value) in &self.config.default_headers {
            req = req.header(key.as_str(), value.as_str());
        }
        if !query.is_empty() {
            req = req.query(query);
        }
        if let Some(auth) = &self.authenticator {
            req = auth.apply(req);
        }

        let response = match req.send().await {
            Ok(response) => response,
            Err(e) if e.is_timeout() => {
                let err = Error::Timeout {
                    url: url.to_string(),
                    timeout_ms: self.config.timeout.as_millis() as u64,
                };
                return Attempt::Retry(self.calculate_backoff(attempt), err);
            }
            Err(e) if e.is_connect() => {
                return Attempt::Retry(self.calculate_backoff(attempt), Error::Http(e));
            }
            Err(e) => return Attempt::Fail(Error::Http(e)),
        };

        let status = response.status();
        if status.is_success() {
            return Attempt::Done(response);
        }

        let response_url = response.url().to_string();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = extract_retry_after(&response);
            let err = Error::RateLimited {
                url: response_url,
                retry_after_seconds: retry_after,
            };
            return Attempt::Retry(Duration::from_secs(retry_after), err);
        }

        let retryable = is_retryable_status(status);
        let body = response.text().await.unwrap_or_default();
        let err = Error::http_status(status.as_u16(), response_url, body);
        if retryable {
            Attempt::Retry(self.calculate_backoff(attempt), err)
        } else {
            Attempt::Fail(err)
        }
    }

    /// Build full URL from path
    fn build_url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }

        match &self.config.base_url {
            Some(base) => format!(
                "{}/{}",
                base.trim_end_matches('/'),
                path.trim_start_matches('/')
            ),
            None => path.to_string(),
        }
    }

    /// Calculate backoff delay for a given attempt
    pub fn calculate_backoff(&self, attempt: u32) -> Duration {
        let initial = self.config.initial_backoff;
        let delay = match self.config.backoff_type {
            BackoffType::Constant => initial,
            BackoffType::Linear => initial * (attempt + 1),
            BackoffType::Exponential => initial * 2u32.saturating_pow(attempt),
        };
        delay.min(self.config.max_backoff)
    }
}

#[async_trait]
impl ApiClient for HttpClient {
    async fn get(&self, path: &str, query: &[(String, String)]) -> Result<ApiResponse> {
        let response = self.fetch(path, query).await?;
        let status = response.status().as_u16();
        let url = response.url().to_string();
        let body = response.text().await?;
        Ok(ApiResponse { status, url, body })
    }
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("config", &self.config)
            .field("has_authenticator", &self.authenticator.is_some())
            .field("has_rate_limiter", &self.rate_limiter.is_some())
            .finish_non_exhaustive()
    }
}

/// 5xx statuses worth retrying, Cloudflare's 52x included
fn is_retryable_status(status: StatusCode) -> bool {
    matches!(status.as_u16(), 500 | 502 | 503 | 504 | 520..=524)
}

/// Seconds from the retry-after header, 60 when absent
fn extract_retry_after(response: &Response) -> u64 {
    response
        .headers()
        .get("retry-after")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse().ok())
        .unwrap_or(60)
}
