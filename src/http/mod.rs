//! HTTP client module
//!
//! Provides the remote API seam and its HTTP implementation.
//!
//! # Features
//!
//! - **ApiClient**: the trait collectors call; tests may stub it
//! - **Automatic Retries**: 429/5xx, timeouts and connection errors
//! - **Rate Limiting**: one token bucket per connection, shared by boards
//! - **Authentication**: Basic or Bearer, from the connection config

mod client;
mod rate_limit;

pub use client::{HttpClient, HttpClientConfig, HttpClientConfigBuilder};
pub use rate_limit::{RateLimiter, RateLimiterConfig, RateLimiterPool, DEFAULT_REQUESTS_PER_HOUR};

use crate::error::{Error, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;

/// A successful response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    /// HTTP status
    pub status: u16,
    /// Final request URL, query included
    pub url: String,
    /// Response body
    pub body: String,
}

impl ApiResponse {
    /// Decode the body as JSON
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_str(&self.body)
            .map_err(|e| Error::decode(format!("{} returned invalid JSON: {e}", self.url)))
    }
}

/// Read access to the remote REST API
///
/// Paths are relative to the connection endpoint. Implementations turn
/// non-2xx responses into [`Error::HttpStatus`].
#[async_trait]
pub trait ApiClient: Send + Sync {
    /// GET a path with query parameters
    async fn get(&self, path: &str, query: &[(String, String)]) -> Result<ApiResponse>;
}
