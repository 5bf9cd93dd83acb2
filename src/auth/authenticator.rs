//! Authenticator implementation

use super::types::AuthConfig;
use crate::error::{Error, Result};
use reqwest::RequestBuilder;

/// Applies a connection's credentials to outgoing requests
#[derive(Debug, Clone)]
pub struct Authenticator {
    config: AuthConfig,
}

impl Authenticator {
    /// Create an authenticator, rejecting incomplete credentials
    pub fn new(config: AuthConfig) -> Result<Self> {
        match &config {
            AuthConfig::Basic { username, .. } if username.is_empty() => {
                return Err(Error::auth("basic auth requires a username"));
            }
            AuthConfig::Bearer { token } if token.is_empty() => {
                return Err(Error::auth("access token is empty"));
            }
            _ => {}
        }
        Ok(Self { config })
    }

    /// Apply authentication to a request builder
    pub fn apply(&self, req: RequestBuilder) -> RequestBuilder {
        match &self.config {
            AuthConfig::None => req,
            AuthConfig::Basic { username, password } => req.basic_auth(username, Some(password)),
            AuthConfig::Bearer { token } => req.bearer_auth(token),
        }
    }

    /// Get the auth config
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }
}
