//! Auth configuration types
//!
//! The runtime form of a connection's credentials.

use crate::config::ConnectionAuth;

/// Authentication applied to every request of a connection
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum AuthConfig {
    /// No authentication required
    #[default]
    None,

    /// HTTP Basic authentication
    Basic {
        /// Username
        username: String,
        /// Password or API token
        password: String,
    },

    /// Bearer token authentication
    Bearer {
        /// The bearer token
        token: String,
    },
}

impl From<&ConnectionAuth> for AuthConfig {
    fn from(auth: &ConnectionAuth) -> Self {
        match auth {
            ConnectionAuth::None => Self::None,
            ConnectionAuth::Basic { username, password } => Self::Basic {
                username: username.clone(),
                password: password.clone(),
            },
            ConnectionAuth::AccessToken { token } => Self::Bearer {
                token: token.clone(),
            },
        }
    }
}
