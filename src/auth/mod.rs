//! Authentication module
//!
//! Supports: none, Basic (username and password or API token), Bearer
//! (personal access token).

mod authenticator;
mod types;

pub use authenticator::Authenticator;
pub use types::AuthConfig;

#[cfg(test)]
mod tests;
