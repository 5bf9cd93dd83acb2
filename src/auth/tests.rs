//! Tests for the auth module

use super::*;
use crate::config::ConnectionAuth;

fn header_of(auth: &Authenticator) -> Option<String> {
    let client = reqwest::Client::new();
    let req = auth.apply(client.get("https://example.com/api"));
    let built = req.build().unwrap();
    built
        .headers()
        .get("Authorization")
        .map(|v| v.to_str().unwrap().to_string())
}

#[test]
fn test_no_auth() {
    let auth = Authenticator::new(AuthConfig::None).unwrap();
    assert_eq!(header_of(&auth), None);
}

#[test]
fn test_basic_auth() {
    let auth = Authenticator::new(AuthConfig::Basic {
        username: "bot".to_string(),
        password: "secret".to_string(),
    })
    .unwrap();
    assert_eq!(header_of(&auth).as_deref(), Some("Basic Ym90OnNlY3JldA=="));
}

#[test]
fn test_bearer_auth() {
    let auth = Authenticator::new(AuthConfig::Bearer {
        token: "pat-123".to_string(),
    })
    .unwrap();
    assert_eq!(header_of(&auth).as_deref(), Some("Bearer pat-123"));
}

#[test]
fn test_incomplete_credentials_are_rejected() {
    let err = Authenticator::new(AuthConfig::Basic {
        username: String::new(),
        password: "x".to_string(),
    })
    .unwrap_err();
    assert!(matches!(err, crate::error::Error::Auth { .. }));

    assert!(Authenticator::new(AuthConfig::Bearer {
        token: String::new()
    })
    .is_err());
}

#[test]
fn test_from_connection_auth() {
    let basic = ConnectionAuth::Basic {
        username: "bot".to_string(),
        password: "secret".to_string(),
    };
    assert!(matches!(AuthConfig::from(&basic), AuthConfig::Basic { .. }));

    let token = ConnectionAuth::AccessToken {
        token: "t".to_string(),
    };
    assert_eq!(
        AuthConfig::from(&token),
        AuthConfig::Bearer {
            token: "t".to_string()
        }
    );
    assert_eq!(AuthConfig::from(&ConnectionAuth::None), AuthConfig::None);
}
