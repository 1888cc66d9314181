#![allow(dead_code)]

use satoken::{OAuthConfig, ServiceAccountCredential};
use wiremock::MockServer;

pub const TEST_KEY: &str = include_str!("../data/test_key.pem");
pub const TEST_PUBLIC_KEY: &str = include_str!("../data/test_key.pub.pem");
pub const EMAIL: &str = "svc@example.iam.gserviceaccount.com";

/// A config whose endpoints all live on `server`.
pub fn config_for(server: &MockServer) -> OAuthConfig {
    OAuthConfig::default()
        .with_token_uri(format!("{}/token", server.uri()))
        .with_tokeninfo_uri(format!("{}/tokeninfo", server.uri()))
}

pub fn key_file() -> String {
    serde_json::json!({
        "type": "service_account",
        "project_id": "example",
        "private_key_id": "0123456789abcdef",
        "private_key": TEST_KEY,
        "client_email": EMAIL,
        "client_id": "1234567890",
        "token_uri": "https://oauth2.googleapis.com/token",
    })
    .to_string()
}

pub fn credential(config: &OAuthConfig) -> ServiceAccountCredential {
    ServiceAccountCredential::load(&key_file(), config).unwrap()
}

/// Pull the `assertion` field back out of a form-encoded exchange request.
pub fn assertion_from_form(body: &[u8]) -> String {
    let body = std::str::from_utf8(body).unwrap();
    body.split('&')
        .find_map(|pair| pair.strip_prefix("assertion="))
        .unwrap()
        .to_string()
}
