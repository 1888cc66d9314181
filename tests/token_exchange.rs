//! Token exchange tests against a wiremock token endpoint.

mod common;

use common::{EMAIL, TEST_PUBLIC_KEY, assertion_from_form, config_for, credential};
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use satoken::jwt::JwtClaims;
use satoken::{
    CredentialError, Error, FixedClock, OAuthConfig, ProtocolError, ServiceAccount,
    ServiceAccountCredential, TokenExchangeClient, TokenSource,
};
use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing_subscriber::fmt::MakeWriter;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn service_account(config: &OAuthConfig) -> ServiceAccount {
    ServiceAccount::new(
        credential(config),
        &["https://www.googleapis.com/auth/cloud-platform"],
        TokenExchangeClient::new(config),
    )
}

#[tokio::test]
async fn exchange_returns_access_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(header("content-type", "application/x-www-form-urlencoded"))
        .and(body_string_contains(
            "grant_type=urn%3Aietf%3Aparams%3Aoauth%3Agrant-type%3Ajwt-bearer",
        ))
        .and(body_string_contains("assertion="))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "abc123",
            "token_type": "Bearer",
            "expires_in": 3600,
        })))
        .expect(1)
        .mount(&server)
        .await;

    let token = service_account(&config_for(&server))
        .get_access_token()
        .await
        .unwrap();
    assert_eq!(token.access_token, "abc123");
    assert_eq!(token.token_type.as_deref(), Some("Bearer"));
    assert_eq!(token.expires_in, Some(3600));
}

#[tokio::test]
async fn exchanged_assertion_is_a_valid_rs256_jwt() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"access_token": "abc123"})),
        )
        .mount(&server)
        .await;

    let config = config_for(&server);
    service_account(&config).get_access_token().await.unwrap();

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    let assertion = assertion_from_form(&requests[0].body);

    let mut validation = Validation::new(Algorithm::RS256);
    validation.set_audience(&[&config.token_uri]);
    validation.set_issuer(&[EMAIL]);
    validation.set_required_spec_claims(&["exp", "iss", "aud"]);
    let key = DecodingKey::from_rsa_pem(TEST_PUBLIC_KEY.as_bytes()).unwrap();
    let decoded = jsonwebtoken::decode::<JwtClaims>(&assertion, &key, &validation).unwrap();

    assert_eq!(decoded.header.alg, Algorithm::RS256);
    assert_eq!(decoded.header.typ.as_deref(), Some("JWT"));
    assert_eq!(decoded.claims.exp - decoded.claims.iat, 60);
    assert_eq!(
        decoded.claims.scope,
        "https://www.googleapis.com/auth/cloud-platform"
    );
}

#[tokio::test]
async fn oauth_error_is_a_protocol_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(serde_json::json!({"error": "invalid_grant"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let err = service_account(&config_for(&server))
        .get_access_token()
        .await
        .unwrap_err();
    match err {
        Error::Protocol(ProtocolError::OAuth(e)) => {
            assert_eq!(e.error, "invalid_grant");
            assert_eq!(e.error_description, None);
        }
        e => panic!("unexpected error {e:?}"),
    }
}

#[tokio::test]
async fn structured_error_object_is_an_oauth_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "error": {"code": 400, "message": "bad", "status": "INVALID_ARGUMENT"},
        })))
        .expect(1)
        .mount(&server)
        .await;

    let err = service_account(&config_for(&server))
        .get_access_token()
        .await
        .unwrap_err();
    match err {
        Error::Protocol(ProtocolError::OAuth(e)) => {
            assert_eq!(e.error, "INVALID_ARGUMENT");
            assert_eq!(e.error_description.as_deref(), Some("bad"));
        }
        e => panic!("unexpected error {e:?}"),
    }
}

#[tokio::test]
async fn failures_are_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(503).set_body_string("Service Unavailable"))
        .expect(1)
        .mount(&server)
        .await;

    let err = service_account(&config_for(&server))
        .get_access_token()
        .await
        .unwrap_err();
    assert!(
        matches!(
            err,
            Error::Protocol(ProtocolError::InvalidJson { status: 503, .. })
        ),
        "{err:?}"
    );
}

#[tokio::test]
async fn success_without_token_is_a_protocol_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"token_type": "Bearer"})),
        )
        .mount(&server)
        .await;

    let err = service_account(&config_for(&server))
        .get_access_token()
        .await
        .unwrap_err();
    assert!(
        matches!(
            err,
            Error::Protocol(ProtocolError::MissingAccessToken { status: 200 })
        ),
        "{err:?}"
    );
}

#[tokio::test]
async fn unreachable_endpoint_is_a_transport_error() {
    // Grab a free port, then close it so nothing is listening there.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    let config = OAuthConfig::default().with_token_uri(format!("http://127.0.0.1:{port}/token"));

    let err = service_account(&config)
        .get_access_token()
        .await
        .unwrap_err();
    match err {
        Error::Transport(e) => assert_eq!(e.url, config.token_uri),
        e => panic!("unexpected error {e:?}"),
    }
}

#[tokio::test]
async fn explicit_timeout_is_a_transport_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"access_token": "abc123"}))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let config = config_for(&server);
    let client = satoken::exchange::http_client(Some(Duration::from_millis(200))).unwrap();
    let sa = ServiceAccount::new(
        credential(&config),
        &["openid"],
        TokenExchangeClient::with_client(&config, client),
    );
    let err = sa.get_access_token().await.unwrap_err();
    match err {
        Error::Transport(e) => assert!(e.source.is_timeout(), "{e:?}"),
        e => panic!("unexpected error {e:?}"),
    }
}

#[tokio::test]
async fn missing_private_key_fails_before_any_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let config = config_for(&server);
    let source = serde_json::json!({"type": "service_account", "client_email": EMAIL}).to_string();
    let err = ServiceAccountCredential::load(&source, &config).unwrap_err();
    assert!(
        matches!(
            err,
            Error::Credential(CredentialError::MissingField("private_key"))
        ),
        "{err:?}"
    );
}

#[tokio::test]
async fn fixed_clock_assertion_is_what_gets_sent() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"access_token": "abc123"})),
        )
        .mount(&server)
        .await;

    let config = config_for(&server);
    let sa = service_account(&config).with_clock(FixedClock::from_timestamp(1000));
    let expected = sa.assertion().unwrap();
    sa.get_access_token().await.unwrap();

    let requests = server.received_requests().await.unwrap();
    assert_eq!(assertion_from_form(&requests[0].body), expected.as_str());
    let claims = expected.claims().unwrap();
    assert_eq!(claims.iat, 1000);
    assert_eq!(claims.exp, 1060);
    assert_eq!(claims.aud, config.token_uri);
}

/// Collects formatted log lines in memory.
#[derive(Clone, Default)]
struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    fn contents(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }
}

impl io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogBuffer {
    type Writer = LogBuffer;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

#[tokio::test]
async fn debug_log_shows_response_body_and_redacted_assertion() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"{"access_token":"abc123","expires_in":3599}"#,
        ))
        .mount(&server)
        .await;

    let logs = LogBuffer::default();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .with_writer(logs.clone())
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    let config = config_for(&server);
    let sa = service_account(&config).with_clock(FixedClock::from_timestamp(1000));
    let sent = sa.assertion().unwrap();
    sa.get_access_token().await.unwrap();

    let logs = logs.contents();
    assert!(
        logs.contains(r#"Token endpoint response body: {"access_token":"abc123","expires_in":3599}"#),
        "{logs}"
    );
    assert!(
        logs.contains("assertion: SignedAssertion(eyJhbGciOiJSUzI1NiIsInR5cCI6IkpXVCJ9.<redacted>)"),
        "{logs}"
    );
    let signature = sent.as_str().rsplit('.').next().unwrap();
    assert!(!logs.contains(signature), "{logs}");
}
