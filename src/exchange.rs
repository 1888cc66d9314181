use crate::error::{OAuthErrorResponse, ProtocolError, Result, TransportError};
use crate::jwt::SignedAssertion;
use crate::oauth_config::{JWT_BEARER_GRANT_TYPE, OAuthConfig};
use std::time::Duration;

/// Build the HTTP client shared by the exchange and introspection calls.
///
/// No timeout is applied unless one is asked for.
pub fn http_client(timeout: Option<Duration>) -> reqwest::Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder();
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    builder.build()
}

/// Everything the token endpoint can send back, success or failure.
#[derive(Debug, serde::Deserialize)]
struct TokenEndpointBody {
    access_token: Option<String>,
    token_type: Option<String>,
    expires_in: Option<u64>,
    error: Option<serde_json::Value>,
    error_description: Option<String>,
}

/// Turn whatever sits in the `error` field into an [`OAuthErrorResponse`].
///
/// RFC 6749 servers send a string code. Google front ends sometimes answer with a
/// `{"code": 400, "message": "...", "status": "INVALID_ARGUMENT"}` object instead.
fn oauth_error(error: serde_json::Value, error_description: Option<String>) -> OAuthErrorResponse {
    match error {
        serde_json::Value::String(error) => OAuthErrorResponse {
            error,
            error_description,
        },
        serde_json::Value::Object(fields) => {
            let text = |key: &str| fields.get(key).and_then(|v| v.as_str()).map(str::to_string);
            let error = text("status")
                .or_else(|| fields.get("code").map(|code| code.to_string()))
                .unwrap_or_else(|| "unknown_error".to_string());
            OAuthErrorResponse {
                error,
                error_description: text("message").or(error_description),
            }
        }
        other => OAuthErrorResponse {
            error: other.to_string(),
            error_description,
        },
    }
}

/// A freshly issued access token.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: Option<String>,
    /// Lifetime in seconds, counted from when the token was issued.
    pub expires_in: Option<u64>,
    /// The response body exactly as the server sent it.
    pub raw: String,
}

impl TokenResponse {
    /// When the token stops being valid, if the server said.
    pub fn expires_at(
        &self,
        issued_at: chrono::DateTime<chrono::Utc>,
    ) -> Option<chrono::DateTime<chrono::Utc>> {
        let secs = i64::try_from(self.expires_in?).ok()?;
        issued_at.checked_add_signed(chrono::TimeDelta::try_seconds(secs)?)
    }

    fn from_body(status: reqwest::StatusCode, url: &str, raw: String) -> Result<Self> {
        let body: TokenEndpointBody =
            serde_json::from_str(&raw).map_err(|source| ProtocolError::InvalidJson {
                url: url.to_string(),
                status: status.as_u16(),
                source,
            })?;
        if let Some(error) = body.error {
            return Err(ProtocolError::OAuth(oauth_error(error, body.error_description)).into());
        }
        let access_token = body
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or(ProtocolError::MissingAccessToken {
                status: status.as_u16(),
            })?;
        Ok(Self {
            access_token,
            token_type: body.token_type,
            expires_in: body.expires_in,
            raw,
        })
    }
}

/// Redeems signed assertions for access tokens under the JWT-bearer grant.
///
/// Every call is exactly one request. Nothing is retried: an assertion only lives for
/// a minute, so a failed exchange should start over with a new one.
#[derive(Clone, Debug)]
pub struct TokenExchangeClient {
    client: reqwest::Client,
    token_uri: String,
}

impl TokenExchangeClient {
    pub fn new(oauth_config: &OAuthConfig) -> Self {
        Self::with_client(oauth_config, reqwest::Client::new())
    }

    /// Use a preconfigured client, e.g. one from [`http_client`] with a timeout.
    pub fn with_client(oauth_config: &OAuthConfig, client: reqwest::Client) -> Self {
        Self {
            client,
            token_uri: oauth_config.token_uri.clone(),
        }
    }

    pub fn token_uri(&self) -> &str {
        &self.token_uri
    }

    pub async fn exchange(&self, assertion: &SignedAssertion) -> Result<TokenResponse> {
        tracing::debug!("Exchanging assertion at {}", self.token_uri);
        tracing::debug!("assertion: {:?}", assertion);
        let transport_error = |source| TransportError {
            url: self.token_uri.clone(),
            source,
        };
        let response = self
            .client
            .post(&self.token_uri)
            .form(&[
                ("assertion", assertion.as_str()),
                ("grant_type", JWT_BEARER_GRANT_TYPE),
            ])
            .send()
            .await
            .map_err(transport_error)?;
        let status = response.status();
        tracing::debug!("Token endpoint responded with {}", status);
        let raw = response.text().await.map_err(transport_error)?;
        tracing::debug!("Token endpoint response body: {}", raw);

        match TokenResponse::from_body(status, &self.token_uri, raw) {
            Ok(token) => {
                tracing::debug!("Successfully exchanged assertion for an access token");
                Ok(token)
            }
            Err(e) => {
                tracing::debug!("Could not exchange assertion: {}", e);
                Err(e)
            }
        }
    }
}
