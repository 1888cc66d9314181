use crate::error::{ProtocolError, Result, TransportError};
use crate::oauth_config::OAuthConfig;

/// Asks the authorization server what it knows about an access token.
///
/// This is only for showing to a human; nothing else consumes the result.
#[derive(Clone, Debug)]
pub struct TokenIntrospector {
    client: reqwest::Client,
    tokeninfo_uri: String,
}

impl TokenIntrospector {
    pub fn new(oauth_config: &OAuthConfig) -> Self {
        Self::with_client(oauth_config, reqwest::Client::new())
    }

    pub fn with_client(oauth_config: &OAuthConfig, client: reqwest::Client) -> Self {
        Self {
            client,
            tokeninfo_uri: oauth_config.tokeninfo_uri.clone(),
        }
    }

    /// Fetch token metadata. The JSON body is returned exactly as received.
    ///
    /// Error statuses are not failures here: the server explains what is wrong with the
    /// token in the body, which is exactly what the caller wants to see.
    pub async fn inspect(&self, token: &str) -> Result<String> {
        tracing::debug!("Inspecting access token at {}", self.tokeninfo_uri);
        let transport_error = |source| TransportError {
            url: self.tokeninfo_uri.clone(),
            source,
        };
        let response = self
            .client
            .get(&self.tokeninfo_uri)
            .query(&[("access_token", token)])
            .send()
            .await
            .map_err(transport_error)?;
        let status = response.status();
        let body = response.text().await.map_err(transport_error)?;
        serde_json::from_str::<serde::de::IgnoredAny>(&body).map_err(|source| {
            ProtocolError::InvalidJson {
                url: self.tokeninfo_uri.clone(),
                status: status.as_u16(),
                source,
            }
        })?;
        if !status.is_success() {
            tracing::warn!(
                "Token info endpoint responded with {}; passing its body through",
                status
            );
        }
        Ok(body)
    }
}
