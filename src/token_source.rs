use crate::error::Result;
use crate::exchange::TokenResponse;

/// Something that can hand out OAuth2 access tokens.
#[async_trait::async_trait]
pub trait TokenSource: Send + Sync + std::fmt::Debug {
    /// A human readable description of this source e.g. "service account"
    fn kind(&self) -> &'static str;

    /// Fetch a new access token.
    ///
    /// Tokens are never cached, so every call goes to the network.
    async fn get_access_token(&self) -> Result<TokenResponse>;
}
