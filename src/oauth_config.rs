use std::string::ToString;
use std::sync::LazyLock;

/// The grant type sent with every assertion exchange (RFC 7523).
pub const JWT_BEARER_GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// The scope requested when the caller does not ask for one.
pub const DEFAULT_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";

pub static GOOGLE_OAUTH_CONFIG: LazyLock<OAuthConfig> = LazyLock::new(|| OAuthConfig {
    token_uri: "https://www.googleapis.com/oauth2/v4/token".to_string(),
    tokeninfo_uri: "https://www.googleapis.com/oauth2/v3/tokeninfo".to_string(),
    default_scope: DEFAULT_SCOPE.to_string(),
});

fn default_scope() -> String {
    DEFAULT_SCOPE.to_string()
}

/// The endpoints of the authorization server that tokens are requested from.
#[derive(Debug, serde::Serialize, serde::Deserialize, Clone, PartialEq, Eq)]
pub struct OAuthConfig {
    /// Where assertions are exchanged for access tokens.
    ///
    /// This is also the `aud` claim of every assertion, since the server only accepts
    /// assertions addressed to itself.
    pub token_uri: String,
    /// Where issued access tokens can be inspected. Only used for diagnostics.
    pub tokeninfo_uri: String,
    /// Requested when the caller asks for no scopes at all.
    #[serde(default = "default_scope")]
    pub default_scope: String,
}

impl Default for OAuthConfig {
    fn default() -> Self {
        GOOGLE_OAUTH_CONFIG.clone()
    }
}

impl OAuthConfig {
    /// Replace the token endpoint, e.g. to point at a private authorization server.
    pub fn with_token_uri(self, token_uri: impl Into<String>) -> Self {
        Self {
            token_uri: token_uri.into(),
            ..self
        }
    }

    /// Replace the scope requested when none is given.
    pub fn with_default_scope(self, default_scope: impl Into<String>) -> Self {
        Self {
            default_scope: default_scope.into(),
            ..self
        }
    }

    /// Replace the introspection endpoint.
    pub fn with_tokeninfo_uri(self, tokeninfo_uri: impl Into<String>) -> Self {
        Self {
            tokeninfo_uri: tokeninfo_uri.into(),
            ..self
        }
    }
}
