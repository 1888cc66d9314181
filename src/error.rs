use std::path::PathBuf;

/// Failure to turn a key file into a [`crate::ServiceAccountCredential`].
#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("Could not read credentials file at {}", .path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Credentials are not well-formed JSON")]
    Malformed(#[source] serde_json::Error),
    #[error("Credentials are missing the required field `{0}`")]
    MissingField(&'static str),
    #[error("Credentials are for a `{0}` account, not a service account")]
    NotServiceAccount(String),
}

/// The private key could not be read as a PKCS8-encoded RSA key.
#[derive(Debug, thiserror::Error)]
pub enum KeyFormatError {
    #[error("Private key is not valid base64")]
    Base64(#[from] base64::DecodeError),
    #[error("Private key is not a PKCS8-encoded RSA key")]
    Pkcs8(#[from] rsa::pkcs8::Error),
}

/// The assertion could not be produced from a well-formed key.
#[derive(Debug, thiserror::Error)]
pub enum SigningError {
    #[error("Could not serialize assertion segment")]
    Encode(#[from] serde_json::Error),
    #[error("Could not sign assertion with RS256")]
    Rsa(#[from] rsa::signature::Error),
}

/// The authorization server could not be reached, or the connection broke mid-response.
#[derive(Debug, thiserror::Error)]
#[error("Request to {url} failed")]
pub struct TransportError {
    pub url: String,
    #[source]
    pub source: reqwest::Error,
}

/// The body that an OAuth endpoint returns when it refuses a request.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct OAuthErrorResponse {
    pub error: String,
    #[serde(default)]
    pub error_description: Option<String>,
}

impl std::fmt::Display for OAuthErrorResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.error_description {
            Some(description) => write!(f, "{} ({})", self.error, description),
            None => write!(f, "{}", self.error),
        }
    }
}

/// The server answered, but not with what the protocol requires.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("Response from {url} (HTTP {status}) is not valid JSON")]
    InvalidJson {
        url: String,
        status: u16,
        #[source]
        source: serde_json::Error,
    },
    #[error("Error returned from token endpoint: {0}")]
    OAuth(OAuthErrorResponse),
    #[error("Token endpoint response (HTTP {status}) did not contain an access_token")]
    MissingAccessToken { status: u16 },
}

/// Any failure in the token pipeline.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Credential(#[from] CredentialError),
    #[error(transparent)]
    KeyFormat(#[from] KeyFormatError),
    #[error(transparent)]
    Signing(#[from] SigningError),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn oauth_error_display_includes_description() {
        let err = ProtocolError::OAuth(OAuthErrorResponse {
            error: "invalid_grant".to_string(),
            error_description: Some("Invalid JWT Signature.".to_string()),
        });
        assert_eq!(
            err.to_string(),
            "Error returned from token endpoint: invalid_grant (Invalid JWT Signature.)"
        );
    }

    #[test]
    fn umbrella_is_transparent() {
        let err: Error = CredentialError::MissingField("private_key").into();
        assert_eq!(
            err.to_string(),
            "Credentials are missing the required field `private_key`"
        );
    }
}
