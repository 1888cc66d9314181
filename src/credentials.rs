use crate::error::{CredentialError, Result};
use crate::oauth_config::OAuthConfig;
use crate::signer::parse_private_key;
use rsa::RsaPrivateKey;
use std::fmt::{Debug, Formatter};
use std::path::Path;

/// The fields of a service account json key file that we care about.
///
/// Everything is optional here so that a missing field can be reported by name,
/// rather than as a generic decoding error.
#[derive(Clone, Debug, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
struct ServiceAccountKeyFile {
    #[serde(rename = "type")]
    account_type: Option<String>,
    /// The client email address of the service account.
    /// (e.g., "my-sa@my-project.iam.gserviceaccount.com")
    client_email: Option<String>,
    /// The PEM-encoded PKCS#8 private key string associated with the service account.
    private_key: Option<String>,
    private_key_id: Option<String>,
    project_id: Option<String>,
}

fn required(value: Option<String>, field: &'static str) -> Result<String, CredentialError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or(CredentialError::MissingField(field))
}

/// A service account that can sign its own assertions.
#[derive(Clone)]
pub struct ServiceAccountCredential {
    /// The `iss` of every assertion signed by this account.
    pub issuer_email: String,
    pub private_key: RsaPrivateKey,
    /// Where assertions are redeemed. This is also their audience.
    pub token_endpoint: String,
    /// Requested when an assertion is built without any scopes.
    pub default_scope: String,
    pub private_key_id: Option<String>,
    pub project_id: Option<String>,
}

impl ServiceAccountCredential {
    /// Parse the contents of a service account json key file.
    ///
    /// The token endpoint and default scope are taken from `oauth_config`, not from the file.
    pub fn load(source: &str, oauth_config: &OAuthConfig) -> Result<Self> {
        let key_file: ServiceAccountKeyFile =
            serde_json::from_str(source).map_err(CredentialError::Malformed)?;
        if let Some(account_type) = key_file.account_type {
            if account_type != "service_account" {
                return Err(CredentialError::NotServiceAccount(account_type).into());
            }
        }
        let issuer_email = required(key_file.client_email, "client_email")?;
        let private_key = required(key_file.private_key, "private_key")?;
        let private_key = parse_private_key(&private_key)?;
        tracing::debug!("Loaded service account credentials for {}", issuer_email);

        Ok(Self {
            issuer_email,
            private_key,
            token_endpoint: oauth_config.token_uri.clone(),
            default_scope: oauth_config.default_scope.clone(),
            private_key_id: key_file.private_key_id,
            project_id: key_file.project_id,
        })
    }

    /// Read a key file from disk, then [`Self::load`] it.
    pub fn load_from_file(path: impl AsRef<Path>, oauth_config: &OAuthConfig) -> Result<Self> {
        let path = path.as_ref();
        let js_str = std::fs::read_to_string(path).map_err(|source| {
            CredentialError::Unreadable {
                path: path.to_path_buf(),
                source,
            }
        })?;
        Self::load(&js_str, oauth_config)
    }
}

impl Debug for ServiceAccountCredential {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccountCredential")
            .field("issuer_email", &self.issuer_email)
            .field("private_key_id", &self.private_key_id)
            .field("project_id", &self.project_id)
            .field("token_endpoint", &self.token_endpoint)
            .finish_non_exhaustive()
    }
}
