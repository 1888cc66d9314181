//! Compact JWT serialization of self-signed service account assertions.

use crate::credentials::ServiceAccountCredential;
use crate::error::SigningError;
use base64::Engine;
use base64::prelude::BASE64_URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use itertools::Itertools;
use std::fmt::{Display, Formatter};

/// How long an assertion is valid for, in seconds. Authorization servers reject
/// assertions that live longer than an hour; we ask for far less since the assertion
/// is redeemed immediately.
pub const ASSERTION_LIFETIME_SECS: i64 = 60;

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
pub struct JwtHeader {
    pub alg: &'static str,
    pub typ: &'static str,
}

impl JwtHeader {
    pub const RS256: JwtHeader = JwtHeader {
        alg: "RS256",
        typ: "JWT",
    };
}

impl Default for JwtHeader {
    fn default() -> Self {
        Self::RS256
    }
}

/// The claims of an assertion for the JWT-bearer grant.
///
/// `exp` is always `iat + 60`.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct JwtClaims {
    pub iss: String,
    pub scope: String,
    pub aud: String,
    pub exp: i64,
    pub iat: i64,
}

/// Build the claims for `credential`, issued at `now`.
///
/// Scopes are joined with spaces. If none are given, the credential's default scope
/// (see [`crate::OAuthConfig::default_scope`]) is requested.
pub fn build_claims(
    credential: &ServiceAccountCredential,
    scopes: &[impl AsRef<str>],
    now: DateTime<Utc>,
) -> JwtClaims {
    let scope = scopes
        .iter()
        .map(|s| s.as_ref().trim())
        .filter(|s| !s.is_empty())
        .join(" ");
    let scope = if scope.is_empty() {
        credential.default_scope.clone()
    } else {
        scope
    };
    let iat = now.timestamp();
    let claims = JwtClaims {
        iss: credential.issuer_email.clone(),
        scope,
        aud: credential.token_endpoint.clone(),
        exp: iat + ASSERTION_LIFETIME_SECS,
        iat,
    };
    if tracing::enabled!(tracing::Level::DEBUG) {
        match serde_json::to_string_pretty(&claims) {
            Ok(rendered) => tracing::debug!("jwt payload: {}", rendered),
            Err(e) => tracing::debug!("Could not render jwt payload: {}", e),
        }
    }
    claims
}

/// The first two segments of an assertion, and the string that gets signed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SigningInput {
    /// `header_b64 + "." + claims_b64`
    pub signing_input: String,
    pub header_b64: String,
    pub claims_b64: String,
}

fn encode_segment<T: serde::Serialize>(value: &T) -> Result<String, SigningError> {
    Ok(BASE64_URL_SAFE_NO_PAD.encode(serde_json::to_vec(value)?))
}

pub fn encode_signing_input(
    header: &JwtHeader,
    claims: &JwtClaims,
) -> Result<SigningInput, SigningError> {
    let header_b64 = encode_segment(header)?;
    let claims_b64 = encode_segment(claims)?;
    Ok(SigningInput {
        signing_input: format!("{header_b64}.{claims_b64}"),
        header_b64,
        claims_b64,
    })
}

/// Append the signature as the third segment.
pub fn assemble(signing_input: &str, signature: &[u8]) -> SignedAssertion {
    SignedAssertion(format!(
        "{}.{}",
        signing_input,
        BASE64_URL_SAFE_NO_PAD.encode(signature)
    ))
}

/// A compact-serialized, signed JWT: `header.claims.signature`.
#[derive(Clone, PartialEq, Eq)]
pub struct SignedAssertion(String);

impl SignedAssertion {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    /// Decode the claims segment again. Mostly useful for diagnostics.
    pub fn claims(&self) -> anyhow::Result<JwtClaims> {
        let Some(b64_json) = self.0.split('.').nth(1) else {
            return Err(anyhow::anyhow!(
                "Could not find encoded JWT claims in assertion"
            ));
        };
        let decoded = BASE64_URL_SAFE_NO_PAD.decode(b64_json)?;
        Ok(serde_json::from_slice(&decoded)?)
    }
}

impl AsRef<str> for SignedAssertion {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Display for SignedAssertion {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// Assertions are bearer credentials for a minute; keep them out of debug logs.
impl std::fmt::Debug for SignedAssertion {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let head = self.0.split('.').next().unwrap_or_default();
        write!(f, "SignedAssertion({head}.<redacted>)")
    }
}
