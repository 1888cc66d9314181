use crate::clock::{Clock, SystemClock};
use crate::credentials::ServiceAccountCredential;
use crate::error::Result;
use crate::exchange::{TokenExchangeClient, TokenResponse};
use crate::jwt::{JwtHeader, SignedAssertion, assemble, build_claims, encode_signing_input};
use crate::signer::sign;
use crate::token_source::TokenSource;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

/// A token source for a service account that is authenticated by a key.
///
/// Each token is obtained by signing a short-lived assertion with the account's private
/// key, and redeeming it at the token endpoint.
pub struct ServiceAccount {
    credential: ServiceAccountCredential,
    scopes: Vec<String>,
    clock: Arc<dyn Clock>,
    exchange_client: TokenExchangeClient,
}

impl ServiceAccount {
    pub fn new(
        credential: ServiceAccountCredential,
        scopes: &[impl AsRef<str>],
        exchange_client: TokenExchangeClient,
    ) -> Self {
        Self {
            credential,
            scopes: scopes.iter().map(|s| s.as_ref().to_string()).collect(),
            clock: Arc::new(SystemClock),
            exchange_client,
        }
    }

    /// Take `iat` from `clock` instead of the wall clock.
    pub fn with_clock(self, clock: impl Clock + 'static) -> Self {
        Self {
            clock: Arc::new(clock),
            ..self
        }
    }

    pub fn credential(&self) -> &ServiceAccountCredential {
        &self.credential
    }

    /// Build and sign an assertion without redeeming it.
    pub fn assertion(&self) -> Result<SignedAssertion> {
        let claims = build_claims(&self.credential, &self.scopes, self.clock.now());
        tracing::debug!(
            "Built claims for {} (iat={}, exp={})",
            claims.iss,
            claims.iat,
            claims.exp
        );
        let input = encode_signing_input(&JwtHeader::RS256, &claims)?;
        let signature = sign(input.signing_input.as_bytes(), &self.credential.private_key)?;
        tracing::debug!("Signed assertion for {}", claims.iss);
        Ok(assemble(&input.signing_input, &signature))
    }
}

impl Debug for ServiceAccount {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "ServiceAccount(client_email={}, token_uri={})",
            self.credential.issuer_email,
            self.exchange_client.token_uri()
        )
    }
}

#[async_trait::async_trait]
impl TokenSource for ServiceAccount {
    fn kind(&self) -> &'static str {
        "service account"
    }

    async fn get_access_token(&self) -> Result<TokenResponse> {
        tracing::debug!("Getting access token for {} token source", self.kind());
        let assertion = self.assertion()?;
        self.exchange_client.exchange(&assertion).await
    }
}
