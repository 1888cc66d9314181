//! # satoken
//!
//! The `satoken` crate fetches OAuth2 [access tokens](https://docs.cloud.google.com/docs/authentication/token-types#access-tokens)
//! for a service account, using nothing but the account's json key file.
//!
//! A token is obtained in a handful of small steps, each of which is exposed on its own:
//! - [`ServiceAccountCredential::load`] reads the key file.
//! - [`jwt::build_claims`] and [`jwt::encode_signing_input`] build the assertion body, valid for 60 seconds.
//! - [`signer::sign`] signs it with RS256, and [`jwt::assemble`] produces the compact JWT.
//! - [`TokenExchangeClient::exchange`] redeems it using the
//!   [JWT-bearer grant](https://datatracker.ietf.org/doc/html/rfc7523).
//! - Optionally, [`TokenIntrospector::inspect`] asks the server what it thinks of the token.
//!
//! [`ServiceAccount`] strings these together behind the [`TokenSource`] trait.
//!
//! ## Example
//!
//!```rust,no_run
//! use satoken::{OAuthConfig, ServiceAccount, ServiceAccountCredential, TokenExchangeClient, TokenSource};
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> anyhow::Result<()> {
//!     let config = OAuthConfig::default();
//!     let credential = ServiceAccountCredential::load_from_file("key.json", &config)?;
//!     let token_source = ServiceAccount::new(
//!         credential,
//!         &["https://www.googleapis.com/auth/cloud-platform"],
//!         TokenExchangeClient::new(&config),
//!     );
//!     let token = token_source.get_access_token().await?;
//!     eprintln!("Got access token {}", token.access_token);
//!     Ok(())
//! }
//! ```

#![deny(clippy::all)]
#![allow(clippy::uninlined_format_args)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod clock;
pub mod credentials;
pub mod error;
pub mod exchange;
pub mod introspect;
pub mod jwt;
pub mod oauth_config;
pub mod service_account;
pub mod signer;
pub mod token_source;

pub use clock::{Clock, FixedClock, SystemClock};
pub use credentials::ServiceAccountCredential;
pub use error::{
    CredentialError, Error, KeyFormatError, ProtocolError, Result, SigningError, TransportError,
};
pub use exchange::{TokenExchangeClient, TokenResponse};
pub use introspect::TokenIntrospector;
pub use jwt::SignedAssertion;
pub use oauth_config::GOOGLE_OAUTH_CONFIG;
pub use oauth_config::OAuthConfig;
pub use service_account::ServiceAccount;
pub use token_source::TokenSource;
