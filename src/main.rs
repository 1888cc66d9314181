//! Print an access token for a service account.

use anyhow::Context;
use clap::Parser;
use satoken::exchange::http_client;
use satoken::{
    OAuthConfig, ServiceAccount, ServiceAccountCredential, TokenExchangeClient,
    TokenIntrospector, TokenSource,
};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Command line arguments
#[derive(Parser, Debug)]
#[command(name = "satoken")]
#[command(about = "Get an OAuth2 access token for a service account using its json key file")]
struct Args {
    /// Path to the service account json key file
    #[arg(long, value_name = "PATH")]
    creds: PathBuf,

    /// Scope to request. May be repeated. Defaults to the cloud-platform scope.
    #[arg(long, value_name = "SCOPE")]
    scope: Vec<String>,

    /// Also show what the token info endpoint says about the token
    #[arg(long)]
    inquire: bool,

    /// Token endpoint; also the audience of the assertion
    #[arg(long, env = "SATOKEN_TOKEN_URI")]
    token_uri: Option<String>,

    /// Token info endpoint used by --inquire
    #[arg(long, env = "SATOKEN_TOKENINFO_URI")]
    tokeninfo_uri: Option<String>,

    /// Give up on each HTTP request after this many seconds
    #[arg(long, value_name = "SECONDS")]
    timeout: Option<u64>,

    /// Enable verbose logging, including the assertion claims
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn oauth_config(&self) -> OAuthConfig {
        let mut config = OAuthConfig::default();
        if let Some(token_uri) = &self.token_uri {
            config = config.with_token_uri(token_uri);
        }
        if let Some(tokeninfo_uri) = &self.tokeninfo_uri {
            config = config.with_tokeninfo_uri(tokeninfo_uri);
        }
        config
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    let config = args.oauth_config();
    let client = http_client(args.timeout.map(Duration::from_secs))
        .context("Building HTTP client")?;

    let credential = ServiceAccountCredential::load_from_file(&args.creds, &config)
        .with_context(|| format!("Loading service account from {}", args.creds.display()))?;
    let token_source = ServiceAccount::new(
        credential,
        &args.scope,
        TokenExchangeClient::with_client(&config, client.clone()),
    );
    let issued_at = chrono::Utc::now();
    let token = token_source
        .get_access_token()
        .await
        .context("Fetching access token")?;
    println!("access token: {}", token.access_token);
    if let Some(expires_at) = token.expires_at(issued_at) {
        println!("expires at: {}", expires_at.to_rfc3339());
    }

    if args.inquire {
        let info = TokenIntrospector::with_client(&config, client)
            .inspect(&token.access_token)
            .await
            .context("Fetching token info")?;
        println!("\ntoken info:\n{}", info);
    }
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("satoken={default_level}")));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
