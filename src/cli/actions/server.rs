use crate::{
    api::{
        self,
        handlers::auth::{AuthConfig, AuthState, GoogleVerifier},
    },
    store,
};
use anyhow::{Context, Result};
use secrecy::SecretString;
use std::sync::Arc;
use tracing::info;
use url::Url;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub dsn: String,
    pub jwt_secret: SecretString,
    pub google_client_id: Option<String>,
    pub google_jwks_url: String,
    pub local_token_ttl_seconds: u64,
    pub provider_token_ttl_seconds: u64,
    pub allowed_origin: Option<String>,
}

/// Execute the server action.
/// # Errors
/// Returns an error if the store cannot be opened, the JWKS URL is invalid, or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    log_startup_args(&args);

    let store = store::connect(&args.dsn).await?;

    let config = AuthConfig::new()
        .with_local_token_ttl_seconds(args.local_token_ttl_seconds)
        .with_provider_token_ttl_seconds(args.provider_token_ttl_seconds);
    let mut auth = AuthState::new(config, &args.jwt_secret);

    if let Some(client_id) = args.google_client_id {
        let verifier = GoogleVerifier::new_remote(args.google_jwks_url, client_id)
            .await
            .context("Failed to initialize Google ID token verification")?;
        auth = auth.with_provider(Arc::new(verifier));
    } else {
        info!("Google client id not configured; provider login disabled");
    }

    api::new(args.port, store, Arc::new(auth), args.allowed_origin).await
}

fn log_startup_args(args: &Args) {
    let ttl = |seconds: u64| {
        if seconds == 0 {
            "never".to_string()
        } else {
            format!("{seconds}s")
        }
    };
    let entries = [
        ("listen", format!("tcp:{}", args.port)),
        ("dsn", redact_dsn(&args.dsn)),
        (
            "google_client_id",
            args.google_client_id
                .clone()
                .unwrap_or_else(|| "disabled".to_string()),
        ),
        ("google_jwks_url", args.google_jwks_url.clone()),
        ("local_token_ttl", ttl(args.local_token_ttl_seconds)),
        ("provider_token_ttl", ttl(args.provider_token_ttl_seconds)),
        (
            "allowed_origin",
            args.allowed_origin
                .clone()
                .unwrap_or_else(|| "*".to_string()),
        ),
    ];
    let max_key_len = entries.iter().map(|(key, _)| key.len()).max().unwrap_or(0);
    let mut message = format!(
        "bookshelf {} - {}\n\nStartup configuration:",
        env!("CARGO_PKG_VERSION"),
        short_commit(crate::GIT_COMMIT_HASH)
    );
    for (key, value) in &entries {
        let padding = " ".repeat(max_key_len.saturating_sub(key.len()));
        let _ =
            std::fmt::Write::write_fmt(&mut message, format_args!("\n  {key}:{padding} {value}"));
    }
    info!("{message}");
}

fn redact_dsn(dsn: &str) -> String {
    match Url::parse(dsn) {
        Ok(mut parsed) => {
            if parsed.password().is_some() {
                let _ = parsed.set_password(Some("REDACTED"));
            }
            parsed.to_string()
        }
        Err(_) => "invalid-dsn".to_string(),
    }
}

fn short_commit(hash: &str) -> &str {
    let trimmed = hash.trim();
    trimmed.get(..7).unwrap_or(trimmed)
}
