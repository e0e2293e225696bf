use clap::{Arg, ArgMatches, Command};
use secrecy::SecretString;

use crate::api::handlers::auth::provider::GOOGLE_JWKS_URL;

pub const ARG_PORT: &str = "port";
pub const ARG_DSN: &str = "dsn";
pub const ARG_JWT_SECRET: &str = "jwt-secret";
pub const ARG_GOOGLE_CLIENT_ID: &str = "google-client-id";
pub const ARG_GOOGLE_JWKS_URL: &str = "google-jwks-url";
pub const ARG_LOCAL_TOKEN_TTL: &str = "local-token-ttl";
pub const ARG_PROVIDER_TOKEN_TTL: &str = "provider-token-ttl";
pub const ARG_ALLOWED_ORIGIN: &str = "allowed-origin";

#[derive(Debug)]
pub struct Options {
    pub port: u16,
    pub dsn: String,
    pub jwt_secret: SecretString,
    pub google_client_id: Option<String>,
    pub google_jwks_url: String,
    pub local_token_ttl_seconds: u64,
    pub provider_token_ttl_seconds: u64,
    pub allowed_origin: Option<String>,
}

impl Options {
    /// Parse server arguments from the `server` subcommand matches.
    ///
    /// # Errors
    /// Returns an error if required arguments are missing or empty.
    pub fn parse(matches: &ArgMatches) -> anyhow::Result<Self> {
        // Env vars set to "" reach us as empty strings.
        let get_non_empty = |id: &str| {
            matches
                .get_one::<String>(id)
                .cloned()
                .filter(|v| !v.trim().is_empty())
        };

        let dsn = get_non_empty(ARG_DSN)
            .ok_or_else(|| anyhow::anyhow!("missing required argument: --{ARG_DSN}"))?;
        let jwt_secret = get_non_empty(ARG_JWT_SECRET)
            .ok_or_else(|| anyhow::anyhow!("missing required argument: --{ARG_JWT_SECRET}"))?;

        Ok(Self {
            port: matches.get_one::<u16>(ARG_PORT).copied().unwrap_or(3000),
            dsn,
            jwt_secret: SecretString::from(jwt_secret),
            google_client_id: get_non_empty(ARG_GOOGLE_CLIENT_ID),
            google_jwks_url: get_non_empty(ARG_GOOGLE_JWKS_URL)
                .unwrap_or_else(|| GOOGLE_JWKS_URL.to_string()),
            local_token_ttl_seconds: matches
                .get_one::<u64>(ARG_LOCAL_TOKEN_TTL)
                .copied()
                .unwrap_or(0),
            provider_token_ttl_seconds: matches
                .get_one::<u64>(ARG_PROVIDER_TOKEN_TTL)
                .copied()
                .unwrap_or(86_400),
            allowed_origin: get_non_empty(ARG_ALLOWED_ORIGIN),
        })
    }
}

#[must_use]
pub fn command() -> Command {
    Command::new("server")
        .about("Run the bookshelf API server")
        .arg(
            Arg::new(ARG_PORT)
                .short('p')
                .long(ARG_PORT)
                .help("Port to listen on")
                .default_value("3000")
                .env("BOOKSHELF_PORT")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new(ARG_DSN)
                .short('d')
                .long(ARG_DSN)
                .help("Database connection string")
                .long_help(
                    "Database connection string: a postgres:// URL, or memory:// for a throwaway in-process store.",
                )
                .env("BOOKSHELF_DSN")
                .required(true),
        )
        .arg(
            Arg::new(ARG_JWT_SECRET)
                .long(ARG_JWT_SECRET)
                .help("Secret used to sign session tokens (HS256)")
                .env("BOOKSHELF_JWT_SECRET")
                .hide_env_values(true)
                .required(true),
        )
        .arg(
            Arg::new(ARG_GOOGLE_CLIENT_ID)
                .long(ARG_GOOGLE_CLIENT_ID)
                .help("Google OAuth client id; provider login is disabled when unset")
                .env("BOOKSHELF_GOOGLE_CLIENT_ID"),
        )
        .arg(
            Arg::new(ARG_GOOGLE_JWKS_URL)
                .long(ARG_GOOGLE_JWKS_URL)
                .help("JWKS URL used to verify Google ID tokens")
                .long_help(
                    "JWKS URL used to verify Google ID tokens.\n\nThe keyset is cached (TTL ~1 hour) and refreshed on unknown `kid` with a cooldown. Verification\nitself is local and does not call Google per request.",
                )
                .env("BOOKSHELF_GOOGLE_JWKS_URL")
                .default_value(GOOGLE_JWKS_URL),
        )
        .arg(
            Arg::new(ARG_LOCAL_TOKEN_TTL)
                .long(ARG_LOCAL_TOKEN_TTL)
                .help("Lifetime in seconds of tokens issued by register/login (0 = no expiry)")
                .env("BOOKSHELF_LOCAL_TOKEN_TTL")
                .default_value("0")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new(ARG_PROVIDER_TOKEN_TTL)
                .long(ARG_PROVIDER_TOKEN_TTL)
                .help("Lifetime in seconds of tokens issued by Google login (0 = no expiry)")
                .env("BOOKSHELF_PROVIDER_TOKEN_TTL")
                .default_value("86400")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new(ARG_ALLOWED_ORIGIN)
                .long(ARG_ALLOWED_ORIGIN)
                .help("Only origin allowed by CORS (default: any)")
                .env("BOOKSHELF_ALLOWED_ORIGIN"),
        )
}
