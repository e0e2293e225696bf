//! Google ID token verification against a cached JWKS.
//!
//! The keyset is either static (tests, air-gapped runs) or fetched from
//! Google's certs endpoint and cached in memory. Stale caches are refreshed on
//! demand; a refresh failure keeps the last known keys. Tokens signed with an
//! unknown `kid` trigger one refresh, throttled by a cooldown.

use anyhow::{Context, Result, anyhow};
use jsonwebtoken::{
    Algorithm, DecodingKey, Validation, decode, decode_header,
    jwk::{Jwk, JwkSet},
};
use reqwest::Client;
use serde::Deserialize;
use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::{Duration, Instant, SystemTime},
};
use tokio::sync::RwLock;
use tracing::{Instrument, debug, info, info_span, warn};
use url::Url;

use crate::store::ProviderIdentity;

pub const GOOGLE_JWKS_URL: &str = "https://www.googleapis.com/oauth2/v3/certs";
pub const GOOGLE_ISSUERS: [&str; 2] = ["accounts.google.com", "https://accounts.google.com"];

const KEYSET_CACHE_TTL_SECONDS: u64 = 3600;
const KEYSET_REFRESH_COOLDOWN_SECONDS: u64 = 30;

#[derive(Debug, thiserror::Error)]
pub enum VerifyError {
    #[error("assertion rejected: {0}")]
    Rejected(#[from] jsonwebtoken::errors::Error),
    #[error("no provider key for kid {0:?}")]
    UnknownKey(Option<String>),
    #[error("assertion has an empty subject")]
    MissingSubject,
}

#[derive(Debug)]
enum KeysetSource {
    /// Keys supplied up front and never refreshed.
    Static,
    /// Keys fetched from the provider's JWKS endpoint.
    Remote { url: String, client: Client },
}

#[derive(Debug, Clone)]
struct KeysetCache {
    keyset: JwkSet,
    fetched_at: Instant,
}

impl KeysetCache {
    fn is_fresh(&self) -> bool {
        self.fetched_at.elapsed() < Duration::from_secs(KEYSET_CACHE_TTL_SECONDS)
    }
}

/// Provider state reported by `/health`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DependencyStatus {
    /// JWKS endpoint reachable, keys cached.
    Ok,
    /// Last refresh failed and the cache is stale.
    Error,
    /// Static keyset, nothing to reach.
    Static,
    /// No client id configured; provider login is off.
    Disabled,
}

impl DependencyStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Error => "error",
            Self::Static => "static",
            Self::Disabled => "disabled",
        }
    }
}

/// Claims we read from a Google ID token. Signature, `iss`, `aud` and `exp`
/// are checked by [`Validation`] before these are trusted.
#[derive(Debug, Deserialize)]
struct GoogleClaims {
    sub: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    email_verified: Option<serde_json::Value>,
    #[serde(default)]
    name: Option<String>,
}

impl GoogleClaims {
    /// Google has sent `email_verified` both as a bool and as a string.
    fn email_is_verified(&self) -> bool {
        match &self.email_verified {
            None => true,
            Some(serde_json::Value::Bool(value)) => *value,
            Some(serde_json::Value::String(value)) => value.eq_ignore_ascii_case("true"),
            Some(_) => false,
        }
    }
}

#[derive(Debug)]
pub struct GoogleVerifier {
    keyset_source: KeysetSource,
    keyset_cache: RwLock<KeysetCache>,
    /// OAuth client id; must appear in `aud`.
    audience: String,
    last_refresh_unix: AtomicU64,
}

impl GoogleVerifier {
    /// Verifier over a fixed keyset.
    #[must_use]
    pub fn new(keyset: JwkSet, audience: String) -> Self {
        Self {
            keyset_source: KeysetSource::Static,
            keyset_cache: RwLock::new(KeysetCache {
                keyset,
                fetched_at: Instant::now(),
            }),
            audience,
            last_refresh_unix: AtomicU64::new(0),
        }
    }

    /// Verifier that fetches and caches the provider JWKS.
    ///
    /// The startup fetch is best effort: on failure the cache starts empty and
    /// stale so verification fails closed until a refresh succeeds.
    ///
    /// # Errors
    /// Returns an error for a non-https URL or if the HTTP client cannot be built.
    pub async fn new_remote(url: String, audience: String) -> Result<Self> {
        let parsed = Url::parse(&url).context("Invalid Google JWKS URL")?;
        if parsed.scheme() != "https" {
            return Err(anyhow!("Google JWKS URL must use https: {url}"));
        }

        let client = Client::builder()
            .use_rustls_tls()
            .user_agent(crate::APP_USER_AGENT)
            .timeout(Duration::from_secs(10))
            .build()
            .context("Failed to build JWKS HTTP client")?;

        let (keyset, fetched_at, last_refresh_unix) = match fetch_keyset(&client, &url).await {
            Ok(keyset) => (keyset, Instant::now(), now_unix_seconds()),
            Err(err) => {
                warn!(
                    url = %url,
                    error = %err,
                    "Google JWKS fetch failed during startup; continuing with empty keyset"
                );
                (JwkSet { keys: Vec::new() }, stale_instant(), 0)
            }
        };

        Ok(Self {
            keyset_source: KeysetSource::Remote { url, client },
            keyset_cache: RwLock::new(KeysetCache { keyset, fetched_at }),
            audience,
            last_refresh_unix: AtomicU64::new(last_refresh_unix),
        })
    }

    #[must_use]
    pub fn audience(&self) -> &str {
        &self.audience
    }

    /// Verify an ID token and extract the identity it asserts.
    ///
    /// # Errors
    /// Returns [`VerifyError`] for any signature, claim, or key lookup failure.
    pub async fn verify(&self, assertion: &str) -> Result<ProviderIdentity, VerifyError> {
        let header = decode_header(assertion)?;
        let key = match self.decoding_key(header.kid.as_deref()).await? {
            Some(key) => key,
            None => {
                if self.refresh_on_unknown_kid().await {
                    self.decoding_key(header.kid.as_deref())
                        .await?
                        .ok_or(VerifyError::UnknownKey(header.kid.clone()))?
                } else {
                    return Err(VerifyError::UnknownKey(header.kid));
                }
            }
        };

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[self.audience.as_str()]);
        validation.set_issuer(&GOOGLE_ISSUERS);
        validation.set_required_spec_claims(&["exp", "iss", "aud", "sub"]);

        let claims = decode::<GoogleClaims>(assertion, &key, &validation)?.claims;
        if claims.sub.trim().is_empty() {
            return Err(VerifyError::MissingSubject);
        }
        let email_verified = claims.email_is_verified();
        Ok(ProviderIdentity {
            subject: claims.sub,
            email: claims.email,
            email_verified,
            name: claims.name,
        })
    }

    /// Decoding key for `kid`, refreshing a stale cache first.
    async fn decoding_key(&self, kid: Option<&str>) -> Result<Option<DecodingKey>, VerifyError> {
        let keyset = self.keyset_snapshot().await;
        let jwk = match kid {
            Some(kid) => keyset.find(kid),
            // Single-key sets may omit kid.
            None if keyset.keys.len() == 1 => keyset.keys.first(),
            None => None,
        };
        jwk.map(decoding_key_from_jwk).transpose()
    }

    async fn keyset_snapshot(&self) -> JwkSet {
        let (cached, fresh) = {
            let cache = self.keyset_cache.read().await;
            (cache.keyset.clone(), cache.is_fresh())
        };
        if fresh {
            return cached;
        }
        if let KeysetSource::Remote { url, .. } = &self.keyset_source
            && let Err(err) = self.refresh_keyset().await
        {
            warn!(error = %err, url = %url, "failed to refresh Google JWKS cache");
            return cached;
        }
        self.keyset_cache.read().await.keyset.clone()
    }

    async fn refresh_keyset(&self) -> Result<()> {
        let KeysetSource::Remote { url, client } = &self.keyset_source else {
            return Ok(());
        };
        let keyset = fetch_keyset(client, url).await?;
        let mut cache = self.keyset_cache.write().await;
        cache.keyset = keyset;
        cache.fetched_at = Instant::now();
        info!(keys = cache.keyset.keys.len(), "Google JWKS cache refreshed");
        Ok(())
    }

    /// Refresh once per cooldown window when a token names an unknown key.
    async fn refresh_on_unknown_kid(&self) -> bool {
        if matches!(self.keyset_source, KeysetSource::Static) {
            return false;
        }
        let now = now_unix_seconds();
        let last = self.last_refresh_unix.load(Ordering::Relaxed);
        if now.saturating_sub(last) < KEYSET_REFRESH_COOLDOWN_SECONDS {
            debug!("JWKS refresh suppressed by cooldown");
            return false;
        }
        self.last_refresh_unix.store(now, Ordering::Relaxed);
        match self.refresh_keyset().await {
            Ok(()) => true,
            Err(err) => {
                warn!(error = %err, "Google JWKS refresh on unknown kid failed");
                false
            }
        }
    }

    /// Report keyset health. A fresh cache counts as healthy without I/O.
    pub async fn dependency_status(&self) -> DependencyStatus {
        match &self.keyset_source {
            KeysetSource::Static => DependencyStatus::Static,
            KeysetSource::Remote { url, .. } => {
                if self.keyset_cache.read().await.is_fresh() {
                    return DependencyStatus::Ok;
                }
                match self.refresh_keyset().await {
                    Ok(()) => DependencyStatus::Ok,
                    Err(err) => {
                        warn!(error = %err, url = %url, "Google JWKS fetch failed during health check");
                        DependencyStatus::Error
                    }
                }
            }
        }
    }
}

fn decoding_key_from_jwk(jwk: &Jwk) -> Result<DecodingKey, VerifyError> {
    Ok(DecodingKey::from_jwk(jwk)?)
}

async fn fetch_keyset(client: &Client, url: &str) -> Result<JwkSet> {
    let span = info_span!("google.jwks.fetch", http.method = "GET", url = %url);
    async {
        let response = client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("JWKS fetch failed: {status}"));
        }
        let keyset = response
            .json::<JwkSet>()
            .await
            .context("Invalid JWKS JSON")?;
        Ok(keyset)
    }
    .instrument(span)
    .await
}

fn now_unix_seconds() -> u64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

fn stale_instant() -> Instant {
    Instant::now()
        .checked_sub(Duration::from_secs(KEYSET_CACHE_TTL_SECONDS + 1))
        .unwrap_or_else(Instant::now)
}
