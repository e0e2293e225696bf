//! Auth configuration and shared state.

use secrecy::SecretString;
use std::{sync::Arc, time::Duration};

use super::{
    provider::{DependencyStatus, GoogleVerifier},
    token::{SessionKeys, TokenKind},
};

const DEFAULT_LOCAL_TOKEN_TTL_SECONDS: u64 = 0;
const DEFAULT_PROVIDER_TOKEN_TTL_SECONDS: u64 = 24 * 60 * 60;

/// Token lifetimes. A TTL of `0` issues tokens without `exp`.
#[derive(Clone, Debug)]
pub struct AuthConfig {
    local_token_ttl_seconds: u64,
    provider_token_ttl_seconds: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthConfig {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            local_token_ttl_seconds: DEFAULT_LOCAL_TOKEN_TTL_SECONDS,
            provider_token_ttl_seconds: DEFAULT_PROVIDER_TOKEN_TTL_SECONDS,
        }
    }

    #[must_use]
    pub const fn with_local_token_ttl_seconds(mut self, seconds: u64) -> Self {
        self.local_token_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub const fn with_provider_token_ttl_seconds(mut self, seconds: u64) -> Self {
        self.provider_token_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub const fn local_token_ttl_seconds(&self) -> u64 {
        self.local_token_ttl_seconds
    }

    #[must_use]
    pub const fn provider_token_ttl_seconds(&self) -> u64 {
        self.provider_token_ttl_seconds
    }

    /// TTL applied to tokens of `kind`, `None` when they never expire.
    #[must_use]
    pub const fn token_ttl(&self, kind: TokenKind) -> Option<Duration> {
        let seconds = match kind {
            TokenKind::Local => self.local_token_ttl_seconds,
            TokenKind::Provider => self.provider_token_ttl_seconds,
        };
        if seconds == 0 {
            None
        } else {
            Some(Duration::from_secs(seconds))
        }
    }
}

#[derive(Debug)]
pub struct AuthState {
    config: AuthConfig,
    keys: SessionKeys,
    provider: Option<Arc<GoogleVerifier>>,
}

impl AuthState {
    #[must_use]
    pub fn new(config: AuthConfig, secret: &SecretString) -> Self {
        Self {
            config,
            keys: SessionKeys::new(secret),
            provider: None,
        }
    }

    /// Enable provider login.
    #[must_use]
    pub fn with_provider(mut self, verifier: Arc<GoogleVerifier>) -> Self {
        self.provider = Some(verifier);
        self
    }

    #[must_use]
    pub const fn config(&self) -> &AuthConfig {
        &self.config
    }

    #[must_use]
    pub const fn keys(&self) -> &SessionKeys {
        &self.keys
    }

    #[must_use]
    pub fn provider(&self) -> Option<&GoogleVerifier> {
        self.provider.as_deref()
    }

    pub async fn provider_status(&self) -> DependencyStatus {
        match &self.provider {
            Some(verifier) => verifier.dependency_status().await,
            None => DependencyStatus::Disabled,
        }
    }
}
