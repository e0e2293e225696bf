//! Auth handlers and supporting modules.
//!
//! Local accounts store an argon2id hash; provider accounts are keyed by the
//! Google subject and linked to existing accounts by verified email. Both
//! flows end with an HS256 session token that clients send as a bearer token.
//!
//! ## Token lifetimes
//!
//! Local tokens carry no `exp` unless `--local-token-ttl` is set. Provider
//! tokens expire after 24h by default (`--provider-token-ttl`).

pub(crate) mod google;
pub(crate) mod login;
mod password;
pub(crate) mod principal;
pub mod provider;
pub(crate) mod register;
pub(crate) mod service;
mod state;
pub mod token;
pub(crate) mod types;

pub use principal::{Principal, require_auth};
pub use provider::{DependencyStatus, GoogleVerifier};
pub use state::{AuthConfig, AuthState};
pub use types::{AuthRequest, AuthResponse, ProviderLoginRequest};

#[cfg(test)]
pub(crate) mod test_support;
