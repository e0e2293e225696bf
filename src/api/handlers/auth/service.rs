//! Registration, login and provider login flows.
//!
//! Handlers stay thin: they parse the body and hand off here. Every flow ends
//! in [`issue_session`], which signs a token and pairs it with the public
//! user view.

use tracing::{debug, info, warn};

use super::{
    password::{hash_password, verify_password},
    state::AuthState,
    token::TokenKind,
    types::{AuthRequest, AuthResponse},
};
use crate::{
    api::{
        error::ApiError,
        handlers::{normalize_email, valid_username},
    },
    store::{ProviderIdentity, Store, StoreError, UserRecord},
};

/// Trimmed, non-blank credentials or a validation error.
fn credentials(request: AuthRequest) -> Result<(String, String), ApiError> {
    let username = request.username.unwrap_or_default().trim().to_string();
    let password = request.password.unwrap_or_default();
    if username.is_empty() || password.trim().is_empty() {
        return Err(ApiError::Validation(
            "Username and password are required".to_string(),
        ));
    }
    Ok((username, password))
}

fn issue_session(
    auth: &AuthState,
    user: &UserRecord,
    kind: TokenKind,
) -> Result<AuthResponse, ApiError> {
    let token = auth
        .keys()
        .issue(user, kind, auth.config().token_ttl(kind))
        .map_err(|err| ApiError::Internal(err.to_string()))?;
    Ok(AuthResponse {
        token,
        user: user.public(),
    })
}

/// Create a local account and sign the new user in.
///
/// # Errors
/// [`ApiError::Validation`] for blank or malformed input,
/// [`ApiError::DuplicateUsername`] when the name is taken (also when a
/// concurrent insert wins the race).
pub async fn register(
    store: &dyn Store,
    auth: &AuthState,
    request: AuthRequest,
) -> Result<AuthResponse, ApiError> {
    let (username, password) = credentials(request)?;
    if !valid_username(&username) {
        return Err(ApiError::Validation(
            "Username must be 1-64 characters without spaces".to_string(),
        ));
    }

    if store.user_by_username(&username).await?.is_some() {
        debug!("Username already registered");
        return Err(ApiError::DuplicateUsername);
    }

    let hash = hash_password(&password).map_err(|err| ApiError::Internal(err.to_string()))?;
    let user = match store.insert_local_user(&username, &hash).await {
        Ok(user) => user,
        Err(StoreError::Conflict(_)) => return Err(ApiError::DuplicateUsername),
        Err(err) => return Err(err.into()),
    };

    info!(user_id = %user.id, "Registered local user");
    issue_session(auth, &user, TokenKind::Local)
}

/// Check a username/password pair.
///
/// # Errors
/// [`ApiError::InvalidCredentials`] for unknown users, provider-only accounts
/// and wrong passwords alike.
pub async fn login(
    store: &dyn Store,
    auth: &AuthState,
    request: AuthRequest,
) -> Result<AuthResponse, ApiError> {
    let (username, password) = credentials(request)?;

    let user = store
        .user_by_username(&username)
        .await?
        .ok_or(ApiError::InvalidCredentials)?;
    let Some(hash) = user.password_hash.as_deref() else {
        debug!(user_id = %user.id, "Password login attempted on provider-only account");
        return Err(ApiError::InvalidCredentials);
    };

    let verified = verify_password(&password, hash).map_err(|err| {
        warn!(user_id = %user.id, "Stored password hash is unreadable: {err}");
        ApiError::InvalidCredentials
    })?;
    if !verified {
        return Err(ApiError::InvalidCredentials);
    }

    issue_session(auth, &user, TokenKind::Local)
}

/// Exchange a provider ID token for a session.
///
/// # Errors
/// [`ApiError::InvalidAssertion`] when provider login is disabled or the
/// assertion fails verification.
pub async fn login_with_provider(
    store: &dyn Store,
    auth: &AuthState,
    assertion: &str,
) -> Result<AuthResponse, ApiError> {
    let verifier = auth.provider().ok_or_else(|| {
        debug!("Provider login attempted but no client id is configured");
        ApiError::InvalidAssertion
    })?;

    let mut identity = verifier.verify(assertion).await.map_err(|err| {
        debug!("Rejected provider assertion: {err}");
        ApiError::InvalidAssertion
    })?;
    identity.email = identity.email.as_deref().map(normalize_email);

    let user = provision_user(store, &identity).await?;
    issue_session(auth, &user, TokenKind::Provider)
}

/// Find or create the user behind a provider identity.
///
/// Lookup order is provider id, then email (linking the provider id onto an
/// existing account), then insert. A unique violation on insert means a
/// concurrent request created the user first, so re-read instead of failing.
///
/// An unverified email is kept for display but never used to link. If it is
/// already taken by another account the new user is stored without it.
///
/// # Errors
/// Returns an error if the store fails or the user vanishes mid-flow.
pub async fn provision_user(
    store: &dyn Store,
    identity: &ProviderIdentity,
) -> Result<UserRecord, ApiError> {
    if let Some(user) = find_provider_user(store, identity).await? {
        return Ok(user);
    }

    let mut identity = identity.clone();
    if !identity.email_verified
        && let Some(email) = identity.email.as_deref()
        && store.user_by_email(email).await?.is_some()
    {
        debug!("Unverified provider email already in use; storing user without it");
        identity.email = None;
    }
    let identity = &identity;

    match store.insert_provider_user(identity).await {
        Ok(user) => {
            info!(user_id = %user.id, "Created user from provider login");
            Ok(user)
        }
        Err(StoreError::Conflict(constraint)) => {
            debug!(%constraint, "Provider user insert raced; re-reading");
            find_provider_user(store, identity)
                .await?
                .ok_or_else(|| ApiError::Internal(format!("provider user conflict on {constraint}")))
        }
        Err(err) => Err(err.into()),
    }
}

async fn find_provider_user(
    store: &dyn Store,
    identity: &ProviderIdentity,
) -> Result<Option<UserRecord>, ApiError> {
    if let Some(user) = store.user_by_google_id(&identity.subject).await? {
        return Ok(Some(user));
    }

    let Some(email) = identity.email.as_deref().filter(|_| identity.email_verified) else {
        return Ok(None);
    };
    let Some(user) = store.user_by_email(email).await? else {
        return Ok(None);
    };

    if user.google_id.is_some() {
        return Ok(Some(user));
    }
    let linked = store.link_google_id(user.id, &identity.subject).await?;
    if linked.is_some() {
        info!(user_id = %user.id, "Linked provider identity to existing user");
    }
    Ok(linked)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        api::handlers::auth::test_support::{
            TestProvider, auth_state, auth_state_without_provider, id_token_claims,
        },
        store::MemoryStore,
    };
    use anyhow::{Context, Result};

    fn request(username: &str, password: &str) -> AuthRequest {
        AuthRequest {
            username: Some(username.to_string()),
            password: Some(password.to_string()),
        }
    }

    #[tokio::test]
    async fn register_then_login() -> Result<()> {
        let store = MemoryStore::new();
        let auth = auth_state_without_provider();

        let registered = register(&store, &auth, request("ada", "pw")).await?;
        assert_eq!(registered.user.username.as_deref(), Some("ada"));

        let logged_in = login(&store, &auth, request("ada", "pw")).await?;
        assert_eq!(logged_in.user.id, registered.user.id);
        let claims = auth.keys().verify(&logged_in.token)?;
        assert_eq!(claims.username.as_deref(), Some("ada"));
        Ok(())
    }

    #[tokio::test]
    async fn register_rejects_blank_and_duplicates() -> Result<()> {
        let store = MemoryStore::new();
        let auth = auth_state_without_provider();

        let blank = register(&store, &auth, request("  ", "pw")).await;
        assert!(matches!(blank, Err(ApiError::Validation(_))));
        let spaced = register(&store, &auth, request("two words", "pw")).await;
        assert!(matches!(spaced, Err(ApiError::Validation(_))));

        register(&store, &auth, request("ada", "pw")).await?;
        let duplicate = register(&store, &auth, request("ada", "other")).await;
        assert!(matches!(duplicate, Err(ApiError::DuplicateUsername)));
        Ok(())
    }

    #[tokio::test]
    async fn login_failures_are_indistinguishable() -> Result<()> {
        let store = MemoryStore::new();
        let auth = auth_state_without_provider();
        register(&store, &auth, request("ada", "pw")).await?;

        let wrong = login(&store, &auth, request("ada", "nope")).await;
        assert!(matches!(wrong, Err(ApiError::InvalidCredentials)));
        let unknown = login(&store, &auth, request("bob", "pw")).await;
        assert!(matches!(unknown, Err(ApiError::InvalidCredentials)));
        Ok(())
    }

    #[tokio::test]
    async fn provider_only_account_cannot_password_login() -> Result<()> {
        let store = MemoryStore::new();
        let auth = auth_state_without_provider();
        store
            .insert_provider_user(&ProviderIdentity {
                subject: "sub-1".to_string(),
                email: Some("ada@example.com".to_string()),
                email_verified: true,
                name: None,
            })
            .await?;
        let result = login(&store, &auth, request("ada@example.com", "pw")).await;
        assert!(matches!(result, Err(ApiError::InvalidCredentials)));
        Ok(())
    }

    #[tokio::test]
    async fn provider_login_is_stable_per_email() -> Result<()> {
        let store = MemoryStore::new();
        let auth = auth_state();
        let provider = TestProvider::shared();
        let assertion = provider.sign(&id_token_claims("sub-1", Some("Ada@Example.com")))?;

        let first = login_with_provider(&store, &auth, &assertion).await?;
        let second = login_with_provider(&store, &auth, &assertion).await?;
        assert_eq!(first.user.id, second.user.id);
        assert_eq!(first.user.email.as_deref(), Some("ada@example.com"));

        let claims = auth.keys().verify(&first.token)?;
        assert_eq!(claims.email.as_deref(), Some("ada@example.com"));
        claims.exp.context("provider tokens expire")?;
        Ok(())
    }

    #[tokio::test]
    async fn provider_login_links_existing_email() -> Result<()> {
        let store = MemoryStore::new();
        let auth = auth_state();
        let provider = TestProvider::shared();

        let first = login_with_provider(
            &store,
            &auth,
            &provider.sign(&id_token_claims("sub-1", Some("ada@example.com")))?,
        )
        .await?;
        // Same email, new subject: resolves to the same account by email.
        let second = login_with_provider(
            &store,
            &auth,
            &provider.sign(&id_token_claims("sub-2", Some("ada@example.com")))?,
        )
        .await?;
        assert_eq!(first.user.id, second.user.id);
        Ok(())
    }

    #[tokio::test]
    async fn provision_prefers_provider_id_over_email() -> Result<()> {
        let store = MemoryStore::new();
        let existing = store
            .insert_provider_user(&ProviderIdentity {
                subject: "seed".to_string(),
                email: None,
                email_verified: false,
                name: None,
            })
            .await?;
        let identity = ProviderIdentity {
            subject: "seed".to_string(),
            email: Some("ada@example.com".to_string()),
            email_verified: true,
            name: None,
        };
        let user = provision_user(&store, &identity).await?;
        assert_eq!(user.id, existing.id);
        Ok(())
    }

    #[tokio::test]
    async fn unverified_email_never_links() -> Result<()> {
        let store = MemoryStore::new();
        let existing = store
            .insert_provider_user(&ProviderIdentity {
                subject: "owner".to_string(),
                email: Some("ada@example.com".to_string()),
                email_verified: true,
                name: None,
            })
            .await?;
        let identity = ProviderIdentity {
            subject: "other".to_string(),
            email: Some("ada@example.com".to_string()),
            email_verified: false,
            name: None,
        };

        let user = provision_user(&store, &identity).await?;
        assert_ne!(user.id, existing.id);
        assert_eq!(user.google_id.as_deref(), Some("other"));
        assert!(user.email.is_none(), "a taken email is not copied");

        let again = provision_user(&store, &identity).await?;
        assert_eq!(again.id, user.id);
        Ok(())
    }

    #[tokio::test]
    async fn provider_login_disabled_without_client_id() -> Result<()> {
        let store = MemoryStore::new();
        let auth = auth_state_without_provider();
        let assertion = TestProvider::shared().sign(&id_token_claims("sub-1", None))?;
        let result = login_with_provider(&store, &auth, &assertion).await;
        assert!(matches!(result, Err(ApiError::InvalidAssertion)));
        Ok(())
    }

    #[tokio::test]
    async fn provider_login_rejects_bad_assertion() {
        let store = MemoryStore::new();
        let auth = auth_state();
        let result = login_with_provider(&store, &auth, "garbage").await;
        assert!(matches!(result, Err(ApiError::InvalidAssertion)));
    }
}
