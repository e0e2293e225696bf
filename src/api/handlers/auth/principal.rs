//! Bearer token extraction and principal resolution.
//!
//! Flow: read `Authorization: Bearer <token>`, verify the session token, then
//! confirm the user still exists. Handlers use the resulting principal to
//! scope every book query.

use axum::http::{HeaderMap, header::AUTHORIZATION};
use tracing::debug;
use uuid::Uuid;

use super::state::AuthState;
use crate::{api::error::ApiError, store::Store};

/// Authenticated caller derived from a session token.
#[derive(Clone, Debug)]
pub struct Principal {
    pub user_id: Uuid,
    pub username: Option<String>,
    pub email: Option<String>,
}

/// Bearer token from the `Authorization` header, if any.
#[must_use]
pub fn extract_bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

/// Resolve the request's bearer token into a principal.
///
/// # Errors
/// [`ApiError::Unauthenticated`] when no token is presented,
/// [`ApiError::InvalidToken`] when it fails verification or its user is gone.
pub async fn require_auth(
    headers: &HeaderMap,
    store: &dyn Store,
    auth: &AuthState,
) -> Result<Principal, ApiError> {
    let token = extract_bearer_token(headers).ok_or(ApiError::Unauthenticated)?;

    let claims = auth.keys().verify(token).map_err(|err| {
        debug!("Rejected session token: {err}");
        ApiError::InvalidToken
    })?;
    let user_id = claims.user_id().ok_or(ApiError::InvalidToken)?;

    let user = store
        .user_by_id(user_id)
        .await?
        .ok_or(ApiError::InvalidToken)?;

    Ok(Principal {
        user_id: user.id,
        username: user.username,
        email: user.email,
    })
}
