use axum::{
    Json,
    extract::{Extension, rejection::JsonRejection},
};
use std::sync::Arc;
use tracing::instrument;

use super::{
    service,
    state::AuthState,
    types::{AuthResponse, ProviderLoginRequest},
};
use crate::{api::error::ApiError, store::SharedStore};

/// Sign in with a Google ID token. Any verification failure, including a
/// server without a configured client id, answers 401.
#[utoipa::path(
    post,
    path = "/api/auth/google",
    request_body = ProviderLoginRequest,
    responses(
        (status = 200, description = "Signed in", body = AuthResponse),
        (status = 401, description = "Google authentication failed"),
    ),
    tag = "auth"
)]
#[instrument(skip(store, auth, payload))]
pub async fn google(
    Extension(store): Extension<SharedStore>,
    Extension(auth): Extension<Arc<AuthState>>,
    payload: Result<Json<ProviderLoginRequest>, JsonRejection>,
) -> Result<Json<AuthResponse>, ApiError> {
    let Json(request) = payload.map_err(|_| ApiError::InvalidAssertion)?;
    let assertion = request
        .token
        .filter(|token| !token.trim().is_empty())
        .ok_or(ApiError::InvalidAssertion)?;
    let response = service::login_with_provider(store.as_ref(), &auth, &assertion).await?;
    Ok(Json(response))
}
