use axum::{
    Json,
    extract::{Extension, rejection::JsonRejection},
};
use std::sync::Arc;
use tracing::instrument;

use super::{
    service,
    state::AuthState,
    types::{AuthRequest, AuthResponse},
};
use crate::{api::error::ApiError, store::SharedStore};

#[utoipa::path(
    post,
    path = "/api/login",
    request_body = AuthRequest,
    responses(
        (status = 200, description = "Signed in", body = AuthResponse),
        (status = 400, description = "Malformed body"),
        (status = 401, description = "Invalid credentials"),
    ),
    tag = "auth"
)]
#[instrument(skip(store, auth, payload))]
pub async fn login(
    Extension(store): Extension<SharedStore>,
    Extension(auth): Extension<Arc<AuthState>>,
    payload: Result<Json<AuthRequest>, JsonRejection>,
) -> Result<Json<AuthResponse>, ApiError> {
    let Json(request) = payload?;
    let response = service::login(store.as_ref(), &auth, request).await?;
    Ok(Json(response))
}
