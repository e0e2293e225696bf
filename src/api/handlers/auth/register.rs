use axum::{
    Json,
    extract::{Extension, rejection::JsonRejection},
    http::StatusCode,
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
    path = "/api/register",
    request_body = AuthRequest,
    responses(
        (status = 201, description = "User created and signed in", body = AuthResponse),
        (status = 400, description = "Missing fields, invalid username or username taken"),
    ),
    tag = "auth"
)]
#[instrument(skip(store, auth, payload))]
pub async fn register(
    Extension(store): Extension<SharedStore>,
    Extension(auth): Extension<Arc<AuthState>>,
    payload: Result<Json<AuthRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    let Json(request) = payload?;
    let response = service::register(store.as_ref(), &auth, request).await?;
    Ok((StatusCode::CREATED, Json(response)))
}
