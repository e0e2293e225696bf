//! Request/response types for auth endpoints.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::store::PublicUser;

/// Body of `POST /api/register` and `POST /api/login`.
#[derive(ToSchema, Serialize, Deserialize, Debug, Default)]
pub struct AuthRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

/// Body of `POST /api/auth/google`: the provider-issued ID token.
#[derive(ToSchema, Serialize, Deserialize, Debug, Default)]
pub struct ProviderLoginRequest {
    #[serde(default)]
    pub token: Option<String>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug, Clone)]
pub struct AuthResponse {
    pub token: String,
    pub user: PublicUser,
}
