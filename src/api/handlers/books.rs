//! Book API: owner-scoped CRUD over the store.
//!
//! Every handler resolves the caller first and passes the principal's id into
//! the store call, so ownership is part of the lookup itself. A book owned by
//! someone else is indistinguishable from a missing one.

use axum::{
    Json,
    extract::{Extension, Path, rejection::JsonRejection},
    http::{HeaderMap, StatusCode},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, instrument};
use utoipa::ToSchema;
use uuid::Uuid;

use super::auth::{AuthState, require_auth};
use crate::{
    api::error::ApiError,
    store::{Book, BookPatch, BookStatus, NewBook, SharedStore},
};

#[derive(ToSchema, Serialize, Deserialize, Debug, Default)]
pub struct CreateBookRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    /// One of `to-read`, `reading`, `read`; defaults to `to-read`.
    #[serde(default)]
    pub status: Option<String>,
}

/// Partial update. Absent fields are left untouched; unknown fields are rejected.
#[derive(ToSchema, Serialize, Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
pub struct UpdateBookRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

fn parse_status(value: &str) -> Result<BookStatus, ApiError> {
    value
        .parse::<BookStatus>()
        .map_err(|err| ApiError::Validation(err.to_string()))
}

fn required(value: Option<String>, field: &str) -> Result<String, ApiError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::Validation(format!("{field} is required")))
}

fn non_blank(value: Option<String>, field: &str) -> Result<Option<String>, ApiError> {
    value
        .map(|v| {
            let trimmed = v.trim().to_string();
            if trimmed.is_empty() {
                Err(ApiError::Validation(format!("{field} cannot be empty")))
            } else {
                Ok(trimmed)
            }
        })
        .transpose()
}

impl TryFrom<CreateBookRequest> for NewBook {
    type Error = ApiError;

    fn try_from(request: CreateBookRequest) -> Result<Self, Self::Error> {
        Ok(Self {
            title: required(request.title, "Title")?,
            author: required(request.author, "Author")?,
            status: request
                .status
                .as_deref()
                .map(parse_status)
                .transpose()?
                .unwrap_or_default(),
        })
    }
}

impl TryFrom<UpdateBookRequest> for BookPatch {
    type Error = ApiError;

    fn try_from(request: UpdateBookRequest) -> Result<Self, Self::Error> {
        let patch = Self {
            title: non_blank(request.title, "Title")?,
            author: non_blank(request.author, "Author")?,
            status: request.status.as_deref().map(parse_status).transpose()?,
        };
        if patch.is_empty() {
            return Err(ApiError::Validation("No updates provided".to_string()));
        }
        Ok(patch)
    }
}

/// Book ids that are not UUIDs cannot match anything.
fn parse_book_id(id: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(id).map_err(|_| ApiError::NotFound)
}

#[utoipa::path(
    get,
    path = "/api/books",
    responses(
        (status = 200, description = "Caller's books, oldest first", body = [Book]),
        (status = 401, description = "Missing or invalid session token"),
    ),
    security(("bearer" = [])),
    tag = "books"
)]
#[instrument(skip(headers, store, auth))]
pub async fn list(
    headers: HeaderMap,
    Extension(store): Extension<SharedStore>,
    Extension(auth): Extension<Arc<AuthState>>,
) -> Result<Json<Vec<Book>>, ApiError> {
    let principal = require_auth(&headers, store.as_ref(), &auth).await?;
    let books = store.list_books(principal.user_id, None).await?;
    Ok(Json(books))
}

// GET shares the `{id}` segment with PATCH/DELETE; here it carries a status.
#[utoipa::path(
    get,
    path = "/api/books/{id}",
    params(("id" = String, Path, description = "Status filter: to-read, reading or read")),
    responses(
        (status = 200, description = "Caller's books with the given status", body = [Book]),
        (status = 400, description = "Unknown status"),
        (status = 401, description = "Missing or invalid session token"),
    ),
    security(("bearer" = [])),
    tag = "books"
)]
#[instrument(skip(headers, store, auth))]
pub async fn list_by_status(
    headers: HeaderMap,
    Path(status): Path<String>,
    Extension(store): Extension<SharedStore>,
    Extension(auth): Extension<Arc<AuthState>>,
) -> Result<Json<Vec<Book>>, ApiError> {
    let principal = require_auth(&headers, store.as_ref(), &auth).await?;
    let status = parse_status(&status)?;
    let books = store.list_books(principal.user_id, Some(status)).await?;
    Ok(Json(books))
}

#[utoipa::path(
    post,
    path = "/api/books",
    request_body = CreateBookRequest,
    responses(
        (status = 201, description = "Book created", body = Book),
        (status = 400, description = "Missing title or author, or unknown status"),
        (status = 401, description = "Missing or invalid session token"),
    ),
    security(("bearer" = [])),
    tag = "books"
)]
#[instrument(skip(headers, store, auth, payload))]
pub async fn create(
    headers: HeaderMap,
    Extension(store): Extension<SharedStore>,
    Extension(auth): Extension<Arc<AuthState>>,
    payload: Result<Json<CreateBookRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Book>), ApiError> {
    let principal = require_auth(&headers, store.as_ref(), &auth).await?;
    let Json(request) = payload?;
    let book = NewBook::try_from(request)?;
    let book = store.insert_book(principal.user_id, &book).await?;
    debug!(book_id = %book.id, "Book created");
    Ok((StatusCode::CREATED, Json(book)))
}

#[utoipa::path(
    patch,
    path = "/api/books/{id}",
    params(("id" = String, Path, description = "Book id")),
    request_body = UpdateBookRequest,
    responses(
        (status = 200, description = "Updated book", body = Book),
        (status = 400, description = "Empty, unknown or invalid fields"),
        (status = 401, description = "Missing or invalid session token"),
        (status = 404, description = "Book not found"),
    ),
    security(("bearer" = [])),
    tag = "books"
)]
#[instrument(skip(headers, store, auth, payload))]
pub async fn update(
    headers: HeaderMap,
    Path(id): Path<String>,
    Extension(store): Extension<SharedStore>,
    Extension(auth): Extension<Arc<AuthState>>,
    payload: Result<Json<UpdateBookRequest>, JsonRejection>,
) -> Result<Json<Book>, ApiError> {
    let principal = require_auth(&headers, store.as_ref(), &auth).await?;
    let id = parse_book_id(&id)?;
    let Json(request) = payload?;
    let patch = BookPatch::try_from(request)?;
    let book = store
        .update_book(principal.user_id, id, &patch)
        .await?
        .ok_or(ApiError::NotFound)?;
    Ok(Json(book))
}

#[utoipa::path(
    delete,
    path = "/api/books/{id}",
    params(("id" = String, Path, description = "Book id")),
    responses(
        (status = 204, description = "Book deleted"),
        (status = 401, description = "Missing or invalid session token"),
        (status = 404, description = "Book not found"),
    ),
    security(("bearer" = [])),
    tag = "books"
)]
#[instrument(skip(headers, store, auth))]
pub async fn delete(
    headers: HeaderMap,
    Path(id): Path<String>,
    Extension(store): Extension<SharedStore>,
    Extension(auth): Extension<Arc<AuthState>>,
) -> Result<StatusCode, ApiError> {
    let principal = require_auth(&headers, store.as_ref(), &auth).await?;
    let id = parse_book_id(&id)?;
    if store.delete_book(principal.user_id, id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound)
    }
}
