//! HTTP client for the bookshelf API.

use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::time::Duration;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::{
    api::handlers::auth::AuthResponse,
    store::{Book, BookStatus},
};

#[derive(thiserror::Error, Debug)]
pub enum ClientError {
    #[error("Session expired. Please login again.")]
    Unauthorized,
    #[error("Not signed in. Login or register first.")]
    NotSignedIn,
    #[error("{message}")]
    Http { status: u16, message: String },
    #[error("invalid API URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("request failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("session storage: {0}")]
    Session(#[from] std::io::Error),
}

impl ClientError {
    /// HTTP status of a server-side rejection, if any.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Unauthorized => Some(401),
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Book listing scope: everything, or one status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Filter {
    #[default]
    All,
    Only(BookStatus),
}

impl Filter {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Only(status) => status.as_str(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    base: String,
    http: Client,
}

impl ApiClient {
    /// Client for the API served at `api_url` (for example `http://localhost:3000`).
    ///
    /// # Errors
    /// Returns an error if the URL is invalid or the HTTP client cannot be built.
    pub fn new(api_url: &str) -> Result<Self, ClientError> {
        let parsed = url::Url::parse(api_url)?;
        let http = Client::builder()
            .use_rustls_tls()
            .user_agent(crate::APP_USER_AGENT)
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            base: parsed.as_str().trim_end_matches('/').to_string(),
            http,
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base
    }

    fn request(&self, method: Method, path: &str, token: Option<&str>) -> RequestBuilder {
        let builder = self.http.request(method, format!("{}{path}", self.base));
        match token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// # Errors
    /// Returns `Http` with the server's message when registration is rejected.
    pub async fn register(&self, username: &str, password: &str) -> Result<AuthResponse, ClientError> {
        let body = json!({ "username": username, "password": password });
        self.send_json(self.request(Method::POST, "/api/register", None).json(&body), false)
            .await
    }

    /// # Errors
    /// Returns `Http` with the server's message when the credentials are rejected.
    pub async fn login(&self, username: &str, password: &str) -> Result<AuthResponse, ClientError> {
        let body = json!({ "username": username, "password": password });
        self.send_json(self.request(Method::POST, "/api/login", None).json(&body), false)
            .await
    }

    /// Exchange a Google ID token for a session.
    ///
    /// # Errors
    /// Returns `Http` when the assertion is rejected.
    pub async fn login_with_google(&self, assertion: &str) -> Result<AuthResponse, ClientError> {
        let body = json!({ "token": assertion });
        self.send_json(
            self.request(Method::POST, "/api/auth/google", None).json(&body),
            false,
        )
        .await
    }

    /// # Errors
    /// Returns `Unauthorized` when the session is rejected.
    #[instrument(skip(self, token))]
    pub async fn list_books(&self, token: &str, filter: Filter) -> Result<Vec<Book>, ClientError> {
        let path = match filter {
            Filter::All => "/api/books".to_string(),
            Filter::Only(status) => format!("/api/books/{status}"),
        };
        self.send_json(self.request(Method::GET, &path, Some(token)), true)
            .await
    }

    /// # Errors
    /// Returns `Unauthorized` or the server's validation message.
    pub async fn create_book(
        &self,
        token: &str,
        title: &str,
        author: &str,
        status: Option<BookStatus>,
    ) -> Result<Book, ClientError> {
        let mut body = json!({ "title": title, "author": author });
        if let Some(status) = status {
            body["status"] = Value::from(status.as_str());
        }
        self.send_json(
            self.request(Method::POST, "/api/books", Some(token)).json(&body),
            true,
        )
        .await
    }

    /// # Errors
    /// Returns `Unauthorized`, or `Http` 404 when the book is not the caller's.
    pub async fn update_status(
        &self,
        token: &str,
        id: Uuid,
        status: BookStatus,
    ) -> Result<Book, ClientError> {
        let path = format!("/api/books/{id}");
        let body = json!({ "status": status });
        self.send_json(
            self.request(Method::PATCH, &path, Some(token)).json(&body),
            true,
        )
        .await
    }

    /// # Errors
    /// Returns `Unauthorized`, or `Http` 404 when the book is not the caller's.
    pub async fn delete_book(&self, token: &str, id: Uuid) -> Result<(), ClientError> {
        let path = format!("/api/books/{id}");
        let response = self
            .request(Method::DELETE, &path, Some(token))
            .send()
            .await?;
        check(response, true).await.map(drop)
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        authenticated: bool,
    ) -> Result<T, ClientError> {
        let response = check(request.send().await?, authenticated).await?;
        Ok(response.json().await?)
    }
}

/// Map non-success responses to `ClientError`. A 401 on an authenticated call
/// means the session is gone; elsewhere it carries the server's message.
async fn check(response: Response, authenticated: bool) -> Result<Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if authenticated && status == StatusCode::UNAUTHORIZED {
        return Err(ClientError::Unauthorized);
    }
    let body = response.text().await.unwrap_or_default();
    let message = error_message(status, &body);
    debug!(status = status.as_u16(), message = %message, "API request rejected");
    Err(ClientError::Http {
        status: status.as_u16(),
        message,
    })
}

fn error_message(status: StatusCode, body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| value.get("error").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("Request failed")
                .to_string()
        })
}
