//! Persistence for users and books.
//!
//! Handlers talk to a [`Store`] trait object so the same routes run against
//! Postgres in production and against [`MemoryStore`] in tests or local runs
//! (`--dsn memory://`).
//!
//! Book operations take the owner id as part of every call. Implementations
//! must apply it inside the lookup predicate itself, never as a separate
//! check after fetching.

pub mod memory;
pub mod models;
pub mod postgres;

pub use memory::MemoryStore;
pub use models::{
    Book, BookPatch, BookStatus, NewBook, ProviderIdentity, PublicUser, UserRecord,
};
pub use postgres::PgStore;

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

pub type SharedStore = Arc<dyn Store>;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A unique column (username, email, provider id) already holds the value.
    #[error("unique constraint violated: {0}")]
    Conflict(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[async_trait]
pub trait Store: Send + Sync {
    /// Liveness check used by `/health`.
    async fn ping(&self) -> Result<(), StoreError>;

    async fn insert_local_user(
        &self,
        username: &str,
        password_hash: &str,
    ) -> Result<UserRecord, StoreError>;

    async fn insert_provider_user(
        &self,
        identity: &ProviderIdentity,
    ) -> Result<UserRecord, StoreError>;

    async fn user_by_id(&self, id: Uuid) -> Result<Option<UserRecord>, StoreError>;

    async fn user_by_username(&self, username: &str) -> Result<Option<UserRecord>, StoreError>;

    async fn user_by_google_id(&self, google_id: &str)
    -> Result<Option<UserRecord>, StoreError>;

    async fn user_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError>;

    /// Set `google_id` on a user that has none yet and return the updated record.
    /// A user that already carries a provider id is returned unchanged.
    async fn link_google_id(
        &self,
        user_id: Uuid,
        google_id: &str,
    ) -> Result<Option<UserRecord>, StoreError>;

    /// Books owned by `owner`, oldest first, optionally limited to one status.
    async fn list_books(
        &self,
        owner: Uuid,
        status: Option<BookStatus>,
    ) -> Result<Vec<Book>, StoreError>;

    async fn insert_book(&self, owner: Uuid, book: &NewBook) -> Result<Book, StoreError>;

    /// Returns `None` when no book matches `(id, owner)`.
    async fn update_book(
        &self,
        owner: Uuid,
        id: Uuid,
        patch: &BookPatch,
    ) -> Result<Option<Book>, StoreError>;

    /// Returns `false` when no book matches `(id, owner)`.
    async fn delete_book(&self, owner: Uuid, id: Uuid) -> Result<bool, StoreError>;
}

/// Open the store named by a DSN: `memory://` or a Postgres URL.
///
/// # Errors
/// Returns an error for unsupported schemes or when Postgres is unreachable.
pub async fn connect(dsn: &str) -> Result<SharedStore> {
    let url = url::Url::parse(dsn).context("Invalid database connection string")?;
    match url.scheme() {
        "memory" => Ok(Arc::new(MemoryStore::new())),
        "postgres" | "postgresql" => {
            let store = PgStore::connect(dsn)
                .await
                .context("Failed to connect to database")?;
            Ok(Arc::new(store))
        }
        other => Err(anyhow!("Unsupported database scheme: {other}")),
    }
}
