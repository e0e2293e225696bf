//! Postgres-backed store (schema in `sql/schema.sql`).

use async_trait::async_trait;
use sqlx::{
    Connection, PgPool, Row,
    postgres::{PgPoolOptions, PgRow},
};
use std::time::Duration;
use tracing::{Instrument, Span, info_span};
use uuid::Uuid;

use super::{
    Book, BookPatch, BookStatus, NewBook, ProviderIdentity, Store, StoreError, UserRecord,
};

const USER_COLUMNS: &str =
    "id, username, password_hash, google_id, email, name, created_at, updated_at";
const BOOK_COLUMNS: &str = "id, title, author, status, user_id, created_at, updated_at";

/// Postgres `unique_violation`.
const UNIQUE_VIOLATION: &str = "23505";

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Open a small connection pool.
    ///
    /// # Errors
    /// Returns an error if the database cannot be reached.
    pub async fn connect(dsn: &str) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .min_connections(1)
            .max_connections(5)
            .max_lifetime(Duration::from_secs(60 * 2))
            .test_before_acquire(true)
            .connect(dsn)
            .await?;
        Ok(Self { pool })
    }
}

fn query_span(operation: &'static str, statement: &str) -> Span {
    info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = operation,
        db.statement = statement
    )
}

/// Map unique violations to [`StoreError::Conflict`], keeping the constraint name.
fn map_insert_error(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err
        && db_err.code().as_deref() == Some(UNIQUE_VIOLATION)
    {
        let constraint = db_err.constraint().unwrap_or("unique").to_string();
        return StoreError::Conflict(constraint);
    }
    StoreError::Database(err)
}

fn user_from_row(row: &PgRow) -> Result<UserRecord, sqlx::Error> {
    Ok(UserRecord {
        id: row.try_get("id")?,
        username: row.try_get("username")?,
        password_hash: row.try_get("password_hash")?,
        google_id: row.try_get("google_id")?,
        email: row.try_get("email")?,
        name: row.try_get("name")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn book_from_row(row: &PgRow) -> Result<Book, sqlx::Error> {
    let status: String = row.try_get("status")?;
    let status = status
        .parse::<BookStatus>()
        .map_err(|err| sqlx::Error::Decode(Box::new(err)))?;
    Ok(Book {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        author: row.try_get("author")?,
        status,
        user: row.try_get("user_id")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

impl PgStore {
    async fn fetch_user(
        &self,
        column: &'static str,
        value: &str,
    ) -> Result<Option<UserRecord>, StoreError> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE {column} = $1");
        let row = sqlx::query(&query)
            .bind(value)
            .fetch_optional(&self.pool)
            .instrument(query_span("SELECT", &query))
            .await?;
        Ok(row.as_ref().map(user_from_row).transpose()?)
    }
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> Result<(), StoreError> {
        let acquire_span = info_span!(
            "db.acquire",
            db.system = "postgresql",
            db.operation = "ACQUIRE"
        );
        let mut conn = self.pool.acquire().instrument(acquire_span).await?;
        let ping_span = info_span!("db.ping", db.system = "postgresql", db.operation = "PING");
        conn.ping().instrument(ping_span).await?;
        Ok(())
    }

    async fn insert_local_user(
        &self,
        username: &str,
        password_hash: &str,
    ) -> Result<UserRecord, StoreError> {
        let query = format!(
            "INSERT INTO users (id, username, password_hash) VALUES ($1, $2, $3) \
             RETURNING {USER_COLUMNS}"
        );
        let row = sqlx::query(&query)
            .bind(Uuid::new_v4())
            .bind(username)
            .bind(password_hash)
            .fetch_one(&self.pool)
            .instrument(query_span("INSERT", &query))
            .await
            .map_err(map_insert_error)?;
        Ok(user_from_row(&row)?)
    }

    async fn insert_provider_user(
        &self,
        identity: &ProviderIdentity,
    ) -> Result<UserRecord, StoreError> {
        let query = format!(
            "INSERT INTO users (id, google_id, email, name) VALUES ($1, $2, $3, $4) \
             RETURNING {USER_COLUMNS}"
        );
        let row = sqlx::query(&query)
            .bind(Uuid::new_v4())
            .bind(&identity.subject)
            .bind(identity.email.as_deref())
            .bind(identity.name.as_deref())
            .fetch_one(&self.pool)
            .instrument(query_span("INSERT", &query))
            .await
            .map_err(map_insert_error)?;
        Ok(user_from_row(&row)?)
    }

    async fn user_by_id(&self, id: Uuid) -> Result<Option<UserRecord>, StoreError> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let row = sqlx::query(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .instrument(query_span("SELECT", &query))
            .await?;
        Ok(row.as_ref().map(user_from_row).transpose()?)
    }

    async fn user_by_username(&self, username: &str) -> Result<Option<UserRecord>, StoreError> {
        self.fetch_user("username", username).await
    }

    async fn user_by_google_id(
        &self,
        google_id: &str,
    ) -> Result<Option<UserRecord>, StoreError> {
        self.fetch_user("google_id", google_id).await
    }

    async fn user_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError> {
        self.fetch_user("email", email).await
    }

    async fn link_google_id(
        &self,
        user_id: Uuid,
        google_id: &str,
    ) -> Result<Option<UserRecord>, StoreError> {
        // COALESCE keeps an already linked id; relinking is a no-op.
        let query = format!(
            "UPDATE users SET google_id = COALESCE(google_id, $2), updated_at = NOW() \
             WHERE id = $1 RETURNING {USER_COLUMNS}"
        );
        let row = sqlx::query(&query)
            .bind(user_id)
            .bind(google_id)
            .fetch_optional(&self.pool)
            .instrument(query_span("UPDATE", &query))
            .await
            .map_err(map_insert_error)?;
        Ok(row.as_ref().map(user_from_row).transpose()?)
    }

    async fn list_books(
        &self,
        owner: Uuid,
        status: Option<BookStatus>,
    ) -> Result<Vec<Book>, StoreError> {
        let query = format!(
            "SELECT {BOOK_COLUMNS} FROM books \
             WHERE user_id = $1 AND ($2::TEXT IS NULL OR status = $2) \
             ORDER BY created_at, id"
        );
        let rows = sqlx::query(&query)
            .bind(owner)
            .bind(status.map(BookStatus::as_str))
            .fetch_all(&self.pool)
            .instrument(query_span("SELECT", &query))
            .await?;
        Ok(rows
            .iter()
            .map(book_from_row)
            .collect::<Result<Vec<_>, _>>()?)
    }

    async fn insert_book(&self, owner: Uuid, book: &NewBook) -> Result<Book, StoreError> {
        let query = format!(
            "INSERT INTO books (id, title, author, status, user_id) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {BOOK_COLUMNS}"
        );
        let row = sqlx::query(&query)
            .bind(Uuid::new_v4())
            .bind(&book.title)
            .bind(&book.author)
            .bind(book.status.as_str())
            .bind(owner)
            .fetch_one(&self.pool)
            .instrument(query_span("INSERT", &query))
            .await?;
        Ok(book_from_row(&row)?)
    }

    async fn update_book(
        &self,
        owner: Uuid,
        id: Uuid,
        patch: &BookPatch,
    ) -> Result<Option<Book>, StoreError> {
        let query = format!(
            "UPDATE books SET \
                 title = COALESCE($3, title), \
                 author = COALESCE($4, author), \
                 status = COALESCE($5, status), \
                 updated_at = NOW() \
             WHERE id = $1 AND user_id = $2 RETURNING {BOOK_COLUMNS}"
        );
        let row = sqlx::query(&query)
            .bind(id)
            .bind(owner)
            .bind(patch.title.as_deref())
            .bind(patch.author.as_deref())
            .bind(patch.status.map(BookStatus::as_str))
            .fetch_optional(&self.pool)
            .instrument(query_span("UPDATE", &query))
            .await?;
        Ok(row.as_ref().map(book_from_row).transpose()?)
    }

    async fn delete_book(&self, owner: Uuid, id: Uuid) -> Result<bool, StoreError> {
        let query = "DELETE FROM books WHERE id = $1 AND user_id = $2";
        let result = sqlx::query(query)
            .bind(id)
            .bind(owner)
            .execute(&self.pool)
            .instrument(query_span("DELETE", query))
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
