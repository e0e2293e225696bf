//! In-memory store for tests and throwaway local runs.

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    Book, BookPatch, BookStatus, NewBook, ProviderIdentity, Store, StoreError, UserRecord,
};

#[derive(Debug, Default)]
struct Inner {
    users: Vec<UserRecord>,
    books: Vec<Book>,
}

impl Inner {
    fn taken(&self, pick: impl Fn(&UserRecord) -> Option<&String>, value: &str) -> bool {
        self.users
            .iter()
            .any(|user| pick(user).is_some_and(|v| v == value))
    }
}

/// Vec-backed store; insertion order doubles as creation order.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn insert_local_user(
        &self,
        username: &str,
        password_hash: &str,
    ) -> Result<UserRecord, StoreError> {
        let mut inner = self.inner.write().await;
        if inner.taken(|u| u.username.as_ref(), username) {
            return Err(StoreError::Conflict("users.username".to_string()));
        }
        let now = Utc::now();
        let user = UserRecord {
            id: Uuid::new_v4(),
            username: Some(username.to_string()),
            password_hash: Some(password_hash.to_string()),
            google_id: None,
            email: None,
            name: None,
            created_at: now,
            updated_at: now,
        };
        inner.users.push(user.clone());
        Ok(user)
    }

    async fn insert_provider_user(
        &self,
        identity: &ProviderIdentity,
    ) -> Result<UserRecord, StoreError> {
        let mut inner = self.inner.write().await;
        if inner.taken(|u| u.google_id.as_ref(), &identity.subject) {
            return Err(StoreError::Conflict("users.google_id".to_string()));
        }
        if let Some(email) = &identity.email
            && inner.taken(|u| u.email.as_ref(), email)
        {
            return Err(StoreError::Conflict("users.email".to_string()));
        }
        let now = Utc::now();
        let user = UserRecord {
            id: Uuid::new_v4(),
            username: None,
            password_hash: None,
            google_id: Some(identity.subject.clone()),
            email: identity.email.clone(),
            name: identity.name.clone(),
            created_at: now,
            updated_at: now,
        };
        inner.users.push(user.clone());
        Ok(user)
    }

    async fn user_by_id(&self, id: Uuid) -> Result<Option<UserRecord>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.users.iter().find(|u| u.id == id).cloned())
    }

    async fn user_by_username(&self, username: &str) -> Result<Option<UserRecord>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .users
            .iter()
            .find(|u| u.username.as_deref() == Some(username))
            .cloned())
    }

    async fn user_by_google_id(
        &self,
        google_id: &str,
    ) -> Result<Option<UserRecord>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .users
            .iter()
            .find(|u| u.google_id.as_deref() == Some(google_id))
            .cloned())
    }

    async fn user_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .users
            .iter()
            .find(|u| u.email.as_deref() == Some(email))
            .cloned())
    }

    async fn link_google_id(
        &self,
        user_id: Uuid,
        google_id: &str,
    ) -> Result<Option<UserRecord>, StoreError> {
        let mut inner = self.inner.write().await;
        let conflict = inner
            .users
            .iter()
            .any(|u| u.id != user_id && u.google_id.as_deref() == Some(google_id));
        if conflict {
            return Err(StoreError::Conflict("users.google_id".to_string()));
        }
        let Some(user) = inner.users.iter_mut().find(|u| u.id == user_id) else {
            return Ok(None);
        };
        if user.google_id.is_none() {
            user.google_id = Some(google_id.to_string());
            user.updated_at = Utc::now();
        }
        Ok(Some(user.clone()))
    }

    async fn list_books(
        &self,
        owner: Uuid,
        status: Option<BookStatus>,
    ) -> Result<Vec<Book>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .books
            .iter()
            .filter(|b| b.user == owner && status.is_none_or(|s| b.status == s))
            .cloned()
            .collect())
    }

    async fn insert_book(&self, owner: Uuid, book: &NewBook) -> Result<Book, StoreError> {
        let mut inner = self.inner.write().await;
        let now = Utc::now();
        let record = Book {
            id: Uuid::new_v4(),
            title: book.title.clone(),
            author: book.author.clone(),
            status: book.status,
            user: owner,
            created_at: now,
            updated_at: now,
        };
        inner.books.push(record.clone());
        Ok(record)
    }

    async fn update_book(
        &self,
        owner: Uuid,
        id: Uuid,
        patch: &BookPatch,
    ) -> Result<Option<Book>, StoreError> {
        let mut inner = self.inner.write().await;
        let Some(book) = inner
            .books
            .iter_mut()
            .find(|b| b.id == id && b.user == owner)
        else {
            return Ok(None);
        };
        patch.apply(book);
        book.updated_at = Utc::now();
        Ok(Some(book.clone()))
    }

    async fn delete_book(&self, owner: Uuid, id: Uuid) -> Result<bool, StoreError> {
        let mut inner = self.inner.write().await;
        let before = inner.books.len();
        inner.books.retain(|b| !(b.id == id && b.user == owner));
        Ok(inner.books.len() != before)
    }
}
