//! Client application state and the single event dispatcher that drives it.

use std::fmt::{self, Write as _};
use tracing::{debug, warn};
use uuid::Uuid;

use super::{
    api::{ApiClient, ClientError, Filter},
    hint::DisplayHint,
    session::Session,
};
use crate::{
    api::handlers::auth::AuthResponse,
    store::{Book, BookStatus},
};

pub const SESSION_EXPIRED: &str = "Session expired. Please login again.";
pub const EMPTY_LIST: &str = "No books found. Add some books to get started!";

/// Which auth form is showing. Exactly one is active at a time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Panel {
    #[default]
    Login,
    Register,
}

/// Every user action the client understands.
#[derive(Clone, PartialEq, Eq)]
pub enum Event {
    SwitchPanel(Panel),
    Login { username: String, password: String },
    Register { username: String, password: String },
    ProviderLogin { assertion: String },
    Logout,
    SetFilter(Filter),
    AddBook {
        title: String,
        author: String,
        status: Option<BookStatus>,
    },
    CycleStatus { id: Uuid },
    DeleteBook { id: Uuid },
    Refresh,
}

// Credentials and assertions never reach the logs.
impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SwitchPanel(panel) => f.debug_tuple("SwitchPanel").field(panel).finish(),
            Self::Login { username, .. } => f
                .debug_struct("Login")
                .field("username", username)
                .finish_non_exhaustive(),
            Self::Register { username, .. } => f
                .debug_struct("Register")
                .field("username", username)
                .finish_non_exhaustive(),
            Self::ProviderLogin { .. } => f.debug_struct("ProviderLogin").finish_non_exhaustive(),
            Self::Logout => f.write_str("Logout"),
            Self::SetFilter(filter) => f.debug_tuple("SetFilter").field(filter).finish(),
            Self::AddBook {
                title,
                author,
                status,
            } => f
                .debug_struct("AddBook")
                .field("title", title)
                .field("author", author)
                .field("status", status)
                .finish(),
            Self::CycleStatus { id } => f.debug_struct("CycleStatus").field("id", id).finish(),
            Self::DeleteBook { id } => f.debug_struct("DeleteBook").field("id", id).finish(),
            Self::Refresh => f.write_str("Refresh"),
        }
    }
}

#[derive(Debug)]
pub struct ClientApp {
    api: ApiClient,
    session: Session,
    panel: Panel,
    filter: Filter,
    user: Option<String>,
    books: Vec<Book>,
    message: Option<String>,
}

impl ClientApp {
    #[must_use]
    pub fn new(api: ApiClient, session: Session) -> Self {
        Self {
            api,
            session,
            panel: Panel::default(),
            filter: Filter::default(),
            user: None,
            books: Vec::new(),
            message: None,
        }
    }

    /// Restore the signed-in state from the stored token without any network
    /// call. A token whose payload cannot be decoded is discarded.
    ///
    /// # Errors
    /// Returns an error if an undecodable token cannot be removed.
    pub fn restore(&mut self) -> Result<bool, ClientError> {
        let Some(token) = self.session.token() else {
            return Ok(false);
        };
        if let Some(hint) = DisplayHint::decode(token) {
            self.user = Some(hint.display_name().to_string());
            Ok(true)
        } else {
            warn!("Discarding undecodable session token");
            self.session.clear()?;
            self.user = None;
            Ok(false)
        }
    }

    /// Restore the session and, when signed in, fetch the book list.
    ///
    /// # Errors
    /// Returns `Unauthorized` (after clearing the session) if the server rejects the token.
    pub async fn load(&mut self) -> Result<(), ClientError> {
        if self.restore()? {
            self.refresh().await?;
        }
        Ok(())
    }

    /// Apply one event. Failures are also recorded as the current message.
    ///
    /// # Errors
    /// Returns the underlying client error; a 401 on an authenticated call has
    /// already cleared the session when this returns `Unauthorized`.
    pub async fn dispatch(&mut self, event: Event) -> Result<(), ClientError> {
        debug!(?event, "Dispatching client event");
        self.message = None;
        let result = match event {
            Event::SwitchPanel(panel) => {
                self.panel = panel;
                Ok(())
            }
            Event::Login { username, password } => {
                let response = self.api.login(&username, &password).await;
                self.sign_in(response, "Login failed").await
            }
            Event::Register { username, password } => {
                let response = self.api.register(&username, &password).await;
                self.sign_in(response, "Registration failed").await
            }
            Event::ProviderLogin { assertion } => {
                let response = self.api.login_with_google(&assertion).await;
                self.sign_in(response, "Failed to sign in with Google. Please try again.")
                    .await
            }
            Event::Logout => self.sign_out(),
            Event::SetFilter(filter) => {
                self.filter = filter;
                self.refresh().await
            }
            Event::Refresh => self.refresh().await,
            Event::AddBook {
                title,
                author,
                status,
            } => self.add_book(&title, &author, status).await,
            Event::CycleStatus { id } => self.cycle_status(id).await,
            Event::DeleteBook { id } => self.delete_book(id).await,
        };
        if let Err(err) = &result
            && self.message.is_none()
        {
            self.message = Some(err.to_string());
        }
        result
    }

    async fn sign_in(
        &mut self,
        response: Result<AuthResponse, ClientError>,
        failure: &str,
    ) -> Result<(), ClientError> {
        let response = match response {
            Ok(response) => response,
            Err(err) => {
                self.message = Some(format!("{failure} ({err})"));
                return Err(err);
            }
        };
        self.session.save(&response.token)?;
        self.user = Some(response.user.display_name().to_string());
        self.panel = Panel::Login;
        self.refresh().await
    }

    fn sign_out(&mut self) -> Result<(), ClientError> {
        self.session.clear()?;
        self.user = None;
        self.books.clear();
        self.filter = Filter::All;
        self.panel = Panel::Login;
        Ok(())
    }

    fn token(&self) -> Result<String, ClientError> {
        self.session
            .token()
            .map(str::to_string)
            .ok_or(ClientError::NotSignedIn)
    }

    /// A rejected session is dropped client-side before the error surfaces.
    fn session_failure(&mut self, err: ClientError) -> ClientError {
        if matches!(err, ClientError::Unauthorized) {
            if let Err(clear) = self.sign_out() {
                warn!(error = %clear, "Failed to clear expired session");
            }
            self.message = Some(SESSION_EXPIRED.to_string());
        }
        err
    }

    async fn refresh(&mut self) -> Result<(), ClientError> {
        let token = self.token()?;
        match self.api.list_books(&token, self.filter).await {
            Ok(books) => {
                self.books = books;
                Ok(())
            }
            Err(err) => {
                let err = self.session_failure(err);
                if self.message.is_none() {
                    self.message = Some(format!("Failed to fetch books ({err})"));
                }
                Err(err)
            }
        }
    }

    async fn add_book(
        &mut self,
        title: &str,
        author: &str,
        status: Option<BookStatus>,
    ) -> Result<(), ClientError> {
        let token = self.token()?;
        if let Err(err) = self.api.create_book(&token, title, author, status).await {
            let err = self.session_failure(err);
            if self.message.is_none() {
                self.message = Some(format!("Failed to add book ({err})"));
            }
            return Err(err);
        }
        self.refresh().await
    }

    async fn cycle_status(&mut self, id: Uuid) -> Result<(), ClientError> {
        let token = self.token()?;
        let current = match self.books.iter().find(|book| book.id == id) {
            Some(book) => book.status,
            None => {
                return Err(ClientError::Http {
                    status: 404,
                    message: "Book not found".to_string(),
                });
            }
        };
        if let Err(err) = self.api.update_status(&token, id, current.next()).await {
            return Err(self.session_failure(err));
        }
        self.refresh().await
    }

    async fn delete_book(&mut self, id: Uuid) -> Result<(), ClientError> {
        let token = self.token()?;
        if let Err(err) = self.api.delete_book(&token, id).await {
            return Err(self.session_failure(err));
        }
        self.refresh().await
    }

    #[must_use]
    pub fn is_signed_in(&self) -> bool {
        self.user.is_some()
    }

    #[must_use]
    pub fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }

    #[must_use]
    pub fn books(&self) -> &[Book] {
        &self.books
    }

    #[must_use]
    pub const fn filter(&self) -> Filter {
        self.filter
    }

    #[must_use]
    pub const fn panel(&self) -> Panel {
        self.panel
    }

    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    #[must_use]
    pub const fn session(&self) -> &Session {
        &self.session
    }

    /// Plain-text view of the current state.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        match &self.user {
            None => {
                let (login, register) = match self.panel {
                    Panel::Login => ("[Login]", "Register"),
                    Panel::Register => ("Login", "[Register]"),
                };
                let _ = writeln!(out, "{login} {register}");
            }
            Some(user) => {
                let _ = writeln!(out, "Signed in as {user}");
                let _ = writeln!(out, "Filter: {}", self.filter.as_str());
                if self.books.is_empty() {
                    let _ = writeln!(out, "{EMPTY_LIST}");
                }
                for book in &self.books {
                    out.push_str(&render_card(book));
                }
            }
        }
        if let Some(message) = &self.message {
            let _ = writeln!(out, "{message}");
        }
        out
    }
}

fn render_card(book: &Book) -> String {
    format!(
        "\n[{}] {}\n  by {}\n  id: {}\n",
        book.status.label(),
        book.title,
        book.author,
        book.id
    )
}
