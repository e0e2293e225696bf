//! Command-line client for the bookshelf API.
//!
//! [`ClientApp`] owns the state a user sees (active auth panel, status filter,
//! loaded books, last message) and changes it only through
//! [`ClientApp::dispatch`]. The session token is persisted by [`Session`];
//! the name shown for it comes from an unverified [`DisplayHint`].

pub mod api;
pub mod app;
pub mod hint;
pub mod session;

pub use api::{ApiClient, ClientError, Filter};
pub use app::{ClientApp, Event, Panel};
pub use hint::DisplayHint;
pub use session::Session;
