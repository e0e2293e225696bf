//! # Bookshelf (personal book tracking)
//!
//! `bookshelf` is a small book-tracking service and its command-line client.
//! Users register with a username and password, or sign in with a Google ID
//! token, and then keep a list of books they want to read, are reading, or
//! have read.
//!
//! ## Authentication
//!
//! Passwords are stored as argon2id hashes. Successful authentication yields
//! an HS256 session token carrying the user id and the username or email.
//! Locally issued tokens do not expire by default; provider-issued tokens
//! expire after a day. Both lifetimes are configurable.
//!
//! Google ID tokens are verified offline against the provider's JWKS, which is
//! cached in memory and refreshed when stale or when an unknown `kid` shows up.
//!
//! ## Ownership
//!
//! Every book belongs to exactly one user. Book queries always filter on
//! `(id, owner)` in the same predicate, so requests for another user's book
//! answer `404 Not Found` exactly like requests for a book that never existed.
//!
//! ## Client
//!
//! The [`client`] module holds the client-side session (a persisted opaque
//! token), an unverified display hint decoded from it, the HTTP client, and
//! the application state machine that the CLI drives.

pub mod api;
pub mod cli;
pub mod client;
pub mod store;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
