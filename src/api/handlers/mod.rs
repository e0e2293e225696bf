//! Route handlers and shared input helpers.

pub mod auth;
pub mod books;
pub mod health;

use regex::Regex;

/// Usernames are 1-64 characters with no whitespace.
pub fn valid_username(username: &str) -> bool {
    Regex::new(r"^\S{1,64}$").is_ok_and(|re| re.is_match(username))
}

/// Emails are compared case-insensitively; store them lowercased.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
