//! Display hint decoded from a session token without verifying it.
//!
//! The payload is only used to show a name in the client header. The server
//! re-verifies the token on every call, so nothing here is trusted.

use base64ct::{Base64UrlUnpadded, Encoding};
use serde::Deserialize;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct DisplayHint {
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    email: Option<String>,
}

impl DisplayHint {
    /// Decode the middle segment of a JWT. Returns `None` for anything that is
    /// not three dot-separated segments with a base64url JSON payload.
    #[must_use]
    pub fn decode(token: &str) -> Option<Self> {
        let mut parts = token.split('.');
        let (_header, payload, _signature) = (parts.next()?, parts.next()?, parts.next()?);
        if parts.next().is_some() {
            return None;
        }
        let bytes = Base64UrlUnpadded::decode_vec(payload.trim_end_matches('=')).ok()?;
        serde_json::from_slice(&bytes).ok()
    }

    /// `username`, else `email`, else `"User"`.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.username
            .as_deref()
            .or(self.email.as_deref())
            .unwrap_or("User")
    }
}
