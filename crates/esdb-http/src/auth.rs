//! HTTP Basic authentication

use base64::{engine::general_purpose, Engine as _};
use std::fmt;

/// Username/password pair sent with a request.
///
/// The password never shows up in `Debug` output.
#[derive(Clone, PartialEq, Eq)]
pub struct UserCredentials {
    username: String,
    password: String,
}

impl UserCredentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for UserCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserCredentials")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Build the `Authorization` header value for Basic authentication.
///
/// `Basic ` followed by the standard base64 of `username:password`.
pub fn basic_auth_header(credentials: &UserCredentials) -> String {
    let raw = format!("{}:{}", credentials.username, credentials.password);
    format!("Basic {}", general_purpose::STANDARD.encode(raw.as_bytes()))
}
