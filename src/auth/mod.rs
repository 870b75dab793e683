//! Credential store for the authenticated session
//!
//! A session is a cookie set plus the CSRF token carried by one of those
//! cookies. It is restored from a credential file when one exists, and
//! otherwise captured from the browser after a human completes the login
//! form.

mod credentials;
mod login;

pub use credentials::{AuthenticatedContext, StoredCookie, CSRF_COOKIE};
pub use login::CredentialStore;

use crate::browser::BrowserError;
use std::time::Duration;
use thiserror::Error;

/// Errors raised while restoring or establishing a session
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Failed to access credential file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Credential file is not valid: {0}")]
    Format(#[from] serde_json::Error),

    #[error("Browser failed during login: {0}")]
    Browser(#[from] BrowserError),

    #[error("Login was not completed within {0:?}")]
    LoginTimeout(Duration),

    #[error("Login finished but the browser holds no cookies")]
    NoCookies,
}

/// Result type for credential operations
pub type AuthResult<T> = Result<T, AuthError>;
