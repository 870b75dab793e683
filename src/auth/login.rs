use crate::auth::{AuthError, AuthResult, AuthenticatedContext, StoredCookie};
use crate::browser::{wait_for_url, Browser, BrowserError};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Persists the session cookies and drives the login flow when they are missing
///
/// The credential file is the only cache and is trusted as long as it
/// exists; nothing checks cookie expiry.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Restores the persisted session, if there is one
    pub fn load(&self) -> AuthResult<Option<AuthenticatedContext>> {
        if !self.path.is_file() {
            return Ok(None);
        }

        let content = std::fs::read(&self.path)?;
        let cookies: Vec<StoredCookie> = serde_json::from_slice(&content)?;
        Ok(Some(AuthenticatedContext::from_cookies(cookies)))
    }

    /// Writes the cookie set to the credential file
    pub fn save(&self, cookies: &[StoredCookie]) -> AuthResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let content = serde_json::to_vec_pretty(cookies)?;
        std::fs::write(&self.path, content)?;
        Ok(())
    }

    /// Returns a usable session, logging in through the browser if needed
    ///
    /// With a credential file present this makes no network call at all.
    /// Otherwise the browser is sent to `login_url` and this blocks until
    /// the window leaves the login page or `timeout` passes. `timeout` is
    /// meant to be generous: a human is filling in the form.
    ///
    /// # Errors
    ///
    /// Any failure here leaves the caller without a session; the sync
    /// cannot proceed and a human has to retry.
    pub async fn obtain_session<B: Browser + ?Sized>(
        &self,
        browser: &mut B,
        login_url: &str,
        timeout: Duration,
    ) -> AuthResult<AuthenticatedContext> {
        if let Some(context) = self.load()? {
            tracing::info!("Restored session from {}", self.path.display());
            return Ok(context);
        }

        tracing::info!("Starting browser login, please fill the login form");
        browser.navigate(login_url).await?;

        wait_for_url(browser, |url| !url.contains("login"), timeout)
            .await
            .map_err(|e| match e {
                BrowserError::Timeout(limit) => AuthError::LoginTimeout(limit),
                other => AuthError::Browser(other),
            })?;

        let cookies = browser.cookies().await?;
        if cookies.is_empty() {
            return Err(AuthError::NoCookies);
        }

        self.save(&cookies)?;
        tracing::info!(
            "Login successful, {} cookies saved to {}",
            cookies.len(),
            self.path.display()
        );

        Ok(AuthenticatedContext::from_cookies(cookies))
    }
}
