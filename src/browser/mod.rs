//! Driven browser capability
//!
//! Submission pages only carry their source after client-side scripts have
//! run, and the login form needs a human, so both go through a real browser.
//! The [`Browser`] trait is the narrow surface the rest of the crate needs;
//! [`WebDriverSession`] implements it over the W3C WebDriver protocol, and
//! tests substitute fixtures.

mod webdriver;

pub use webdriver::WebDriverSession;

use crate::auth::StoredCookie;
use async_trait::async_trait;
use scraper::{Html, Selector};
use std::time::{Duration, Instant};
use thiserror::Error;

/// How often readiness and login conditions are re-checked
pub const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Errors raised while driving the browser
#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("WebDriver request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("WebDriver error {error}: {message}")]
    WebDriver { error: String, message: String },

    #[error("Unexpected WebDriver response: {0}")]
    Protocol(String),

    #[error("Timed out after {0:?}")]
    Timeout(Duration),
}

/// Result type for browser operations
pub type BrowserResult<T> = Result<T, BrowserError>;

/// The operations the mirror needs from a driven browser
#[async_trait]
pub trait Browser: Send {
    /// Loads `url` in the current window
    async fn navigate(&mut self, url: &str) -> BrowserResult<()>;

    /// Returns the address currently shown by the window
    async fn current_url(&mut self) -> BrowserResult<String>;

    /// Returns the markup of the page as currently rendered
    async fn page_source(&mut self) -> BrowserResult<String>;

    /// Returns every cookie visible to the current page
    async fn cookies(&mut self) -> BrowserResult<Vec<StoredCookie>>;
}

/// Markup captured from a rendered page
#[derive(Debug, Clone)]
pub struct RenderedPage {
    pub markup: String,
    /// Whether the readiness marker showed up before the timeout
    pub ready: bool,
}

/// Navigates to `url` and waits for an element matching `ready_selector`
///
/// Returns the last markup seen either way; `ready` tells whether the marker
/// appeared within `timeout`.
pub async fn render_and_get_markup<B: Browser + ?Sized>(
    browser: &mut B,
    url: &str,
    ready_selector: &str,
    timeout: Duration,
) -> BrowserResult<RenderedPage> {
    browser.navigate(url).await?;

    let started = Instant::now();
    loop {
        let markup = browser.page_source().await?;
        if contains_element(&markup, ready_selector) {
            return Ok(RenderedPage {
                markup,
                ready: true,
            });
        }

        let elapsed = started.elapsed();
        if elapsed >= timeout {
            tracing::debug!("{} not ready after {:?}", url, elapsed);
            return Ok(RenderedPage {
                markup,
                ready: false,
            });
        }

        tokio::time::sleep(POLL_INTERVAL.min(timeout - elapsed)).await;
    }
}

/// Blocks until the window's address satisfies `done`, or `timeout` passes
pub async fn wait_for_url<B, F>(browser: &mut B, done: F, timeout: Duration) -> BrowserResult<String>
where
    B: Browser + ?Sized,
    F: Fn(&str) -> bool,
{
    let started = Instant::now();
    loop {
        let current = browser.current_url().await?;
        if done(&current) {
            return Ok(current);
        }

        let elapsed = started.elapsed();
        if elapsed >= timeout {
            return Err(BrowserError::Timeout(timeout));
        }

        tokio::time::sleep(POLL_INTERVAL.min(timeout - elapsed)).await;
    }
}

/// Checks whether `markup` contains an element matching a CSS selector
pub fn contains_element(markup: &str, selector: &str) -> bool {
    let Ok(selector) = Selector::parse(selector) else {
        return false;
    };
    Html::parse_document(markup).select(&selector).next().is_some()
}
