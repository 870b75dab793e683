//! W3C WebDriver client
//!
//! Talks to a WebDriver endpoint (chromedriver, geckodriver, ...) with plain
//! JSON over HTTP. Only the handful of commands the mirror uses are covered.

use crate::auth::StoredCookie;
use crate::browser::{Browser, BrowserError, BrowserResult};
use async_trait::async_trait;
use reqwest::{Client, Method};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

/// Every WebDriver response wraps its payload in `value`
#[derive(Debug, Deserialize)]
struct WireResponse {
    value: Value,
}

#[derive(Debug, Deserialize)]
struct WireError {
    error: String,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct NewSession {
    #[serde(rename = "sessionId")]
    session_id: String,
}

/// An open browser session on a WebDriver endpoint
pub struct WebDriverSession {
    client: Client,
    endpoint: String,
    session_id: String,
}

impl WebDriverSession {
    /// Starts a new Chrome session
    ///
    /// # Arguments
    ///
    /// * `webdriver_url` - Base URL of the WebDriver endpoint
    /// * `headless` - Whether to run without a visible window
    pub async fn start(webdriver_url: &str, headless: bool) -> BrowserResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        let endpoint = webdriver_url.trim_end_matches('/').to_string();

        let mut args = vec!["--window-size=1280,1024"];
        if headless {
            args.push("--headless=new");
        }
        let capabilities = json!({
            "capabilities": {
                "alwaysMatch": {
                    "browserName": "chrome",
                    "goog:chromeOptions": { "args": args }
                }
            }
        });

        let value = send(
            &client,
            Method::POST,
            &format!("{}/session", endpoint),
            Some(capabilities),
        )
        .await?;
        let session: NewSession = serde_json::from_value(value)
            .map_err(|e| BrowserError::Protocol(format!("new session: {}", e)))?;

        tracing::info!("Started browser session {}", session.session_id);

        Ok(Self {
            client,
            endpoint,
            session_id: session.session_id,
        })
    }

    /// The session id assigned by the endpoint
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Ends the session and closes the browser
    pub async fn close(self) -> BrowserResult<()> {
        let url = format!("{}/session/{}", self.endpoint, self.session_id);
        send(&self.client, Method::DELETE, &url, None).await?;
        tracing::debug!("Closed browser session {}", self.session_id);
        Ok(())
    }

    async fn command(&self, method: Method, path: &str, body: Option<Value>) -> BrowserResult<Value> {
        let url = format!("{}/session/{}/{}", self.endpoint, self.session_id, path);
        send(&self.client, method, &url, body).await
    }
}

/// Sends one WebDriver command and unwraps its `value`
async fn send(client: &Client, method: Method, url: &str, body: Option<Value>) -> BrowserResult<Value> {
    let mut request = client.request(method, url);
    if let Some(body) = body {
        request = request
            .header("content-type", "application/json")
            .body(body.to_string());
    }

    let response = request.send().await?;
    let status = response.status();
    let bytes = response.bytes().await?;

    let wire: WireResponse = serde_json::from_slice(&bytes).map_err(|e| {
        BrowserError::Protocol(format!("HTTP {} with undecodable body: {}", status, e))
    })?;

    if !status.is_success() {
        let error: WireError = serde_json::from_value(wire.value).map_err(|_| {
            BrowserError::Protocol(format!("HTTP {} without a WebDriver error", status))
        })?;
        return Err(BrowserError::WebDriver {
            error: error.error,
            message: error.message,
        });
    }

    Ok(wire.value)
}

fn expect_string(value: Value, what: &str) -> BrowserResult<String> {
    match value {
        Value::String(s) => Ok(s),
        other => Err(BrowserError::Protocol(format!(
            "expected {} to be a string, got {}",
            what, other
        ))),
    }
}

#[async_trait]
impl Browser for WebDriverSession {
    async fn navigate(&mut self, url: &str) -> BrowserResult<()> {
        self.command(Method::POST, "url", Some(json!({ "url": url })))
            .await?;
        Ok(())
    }

    async fn current_url(&mut self) -> BrowserResult<String> {
        let value = self.command(Method::GET, "url", None).await?;
        expect_string(value, "current url")
    }

    async fn page_source(&mut self) -> BrowserResult<String> {
        let value = self.command(Method::GET, "source", None).await?;
        expect_string(value, "page source")
    }

    async fn cookies(&mut self) -> BrowserResult<Vec<StoredCookie>> {
        let value = self.command(Method::GET, "cookie", None).await?;
        serde_json::from_value(value).map_err(|e| BrowserError::Protocol(format!("cookies: {}", e)))
    }
}
