use serde::Deserialize;

/// Main configuration structure for Leetdeck
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub remote: RemoteConfig,
    pub browser: BrowserConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    pub output: OutputConfig,
}

/// Remote service configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteConfig {
    /// Origin of the remote service (e.g., "https://leetcode.com")
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// User agent sent on the authenticated API channel
    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,
}

/// Driven browser configuration
#[derive(Debug, Clone, Deserialize)]
pub struct BrowserConfig {
    /// WebDriver endpoint (e.g., a local chromedriver)
    #[serde(rename = "webdriver-url")]
    pub webdriver_url: String,

    /// Whether to start the browser without a window
    #[serde(default)]
    pub headless: bool,

    /// How long to wait for a human to finish the login form (seconds)
    #[serde(rename = "login-timeout-secs", default = "default_login_timeout")]
    pub login_timeout_secs: u64,

    /// How long to wait for a submission page to become ready (seconds)
    #[serde(
        rename = "extraction-timeout-secs",
        default = "default_extraction_timeout"
    )]
    pub extraction_timeout_secs: u64,

    /// CSS selector whose presence marks a submission page as rendered
    #[serde(rename = "ready-selector", default = "default_ready_selector")]
    pub ready_selector: String,
}

/// Synchronization pacing and retry configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SyncConfig {
    /// Lower bound of the randomized delay after each remote call (seconds)
    #[serde(rename = "min-pace-secs", default = "default_min_pace")]
    pub min_pace_secs: f64,

    /// Upper bound of the randomized delay after each remote call (seconds)
    #[serde(rename = "max-pace-secs", default = "default_max_pace")]
    pub max_pace_secs: f64,

    /// Attempts per remote query before giving up on transient failures
    #[serde(rename = "max-attempts", default = "default_max_attempts")]
    pub max_attempts: u32,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            min_pace_secs: default_min_pace(),
            max_pace_secs: default_max_pace(),
            max_attempts: default_max_attempts(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,

    /// Path to the persisted session cookies
    #[serde(rename = "credentials-path")]
    pub credentials_path: String,

    /// Path to the rendered markdown deck
    #[serde(rename = "deck-path")]
    pub deck_path: String,
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_11_6) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/54.0.2840.98 Safari/537.36".to_string()
}

fn default_login_timeout() -> u64 {
    // 60 days; effectively "until a human shows up"
    60 * 24 * 3600
}

fn default_extraction_timeout() -> u64 {
    10
}

fn default_ready_selector() -> String {
    "#result_date".to_string()
}

fn default_min_pace() -> f64 {
    10.0
}

fn default_max_pace() -> f64 {
    15.0
}

fn default_max_attempts() -> u32 {
    3
}
