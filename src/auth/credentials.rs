use serde::{Deserialize, Serialize};

/// Name of the cookie that carries the CSRF token
pub const CSRF_COOKIE: &str = "csrftoken";

/// One browser cookie, in the shape WebDriver reports it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredCookie {
    pub name: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default)]
    pub secure: bool,
    #[serde(rename = "httpOnly", default)]
    pub http_only: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<i64>,
}

impl StoredCookie {
    pub fn new(name: &str, value: &str) -> Self {
        Self {
            name: name.to_string(),
            value: value.to_string(),
            domain: None,
            path: None,
            secure: false,
            http_only: false,
            expiry: None,
        }
    }
}

/// Everything the API channel needs to act as the logged-in user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedContext {
    pub cookies: Vec<StoredCookie>,
    pub csrf_token: Option<String>,
}

impl AuthenticatedContext {
    /// Builds a context, pulling the CSRF token out of its cookie
    pub fn from_cookies(cookies: Vec<StoredCookie>) -> Self {
        let csrf_token = cookies
            .iter()
            .rev()
            .find(|c| c.name == CSRF_COOKIE)
            .map(|c| c.value.clone());

        Self {
            cookies,
            csrf_token,
        }
    }

    /// Renders the cookie set as a `Cookie` request header value
    pub fn cookie_header(&self) -> String {
        self.cookies
            .iter()
            .map(|c| format!("{}={}", c.name, c.value))
            .collect::<Vec<_>>()
            .join("; ")
    }
}
