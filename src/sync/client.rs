//! Authenticated API channel
//!
//! Every request carries the session cookies, the CSRF token and a browser
//! user agent. The client never retries; callers decide what to do with a
//! failure using [`QueryError::is_transient`].

use crate::auth::AuthenticatedContext;
use crate::config::RemoteConfig;
use crate::sync::queries::{
    self, ProblemDetail, ProblemList, QuestionNote, SubmissionList,
};
use reqwest::header::{HeaderMap, HeaderValue, InvalidHeaderValue, CONTENT_TYPE, COOKIE, REFERER};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::time::Duration;
use thiserror::Error;

/// Longest response body kept in an error message
const ERROR_BODY_LIMIT: usize = 512;

/// Errors raised by a single remote query
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("response is not valid JSON: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("remote reported errors: {0}")]
    GraphQl(String),

    #[error("response has no value at {0}")]
    Missing(String),

    #[error("session cookie cannot be sent as a header: {0}")]
    Header(#[from] InvalidHeaderValue),
}

impl QueryError {
    /// Whether the same request might succeed if sent again
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::Status { status, .. } => {
                *status == StatusCode::TOO_MANY_REQUESTS.as_u16() || (500..600).contains(status)
            }
            _ => false,
        }
    }
}

/// Issues queries as the logged-in user
#[derive(Debug, Clone)]
pub struct QueryClient {
    client: Client,
    base_url: String,
}

impl QueryClient {
    /// Builds a client that sends the session with every request
    pub fn new(context: &AuthenticatedContext, remote: &RemoteConfig) -> Result<Self, QueryError> {
        let base_url = remote.base_url.trim_end_matches('/').to_string();

        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_str(&context.cookie_header())?);
        if let Some(token) = &context.csrf_token {
            headers.insert("x-csrftoken", HeaderValue::from_str(token)?);
        }
        headers.insert(
            REFERER,
            HeaderValue::from_str(&format!("{}/accounts/login/", base_url))?,
        );

        let client = Client::builder()
            .user_agent(remote.user_agent.as_str())
            .default_headers(headers)
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .gzip(true)
            .brotli(true)
            .build()?;

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Resolves a path returned by the API against the service origin
    pub fn absolute_url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    /// Sends one GraphQL document and returns the decoded response body
    pub async fn query(
        &self,
        operation_name: &str,
        variables: Value,
        document: &str,
    ) -> Result<Value, QueryError> {
        let payload = json!({
            "operationName": operation_name,
            "variables": variables,
            "query": document,
        });

        tracing::trace!("Query {} with {}", operation_name, payload["variables"]);

        let response = self
            .client
            .post(format!("{}/graphql", self.base_url))
            .header(CONTENT_TYPE, "application/json")
            .body(serde_json::to_vec(&payload)?)
            .send()
            .await?;

        let body = read_json(response).await?;
        if let Some(errors) = body.get("errors").and_then(Value::as_array) {
            if !errors.is_empty() {
                let messages = errors
                    .iter()
                    .map(|e| {
                        e.get("message")
                            .and_then(Value::as_str)
                            .map(str::to_string)
                            .unwrap_or_else(|| e.to_string())
                    })
                    .collect::<Vec<_>>()
                    .join("; ");
                return Err(QueryError::GraphQl(messages));
            }
        }

        Ok(body)
    }

    /// Fetches the whole problem catalog with the user's status per problem
    pub async fn fetch_problem_list(&self) -> Result<ProblemList, QueryError> {
        let response = self
            .client
            .get(format!("{}/api/problems/all/", self.base_url))
            .send()
            .await?;
        let body = read_json(response).await?;
        Ok(serde_json::from_value(body)?)
    }

    pub async fn fetch_problem_detail(&self, slug: &str) -> Result<ProblemDetail, QueryError> {
        let body = self
            .query(
                queries::PROBLEM_DETAIL_OPERATION,
                queries::problem_variables(slug),
                queries::PROBLEM_DETAIL_QUERY,
            )
            .await?;
        take_at(body, &["data", "question"])
    }

    pub async fn fetch_solution(&self, slug: &str) -> Result<QuestionNote, QueryError> {
        let body = self
            .query(
                queries::SOLUTION_OPERATION,
                queries::problem_variables(slug),
                queries::SOLUTION_QUERY,
            )
            .await?;
        take_at(body, &["data", "question"])
    }

    /// Fetches the first page of the user's submissions to a problem
    pub async fn fetch_submissions(&self, slug: &str) -> Result<SubmissionList, QueryError> {
        let body = self
            .query(
                queries::SUBMISSIONS_OPERATION,
                queries::submission_variables(slug),
                queries::SUBMISSIONS_QUERY,
            )
            .await?;
        let list: Option<SubmissionList> = take_optional_at(body, &["data", "submissionList"])?;
        Ok(list.unwrap_or_default())
    }
}

async fn read_json(response: reqwest::Response) -> Result<Value, QueryError> {
    let status = response.status();
    let bytes = response.bytes().await?;

    if !status.is_success() {
        let mut body = String::from_utf8_lossy(&bytes).into_owned();
        if body.len() > ERROR_BODY_LIMIT {
            let mut cut = ERROR_BODY_LIMIT;
            while !body.is_char_boundary(cut) {
                cut -= 1;
            }
            body.truncate(cut);
        }
        return Err(QueryError::Status {
            status: status.as_u16(),
            body,
        });
    }

    Ok(serde_json::from_slice(&bytes)?)
}

/// Walks `path` into `body` and decodes what it finds there
fn take_at<T: DeserializeOwned>(body: Value, path: &[&str]) -> Result<T, QueryError> {
    take_optional_at(body, path)?.ok_or_else(|| QueryError::Missing(path.join(".")))
}

/// Like [`take_at`], but a `null` in the last position decodes as `None`
fn take_optional_at<T: DeserializeOwned>(
    mut body: Value,
    path: &[&str],
) -> Result<Option<T>, QueryError> {
    for (depth, key) in path.iter().enumerate() {
        body = match body {
            Value::Object(mut map) => map.remove(*key).unwrap_or(Value::Null),
            _ => Value::Null,
        };
        if body.is_null() {
            if depth + 1 == path.len() {
                return Ok(None);
            }
            return Err(QueryError::Missing(path[..=depth].join(".")));
        }
    }
    Ok(Some(serde_json::from_value(body)?))
}
