//! Authenticated HTTP transport.
//!
//! Nodes describe requests as [`HttpRequest`] values and hand them to an
//! [`HttpTransport`]. The production implementation is [`ReqwestTransport`],
//! which injects the bearer token. Timeouts belong to the transport; nodes
//! never set their own.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Map, Value};
use thiserror::Error;
use tracing::{debug, trace, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fully resolved outgoing request.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    /// Absolute URL.
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
    /// When set, the response is `{statusCode, headers, body}` instead of the
    /// bare decoded body.
    pub full_response: bool,
}

impl HttpRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Error)]
pub enum TransportError {
    /// Non-2xx answer. `body` holds the decoded payload when there was one.
    #[error("the API responded with HTTP {status}")]
    Status { status: u16, body: Option<Value> },

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("failed to encode request body: {0}")]
    Encode(#[from] serde_json::Error),
}

impl TransportError {
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Network(e) => e.status().map(|s| s.as_u16()),
            Self::Encode(_) => None,
        }
    }

    pub fn response_body(&self) -> Option<&Value> {
        match self {
            Self::Status { body, .. } => body.as_ref(),
            _ => None,
        }
    }
}

/// Sends requests on behalf of a node.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Perform the request. Returns the decoded body (`null` when empty), or
    /// the full envelope when `request.full_response` is set.
    async fn send(&self, request: HttpRequest) -> Result<Value, TransportError>;
}

/// `reqwest`-backed transport with bearer-token authentication.
pub struct ReqwestTransport {
    client: Client,
    token: String,
}

impl ReqwestTransport {
    pub fn new(token: impl Into<String>, timeout: Option<Duration>) -> Result<Self, TransportError> {
        let mut builder = Client::builder().user_agent(concat!("tfc-node/", env!("CARGO_PKG_VERSION")));
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            token: token.into(),
        })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<Value, TransportError> {
        let method = match request.method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Patch => reqwest::Method::PATCH,
            HttpMethod::Delete => reqwest::Method::DELETE,
        };

        let mut builder = self
            .client
            .request(method, &request.url)
            .bearer_auth(&self.token);

        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.body(serde_json::to_vec(body)?);
        }

        debug!(method = %request.method, url = %request.url, "sending request");
        let response = builder.send().await?;
        let status = response.status();
        let headers: Map<String, Value> = response
            .headers()
            .iter()
            .filter_map(|(k, v)| {
                v.to_str()
                    .ok()
                    .map(|v| (k.as_str().to_owned(), Value::String(v.to_owned())))
            })
            .collect();
        let text = response.text().await?;

        debug!("Response status: {}", status);
        trace!(
            "Response body (first 2000 chars): {}",
            &text[..floor_char_boundary(&text, 2000)]
        );

        let body = decode_body(&text);

        if !status.is_success() {
            warn!(
                "Terraform Cloud request failed: status={}, url={}",
                status, request.url
            );
            return Err(TransportError::Status {
                status: status.as_u16(),
                body,
            });
        }

        if request.full_response {
            return Ok(json!({
                "statusCode": status.as_u16(),
                "headers": headers,
                "body": body,
            }));
        }

        Ok(body.unwrap_or(Value::Null))
    }
}

/// Empty bodies decode to `None`; non-JSON bodies are kept as strings.
fn decode_body(text: &str) -> Option<Value> {
    if text.trim().is_empty() {
        return None;
    }
    Some(serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_owned())))
}

fn floor_char_boundary(text: &str, max: usize) -> usize {
    if text.len() <= max {
        return text.len();
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    end
}
