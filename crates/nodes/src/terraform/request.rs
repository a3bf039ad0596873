//! Request construction and the per-item API handle.

use serde_json::Value;
use tracing::debug;

use crate::jsonapi::MEDIA_TYPE;
use crate::params::OptionBag;
use crate::transport::{HttpMethod, HttpRequest, HttpTransport};
use crate::{NodeError, NodeParameters};

/// One request, relative to the API base URL. Built fresh for every call.
#[derive(Debug, Clone, PartialEq)]
pub struct OperationRequest {
    pub method: HttpMethod,
    /// Path below the base URL, starting with `/`.
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
    /// Extra headers. These override the JSON:API defaults.
    pub headers: Vec<(String, String)>,
    pub full_response: bool,
}

impl OperationRequest {
    fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            headers: Vec::new(),
            full_response: false,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, path)
    }

    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self::new(HttpMethod::Post, path).body(body)
    }

    pub fn patch(path: impl Into<String>, body: Value) -> Self {
        Self::new(HttpMethod::Patch, path).body(body)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Delete, path)
    }

    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn queries(mut self, pairs: Vec<(String, String)>) -> Self {
        self.query.extend(pairs);
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Ask the transport for `{statusCode, headers, body}`.
    pub fn full_response(mut self) -> Self {
        self.full_response = true;
        self
    }

    /// Resolve against `base_url` and apply the JSON:API default headers.
    pub fn into_http(self, base_url: &str) -> HttpRequest {
        let mut headers: Vec<(String, String)> = ["Accept", "Content-Type"]
            .into_iter()
            .filter(|name| {
                !self
                    .headers
                    .iter()
                    .any(|(k, _)| k.eq_ignore_ascii_case(name))
            })
            .map(|name| (name.to_owned(), MEDIA_TYPE.to_owned()))
            .collect();
        headers.extend(self.headers);

        HttpRequest {
            method: self.method,
            url: format!("{}{}", base_url.trim_end_matches('/'), self.path),
            headers,
            query: self.query,
            body: self.body,
            full_response: self.full_response,
        }
    }
}

/// `page[number]`, `page[size]` and optionally `search[generic]` from a list
/// options bag. Unset or zero values are left out.
pub fn page_query(options: &OptionBag, with_search: bool) -> Vec<(String, String)> {
    let mut query = Vec::new();
    if let Some(number) = options.positive_number("pageNumber") {
        query.push(("page[number]".to_owned(), number));
    }
    if let Some(size) = options.positive_number("pageSize") {
        query.push(("page[size]".to_owned(), size));
    }
    if with_search {
        if let Some(search) = options.string("search") {
            query.push(("search[generic]".to_owned(), search));
        }
    }
    query
}

/// Everything a handler needs to process one item.
pub struct ItemScope<'a> {
    pub transport: &'a dyn HttpTransport,
    pub base_url: &'a str,
    pub params: &'a NodeParameters,
    pub index: usize,
}

impl ItemScope<'_> {
    pub async fn send(&self, request: OperationRequest) -> Result<Value, NodeError> {
        debug!(
            item = self.index,
            method = %request.method,
            path = %request.path,
            "calling Terraform Cloud"
        );
        let response = self.transport.send(request.into_http(self.base_url)).await?;
        Ok(response)
    }

    pub fn string(&self, name: &str, default: &str) -> String {
        self.params.string(name, self.index, default)
    }

    pub fn required(&self, name: &str) -> Result<String, NodeError> {
        self.params.required_string(name, self.index)
    }

    pub fn boolean(&self, name: &str, default: bool) -> bool {
        self.params.boolean(name, self.index, default)
    }

    pub fn raw(&self, name: &str) -> Option<&Value> {
        self.params.get(name, self.index)
    }

    pub fn options(&self, name: &str) -> OptionBag {
        self.params.options(name, self.index)
    }
}
