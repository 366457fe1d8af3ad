//! HTTP transport abstraction.
//!
//! [`Client`](crate::Client) builds [`ApiRequest`]s and interprets
//! [`ApiResponse`]s; the transport only moves bytes. Non-2xx statuses are
//! returned as responses, not errors, so the client can read the error body.
//!
//! # Testing
//!
//! Use [`MockTransport`] to script responses without network access:
//!
//! ```
//! use ionoskit::transport::{ApiResponse, Method, MockTransport};
//! use serde_json::json;
//!
//! let mock = MockTransport::new();
//! mock.respond(Method::Get, "/datacenters", ApiResponse::ok(json!({"items": []})));
//! ```

use crate::config::{ClientConfig, DEFAULT_API_URL};
use crate::error::Result;
use serde_json::{Map, Value, json};
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::{Arc, Mutex};

/// HTTP methods used by the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        };
        f.write_str(name)
    }
}

/// An outgoing request with an absolute URL.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub url: String,
    pub body: Option<Value>,
}

/// A response of any status.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    /// `Location` header, present on accepted mutations
    pub location: Option<String>,
    /// Parsed JSON body, `Null` when empty
    pub body: Value,
}

impl ApiResponse {
    pub fn new(status: u16, body: Value) -> Self {
        Self {
            status,
            location: None,
            body,
        }
    }

    /// 200 with a body.
    pub fn ok(body: Value) -> Self {
        Self::new(200, body)
    }

    /// 202 carrying a request-status location.
    pub fn accepted(body: Value, request_id: &str) -> Self {
        Self::new(202, body).with_location(format!(
            "{DEFAULT_API_URL}/requests/{request_id}/status"
        ))
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Moves one request over the wire.
pub trait Transport: Send + Sync {
    fn send(&self, request: &ApiRequest) -> Result<ApiResponse>;
}

/// Blocking transport over a `ureq` agent.
pub struct HttpTransport {
    agent: ureq::Agent,
    authorization: String,
    user_agent: String,
}

impl HttpTransport {
    pub fn new(config: &ClientConfig) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(config.timeout))
            .build()
            .into();
        Self {
            agent,
            authorization: config.credentials.authorization(),
            user_agent: config.user_agent.clone(),
        }
    }

    fn decorate<B>(&self, builder: ureq::RequestBuilder<B>) -> ureq::RequestBuilder<B> {
        builder
            .header("Authorization", &self.authorization)
            .header("User-Agent", &self.user_agent)
            .header("Accept", "application/json")
    }
}

impl Transport for HttpTransport {
    fn send(&self, request: &ApiRequest) -> Result<ApiResponse> {
        let empty = Value::Object(Map::new());
        let body = request.body.as_ref().unwrap_or(&empty);
        let url = request.url.as_str();

        let mut response = match request.method {
            Method::Get => self.decorate(self.agent.get(url)).call()?,
            Method::Delete => self.decorate(self.agent.delete(url)).call()?,
            Method::Post => self.decorate(self.agent.post(url)).send_json(body)?,
            Method::Put => self.decorate(self.agent.put(url)).send_json(body)?,
            Method::Patch => self.decorate(self.agent.patch(url)).send_json(body)?,
        };

        let status = response.status().as_u16();
        let location = response
            .headers()
            .get("location")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let text = response.body_mut().read_to_string()?;
        let body = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).unwrap_or(Value::String(text))
        };

        log::trace!("{} {url} -> {status}", request.method);
        Ok(ApiResponse {
            status,
            location,
            body,
        })
    }
}

/// Scripted transport for tests.
///
/// Responses are keyed by method and API path (query string ignored). Each
/// call consumes the next queued response; the last one repeats. Unscripted
/// requests get a 404.
#[derive(Debug, Clone)]
pub struct MockTransport {
    base: String,
    responses: Arc<Mutex<HashMap<(Method, String), VecDeque<ApiResponse>>>>,
    requests: Arc<Mutex<Vec<ApiRequest>>>,
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTransport {
    /// Mock for clients configured with the default API URL.
    #[must_use]
    pub fn new() -> Self {
        Self::with_base(DEFAULT_API_URL)
    }

    #[must_use]
    pub fn with_base(base: impl Into<String>) -> Self {
        Self {
            base: base.into().trim_end_matches('/').to_string(),
            responses: Arc::default(),
            requests: Arc::default(),
        }
    }

    /// Queue a response for `method path`.
    pub fn respond(&self, method: Method, path: &str, response: ApiResponse) {
        let mut responses = self.responses.lock().unwrap();
        responses
            .entry((method, path.to_string()))
            .or_default()
            .push_back(response);
    }

    /// Requests sent so far, in order.
    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// `METHOD path` of every request sent so far.
    pub fn request_lines(&self) -> Vec<String> {
        self.requests()
            .iter()
            .map(|r| format!("{} {}", r.method, self.path_of(&r.url)))
            .collect()
    }

    fn path_of(&self, url: &str) -> String {
        let without_query = url.split('?').next().unwrap_or(url);
        without_query
            .strip_prefix(&self.base)
            .unwrap_or(without_query)
            .to_string()
    }
}

impl Transport for MockTransport {
    fn send(&self, request: &ApiRequest) -> Result<ApiResponse> {
        self.requests.lock().unwrap().push(request.clone());

        let path = self.path_of(&request.url);
        let mut responses = self.responses.lock().unwrap();
        let response = match responses.get_mut(&(request.method, path.clone())) {
            Some(queue) if queue.len() > 1 => queue.pop_front(),
            Some(queue) => queue.front().cloned(),
            None => None,
        };

        Ok(response.unwrap_or_else(|| {
            ApiResponse::new(
                404,
                json!({"httpStatus": 404, "messages": [
                    {"message": format!("no mock response for {} {path}", request.method)}
                ]}),
            )
        }))
    }
}
