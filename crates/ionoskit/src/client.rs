//! Blocking REST client.

use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::request::{RequestStatus, extract_request_id};
use crate::transport::{ApiRequest, ApiResponse, HttpTransport, Method, Transport};
use serde_json::Value;

/// Body of an accepted mutation and the id of the request tracking it.
#[derive(Debug, Clone, PartialEq)]
pub struct Accepted {
    pub status: u16,
    pub body: Value,
    pub request_id: Option<String>,
}

impl Accepted {
    /// `202`: the change is applied asynchronously
    pub fn is_async(&self) -> bool {
        self.status == 202
    }
}

/// IONOS Cloud API client.
///
/// # Example
///
/// ```no_run
/// use ionoskit::{Client, ClientConfig, Credentials};
///
/// let credentials = Credentials::resolve(std::env::var("IONOS_TOKEN").ok(), None, None)?;
/// let client = Client::new(ClientConfig::new(credentials));
/// for dc in client.list("/datacenters")? {
///     println!("{}", dc["properties"]["name"]);
/// }
/// # Ok::<(), ionoskit::Error>(())
/// ```
pub struct Client {
    config: ClientConfig,
    transport: Box<dyn Transport>,
}

impl Client {
    /// Client over HTTP.
    pub fn new(config: ClientConfig) -> Self {
        let transport = HttpTransport::new(&config);
        Self::with_transport(config, transport)
    }

    /// Client over a custom transport (for testing).
    pub fn with_transport(config: ClientConfig, transport: impl Transport + 'static) -> Self {
        Self {
            config,
            transport: Box::new(transport),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// GET a collection and return its `items`.
    pub fn list(&self, path: &str) -> Result<Vec<Value>> {
        let response = self.execute(Method::Get, &self.read_url(path), path, None)?;
        match response.body {
            Value::Object(mut map) => match map.remove("items") {
                Some(Value::Array(items)) => Ok(items),
                Some(_) => Err(Error::InvalidResponse(format!("{path}: items is not an array"))),
                None => Ok(Vec::new()),
            },
            _ => Err(Error::InvalidResponse(format!("{path}: expected an object"))),
        }
    }

    /// GET a single object.
    pub fn get(&self, path: &str) -> Result<Value> {
        Ok(self
            .execute(Method::Get, &self.read_url(path), path, None)?
            .body)
    }

    pub fn post(&self, path: &str, body: &Value) -> Result<Accepted> {
        self.mutate(Method::Post, path, Some(body))
    }

    pub fn put(&self, path: &str, body: &Value) -> Result<Accepted> {
        self.mutate(Method::Put, path, Some(body))
    }

    pub fn patch(&self, path: &str, body: &Value) -> Result<Accepted> {
        self.mutate(Method::Patch, path, Some(body))
    }

    /// DELETE an object, returning the tracking request id if any.
    pub fn delete(&self, path: &str) -> Result<Option<String>> {
        Ok(self.mutate(Method::Delete, path, None)?.request_id)
    }

    /// Current state of an accepted request.
    pub fn request_status(&self, request_id: &str) -> Result<RequestStatus> {
        let path = format!("/requests/{request_id}/status");
        let body = self.get(&path)?;
        Ok(RequestStatus::from_body(&body))
    }

    fn mutate(&self, method: Method, path: &str, body: Option<&Value>) -> Result<Accepted> {
        let response = self.execute(method, &self.config.url(path), path, body.cloned())?;
        let request_id = response.location.as_deref().and_then(extract_request_id);
        log::debug!(
            "{method} {path} accepted (request {})",
            request_id.as_deref().unwrap_or("none")
        );
        if response.status == 202 && request_id.is_none() {
            log::warn!(
                "{method} {path} was accepted without a trackable request (Location: {})",
                response.location.as_deref().unwrap_or("missing")
            );
        }
        Ok(Accepted {
            status: response.status,
            body: response.body,
            request_id,
        })
    }

    fn read_url(&self, path: &str) -> String {
        format!("{}?depth={}", self.config.url(path), self.config.depth)
    }

    fn execute(
        &self,
        method: Method,
        url: &str,
        path: &str,
        body: Option<Value>,
    ) -> Result<ApiResponse> {
        log::debug!("{method} {url}");
        let request = ApiRequest {
            method,
            url: url.to_string(),
            body,
        };
        let response = self.transport.send(&request)?;
        if response.is_success() {
            return Ok(response);
        }

        let message = error_message(&response);
        log::debug!("{method} {path} failed with {}: {message}", response.status);
        Err(match response.status {
            404 => Error::NotFound {
                path: path.to_string(),
            },
            409 => Error::Conflict { message },
            status => Error::http(status, message),
        })
    }
}

/// Join the `messages[].message` entries of an error body.
fn error_message(response: &ApiResponse) -> String {
    let joined = response.body["messages"]
        .as_array()
        .map(|messages| {
            messages
                .iter()
                .filter_map(|m| m["message"].as_str())
                .collect::<Vec<_>>()
                .join("; ")
        })
        .unwrap_or_default();

    if !joined.is_empty() {
        return joined;
    }
    match &response.body {
        Value::String(s) if !s.is_empty() => s.clone(),
        _ => format!("HTTP {}", response.status),
    }
}
