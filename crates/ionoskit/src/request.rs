//! Asynchronous request tracking.
//!
//! Mutations are accepted with `202` and a `Location` header pointing at
//! `/requests/<id>/status`. Polling that endpoint tells whether the request
//! is still queued, running, done or failed.

use converge::Probe;
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

static REQUEST_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/requests/([^/?#]+)(?:[/?#]|$)").expect("valid regex"));

/// Extract the request id from a `Location` header value.
pub fn extract_request_id(location: &str) -> Option<String> {
    REQUEST_ID
        .captures(location)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// State of an accepted request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestStatus {
    Queued,
    Running,
    Done,
    Failed { message: String },
}

impl RequestStatus {
    /// Read `metadata.status` (and `metadata.message`) from a status body.
    ///
    /// Unknown values count as still running.
    pub fn from_body(body: &Value) -> Self {
        let metadata = &body["metadata"];
        match metadata["status"].as_str().unwrap_or_default() {
            "QUEUED" => Self::Queued,
            "DONE" => Self::Done,
            "FAILED" => Self::Failed {
                message: metadata["message"]
                    .as_str()
                    .unwrap_or("request failed")
                    .to_string(),
            },
            _ => Self::Running,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed { .. })
    }
}

impl From<RequestStatus> for Probe {
    fn from(status: RequestStatus) -> Self {
        match status {
            RequestStatus::Queued | RequestStatus::Running => Probe::Pending,
            RequestStatus::Done => Probe::Done,
            RequestStatus::Failed { message } => Probe::Failed { message },
        }
    }
}
