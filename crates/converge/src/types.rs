//! Core types for declarative reconciliation

use crate::identity::FieldPath;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// What the caller wants to be true about the remote resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Intent {
    /// The resource exists and matches the desired state
    Present,
    /// The resource does not exist
    Absent,
    /// An existing resource matches the desired state; missing is not an error
    Update,
}

impl Intent {
    /// Action the intent is heading for before any remote state is known
    pub fn default_action(&self) -> Action {
        match self {
            Self::Present => Action::Create,
            Self::Update => Action::Update,
            Self::Absent => Action::Delete,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Present => "present",
            Self::Absent => "absent",
            Self::Update => "update",
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Intent {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "present" => Ok(Self::Present),
            "absent" => Ok(Self::Absent),
            "update" => Ok(Self::Update),
            other => Err(format!(
                "unknown state '{other}' (expected present, absent or update)"
            )),
        }
    }
}

/// Mutation reported back to the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Create,
    Update,
    Delete,
    /// Desired state already satisfied
    None,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::None => "none",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A remote object as returned by the vendor API
///
/// The engine never interprets the payload beyond the identity paths,
/// `id` and `metadata.state`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceSummary(Value);

impl ResourceSummary {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    /// Remote identifier, if the object carries one
    pub fn id(&self) -> Option<&str> {
        self.0.get("id").and_then(Value::as_str)
    }

    /// Lifecycle state (`AVAILABLE`, `BUSY`, `DESTROYING`, ...)
    pub fn state(&self) -> Option<&str> {
        self.0
            .get("metadata")
            .and_then(|m| m.get("state"))
            .and_then(Value::as_str)
    }

    /// Value reached by following `path`, if every segment exists
    pub fn get(&self, path: &FieldPath) -> Option<&Value> {
        path.lookup(&self.0)
    }

    /// String value at `path`
    pub fn get_str(&self, path: &FieldPath) -> Option<&str> {
        self.get(path).and_then(Value::as_str)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }
}

impl From<Value> for ResourceSummary {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

/// Caller-supplied parameters for one reconciliation call
///
/// A missing key means "not specified, do not change". An explicit
/// `Value::Null` is kept and compared like any other value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DesiredState(Map<String, Value>);

impl DesiredState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style setter
    pub fn with(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.set(field, value);
        self
    }

    pub fn set(&mut self, field: &str, value: impl Into<Value>) {
        self.0.insert(field.to_string(), value.into());
    }

    /// Set `field` only when `value` is `Some`
    pub fn set_opt<T: Into<Value>>(&mut self, field: &str, value: Option<T>) {
        if let Some(value) = value {
            self.set(field, value);
        }
    }

    /// Raw value; `None` means unset, `Some(Value::Null)` means explicit null
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn is_set(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.get(field).and_then(Value::as_str)
    }

    pub fn get_bool(&self, field: &str) -> Option<bool> {
        self.get(field).and_then(Value::as_bool)
    }

    pub fn get_i64(&self, field: &str) -> Option<i64> {
        self.get(field).and_then(Value::as_i64)
    }

    /// True when `field` is set and differs from `existing` at `path`
    ///
    /// An absent value on the remote side compares equal to explicit null.
    pub fn differs(&self, field: &str, existing: &ResourceSummary, path: &FieldPath) -> bool {
        match self.get(field) {
            None => false,
            Some(wanted) => existing.get(path).unwrap_or(&Value::Null) != wanted,
        }
    }

    /// Value for `field`, falling back to `existing` at `path` when unset
    pub fn or_existing(
        &self,
        field: &str,
        existing: Option<&ResourceSummary>,
        path: &FieldPath,
    ) -> Option<Value> {
        self.get(field)
            .cloned()
            .or_else(|| existing.and_then(|e| e.get(path).cloned()))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, Value)> for DesiredState {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// One reconciliation call
#[derive(Debug, Clone)]
pub struct ReconcileRequest {
    pub intent: Intent,
    /// Id or display name of the object to act on
    pub identifier: Option<String>,
    pub desired: DesiredState,
}

impl ReconcileRequest {
    pub fn new(intent: Intent, desired: DesiredState) -> Self {
        Self {
            intent,
            identifier: None,
            desired,
        }
    }

    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = Some(identifier.into());
        self
    }
}

/// Outcome of a reconciliation call
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReconcileResult {
    pub changed: bool,
    pub action: Action,
    /// The resource as it stands after the call (before removal for deletes)
    pub resource: Option<ResourceSummary>,
    /// Id of the object destroyed by a replace
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replaced_id: Option<String>,
    /// Non-fatal problems such as a wait that ran out of time
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl ReconcileResult {
    /// Nothing to do
    pub fn unchanged(resource: Option<ResourceSummary>) -> Self {
        Self {
            changed: false,
            action: Action::None,
            resource,
            replaced_id: None,
            warnings: Vec::new(),
        }
    }

    pub fn changed(action: Action, resource: Option<ResourceSummary>) -> Self {
        Self {
            changed: true,
            action,
            resource,
            replaced_id: None,
            warnings: Vec::new(),
        }
    }

    /// Render as the mapping handed back to the caller
    ///
    /// The resource payload goes under `returned_key`; deletions also carry `id`.
    pub fn to_output(&self, returned_key: &str) -> Value {
        let mut out = Map::new();
        out.insert("changed".into(), Value::Bool(self.changed));
        out.insert("failed".into(), Value::Bool(false));
        out.insert("action".into(), Value::String(self.action.to_string()));
        if let Some(resource) = &self.resource {
            if self.action == Action::Delete {
                if let Some(id) = resource.id() {
                    out.insert("id".into(), Value::String(id.to_string()));
                }
            }
            out.insert(returned_key.to_string(), resource.as_value().clone());
        }
        if let Some(id) = &self.replaced_id {
            out.insert("replaced_id".into(), Value::String(id.clone()));
        }
        if !self.warnings.is_empty() {
            out.insert(
                "warnings".into(),
                Value::Array(self.warnings.iter().cloned().map(Value::String).collect()),
            );
        }
        Value::Object(out)
    }
}
