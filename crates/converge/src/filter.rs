//! `path=value` filters for listing commands

use crate::identity::FieldPath;
use crate::types::ResourceSummary;
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterError {
    #[error("invalid filter '{0}': expected path=value")]
    MissingEquals(String),

    #[error("invalid filter '{0}': empty path")]
    EmptyPath(String),
}

/// Keep objects whose value at `path` equals `value`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    pub path: FieldPath,
    pub value: String,
}

impl Filter {
    /// Parse `properties.name=web`. Only the first `=` splits.
    pub fn parse(raw: &str) -> Result<Self, FilterError> {
        let (path, value) = raw
            .split_once('=')
            .ok_or_else(|| FilterError::MissingEquals(raw.to_string()))?;
        let path = path.trim();
        if path.is_empty() {
            return Err(FilterError::EmptyPath(raw.to_string()));
        }
        Ok(Self {
            path: FieldPath::parse(path),
            value: value.to_string(),
        })
    }

    pub fn matches(&self, resource: &ResourceSummary) -> bool {
        match resource.get(&self.path) {
            None => false,
            Some(Value::String(s)) => *s == self.value,
            Some(other) => serde_json::from_str::<Value>(&self.value)
                .map(|wanted| *other == wanted)
                .unwrap_or(false),
        }
    }
}

impl FromStr for Filter {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.path, self.value)
    }
}

/// Objects matching every filter, in listing order
pub fn apply_filters(items: Vec<ResourceSummary>, filters: &[Filter]) -> Vec<ResourceSummary> {
    items
        .into_iter()
        .filter(|item| filters.iter().all(|f| f.matches(item)))
        .collect()
}
