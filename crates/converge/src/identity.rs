//! Lookup paths used to recognise a remote object from a caller-supplied string

use serde_json::Value;
use std::fmt;

/// A path of object keys into a JSON document, e.g. `properties.name`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldPath(Vec<String>);

impl FieldPath {
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(segments.into_iter().map(Into::into).collect())
    }

    /// Parse dotted notation (`metadata.state`)
    pub fn parse(dotted: &str) -> Self {
        Self::new(dotted.split('.').filter(|s| !s.is_empty()))
    }

    /// The `["id"]` path
    pub fn id() -> Self {
        Self::new(["id"])
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn is_id(&self) -> bool {
        self.0.len() == 1 && self.0[0] == "id"
    }

    /// Follow the path through `value`
    pub fn lookup<'a>(&self, value: &'a Value) -> Option<&'a Value> {
        self.0
            .iter()
            .try_fold(value, |current, key| current.get(key.as_str()))
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("."))
    }
}

/// Ordered list of paths that may identify an object of one resource type
///
/// Always contains `["id"]`. Built once per resource type and never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceIdentity {
    paths: Vec<FieldPath>,
}

impl ResourceIdentity {
    /// Build an identity from `paths`, inserting `["id"]` first when missing
    pub fn new(paths: impl IntoIterator<Item = FieldPath>) -> Self {
        let mut paths: Vec<FieldPath> = paths.into_iter().collect();
        if !paths.iter().any(FieldPath::is_id) {
            paths.insert(0, FieldPath::id());
        }
        Self { paths }
    }

    /// Identity that only accepts the opaque id
    pub fn id_only() -> Self {
        Self::new([])
    }

    /// `id` or `properties.name`, the common case
    pub fn id_or_name() -> Self {
        Self::new([FieldPath::id(), FieldPath::parse("properties.name")])
    }

    pub fn paths(&self) -> &[FieldPath] {
        &self.paths
    }

    /// Every path except `["id"]`: where display names live
    pub fn name_paths(&self) -> impl Iterator<Item = &FieldPath> {
        self.paths.iter().filter(|path| !path.is_id())
    }
}

impl Default for ResourceIdentity {
    fn default() -> Self {
        Self::id_or_name()
    }
}
