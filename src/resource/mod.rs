//! IONOS resource adapters for the reconciliation engine
//!
//! Each adapter maps desired-state fields (snake_case, as given on the command
//! line) to API properties (camelCase under `properties`) and decides which
//! differences are updates and which force a replace.

pub mod datacenter;
pub mod lan;
pub mod nodepool;

pub use datacenter::DatacenterAdapter;
pub use lan::LanAdapter;
pub use nodepool::NodepoolAdapter;

use converge::{
    AdapterError, DesiredState, Error, FieldPath, Mutation, OperationHandle, Probe,
    ResourceIdentity, ResourceSummary, matcher,
};
use ionoskit::{Accepted, Client};
use serde_json::{Map, Value, json};

/// A desired-state field and the API property backing it
#[derive(Debug, Clone, Copy)]
pub struct Field {
    pub name: &'static str,
    pub api: &'static str,
}

impl Field {
    pub const fn new(name: &'static str, api: &'static str) -> Self {
        Self { name, api }
    }

    pub fn path(&self) -> FieldPath {
        FieldPath::new(["properties", self.api])
    }
}

/// True if any of `fields` is set in `desired` and differs from `existing`
pub fn any_differs(fields: &[Field], existing: &ResourceSummary, desired: &DesiredState) -> bool {
    fields
        .iter()
        .any(|field| desired.differs(field.name, existing, &field.path()))
}

/// `{"properties": {...}}` from the set fields, inheriting unset ones from `existing`
pub fn properties_body(
    fields: &[Field],
    desired: &DesiredState,
    existing: Option<&ResourceSummary>,
) -> Value {
    let mut properties = Map::new();
    for field in fields {
        if let Some(value) = desired.or_existing(field.name, existing, &field.path()) {
            if !value.is_null() {
                properties.insert(field.api.to_string(), value);
            }
        }
    }
    json!({ "properties": properties })
}

pub fn summaries(items: Vec<Value>) -> Vec<ResourceSummary> {
    items.into_iter().map(ResourceSummary::new).collect()
}

/// Id of `existing`, which every listed API object carries
pub fn object_id<'a>(kind: &str, existing: &'a ResourceSummary) -> Result<&'a str, AdapterError> {
    existing
        .id()
        .ok_or_else(|| AdapterError::not_found(format!("{kind} without an id")))
}

/// State of a provisioned data center or LAN
pub const AVAILABLE: &str = "AVAILABLE";

/// Mutation tracked through the request-status endpoint
///
/// An asynchronous response without a request id falls back to waiting for
/// the object to become `AVAILABLE`.
pub fn tracked_by_request(accepted: Accepted) -> Mutation {
    let is_async = accepted.is_async();
    let resource = ResourceSummary::new(accepted.body);
    let handle = match accepted.request_id {
        Some(request_id) => Some(OperationHandle::request(request_id)),
        None if is_async => resource
            .id()
            .map(|id| OperationHandle::until_state(id, AVAILABLE)),
        None => None,
    };
    Mutation::new(resource, handle)
}

pub fn request_probe(client: &Client, request_id: &str) -> Result<Probe, AdapterError> {
    Ok(client.request_status(request_id)?.into())
}

/// Resolve a parent object (data center, cluster) by id or name to its id
pub fn resolve_parent(
    client: &Client,
    kind: &str,
    collection: &str,
    identifier: &str,
) -> converge::Result<String> {
    let items = summaries(client.list(collection).map_err(AdapterError::from)?);
    matcher::find_id(kind, &items, identifier, &ResourceIdentity::default())?.ok_or_else(|| {
        Error::NotFound {
            kind: kind.to_string(),
            identifier: identifier.to_string(),
        }
    })
}
