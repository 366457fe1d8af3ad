//! Resource adapter trait: the per-resource-type collaborator of the engine
//!
//! An adapter knows how to list, create, update and delete one kind of remote
//! object and which differences force a replace versus an in-place update.
//! The engine depends only on this trait, never on resource-specific fields.

use crate::error::AdapterError;
use crate::identity::{FieldPath, ResourceIdentity};
use crate::tracker::Probe;
use crate::types::{DesiredState, Intent, ResourceSummary};
use serde_json::{Map, Value, json};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Terminal condition for resource-state polling
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    /// `metadata.state` equals the given value
    State(String),
    /// The object is no longer listed
    Gone,
}

impl Condition {
    /// Evaluate against the object as currently listed (`None` if absent)
    pub fn evaluate(&self, current: Option<&ResourceSummary>) -> Probe {
        match (self, current) {
            (Condition::Gone, None) => Probe::Done,
            (Condition::Gone, Some(_)) => Probe::Pending,
            (Condition::State(_), None) => Probe::Pending,
            (Condition::State(wanted), Some(resource)) => match resource.state() {
                Some(state) if state == wanted => Probe::Done,
                Some("FAILED") => Probe::Failed {
                    message: format!(
                        "{} entered state FAILED",
                        resource.id().unwrap_or("resource")
                    ),
                },
                _ => Probe::Pending,
            },
        }
    }
}

/// Token returned by a mutating call to track its completion
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationHandle {
    /// Poll the request-status endpoint
    Request { request_id: String },
    /// Re-list the collection and evaluate a condition on one object
    Resource { id: String, until: Condition },
}

impl OperationHandle {
    pub fn request(request_id: impl Into<String>) -> Self {
        Self::Request {
            request_id: request_id.into(),
        }
    }

    pub fn until_state(id: impl Into<String>, state: impl Into<String>) -> Self {
        Self::Resource {
            id: id.into(),
            until: Condition::State(state.into()),
        }
    }

    pub fn until_gone(id: impl Into<String>) -> Self {
        Self::Resource {
            id: id.into(),
            until: Condition::Gone,
        }
    }
}

/// Result of a create or update call
#[derive(Debug, Clone, PartialEq)]
pub struct Mutation {
    pub resource: ResourceSummary,
    pub handle: Option<OperationHandle>,
}

impl Mutation {
    pub fn new(resource: ResourceSummary, handle: Option<OperationHandle>) -> Self {
        Self { resource, handle }
    }
}

/// Per-resource-type collaborator of the reconciliation engine
pub trait ResourceAdapter {
    /// Resource type name used in messages ("datacenter", "lan", ...)
    fn kind(&self) -> &'static str;

    /// Key under which the resource payload is reported to the caller
    fn returned_key(&self) -> &'static str {
        self.kind()
    }

    /// Paths that may identify an object from a caller-supplied string
    fn identity(&self) -> &ResourceIdentity;

    /// Fields that must be set for `intent`
    fn required_fields(&self, _intent: Intent) -> &'static [&'static str] {
        &[]
    }

    /// The mutable display name the desired state asks for
    fn desired_name(&self, desired: &DesiredState) -> Option<String> {
        desired.get_str("name").map(str::to_string)
    }

    /// Whether `update` of a missing object is an error instead of a no-op
    fn fail_on_missing_update(&self) -> bool {
        false
    }

    /// Fetch the current collection
    fn list(&self) -> Result<Vec<ResourceSummary>, AdapterError>;

    /// The object with `id` as currently listed
    fn fetch(&self, id: &str) -> Result<Option<ResourceSummary>, AdapterError> {
        Ok(self.list()?.into_iter().find(|r| r.id() == Some(id)))
    }

    /// Create a new object, inheriting unset fields from `existing` on replace
    fn create(
        &self,
        desired: &DesiredState,
        existing: Option<&ResourceSummary>,
    ) -> Result<Mutation, AdapterError>;

    /// Update `existing` in place
    fn update(
        &self,
        existing: &ResourceSummary,
        desired: &DesiredState,
    ) -> Result<Mutation, AdapterError>;

    /// Delete `existing`
    fn delete(&self, existing: &ResourceSummary) -> Result<Option<OperationHandle>, AdapterError>;

    /// True when reaching `desired` requires destroy-and-recreate
    fn should_replace(&self, existing: &ResourceSummary, desired: &DesiredState) -> bool;

    /// True when `desired` differs from `existing` in updatable fields
    fn should_update(&self, existing: &ResourceSummary, desired: &DesiredState) -> bool;

    /// Status of an asynchronous request
    fn request_status(&self, request_id: &str) -> Result<Probe, AdapterError> {
        Err(AdapterError::Unsupported {
            operation: format!("request status for {request_id}"),
        })
    }

    /// Observe the progress of `handle` once
    fn probe(&self, handle: &OperationHandle) -> Result<Probe, AdapterError> {
        match handle {
            OperationHandle::Request { request_id } => self.request_status(request_id),
            OperationHandle::Resource { id, until } => {
                let collection = self.list()?;
                let current = collection.iter().find(|r| r.id() == Some(id.as_str()));
                Ok(until.evaluate(current))
            }
        }
    }
}

/// How [`MockAdapter`] reports completion of its mutations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockWait {
    /// Mutations are synchronous
    None,
    /// Mutations return request ids answered by the request script; a
    /// `Done` answer settles every `BUSY` object
    Request,
    /// Mutations return resource-state handles
    State,
}

#[derive(Debug, Default)]
struct MockStore {
    objects: Vec<Value>,
    calls: Vec<String>,
    next_id: u64,
    request_script: VecDeque<Probe>,
    failures: Vec<(String, AdapterError)>,
}

/// In-memory adapter for tests.
///
/// Objects look like `{"id", "metadata": {"state"}, "properties": {...}}` and
/// every desired field maps to `properties.<field>`. Fields declared
/// immutable force a replace; any other differing field forces an update.
#[derive(Debug, Clone)]
pub struct MockAdapter {
    kind: &'static str,
    identity: ResourceIdentity,
    immutable: Vec<&'static str>,
    required_present: &'static [&'static str],
    wait: MockWait,
    store: Arc<Mutex<MockStore>>,
}

impl MockAdapter {
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            identity: ResourceIdentity::default(),
            immutable: Vec::new(),
            required_present: &[],
            wait: MockWait::None,
            store: Arc::new(Mutex::new(MockStore::default())),
        }
    }

    /// Declare fields that can only change through a replace
    pub fn with_immutable(mut self, fields: &[&'static str]) -> Self {
        self.immutable = fields.to_vec();
        self
    }

    /// Fields required for `present`
    pub fn with_required_present(mut self, fields: &'static [&'static str]) -> Self {
        self.required_present = fields;
        self
    }

    pub fn with_wait(mut self, wait: MockWait) -> Self {
        self.wait = wait;
        self
    }

    /// Seed an object with the given id and properties
    pub fn with_object(self, id: &str, properties: Value) -> Self {
        self.insert(id, properties);
        self
    }

    pub fn insert(&self, id: &str, properties: Value) {
        let mut store = self.store.lock().unwrap();
        store.objects.push(json!({
            "id": id,
            "metadata": {"state": "AVAILABLE"},
            "properties": properties,
        }));
    }

    /// Queue probe results for the next request-status calls
    pub fn script_requests(&self, probes: impl IntoIterator<Item = Probe>) {
        self.store.lock().unwrap().request_script.extend(probes);
    }

    /// Make the next call to `operation` fail with `error`
    pub fn fail_next(&self, operation: &str, error: AdapterError) {
        self.store
            .lock()
            .unwrap()
            .failures
            .push((operation.to_string(), error));
    }

    /// Force an object into a lifecycle state
    pub fn set_state(&self, id: &str, state: &str) {
        let mut store = self.store.lock().unwrap();
        if let Some(obj) = store.objects.iter_mut().find(|o| o["id"] == id) {
            obj["metadata"]["state"] = Value::String(state.to_string());
        }
    }

    /// Names of the adapter operations invoked so far, in order
    pub fn calls(&self) -> Vec<String> {
        self.store.lock().unwrap().calls.clone()
    }

    /// Number of mutating calls (create, update, delete) so far
    pub fn mutation_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c.as_str(), "create" | "update" | "delete"))
            .count()
    }

    pub fn objects(&self) -> Vec<ResourceSummary> {
        self.store
            .lock()
            .unwrap()
            .objects
            .iter()
            .cloned()
            .map(ResourceSummary::new)
            .collect()
    }

    fn record(&self, operation: &str) -> Result<(), AdapterError> {
        let mut store = self.store.lock().unwrap();
        store.calls.push(operation.to_string());
        if let Some(pos) = store.failures.iter().position(|(op, _)| op == operation) {
            let (_, error) = store.failures.remove(pos);
            return Err(error);
        }
        Ok(())
    }

    fn handle_for(&self, id: &str, until: Condition) -> Option<OperationHandle> {
        match self.wait {
            MockWait::None => None,
            MockWait::Request => Some(OperationHandle::request(format!("req-{id}"))),
            MockWait::State => Some(OperationHandle::Resource {
                id: id.to_string(),
                until,
            }),
        }
    }

    fn property_path(field: &str) -> FieldPath {
        FieldPath::new(["properties", field])
    }
}

impl ResourceAdapter for MockAdapter {
    fn kind(&self) -> &'static str {
        self.kind
    }

    fn identity(&self) -> &ResourceIdentity {
        &self.identity
    }

    fn required_fields(&self, intent: Intent) -> &'static [&'static str] {
        match intent {
            Intent::Present => self.required_present,
            _ => &[],
        }
    }

    fn list(&self) -> Result<Vec<ResourceSummary>, AdapterError> {
        self.record("list")?;
        Ok(self.objects())
    }

    fn create(
        &self,
        desired: &DesiredState,
        existing: Option<&ResourceSummary>,
    ) -> Result<Mutation, AdapterError> {
        self.record("create")?;

        let mut properties = existing
            .and_then(|e| e.get(&FieldPath::parse("properties")))
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_else(Map::new);
        for (field, value) in desired.iter() {
            properties.insert(field.clone(), value.clone());
        }

        let id = {
            let mut store = self.store.lock().unwrap();
            store.next_id += 1;
            format!("{}-{}", self.kind, store.next_id)
        };
        let state = if self.wait == MockWait::None {
            "AVAILABLE"
        } else {
            "BUSY"
        };
        let object = json!({
            "id": id,
            "metadata": {"state": state},
            "properties": Value::Object(properties),
        });
        self.store.lock().unwrap().objects.push(object.clone());

        let handle = self.handle_for(&id, Condition::State("AVAILABLE".to_string()));
        Ok(Mutation::new(ResourceSummary::new(object), handle))
    }

    fn update(
        &self,
        existing: &ResourceSummary,
        desired: &DesiredState,
    ) -> Result<Mutation, AdapterError> {
        self.record("update")?;
        let id = existing.id().unwrap_or_default().to_string();

        let mut store = self.store.lock().unwrap();
        let object = store
            .objects
            .iter_mut()
            .find(|o| o["id"] == id.as_str())
            .ok_or_else(|| AdapterError::not_found(format!("{} {id}", self.kind)))?;
        for (field, value) in desired.iter() {
            object["properties"][field.as_str()] = value.clone();
        }
        let updated = ResourceSummary::new(object.clone());
        drop(store);

        let handle = self.handle_for(&id, Condition::State("AVAILABLE".to_string()));
        Ok(Mutation::new(updated, handle))
    }

    fn delete(&self, existing: &ResourceSummary) -> Result<Option<OperationHandle>, AdapterError> {
        self.record("delete")?;
        let id = existing.id().unwrap_or_default().to_string();

        let mut store = self.store.lock().unwrap();
        let before = store.objects.len();
        store.objects.retain(|o| o["id"] != id.as_str());
        if store.objects.len() == before {
            return Err(AdapterError::not_found(format!("{} {id}", self.kind)));
        }
        drop(store);

        Ok(self.handle_for(&id, Condition::Gone))
    }

    fn should_replace(&self, existing: &ResourceSummary, desired: &DesiredState) -> bool {
        self.immutable
            .iter()
            .any(|field| desired.differs(field, existing, &Self::property_path(field)))
    }

    fn should_update(&self, existing: &ResourceSummary, desired: &DesiredState) -> bool {
        desired
            .iter()
            .map(|(field, _)| field.as_str())
            .filter(|field| !self.immutable.contains(field))
            .any(|field| desired.differs(field, existing, &Self::property_path(field)))
    }

    fn request_status(&self, _request_id: &str) -> Result<Probe, AdapterError> {
        self.record("request_status")?;
        let mut store = self.store.lock().unwrap();
        let probe = store.request_script.pop_front().unwrap_or(Probe::Done);
        if probe == Probe::Done {
            for object in &mut store.objects {
                if object["metadata"]["state"] == "BUSY" {
                    object["metadata"]["state"] = Value::String("AVAILABLE".to_string());
                }
            }
        }
        Ok(probe)
    }
}
