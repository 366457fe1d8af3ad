//! Virtual data centers (`/datacenters`)

use super::{
    Field, any_differs, object_id, properties_body, request_probe, summaries, tracked_by_request,
};
use converge::{
    AdapterError, DesiredState, Intent, Mutation, OperationHandle, Probe, ResourceAdapter,
    ResourceIdentity, ResourceSummary,
};
use ionoskit::Client;

pub const COLLECTION: &str = "/datacenters";

const NAME: Field = Field::new("name", "name");
const DESCRIPTION: Field = Field::new("description", "description");
const LOCATION: Field = Field::new("location", "location");

const ALL: [Field; 3] = [NAME, DESCRIPTION, LOCATION];
/// A data center cannot move between locations
const REPLACE: [Field; 1] = [LOCATION];
const UPDATE: [Field; 2] = [NAME, DESCRIPTION];

pub struct DatacenterAdapter<'a> {
    client: &'a Client,
    identity: ResourceIdentity,
}

impl<'a> DatacenterAdapter<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self {
            client,
            identity: ResourceIdentity::id_or_name(),
        }
    }

    fn object_path(&self, existing: &ResourceSummary) -> Result<String, AdapterError> {
        Ok(format!("{COLLECTION}/{}", object_id(self.kind(), existing)?))
    }
}

impl ResourceAdapter for DatacenterAdapter<'_> {
    fn kind(&self) -> &'static str {
        "datacenter"
    }

    fn identity(&self) -> &ResourceIdentity {
        &self.identity
    }

    fn required_fields(&self, intent: Intent) -> &'static [&'static str] {
        match intent {
            Intent::Present => &["name", "location"],
            _ => &[],
        }
    }

    fn list(&self) -> Result<Vec<ResourceSummary>, AdapterError> {
        Ok(summaries(self.client.list(COLLECTION)?))
    }

    fn create(
        &self,
        desired: &DesiredState,
        existing: Option<&ResourceSummary>,
    ) -> Result<Mutation, AdapterError> {
        let body = properties_body(&ALL, desired, existing);
        Ok(tracked_by_request(self.client.post(COLLECTION, &body)?))
    }

    fn update(
        &self,
        existing: &ResourceSummary,
        desired: &DesiredState,
    ) -> Result<Mutation, AdapterError> {
        let path = self.object_path(existing)?;
        let body = properties_body(&UPDATE, desired, None);
        Ok(tracked_by_request(self.client.patch(&path, &body)?))
    }

    fn delete(&self, existing: &ResourceSummary) -> Result<Option<OperationHandle>, AdapterError> {
        let path = self.object_path(existing)?;
        Ok(self.client.delete(&path)?.map(OperationHandle::request))
    }

    fn should_replace(&self, existing: &ResourceSummary, desired: &DesiredState) -> bool {
        any_differs(&REPLACE, existing, desired)
    }

    fn should_update(&self, existing: &ResourceSummary, desired: &DesiredState) -> bool {
        any_differs(&UPDATE, existing, desired)
    }

    fn request_status(&self, request_id: &str) -> Result<Probe, AdapterError> {
        request_probe(self.client, request_id)
    }
}
