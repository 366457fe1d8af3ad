//! Kubernetes node pools (`/k8s/{cluster}/nodepools`)
//!
//! Node pools report progress through `metadata.state` rather than request
//! ids: mutations wait for `ACTIVE`, deletions wait until the pool is no
//! longer listed.

use super::{Field, any_differs, object_id, properties_body, summaries};
use converge::{
    AdapterError, DesiredState, Intent, Mutation, OperationHandle, ResourceAdapter,
    ResourceIdentity, ResourceSummary,
};
use ionoskit::{Accepted, Client};

const NAME: Field = Field::new("name", "name");
const DATACENTER: Field = Field::new("datacenter_id", "datacenterId");
const NODE_COUNT: Field = Field::new("node_count", "nodeCount");
const CPU_FAMILY: Field = Field::new("cpu_family", "cpuFamily");
const CORES_COUNT: Field = Field::new("cores_count", "coresCount");
const RAM_SIZE: Field = Field::new("ram_size", "ramSize");
const STORAGE_TYPE: Field = Field::new("storage_type", "storageType");
const STORAGE_SIZE: Field = Field::new("storage_size", "storageSize");
const AVAILABILITY_ZONE: Field = Field::new("availability_zone", "availabilityZone");
const K8S_VERSION: Field = Field::new("k8s_version", "k8sVersion");

/// Node shape and placement are fixed at creation
const REPLACE: [Field; 8] = [
    NAME,
    DATACENTER,
    CPU_FAMILY,
    CORES_COUNT,
    RAM_SIZE,
    STORAGE_TYPE,
    STORAGE_SIZE,
    AVAILABILITY_ZONE,
];
const UPDATE: [Field; 2] = [NODE_COUNT, K8S_VERSION];
const ALL: [Field; 10] = [
    NAME,
    DATACENTER,
    NODE_COUNT,
    CPU_FAMILY,
    CORES_COUNT,
    RAM_SIZE,
    STORAGE_TYPE,
    STORAGE_SIZE,
    AVAILABILITY_ZONE,
    K8S_VERSION,
];

const READY_STATE: &str = "ACTIVE";

pub struct NodepoolAdapter<'a> {
    client: &'a Client,
    collection: String,
    identity: ResourceIdentity,
}

impl<'a> NodepoolAdapter<'a> {
    /// Adapter for the node pools of the cluster with id `cluster_id`
    pub fn new(client: &'a Client, cluster_id: &str) -> Self {
        Self {
            client,
            collection: format!("/k8s/{cluster_id}/nodepools"),
            identity: ResourceIdentity::id_or_name(),
        }
    }

    fn object_path(&self, existing: &ResourceSummary) -> Result<String, AdapterError> {
        Ok(format!("{}/{}", self.collection, object_id(self.kind(), existing)?))
    }

    fn until_active(accepted: Accepted) -> Mutation {
        let resource = ResourceSummary::new(accepted.body);
        let handle = resource
            .id()
            .map(|id| OperationHandle::until_state(id, READY_STATE));
        Mutation::new(resource, handle)
    }
}

impl ResourceAdapter for NodepoolAdapter<'_> {
    fn kind(&self) -> &'static str {
        "nodepool"
    }

    fn identity(&self) -> &ResourceIdentity {
        &self.identity
    }

    fn required_fields(&self, intent: Intent) -> &'static [&'static str] {
        match intent {
            Intent::Present => &[
                "name",
                "datacenter_id",
                "cpu_family",
                "cores_count",
                "ram_size",
                "storage_type",
                "storage_size",
            ],
            _ => &[],
        }
    }

    fn list(&self) -> Result<Vec<ResourceSummary>, AdapterError> {
        Ok(summaries(self.client.list(&self.collection)?))
    }

    fn create(
        &self,
        desired: &DesiredState,
        existing: Option<&ResourceSummary>,
    ) -> Result<Mutation, AdapterError> {
        let body = properties_body(&ALL, desired, existing);
        Ok(Self::until_active(self.client.post(&self.collection, &body)?))
    }

    /// PUT replaces the updatable properties, so unset ones are carried over
    fn update(
        &self,
        existing: &ResourceSummary,
        desired: &DesiredState,
    ) -> Result<Mutation, AdapterError> {
        let path = self.object_path(existing)?;
        let body = properties_body(&UPDATE, desired, Some(existing));
        Ok(Self::until_active(self.client.put(&path, &body)?))
    }

    fn delete(&self, existing: &ResourceSummary) -> Result<Option<OperationHandle>, AdapterError> {
        let path = self.object_path(existing)?;
        self.client.delete(&path)?;
        Ok(existing.id().map(OperationHandle::until_gone))
    }

    fn should_replace(&self, existing: &ResourceSummary, desired: &DesiredState) -> bool {
        any_differs(&REPLACE, existing, desired)
    }

    fn should_update(&self, existing: &ResourceSummary, desired: &DesiredState) -> bool {
        any_differs(&UPDATE, existing, desired)
    }
}
