//! LANs inside a data center (`/datacenters/{id}/lans`)
//!
//! LANs are never replaced; every supported property updates in place.

use super::{
    Field, any_differs, object_id, properties_body, request_probe, summaries, tracked_by_request,
};
use converge::{
    AdapterError, DesiredState, Intent, Mutation, OperationHandle, Probe, ResourceAdapter,
    ResourceIdentity, ResourceSummary,
};
use ionoskit::Client;

const NAME: Field = Field::new("name", "name");
const PUBLIC: Field = Field::new("public", "public");
const IPV6_CIDR: Field = Field::new("ipv6_cidr", "ipv6CidrBlock");
const PCC: Field = Field::new("pcc", "pcc");

const UPDATE: [Field; 3] = [NAME, PUBLIC, PCC];
const ALL: [Field; 4] = [NAME, PUBLIC, IPV6_CIDR, PCC];

/// Asks the API to pick an IPv6 block
const AUTO_CIDR: &str = "AUTO";

pub struct LanAdapter<'a> {
    client: &'a Client,
    collection: String,
    identity: ResourceIdentity,
}

impl<'a> LanAdapter<'a> {
    /// Adapter for the LANs of the data center with id `datacenter_id`
    pub fn new(client: &'a Client, datacenter_id: &str) -> Self {
        Self {
            client,
            collection: format!("/datacenters/{datacenter_id}/lans"),
            identity: ResourceIdentity::id_or_name(),
        }
    }

    fn object_path(&self, existing: &ResourceSummary) -> Result<String, AdapterError> {
        Ok(format!("{}/{}", self.collection, object_id(self.kind(), existing)?))
    }

    /// `AUTO` is satisfied by any assigned block
    fn cidr_differs(existing: &ResourceSummary, desired: &DesiredState) -> bool {
        match desired.get_str(IPV6_CIDR.name) {
            Some(AUTO_CIDR) => existing.get_str(&IPV6_CIDR.path()).is_none(),
            _ => desired.differs(IPV6_CIDR.name, existing, &IPV6_CIDR.path()),
        }
    }
}

impl ResourceAdapter for LanAdapter<'_> {
    fn kind(&self) -> &'static str {
        "lan"
    }

    fn identity(&self) -> &ResourceIdentity {
        &self.identity
    }

    fn required_fields(&self, intent: Intent) -> &'static [&'static str] {
        match intent {
            Intent::Present => &["name"],
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
        Ok(tracked_by_request(self.client.post(&self.collection, &body)?))
    }

    fn update(
        &self,
        existing: &ResourceSummary,
        desired: &DesiredState,
    ) -> Result<Mutation, AdapterError> {
        let path = self.object_path(existing)?;
        let body = properties_body(&ALL, desired, None);
        Ok(tracked_by_request(self.client.patch(&path, &body)?))
    }

    fn delete(&self, existing: &ResourceSummary) -> Result<Option<OperationHandle>, AdapterError> {
        let path = self.object_path(existing)?;
        Ok(self.client.delete(&path)?.map(OperationHandle::request))
    }

    fn should_replace(&self, _existing: &ResourceSummary, _desired: &DesiredState) -> bool {
        false
    }

    fn should_update(&self, existing: &ResourceSummary, desired: &DesiredState) -> bool {
        any_differs(&UPDATE, existing, desired) || Self::cidr_differs(existing, desired)
    }

    fn request_status(&self, request_id: &str) -> Result<Probe, AdapterError> {
        request_probe(self.client, request_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::testing;
    use converge::{Action, Error, ReconcileOptions, ReconcileRequest, Reconciler};
    use ionoskit::transport::{ApiResponse, Method, MockTransport};
    use serde_json::json;

    const LANS: &str = "/datacenters/dc-1/lans";

    fn no_wait() -> ReconcileOptions {
        ReconcileOptions {
            wait: false,
            ..ReconcileOptions::default()
        }
    }

    fn lans() -> serde_json::Value {
        json!({"items": [
            {"id": "1", "properties": {"name": "front", "public": true, "ipv6CidrBlock": "2001:db8::/64"}},
            {"id": "2", "properties": {"name": "back", "public": false, "ipv6CidrBlock": null}},
        ]})
    }

    fn summary(value: serde_json::Value) -> ResourceSummary {
        ResourceSummary::new(value)
    }

    #[test]
    fn test_never_replaces() {
        let mock = MockTransport::new();
        let client = testing::client(&mock);
        let adapter = LanAdapter::new(&client, "dc-1");
        let existing = summary(json!({"id": "1", "properties": {"name": "front"}}));
        let desired = DesiredState::new().with("name", "other").with("public", true);

        assert!(!adapter.should_replace(&existing, &desired));
        assert!(adapter.should_update(&existing, &desired));
    }

    #[test]
    fn test_auto_cidr() {
        let mock = MockTransport::new();
        let client = testing::client(&mock);
        let adapter = LanAdapter::new(&client, "dc-1");
        let auto = DesiredState::new().with("ipv6_cidr", "AUTO");

        let assigned = summary(json!({"id": "1", "properties": {"ipv6CidrBlock": "2001:db8::/64"}}));
        let unassigned = summary(json!({"id": "2", "properties": {"ipv6CidrBlock": null}}));
        assert!(!adapter.should_update(&assigned, &auto));
        assert!(adapter.should_update(&unassigned, &auto));

        let explicit = DesiredState::new().with("ipv6_cidr", "2001:db8:1::/64");
        assert!(adapter.should_update(&assigned, &explicit));
    }

    #[test]
    fn test_rename_patches_lan_under_datacenter() {
        let mock = MockTransport::new();
        mock.respond(Method::Get, LANS, ApiResponse::ok(lans()));
        mock.respond(
            Method::Patch,
            "/datacenters/dc-1/lans/2",
            ApiResponse::accepted(json!({"id": "2", "properties": {"name": "private"}}), "0b9c7e34-5f21-4d8a-b6e0-93a1c2d4f5e6"),
        );
        let client = testing::client(&mock);
        let adapter = LanAdapter::new(&client, "dc-1");

        let request = ReconcileRequest::new(
            Intent::Update,
            DesiredState::new().with("name", "private"),
        )
        .with_identifier("back");
        let result = Reconciler::new(&adapter, no_wait()).reconcile(&request).unwrap();

        assert!(result.changed);
        assert_eq!(result.action, Action::Update);
        assert_eq!(
            mock.request_lines(),
            vec!["GET /datacenters/dc-1/lans", "PATCH /datacenters/dc-1/lans/2"]
        );
    }

    #[test]
    fn test_rename_onto_sibling_collides() {
        let mock = MockTransport::new();
        mock.respond(Method::Get, LANS, ApiResponse::ok(lans()));
        let client = testing::client(&mock);
        let adapter = LanAdapter::new(&client, "dc-1");

        let request = ReconcileRequest::new(
            Intent::Update,
            DesiredState::new().with("name", "front"),
        )
        .with_identifier("2");
        let err = Reconciler::new(&adapter, no_wait()).reconcile(&request).unwrap_err();

        match err.error {
            Error::NameCollision { existing_id, .. } => assert_eq!(existing_id, "1"),
            other => panic!("Expected NameCollision, got {other:?}"),
        }
        assert_eq!(mock.requests().len(), 1);
    }

    #[test]
    fn test_absent_unknown_lan_is_noop() {
        let mock = MockTransport::new();
        mock.respond(Method::Get, LANS, ApiResponse::ok(lans()));
        let client = testing::client(&mock);
        let adapter = LanAdapter::new(&client, "dc-1");

        let request =
            ReconcileRequest::new(Intent::Absent, DesiredState::new()).with_identifier("mgmt");
        let result = Reconciler::new(&adapter, no_wait()).reconcile(&request).unwrap();

        assert!(!result.changed);
        assert_eq!(result.to_output("lan")["action"], "none");
    }
}
