//! `info` command: list a collection, keeping items that match every filter

use super::{connect, print_json};
use crate::cli::{ConnectionArgs, InfoArgs, ResourceKind};
use crate::config::Config;
use crate::resource::{self, DatacenterAdapter, LanAdapter, NodepoolAdapter};
use anyhow::{Context as _, Result};
use converge::{Filter, ResourceAdapter, ResourceSummary, apply_filters};
use ionoskit::Client;
use serde_json::{Map, Value};

pub fn run(config: &Config, connection: &ConnectionArgs, args: InfoArgs) -> Result<()> {
    let client = connect(config, connection)?;
    let adapter = adapter_for(&client, &args)?;
    let items = list(adapter.as_ref(), &args.filters)?;
    log::info!("{} {} item(s) matched", items.len(), adapter.kind());
    print_json(&output(adapter.returned_key(), items))
}

fn adapter_for<'a>(client: &'a Client, args: &InfoArgs) -> Result<Box<dyn ResourceAdapter + 'a>> {
    Ok(match args.kind {
        ResourceKind::Datacenter => Box::new(DatacenterAdapter::new(client)),
        ResourceKind::Lan => {
            let datacenter = args
                .datacenter
                .as_deref()
                .context("--datacenter is required to list LANs")?;
            let id = resource::resolve_parent(
                client,
                "datacenter",
                resource::datacenter::COLLECTION,
                datacenter,
            )?;
            Box::new(LanAdapter::new(client, &id))
        }
        ResourceKind::Nodepool => {
            let cluster = args
                .cluster
                .as_deref()
                .context("--cluster is required to list node pools")?;
            let id = resource::resolve_parent(client, "k8s cluster", "/k8s", cluster)?;
            Box::new(NodepoolAdapter::new(client, &id))
        }
    })
}

fn list(adapter: &dyn ResourceAdapter, filters: &[Filter]) -> Result<Vec<ResourceSummary>> {
    let items = adapter
        .list()
        .with_context(|| format!("Could not list {} resources", adapter.kind()))?;
    Ok(apply_filters(items, filters))
}

/// `{"changed": false, "<key>s": [...]}`
fn output(returned_key: &str, items: Vec<ResourceSummary>) -> Value {
    let mut out = Map::new();
    out.insert("changed".into(), Value::Bool(false));
    out.insert(
        format!("{returned_key}s"),
        Value::Array(items.into_iter().map(ResourceSummary::into_value).collect()),
    );
    Value::Object(out)
}
