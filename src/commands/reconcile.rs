//! `datacenter`, `lan` and `nodepool` commands

use super::{connect, fail, failure_output, print_json};
use crate::Context;
use crate::cli::{ConnectionArgs, DatacenterArgs, LanArgs, NodepoolArgs, ReconcileArgs};
use crate::config::Config;
use crate::progress::SpinnerCallback;
use crate::resource::{self, DatacenterAdapter, LanAdapter, NodepoolAdapter};
use crate::ui;
use anyhow::Result;
use converge::{
    Action, DesiredState, Intent, ReconcileError, ReconcileOptions, ReconcileRequest,
    ReconcileResult, Reconciler, ResourceAdapter,
};

pub fn datacenter(
    ctx: &Context,
    config: &Config,
    connection: &ConnectionArgs,
    args: DatacenterArgs,
) -> Result<()> {
    let mut desired = DesiredState::new();
    desired.set_opt("name", args.name);
    desired.set_opt("description", args.description);
    desired.set_opt("location", args.location);

    let options = or_report(&args.common, config.reconcile_options(&args.common))?;
    let client = or_report(&args.common, connect(config, connection))?;
    let adapter = DatacenterAdapter::new(&client);
    run(ctx, &adapter, options, &args.common, desired)
}

pub fn lan(ctx: &Context, config: &Config, connection: &ConnectionArgs, args: LanArgs) -> Result<()> {
    let mut desired = DesiredState::new();
    desired.set_opt("name", args.name);
    desired.set_opt("public", args.public);
    desired.set_opt("ipv6_cidr", args.ipv6_cidr);
    desired.set_opt("pcc", args.pcc);

    let options = or_report(&args.common, config.reconcile_options(&args.common))?;
    let client = or_report(&args.common, connect(config, connection))?;
    let intent = Intent::from(args.common.state);
    let datacenters = resource::datacenter::COLLECTION;
    let datacenter_id =
        match resource::resolve_parent(&client, "datacenter", datacenters, &args.datacenter) {
            Ok(id) => id,
            Err(e) => return fail(ReconcileError::new("lan", intent.default_action(), e)),
        };

    let adapter = LanAdapter::new(&client, &datacenter_id);
    run(ctx, &adapter, options, &args.common, desired)
}

pub fn nodepool(
    ctx: &Context,
    config: &Config,
    connection: &ConnectionArgs,
    args: NodepoolArgs,
) -> Result<()> {
    let mut desired = DesiredState::new();
    desired.set_opt("name", args.name);
    desired.set_opt("datacenter_id", args.datacenter_id);
    desired.set_opt("node_count", args.node_count);
    desired.set_opt("cpu_family", args.cpu_family);
    desired.set_opt("cores_count", args.cores_count);
    desired.set_opt("ram_size", args.ram_size);
    desired.set_opt("storage_type", args.storage_type);
    desired.set_opt("storage_size", args.storage_size);
    desired.set_opt("availability_zone", args.availability_zone);
    desired.set_opt("k8s_version", args.k8s_version);

    let options = or_report(&args.common, config.reconcile_options(&args.common))?;
    let client = or_report(&args.common, connect(config, connection))?;
    let intent = Intent::from(args.common.state);
    let cluster_id = match resource::resolve_parent(&client, "k8s cluster", "/k8s", &args.cluster) {
        Ok(id) => id,
        Err(e) => return fail(ReconcileError::new("nodepool", intent.default_action(), e)),
    };

    let adapter = NodepoolAdapter::new(&client, &cluster_id);
    run(ctx, &adapter, options, &args.common, desired)
}

/// Setup problems (credentials, poll settings) are reported like any other failure
fn or_report<T>(args: &ReconcileArgs, step: Result<T>) -> Result<T> {
    step.inspect_err(|e| {
        let action = Intent::from(args.state).default_action();
        if let Err(write_err) = print_json(&failure_output(action, &format!("{e:#}"))) {
            log::warn!("Could not write failure output: {write_err:#}");
        }
    })
}

fn run<A: ResourceAdapter + ?Sized>(
    ctx: &Context,
    adapter: &A,
    options: ReconcileOptions,
    args: &ReconcileArgs,
    desired: DesiredState,
) -> Result<()> {
    let mut request = ReconcileRequest::new(args.state.into(), desired);
    request.identifier.clone_from(&args.identifier);

    let show_spinner = !ctx.quiet && options.wait && !args.check;
    let callback = if show_spinner {
        SpinnerCallback::new(&format!("Reconciling {}", adapter.kind()))
    } else {
        SpinnerCallback::hidden()
    };
    let engine = Reconciler::new(adapter, options).with_callback(&callback);

    let outcome = if args.check {
        engine.plan(&request).map(|plan| plan.preview())
    } else {
        engine.reconcile(&request)
    };
    callback.finish();

    match outcome {
        Ok(result) => {
            report(ctx, adapter.kind(), &result, args.check);
            print_json(&result.to_output(adapter.returned_key()))
        }
        Err(err) => fail(err),
    }
}

fn report(ctx: &Context, kind: &str, result: &ReconcileResult, check: bool) {
    for warning in &result.warnings {
        ui::warn(warning);
    }
    if ctx.quiet {
        return;
    }

    let id = result
        .resource
        .as_ref()
        .and_then(|r| r.id())
        .unwrap_or("-");
    let prefix = if check { "(check) " } else { "" };
    match (result.changed, result.action) {
        (false, _) | (_, Action::None) => ui::info(&format!("{kind} {id} already in desired state")),
        (true, action) => {
            let replaced = result
                .replaced_id
                .as_ref()
                .map(|old| format!(" (replacing {old})"))
                .unwrap_or_default();
            ui::success(&format!("{prefix}{kind} {id}: {action}{replaced}"));
        }
    }
}
