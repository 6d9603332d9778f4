//! OpenShift cluster lifecycle via `oc cluster`.

use std::net::Ipv4Addr;

use crate::context::Context;
use crate::error::BoxError;
use crate::extract::{self, OPENSHIFT_PORT};
use crate::origin_config;
use crate::poll::{CommandSucceeds, PollReport, Poller};

pub const DEFAULT_OCP_VERSION: &str = "v3.6.0";
pub const DEFAULT_OCP_IMAGE: &str = "openshift/origin";

/// Name of the container `oc cluster up` runs the control plane in.
pub const ORIGIN_CONTAINER: &str = "origin";

const CLUSTER_RESOURCE: &str = "OpenShift cluster (see logs for \"origin\" container)";

/// Flags forwarded to `oc cluster up`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterOptions {
    pub ocp_version: String,
    pub ocp_image: String,
    pub public_hostname: Option<String>,
}

impl Default for ClusterOptions {
    fn default() -> Self {
        Self {
            ocp_version: DEFAULT_OCP_VERSION.to_string(),
            ocp_image: DEFAULT_OCP_IMAGE.to_string(),
            public_hostname: None,
        }
    }
}

/// Start the cluster, allow the local registry, log in and grant the `osbs`
/// user cluster-admin.
///
/// Returns the cluster's IP as scraped from `oc cluster up`.
pub fn up(ctx: &Context<'_>, opts: &ClusterOptions) -> Result<Ipv4Addr, BoxError> {
    let mut cmd = ctx.cluster().args([
        "cluster",
        "up",
        "--version",
        opts.ocp_version.as_str(),
        "--image",
        opts.ocp_image.as_str(),
    ]);
    if let Some(hostname) = &opts.public_hostname {
        cmd = cmd.args(["--public-hostname", hostname.as_str()]);
    }
    let output = ctx.run(&cmd)?;
    let ip = extract::openshift_ip(&output)?;

    let patched = origin_config::allow_local_registry(
        &ctx.config.origin_master_config,
        &ctx.config.local_registry,
    )?;
    if patched.changed() {
        tracing::info!("Restarting origin container due to config changes");
        ctx.run(&ctx.engine().args(["restart", ORIGIN_CONTAINER]))?;
        wait_until_up(ctx)?;
    }

    ctx.run(&ctx.cluster().args([
        "login".to_string(),
        "-u".to_string(),
        "system:admin".to_string(),
        format!("https://{ip}:{OPENSHIFT_PORT}"),
    ]))?;

    ctx.run(&ctx.cluster().args([
        "-n",
        "osbs",
        "adm",
        "policy",
        "add-cluster-role-to-user",
        "cluster-admin",
        "osbs",
    ]))?;

    Ok(ip)
}

/// `oc cluster down`; failures are ignored so teardown always proceeds.
pub fn down(ctx: &Context<'_>) -> Result<(), BoxError> {
    ctx.run_ignoring_exit(&ctx.cluster().args(["cluster", "down"]))?;
    Ok(())
}

/// Poll `oc cluster status` until it succeeds.
pub fn wait_until_up(ctx: &Context<'_>) -> Result<PollReport, BoxError> {
    tracing::info!("Waiting for OpenShift cluster to be up");
    let status = ctx.cluster().args(["cluster", "status"]);
    let mut probe = CommandSucceeds::new(ctx.runner, CLUSTER_RESOURCE, status);
    Poller::new(ctx.config.polling.cluster_status).wait(&mut probe)
}
