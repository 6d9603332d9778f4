//! Box status: cluster URL, Koji URLs and per-service container state.
//!
//! Collecting status never fails because a component is down; unreachable
//! parts are reported as such. Only a failure to launch the tools themselves
//! propagates.

use serde::Serialize;

use crate::context::Context;
use crate::error::BoxError;
use crate::extract;

/// Service whose log announces the Koji URLs.
const KOJI_HUB_SERVICE: &str = "koji-hub";

/// State reported when `inspect` fails for a service container.
pub const NOT_FOUND: &str = "not found";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ClusterStatus {
    Running { url: String },
    /// `oc cluster status` succeeded but printed no URL.
    UrlNotFound,
    NotRunning,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum KojiStatus {
    Running { hub_url: String, files_url: String },
    /// Hub logs are readable but do not contain the URLs yet.
    UrlNotFound,
    /// Hub container logs could not be read.
    Unavailable,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceStatus {
    pub service: String,
    pub state: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusReport {
    pub cluster: ClusterStatus,
    pub koji: KojiStatus,
    pub services: Vec<ServiceStatus>,
}

/// Query every component of the box.
pub fn collect(ctx: &Context<'_>) -> Result<StatusReport, BoxError> {
    Ok(StatusReport {
        cluster: cluster_status(ctx)?,
        koji: koji_status(ctx)?,
        services: service_states(ctx)?,
    })
}

fn cluster_status(ctx: &Context<'_>) -> Result<ClusterStatus, BoxError> {
    let out = ctx.probe(&ctx.cluster().args(["cluster", "status"]))?;
    if !out.success() {
        return Ok(ClusterStatus::NotRunning);
    }
    Ok(match extract::cluster_url(&out.output) {
        Ok(url) => ClusterStatus::Running { url },
        Err(err) => {
            tracing::debug!(error = %err, "cluster status without URL");
            ClusterStatus::UrlNotFound
        }
    })
}

fn koji_status(ctx: &Context<'_>) -> Result<KojiStatus, BoxError> {
    let container = ctx.config.container_name(KOJI_HUB_SERVICE);
    let out = ctx.probe(&ctx.engine().args(["logs", container.as_str()]))?;
    if !out.success() {
        return Ok(KojiStatus::Unavailable);
    }
    Ok(match extract::koji_urls(&out.output) {
        Ok(urls) => KojiStatus::Running {
            hub_url: urls.hub,
            files_url: urls.files,
        },
        Err(err) => {
            tracing::debug!(error = %err, "koji hub logs without URLs");
            KojiStatus::UrlNotFound
        }
    })
}

fn service_states(ctx: &Context<'_>) -> Result<Vec<ServiceStatus>, BoxError> {
    ctx.config
        .services
        .iter()
        .map(|service| {
            let container = ctx.config.container_name(service);
            let out = ctx.probe(&ctx.engine().args([
                "inspect",
                "--format={{.State.Status}}",
                container.as_str(),
            ]))?;
            let state = if out.success() {
                out.output.trim().to_string()
            } else {
                NOT_FOUND.to_string()
            };
            Ok(ServiceStatus {
                service: service.clone(),
                state,
            })
        })
        .collect()
}
