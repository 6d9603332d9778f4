//! Whole-box lifecycle: cluster plus compose stack.
//!
//! `up` order:
//!
//! 1. tear everything down (unless `no_cleanup`)
//! 2. generate certificates if `ssl/` is missing
//! 3. start the cluster ([`crate::cluster::up`])
//! 4. select per-distro Dockerfiles
//! 5. build the base image, then each compose service
//! 6. `docker-compose up -d`
//! 7. wait for koji-client, koji-db, koji-hub and koji-builder
//! 8. seed the local registry with the auto-pull images

use std::fmt;
use std::str::FromStr;

use crate::cluster::{self, ClusterOptions};
use crate::context::Context;
use crate::error::{io_err, BoxError};
use crate::images;

/// Base distribution the images are built from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Distro {
    #[default]
    Fedora,
    Rhel7,
}

impl Distro {
    pub fn as_str(self) -> &'static str {
        match self {
            Distro::Fedora => "fedora",
            Distro::Rhel7 => "rhel7",
        }
    }
}

impl fmt::Display for Distro {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Distro {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "fedora" => Ok(Distro::Fedora),
            "rhel7" => Ok(Distro::Rhel7),
            other => Err(format!("unknown distro '{other}'; expected: fedora, rhel7")),
        }
    }
}

/// Options for [`up`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpOptions {
    /// Keep existing containers and volumes.
    pub no_cleanup: bool,
    /// Build images with `--no-cache`.
    pub force_rebuild: bool,
    pub updates: bool,
    pub updates_testing: bool,
    pub distro: Distro,
    /// Extra repo file installed into the base image.
    pub repo_url: Option<String>,
    pub cluster: ClusterOptions,
}

/// Readiness checkpoints after `docker-compose up`, in order: the service
/// must be running and, when a marker is given, must have logged it.
const READINESS: &[(&str, Option<&str>)] = &[
    ("koji-client", Some("exec sleep infinity")),
    ("koji-db", None),
    ("koji-hub", None),
    ("koji-builder", Some("exec /usr/sbin/init")),
];

const CERTS_DIR: &str = "ssl";
const GENERATE_CERTS: &str = "generate-certs";

/// Bring up the whole box.
pub fn up(ctx: &Context<'_>, opts: &UpOptions) -> Result<(), BoxError> {
    if !opts.no_cleanup {
        cleanup(ctx)?;
    }
    tracing::info!("osbs-box: up");

    ensure_certs(ctx)?;
    cluster::up(ctx, &opts.cluster)?;
    select_dockerfiles(ctx, opts.distro)?;
    build_images(ctx, opts)?;

    ctx.run(&ctx.compose().args(["up", "-d"]))?;

    tracing::info!("Waiting for client to come up");
    for (index, (service, marker)) in READINESS.iter().enumerate() {
        if index == 1 {
            tracing::info!("Checking that other containers are running");
        }
        ctx.wait_until_running(service)?;
        if let Some(marker) = marker {
            ctx.wait_for_log(service, marker)?;
        }
    }

    tracing::info!("Automatically populating local registry with images");
    for image in &ctx.config.auto_pull_images {
        images::copy_image(ctx, &image.source, &image.destination)?;
    }

    tracing::info!("osbs-box is up");
    Ok(())
}

/// Stop the compose stack (optionally deleting its volumes), then the cluster.
/// Exit statuses are ignored so a partially started box can still be removed.
pub fn down(ctx: &Context<'_>, delete_volumes: bool) -> Result<(), BoxError> {
    tracing::info!("osbs-box: down");
    let cmd = ctx.compose().arg("down").args_if(delete_volumes, ["-v"]);
    ctx.run_ignoring_exit(&cmd)?;
    cluster::down(ctx)
}

/// [`down`] with volume removal.
pub fn cleanup(ctx: &Context<'_>) -> Result<(), BoxError> {
    down(ctx, true)
}

/// Operator hint printed after a successful `up`.
pub fn certificate_hint(ctx: &Context<'_>) -> String {
    format!(
        "make sure registry certificate from ./{CERTS_DIR}/certs/domain.crt is copied to \
         /etc/docker/certs.d/{}/ca.crt",
        ctx.config.local_registry
    )
}

fn ensure_certs(ctx: &Context<'_>) -> Result<(), BoxError> {
    if ctx.workdir().join(CERTS_DIR).exists() {
        tracing::info!("Reusing existing certificates");
        return Ok(());
    }
    tracing::info!("Generating certificates");
    let script = ctx.workdir().join(GENERATE_CERTS);
    ctx.run(&ctx.tool(script.display().to_string()))?;
    Ok(())
}

/// Copy `<dir>/Dockerfile.<distro>` over `<dir>/Dockerfile` for every image dir.
fn select_dockerfiles(ctx: &Context<'_>, distro: Distro) -> Result<(), BoxError> {
    for directory in &ctx.config.directories {
        let dir = ctx.workdir().join(directory);
        let source = dir.join(format!("Dockerfile.{distro}"));
        let target = dir.join("Dockerfile");
        std::fs::copy(&source, &target).map_err(|e| io_err(&source, e))?;
        tracing::debug!("'{}' -> '{}'", source.display(), target.display());
    }
    Ok(())
}

fn build_images(ctx: &Context<'_>, opts: &UpOptions) -> Result<(), BoxError> {
    let base_tag = format!("{}:{}", ctx.config.base_image, opts.distro);
    let repo_arg = opts.repo_url.as_ref().map(|url| format!("REPO_URL={url}"));

    let build = ctx
        .engine()
        .arg("build")
        .args_if(opts.force_rebuild, ["--no-cache"])
        .args_if(opts.updates, ["--build-arg", "UPDATES=1"])
        .args_if(opts.updates_testing, ["--build-arg", "UPDATES_TESTING=1"])
        .args(
            repo_arg
                .into_iter()
                .flat_map(|arg| ["--build-arg".to_string(), arg]),
        )
        .args(["-t", base_tag.as_str(), "base"]);
    ctx.run(&build)?;

    for service in &ctx.config.services {
        ctx.run(&ctx.compose().args(["build", service.as_str()]))?;
    }
    Ok(())
}
