//! `osbs-box os-up` / `osbs-box os-down`: cluster-only lifecycle.

use anyhow::{Context as _, Result};
use clap::Args;
use colored::Colorize;

use osbs_box_core::cluster::{self, DEFAULT_OCP_IMAGE, DEFAULT_OCP_VERSION};
use osbs_box_core::{ClusterOptions, Context};

/// Flags shared by `up` and `os-up`.
#[derive(Args, Debug, Clone)]
pub struct ClusterArgs {
    /// Tag for OpenShift images used in 'oc cluster up'.
    #[arg(long, default_value = DEFAULT_OCP_VERSION)]
    pub ocp_version: String,

    /// Images to use for OpenShift in 'oc cluster up'.
    #[arg(long, default_value = DEFAULT_OCP_IMAGE)]
    pub ocp_image: String,

    /// Public hostname for osbs-box services.
    #[arg(long)]
    pub public_hostname: Option<String>,
}

impl From<ClusterArgs> for ClusterOptions {
    fn from(args: ClusterArgs) -> Self {
        Self {
            ocp_version: args.ocp_version,
            ocp_image: args.ocp_image,
            public_hostname: args.public_hostname,
        }
    }
}

impl ClusterArgs {
    pub fn run(self, ctx: &Context<'_>) -> Result<()> {
        let opts = ClusterOptions::from(self);
        let ip = cluster::up(ctx, &opts).context("failed to start OpenShift cluster")?;
        println!("{} OpenShift cluster is up at {ip}", "✓".green());
        Ok(())
    }
}

pub fn os_down(ctx: &Context<'_>) -> Result<()> {
    cluster::down(ctx).context("failed to stop OpenShift cluster")
}
