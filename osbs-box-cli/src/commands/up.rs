//! `osbs-box up`: full bring-up of cluster, Koji and registry.

use anyhow::{Context as _, Result};
use clap::Args;
use colored::Colorize;

use osbs_box_core::{stack, Context, Distro, UpOptions};

use super::cluster::ClusterArgs;

/// Arguments for `osbs-box up`.
#[derive(Args, Debug)]
pub struct UpArgs {
    /// Don't remove existing volumes when starting a new box.
    #[arg(long)]
    pub no_cleanup: bool,

    /// Force image rebuild.
    #[arg(long)]
    pub force_rebuild: bool,

    /// Update packages.
    #[arg(long)]
    pub updates: bool,

    /// Enable updates-testing repo and update packages.
    #[arg(long)]
    pub updates_testing: bool,

    /// Base distro: fedora or rhel7.
    #[arg(long, default_value = "fedora")]
    pub distro: Distro,

    /// URL of the additional repo file to install.
    #[arg(long)]
    pub repo_url: Option<String>,

    #[command(flatten)]
    pub cluster: ClusterArgs,
}

impl UpArgs {
    pub fn run(self, ctx: &Context<'_>) -> Result<()> {
        let opts = UpOptions {
            no_cleanup: self.no_cleanup,
            force_rebuild: self.force_rebuild,
            updates: self.updates,
            updates_testing: self.updates_testing,
            distro: self.distro,
            repo_url: self.repo_url,
            cluster: self.cluster.into(),
        };
        stack::up(ctx, &opts)
            .context("osbs-box failed to start; run `osbs-box cleanup` before retrying")?;

        println!("{} osbs-box is up", "✓".green());
        println!("{}", stack::certificate_hint(ctx).yellow());
        Ok(())
    }
}
