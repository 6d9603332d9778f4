//! `osbs-box pull-image` / `osbs-box copy-image`.

use anyhow::{Context as _, Result};
use clap::Args;
use colored::Colorize;

use osbs_box_core::{images, Context};

/// Arguments for `osbs-box pull-image`.
#[derive(Args, Debug)]
pub struct PullImageArgs {
    /// Image to pull, e.g. registry.fedoraproject.org/fedora:27, fedora:28
    pub source: String,

    /// Which repo:tag to push image to in local registry, e.g. fedora:27
    pub destination: String,
}

impl PullImageArgs {
    pub fn run(self, ctx: &Context<'_>) -> Result<()> {
        let pushed = images::pull_image(ctx, &self.source, &self.destination)
            .with_context(|| format!("failed to pull '{}' into local registry", self.source))?;
        println!("{} pushed {pushed}", "✓".green());
        Ok(())
    }
}

/// Arguments for `osbs-box copy-image`.
#[derive(Args, Debug)]
pub struct CopyImageArgs {
    /// Source image, e.g. registry.fedoraproject.org/fedora:28
    pub source: String,

    /// Destination repo:tag for copied image in local registry, e.g. fedora:28
    pub destination: String,
}

impl CopyImageArgs {
    pub fn run(self, ctx: &Context<'_>) -> Result<()> {
        let copied = images::copy_image(ctx, &self.source, &self.destination)
            .with_context(|| format!("failed to copy '{}' into local registry", self.source))?;
        println!("{} copied to {copied}", "✓".green());
        Ok(())
    }
}
