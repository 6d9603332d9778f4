//! `osbs-box down` / `osbs-box cleanup`.

use anyhow::{Context as _, Result};

use osbs_box_core::{stack, Context};

pub fn down(ctx: &Context<'_>) -> Result<()> {
    stack::down(ctx, false).context("failed to stop osbs-box")
}

pub fn cleanup(ctx: &Context<'_>) -> Result<()> {
    stack::cleanup(ctx).context("failed to clean up osbs-box")
}
