//! osbs-box: local OSBS development environment.
//!
//! # Usage
//!
//! ```text
//! osbs-box up [--no-cleanup] [--force-rebuild] [--updates] [--updates-testing]
//!             [--distro fedora|rhel7] [--repo-url <url>]
//!             [--ocp-version <tag>] [--ocp-image <image>] [--public-hostname <host>]
//! osbs-box down
//! osbs-box os-up [--ocp-version <tag>] [--ocp-image <image>] [--public-hostname <host>]
//! osbs-box os-down
//! osbs-box cleanup
//! osbs-box status [--json]
//! osbs-box pull-image <source> <destination>
//! osbs-box copy-image <source> <destination>
//! ```

mod commands;

use std::path::PathBuf;

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};

use commands::{
    cluster::ClusterArgs,
    image::{CopyImageArgs, PullImageArgs},
    status::StatusArgs,
    up::UpArgs,
};
use osbs_box_core::{BoxConfig, Context, SystemRunner};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "osbs-box",
    version,
    about = "Set up a new OSBS instance using docker-compose.\n\
             It includes an OpenShift cluster, Koji and a docker registry",
    long_about = None,
)]
struct Cli {
    /// YAML file overriding the built-in box configuration
    /// (defaults to ./osbs-box.yaml when present).
    #[arg(long, global = true, env = "OSBS_BOX_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start a new osbs-box.
    Up(UpArgs),

    /// Destroy the existing osbs-box.
    Down,

    /// Start the OpenShift cluster for osbs-box.
    OsUp(ClusterArgs),

    /// Destroy the OpenShift cluster for osbs-box.
    OsDown,

    /// Destroy the box and remove its configuration volumes.
    Cleanup,

    /// Show OpenShift, Koji and container status.
    Status(StatusArgs),

    /// Pull an image and push it to the local registry.
    PullImage(PullImageArgs),

    /// Copy an image and its manifests into the local registry using skopeo-lite.
    CopyImage(CopyImageArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let workdir = std::env::current_dir().context("could not determine working directory")?;
    let config = BoxConfig::resolve(cli.config.as_deref(), &workdir)
        .context("failed to load box configuration")?;
    let runner = SystemRunner;
    let ctx = Context::new(&config, &runner, workdir);

    match cli.command {
        Commands::Up(args) => args.run(&ctx),
        Commands::Down => commands::down::down(&ctx),
        Commands::OsUp(args) => args.run(&ctx),
        Commands::OsDown => commands::cluster::os_down(&ctx),
        Commands::Cleanup => commands::down::cleanup(&ctx),
        Commands::Status(args) => args.run(&ctx),
        Commands::PullImage(args) => args.run(&ctx),
        Commands::CopyImage(args) => args.run(&ctx),
    }
}

/// Progress and command echo go to stderr; stdout carries results.
fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
