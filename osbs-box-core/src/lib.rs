//! osbs-box core library: configuration, command runner, readiness polling
//! and the box operations built on them.
//!
//! - [`config`]: [`BoxConfig`] and poll policies
//! - [`runner`]: [`CommandRunner`] seam and [`SystemRunner`]
//! - [`poll`]: bounded readiness polling over three probe kinds
//! - [`extract`]: typed scraping of tool output
//! - [`origin_config`]: local-registry allow-list patch
//! - [`cluster`], [`stack`], [`images`], [`status`]: operations

pub mod cluster;
pub mod config;
pub mod context;
pub mod error;
pub mod extract;
pub mod images;
pub mod origin_config;
pub mod poll;
pub mod runner;
pub mod stack;
pub mod status;

pub use cluster::ClusterOptions;
pub use config::{BoxConfig, ImageMapping, PollPolicy};
pub use context::Context;
pub use error::BoxError;
pub use origin_config::PatchOutcome;
pub use poll::{Observation, PollReport, Poller, Probe};
pub use runner::{CommandOutput, CommandRunner, Invocation, LogStream, RunMode, SystemRunner};
pub use stack::{Distro, UpOptions};
pub use status::StatusReport;
