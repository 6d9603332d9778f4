//! Explicit operation context: configuration, command runner, working dir.

use std::path::{Path, PathBuf};

use crate::config::{BoxConfig, PollPolicy};
use crate::error::BoxError;
use crate::poll::{ContainerRunning, LogContains, PollReport, Poller};
use crate::runner::{CommandOutput, CommandRunner, Invocation, RunMode};

/// Everything an operation needs. Built once by the CLI, or by tests with a
/// scripted runner and a temporary working directory.
pub struct Context<'a> {
    pub config: &'a BoxConfig,
    pub runner: &'a dyn CommandRunner,
    /// Checkout holding the compose file, per-image directories and `ssl/`.
    pub workdir: PathBuf,
}

impl<'a> Context<'a> {
    pub fn new(
        config: &'a BoxConfig,
        runner: &'a dyn CommandRunner,
        workdir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            config,
            runner,
            workdir: workdir.into(),
        }
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    /// `program …`, started in the working directory.
    pub fn tool(&self, program: impl Into<String>) -> Invocation {
        Invocation::new(program).current_dir(&self.workdir)
    }

    /// `docker …`
    pub fn engine(&self) -> Invocation {
        self.tool(&self.config.tools.engine)
    }

    /// `docker-compose …`
    pub fn compose(&self) -> Invocation {
        self.tool(&self.config.tools.compose)
    }

    /// `oc …`
    pub fn cluster(&self) -> Invocation {
        self.tool(&self.config.tools.cluster)
    }

    /// Echoed run; a non-zero exit aborts the operation.
    pub fn run(&self, invocation: &Invocation) -> Result<String, BoxError> {
        self.runner
            .run(invocation, RunMode::Checked)
            .map(|out| out.output)
    }

    /// Echoed run whose exit status is ignored.
    pub fn run_ignoring_exit(&self, invocation: &Invocation) -> Result<CommandOutput, BoxError> {
        self.runner.run(invocation, RunMode::Unchecked)
    }

    /// Silent run that reports rather than raises a non-zero exit.
    pub fn probe(&self, invocation: &Invocation) -> Result<CommandOutput, BoxError> {
        self.runner.run(invocation, RunMode::QuietUnchecked)
    }

    /// Wait for the compose container of `service` to report running.
    pub fn wait_until_running(&self, service: &str) -> Result<PollReport, BoxError> {
        let container = self.config.container_name(service);
        let mut probe = ContainerRunning::new(self.runner, &self.config.tools.engine, container);
        Poller::new(self.config.polling.container_state).wait(&mut probe)
    }

    /// Follow the log of `service`'s container until a line contains `needle`.
    pub fn wait_for_log(&self, service: &str, needle: &str) -> Result<PollReport, BoxError> {
        let container = self.config.container_name(service);
        let mut probe =
            LogContains::follow(self.runner, &self.config.tools.engine, &container, needle)?;
        let report = Poller::new(PollPolicy::unbounded()).wait(&mut probe)?;
        tracing::info!("Container {container} is up");
        Ok(report)
    }
}
