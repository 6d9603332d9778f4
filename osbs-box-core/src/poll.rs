//! Readiness polling.
//!
//! A [`Poller`] repeatedly asks a [`Probe`] for one observation until the
//! probe reports [`Observation::Ready`], its source ends, or the attempt
//! ceiling of the [`PollPolicy`] is reached. Exhaustion is always an error;
//! callers treat it as fatal.
//!
//! Three probes cover the readiness surfaces the external tools expose:
//!
//! | Probe               | Observation                             | Ready when            |
//! |---------------------|-----------------------------------------|-----------------------|
//! | [`ContainerRunning`]| `docker inspect --format={{.State.Running}}` | output is `true` |
//! | [`LogContains`]     | next line of `docker logs -f`           | line has the needle   |
//! | [`CommandSucceeds`] | one run of a status command             | exit status 0         |

use std::thread;

use crate::config::PollPolicy;
use crate::error::BoxError;
use crate::runner::{CommandRunner, Invocation, LogStream, RunMode};

/// Classification of a single probe attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Observation {
    Ready,
    NotReady,
    /// The observed source closed; further attempts cannot succeed.
    Ended,
}

pub trait Probe {
    /// Human-readable name used in logs and errors.
    fn resource(&self) -> &str;

    /// Take one observation.
    fn observe(&mut self) -> Result<Observation, BoxError>;

    /// Error reported when the source ends before becoming ready.
    fn ended(&mut self, attempts: u32) -> BoxError {
        BoxError::NotReady {
            resource: self.resource().to_string(),
            attempts,
        }
    }
}

/// Outcome of a successful wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollReport {
    /// Observations taken, including the one that reported ready.
    pub attempts: u32,
}

/// Bounded fixed-interval retry loop.
#[derive(Debug, Clone, Copy)]
pub struct Poller {
    policy: PollPolicy,
}

impl Poller {
    pub fn new(policy: PollPolicy) -> Self {
        Self { policy }
    }

    /// Block until `probe` reports ready.
    ///
    /// Sleeps `policy.interval` between not-ready observations, never after
    /// the last permitted one.
    pub fn wait<P: Probe + ?Sized>(&self, probe: &mut P) -> Result<PollReport, BoxError> {
        let mut attempts = 0u32;
        loop {
            if self.exhausted(attempts) {
                return Err(BoxError::NotReady {
                    resource: probe.resource().to_string(),
                    attempts,
                });
            }

            attempts += 1;
            match probe.observe()? {
                Observation::Ready => {
                    tracing::debug!(resource = probe.resource(), attempts, "ready");
                    return Ok(PollReport { attempts });
                }
                Observation::Ended => return Err(probe.ended(attempts)),
                Observation::NotReady => {
                    tracing::debug!(resource = probe.resource(), attempts, "not ready yet");
                }
            }

            if !self.exhausted(attempts) && !self.policy.interval.is_zero() {
                thread::sleep(self.policy.interval);
            }
        }
    }

    fn exhausted(&self, attempts: u32) -> bool {
        self.policy.max_attempts.is_some_and(|max| attempts >= max)
    }
}

// ---------------------------------------------------------------------------
// ContainerRunning
// ---------------------------------------------------------------------------

/// Polls the container engine's running flag for one container.
pub struct ContainerRunning<'a, R: CommandRunner + ?Sized> {
    runner: &'a R,
    container: String,
    inspect: Invocation,
}

impl<'a, R: CommandRunner + ?Sized> ContainerRunning<'a, R> {
    pub fn new(runner: &'a R, engine: &str, container: impl Into<String>) -> Self {
        let container = container.into();
        let inspect = Invocation::new(engine).args([
            "inspect".to_string(),
            "--format={{.State.Running}}".to_string(),
            container.clone(),
        ]);
        Self {
            runner,
            container,
            inspect,
        }
    }
}

impl<R: CommandRunner + ?Sized> Probe for ContainerRunning<'_, R> {
    fn resource(&self) -> &str {
        &self.container
    }

    fn observe(&mut self) -> Result<Observation, BoxError> {
        // A missing container makes inspect fail; that is "not yet", not fatal.
        let out = self.runner.run(&self.inspect, RunMode::QuietUnchecked)?;
        if out.success() && out.output.trim() == "true" {
            Ok(Observation::Ready)
        } else {
            Ok(Observation::NotReady)
        }
    }
}

// ---------------------------------------------------------------------------
// LogContains
// ---------------------------------------------------------------------------

/// Follows a log stream until a line contains `needle`.
pub struct LogContains {
    resource: String,
    needle: String,
    stream: LogStream,
    seen: Vec<String>,
}

impl LogContains {
    pub fn new(resource: impl Into<String>, needle: impl Into<String>, stream: LogStream) -> Self {
        Self {
            resource: resource.into(),
            needle: needle.into(),
            stream,
            seen: Vec::new(),
        }
    }

    /// Follow `<engine> logs -f <container>` through `runner`.
    pub fn follow<R: CommandRunner + ?Sized>(
        runner: &R,
        engine: &str,
        container: &str,
        needle: &str,
    ) -> Result<Self, BoxError> {
        let inv = Invocation::new(engine).args(["logs", "-f", container]);
        let stream = runner.stream(&inv)?;
        Ok(Self::new(container, needle, stream))
    }

    /// Lines read so far.
    pub fn lines_read(&self) -> usize {
        self.seen.len()
    }
}

impl Probe for LogContains {
    fn resource(&self) -> &str {
        &self.resource
    }

    fn observe(&mut self) -> Result<Observation, BoxError> {
        let Some(line) = self.stream.next_line() else {
            return Ok(Observation::Ended);
        };
        let found = line.contains(&self.needle);
        self.seen.push(line);
        Ok(if found {
            Observation::Ready
        } else {
            Observation::NotReady
        })
    }

    fn ended(&mut self, _attempts: u32) -> BoxError {
        let logs = self.seen.join("\n");
        tracing::warn!(resource = %self.resource, "log stream ended early:\n{logs}");
        BoxError::StreamEnded {
            resource: self.resource.clone(),
            logs,
        }
    }
}

// ---------------------------------------------------------------------------
// CommandSucceeds
// ---------------------------------------------------------------------------

/// Ready once an invocation exits with status 0.
pub struct CommandSucceeds<'a, R: CommandRunner + ?Sized> {
    runner: &'a R,
    resource: String,
    invocation: Invocation,
}

impl<'a, R: CommandRunner + ?Sized> CommandSucceeds<'a, R> {
    pub fn new(runner: &'a R, resource: impl Into<String>, invocation: Invocation) -> Self {
        Self {
            runner,
            resource: resource.into(),
            invocation,
        }
    }
}

impl<R: CommandRunner + ?Sized> Probe for CommandSucceeds<'_, R> {
    fn resource(&self) -> &str {
        &self.resource
    }

    fn observe(&mut self) -> Result<Observation, BoxError> {
        let out = self.runner.run(&self.invocation, RunMode::QuietUnchecked)?;
        Ok(if out.success() {
            Observation::Ready
        } else {
            Observation::NotReady
        })
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::time::Duration;

    use super::*;
    use crate::runner::CommandOutput;

    /// Replays canned outputs and counts calls.
    struct Replay {
        outputs: RefCell<VecDeque<CommandOutput>>,
        calls: RefCell<Vec<Invocation>>,
    }

    impl Replay {
        fn new(outputs: Vec<(i32, &str)>) -> Self {
            Self {
                outputs: RefCell::new(
                    outputs
                        .into_iter()
                        .map(|(code, out)| CommandOutput {
                            output: out.to_string(),
                            code: Some(code),
                        })
                        .collect(),
                ),
                calls: RefCell::new(Vec::new()),
            }
        }

        fn calls(&self) -> usize {
            self.calls.borrow().len()
        }
    }

    impl CommandRunner for Replay {
        fn run(&self, inv: &Invocation, _mode: RunMode) -> Result<CommandOutput, BoxError> {
            self.calls.borrow_mut().push(inv.clone());
            Ok(self.outputs.borrow_mut().pop_front().unwrap_or(CommandOutput {
                output: String::new(),
                code: Some(1),
            }))
        }

        fn stream(&self, _inv: &Invocation) -> Result<LogStream, BoxError> {
            Ok(LogStream::from_lines(Vec::<String>::new()))
        }
    }

    fn fast(max: u32) -> Poller {
        Poller::new(PollPolicy::new(max, Duration::ZERO))
    }

    #[test]
    fn container_ready_within_ceiling() {
        let runner = Replay::new(vec![(1, "Error: No such object"), (0, "false"), (0, "true")]);
        let mut probe = ContainerRunning::new(&runner, "docker", "box_koji-db_1");

        let report = fast(10).wait(&mut probe).expect("ready");
        assert_eq!(report.attempts, 3);
        assert_eq!(runner.calls(), 3);
        assert_eq!(
            runner.calls.borrow()[0].to_string(),
            "docker inspect --format={{.State.Running}} box_koji-db_1"
        );
    }

    #[test]
    fn container_never_ready_exhausts_at_ceiling() {
        let runner = Replay::new(vec![(0, "false"); 20]);
        let mut probe = ContainerRunning::new(&runner, "docker", "box_koji-db_1");

        let err = fast(10).wait(&mut probe).unwrap_err();
        assert_eq!(runner.calls(), 10);
        match err {
            BoxError::NotReady { resource, attempts } => {
                assert_eq!(resource, "box_koji-db_1");
                assert_eq!(attempts, 10);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn zero_ceiling_never_observes() {
        let runner = Replay::new(vec![(0, "true")]);
        let mut probe = ContainerRunning::new(&runner, "docker", "box_koji-db_1");

        let err = fast(0).wait(&mut probe).unwrap_err();
        assert_eq!(runner.calls(), 0);
        assert!(matches!(err, BoxError::NotReady { attempts: 0, .. }), "got: {err}");
    }

    #[test]
    fn log_needle_on_nth_line_reads_exactly_n() {
        let stream = LogStream::from_lines([
            "+ mkdir -p /mnt/koji",
            "+ koji moshimoshi",
            "+ exec sleep infinity",
            "never read",
        ]);
        let mut probe = LogContains::new("box_koji-client_1", "exec sleep infinity", stream);

        let report = Poller::new(PollPolicy::unbounded())
            .wait(&mut probe)
            .expect("ready");
        assert_eq!(report.attempts, 3);
        assert_eq!(probe.lines_read(), 3);
    }

    #[test]
    fn log_stream_end_reports_buffered_logs() {
        let stream = LogStream::from_lines(["starting", "fatal: no database"]);
        let mut probe = LogContains::new("box_koji-builder_1", "exec /usr/sbin/init", stream);

        let err = Poller::new(PollPolicy::unbounded())
            .wait(&mut probe)
            .unwrap_err();
        match err {
            BoxError::StreamEnded { resource, logs } => {
                assert_eq!(resource, "box_koji-builder_1");
                assert_eq!(logs, "starting\nfatal: no database");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn command_succeeds_first_try_runs_once() {
        let runner = Replay::new(vec![(0, "Web console URL: https://127.0.0.1:8443")]);
        let inv = Invocation::new("oc").args(["cluster", "status"]);
        let mut probe = CommandSucceeds::new(&runner, "OpenShift cluster", inv);

        let report = fast(90).wait(&mut probe).expect("ready");
        assert_eq!(report.attempts, 1);
        assert_eq!(runner.calls(), 1);
    }

    #[test]
    fn command_never_succeeds_runs_exactly_ceiling() {
        let runner = Replay::new(Vec::new());
        let inv = Invocation::new("oc").args(["cluster", "status"]);
        let mut probe = CommandSucceeds::new(&runner, "OpenShift cluster", inv);

        let err = fast(90).wait(&mut probe).unwrap_err();
        assert_eq!(runner.calls(), 90);
        assert!(err.to_string().contains("OpenShift cluster"), "got: {err}");
        assert!(err.to_string().contains("90 attempts"), "got: {err}");
    }
}
