//! External command execution.
//!
//! Everything the box does goes through [`CommandRunner`]: one-shot
//! invocations that capture combined output, and followed streams used for
//! log-based readiness. [`SystemRunner`] spawns real processes; tests plug in
//! scripted runners.

use std::fmt;
use std::io::{self, BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::mpsc;
use std::thread;

use crate::error::BoxError;

// ---------------------------------------------------------------------------
// Invocation
// ---------------------------------------------------------------------------

/// A program plus its ordered argument tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    /// Directory the process starts in; the caller's cwd when `None`.
    pub cwd: Option<PathBuf>,
}

impl Invocation {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
        }
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    pub fn cwd(&self) -> Option<&Path> {
        self.cwd.as_deref()
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Append `args` only when `cond` holds.
    pub fn args_if<I, S>(self, cond: bool, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if cond {
            self.args(args)
        } else {
            self
        }
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                write!(f, " '{arg}'")?;
            } else {
                write!(f, " {arg}")?;
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Output / modes
// ---------------------------------------------------------------------------

/// Result of a finished invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// Combined stdout and stderr, trimmed.
    pub output: String,
    /// `None` when the process was terminated by a signal.
    pub code: Option<i32>,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// How a one-shot invocation treats its exit status and output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Echo the command and its output; a non-zero exit is an error.
    Checked,
    /// Echo the command and its output; the exit status is only reported.
    Unchecked,
    /// Stay silent unless the command fails; a non-zero exit is an error.
    Quiet,
    /// Stay silent; the exit status is only reported.
    QuietUnchecked,
}

impl RunMode {
    pub fn echoes(self) -> bool {
        matches!(self, RunMode::Checked | RunMode::Unchecked)
    }

    pub fn checks_exit(self) -> bool {
        matches!(self, RunMode::Checked | RunMode::Quiet)
    }
}

// ---------------------------------------------------------------------------
// LogStream
// ---------------------------------------------------------------------------

/// Line stream of a followed command.
///
/// Yields lines until the source closes. Dropping the stream terminates the
/// underlying process, if any.
pub struct LogStream {
    lines: Box<dyn Iterator<Item = String> + Send>,
    child: Option<Child>,
}

impl LogStream {
    /// Stream over a fixed set of lines; used by test runners.
    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let lines: Vec<String> = lines.into_iter().map(Into::into).collect();
        Self {
            lines: Box::new(lines.into_iter()),
            child: None,
        }
    }

    /// Next line, or `None` once the source has closed.
    pub fn next_line(&mut self) -> Option<String> {
        self.lines.next()
    }
}

impl Iterator for LogStream {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        self.next_line()
    }
}

impl Drop for LogStream {
    fn drop(&mut self) {
        if let Some(child) = self.child.as_mut() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

impl fmt::Debug for LogStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogStream")
            .field("pid", &self.child.as_ref().map(Child::id))
            .finish()
    }
}

// ---------------------------------------------------------------------------
// CommandRunner
// ---------------------------------------------------------------------------

pub trait CommandRunner {
    /// Run to completion and capture combined output.
    fn run(&self, invocation: &Invocation, mode: RunMode) -> Result<CommandOutput, BoxError>;

    /// Start the command and follow its merged output line by line.
    fn stream(&self, invocation: &Invocation) -> Result<LogStream, BoxError>;
}

impl<R: CommandRunner + ?Sized> CommandRunner for &R {
    fn run(&self, invocation: &Invocation, mode: RunMode) -> Result<CommandOutput, BoxError> {
        (**self).run(invocation, mode)
    }

    fn stream(&self, invocation: &Invocation) -> Result<LogStream, BoxError> {
        (**self).stream(invocation)
    }
}

/// Turn a finished run into the mode's contract: checked modes reject a
/// non-zero exit, quiet modes surface the hidden output when they do.
pub fn finish(
    invocation: &Invocation,
    mode: RunMode,
    result: CommandOutput,
) -> Result<CommandOutput, BoxError> {
    if !mode.checks_exit() || result.success() {
        return Ok(result);
    }
    if !mode.echoes() && !result.output.is_empty() {
        tracing::warn!(command = %invocation, "{}", result.output);
    }
    Err(BoxError::CommandFailed {
        command: invocation.to_string(),
        code: result.code,
        output: result.output,
    })
}

// ---------------------------------------------------------------------------
// SystemRunner
// ---------------------------------------------------------------------------

/// Runs invocations as real child processes.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, invocation: &Invocation, mode: RunMode) -> Result<CommandOutput, BoxError> {
        if mode.echoes() {
            tracing::info!("Running '{invocation}'");
        }

        let (mut child, lines) = spawn_merged(invocation)?;
        let mut output = String::new();
        for line in lines {
            if mode.echoes() {
                tracing::info!("{line}");
            }
            output.push_str(&line);
            output.push('\n');
        }

        let status = child.wait().map_err(|source| BoxError::Spawn {
            command: invocation.to_string(),
            source,
        })?;

        let result = CommandOutput {
            output: output.trim().to_string(),
            code: status.code(),
        };
        finish(invocation, mode, result)
    }

    fn stream(&self, invocation: &Invocation) -> Result<LogStream, BoxError> {
        tracing::debug!("following '{invocation}'");
        let (child, lines) = spawn_merged(invocation)?;
        Ok(LogStream {
            lines: Box::new(lines.into_iter()),
            child: Some(child),
        })
    }
}

/// Spawn with stdout and stderr sharing one pipe, read into a line channel.
///
/// Both streams write to the same pipe, so lines keep the order the child
/// emitted them in.
fn spawn_merged(invocation: &Invocation) -> Result<(Child, mpsc::Receiver<String>), BoxError> {
    let spawn_err = |source: io::Error| BoxError::Spawn {
        command: invocation.to_string(),
        source,
    };

    let (reader, writer) = io::pipe().map_err(spawn_err)?;
    let child = {
        let mut command = Command::new(&invocation.program);
        command
            .args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(writer.try_clone().map_err(spawn_err)?)
            .stderr(writer);
        if let Some(dir) = invocation.cwd() {
            command.current_dir(dir);
        }
        // Dropping `command` closes the parent's write ends so the reader
        // sees EOF once the child exits.
        command.spawn().map_err(spawn_err)?
    };

    let (tx, rx) = mpsc::channel::<String>();
    forward_lines(reader, tx);
    Ok((child, rx))
}

/// Drain `source` on a reader thread; the channel closes at EOF.
fn forward_lines<R: Read + Send + 'static>(source: R, tx: mpsc::Sender<String>) {
    thread::spawn(move || {
        let reader = BufReader::new(source);
        for line in reader.split(b'\n') {
            let Ok(bytes) = line else { break };
            let text = String::from_utf8_lossy(&bytes).trim_end().to_string();
            if tx.send(text).is_err() {
                break;
            }
        }
    });
}
