//! Error types for osbs-box-core.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise while driving the box.
#[derive(Debug, Error)]
pub enum BoxError {
    /// Filesystem failure, annotated with the path involved.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The external program could not be started at all (missing binary, etc.).
    #[error("failed to run '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// A checked command exited unsuccessfully.
    #[error("command '{command}' failed with exit code {}", display_code(.code))]
    CommandFailed {
        command: String,
        code: Option<i32>,
        output: String,
    },

    /// A readiness poll exhausted its attempt ceiling.
    #[error("{resource} is not ready after {attempts} attempts")]
    NotReady { resource: String, attempts: u32 },

    /// A followed log stream closed before the awaited line appeared.
    #[error("{resource} failed to start; log stream ended:\n{logs}")]
    StreamEnded { resource: String, logs: String },

    /// Tool output did not match the documented format.
    #[error("failed to find {what} in output:\n{output}")]
    Unparseable { what: &'static str, output: String },

    /// Config file exists but is not valid YAML for [`crate::BoxConfig`].
    #[error("failed to parse config at {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// Cluster master config is not valid YAML or has an unexpected shape.
    #[error("invalid master config at {path}: {source}")]
    MasterConfig {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// YAML error on documents other than the box config.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

fn display_code(code: &Option<i32>) -> String {
    match code {
        Some(code) => code.to_string(),
        None => "none (terminated by signal)".to_string(),
    }
}

/// Convenience constructor for [`BoxError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> BoxError {
    BoxError::Io {
        path: path.into(),
        source,
    }
}
