//! Box configuration.
//!
//! Every value the box needs (service lists, registry address, tool names,
//! poll budgets) lives in [`BoxConfig`] and is handed to each operation.
//! A YAML file may override any subset of fields; the rest keep their
//! defaults.
//!
//! ```yaml
//! local_registry: 10.0.0.1:5000
//! project: mybox
//! polling:
//!   cluster_status:
//!     max_attempts: 120
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{io_err, BoxError};

/// File name picked up from the working directory when no explicit path is given.
pub const DEFAULT_CONFIG_FILE: &str = "osbs-box.yaml";

/// Fallback compose project prefix when the working directory has no usable name.
const FALLBACK_PROJECT: &str = "osbsbox";

// ---------------------------------------------------------------------------
// BoxConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoxConfig {
    /// Repository name of the base image (`<base_image>:<distro>`).
    pub base_image: String,
    /// Directories carrying per-distro `Dockerfile.<distro>` files.
    pub directories: Vec<String>,
    /// Compose services, in build order.
    pub services: Vec<String>,
    /// `host:port` of the local registry.
    pub local_registry: String,
    /// Images copied into the local registry at the end of `up`.
    pub auto_pull_images: Vec<ImageMapping>,
    /// Compose project prefix; containers are `<project>_<service>_1`.
    pub project: String,
    /// Cluster master config patched to allow the local registry.
    pub origin_master_config: PathBuf,
    pub tools: Tools,
    pub polling: Polling,
}

impl Default for BoxConfig {
    fn default() -> Self {
        Self {
            base_image: "osbs-box".to_string(),
            directories: strings(&[
                "base",
                "client",
                "koji-db",
                "hub",
                "koji-builder",
                "shared-data",
            ]),
            services: strings(&[
                "shared-data",
                "koji-db",
                "koji-hub",
                "koji-builder",
                "koji-client",
                "skopeo-lite",
            ]),
            local_registry: "172.17.0.1:5000".to_string(),
            auto_pull_images: vec![ImageMapping {
                source: "registry.fedoraproject.org/fedora:latest".to_string(),
                destination: "fedora:latest".to_string(),
            }],
            project: default_project(),
            origin_master_config: PathBuf::from(
                "/var/lib/origin/openshift.local.config/master/master-config.yaml",
            ),
            tools: Tools::default(),
            polling: Polling::default(),
        }
    }
}

impl BoxConfig {
    /// Name of the container compose starts for `service`.
    pub fn container_name(&self, service: &str) -> String {
        format!("{}_{}_1", self.project, service)
    }

    /// `<local_registry>/<repo>`.
    pub fn registry_ref(&self, repo: &str) -> String {
        format!("{}/{}", self.local_registry, repo)
    }

    /// Load a config from an explicit YAML file.
    ///
    /// Returns `BoxError::Io` when the file cannot be read and
    /// `BoxError::ConfigParse` (with path) when it is malformed.
    pub fn load(path: &Path) -> Result<Self, BoxError> {
        let contents = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(&contents).map_err(|source| BoxError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Resolve the effective config.
    ///
    /// An explicit path must exist. Without one, `osbs-box.yaml` in `cwd` is
    /// used when present, otherwise the built-in defaults.
    pub fn resolve(explicit: Option<&Path>, cwd: &Path) -> Result<Self, BoxError> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        let candidate = cwd.join(DEFAULT_CONFIG_FILE);
        if candidate.is_file() {
            tracing::debug!(path = %candidate.display(), "loading box config");
            return Self::load(&candidate);
        }
        Ok(Self::default())
    }
}

/// A `source -> destination` pair for images seeded into the local registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageMapping {
    pub source: String,
    /// `repo:tag` inside the local registry.
    pub destination: String,
}

// ---------------------------------------------------------------------------
// Tools
// ---------------------------------------------------------------------------

/// Program names of the external collaborators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tools {
    pub engine: String,
    pub compose: String,
    pub cluster: String,
}

impl Default for Tools {
    fn default() -> Self {
        Self {
            engine: "docker".to_string(),
            compose: "docker-compose".to_string(),
            cluster: "oc".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Polling
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Polling {
    /// Budget for waiting on a container's running flag.
    pub container_state: PollPolicy,
    /// Budget for waiting on `oc cluster status` to succeed.
    pub cluster_status: PollPolicy,
}

impl Default for Polling {
    fn default() -> Self {
        Self {
            container_state: PollPolicy::new(10, Duration::from_secs(1)),
            cluster_status: PollPolicy::new(90, Duration::from_secs(1)),
        }
    }
}

/// Attempt ceiling and fixed pause between attempts.
///
/// Fields omitted from a config file fall back to [`PollPolicy::default`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollPolicy {
    /// `None` polls until the probe reports ready or its source ends.
    pub max_attempts: Option<u32>,
    #[serde(with = "millis", rename = "interval_ms")]
    pub interval: Duration,
}

impl PollPolicy {
    pub const fn new(max_attempts: u32, interval: Duration) -> Self {
        Self {
            max_attempts: Some(max_attempts),
            interval,
        }
    }

    /// No ceiling and no pause; used for following log streams.
    pub const fn unbounded() -> Self {
        Self {
            max_attempts: None,
            interval: Duration::ZERO,
        }
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self::new(10, Duration::from_secs(1))
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Compose prefixes containers with the project directory name, minus dashes.
pub fn project_from_dir(dir: &Path) -> Option<String> {
    let name = dir.file_name()?.to_string_lossy().replace('-', "");
    if name.is_empty() {
        None
    } else {
        Some(name)
    }
}

fn default_project() -> String {
    std::env::current_dir()
        .ok()
        .and_then(|dir| project_from_dir(&dir))
        .unwrap_or_else(|| FALLBACK_PROJECT.to_string())
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}
