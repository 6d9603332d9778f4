//! Structured extraction from external tool output.
//!
//! Each extractor documents the output shape it expects and returns
//! [`BoxError::Unparseable`] (carrying the full output) when it does not
//! match.

use std::net::Ipv4Addr;
use std::sync::OnceLock;

use regex::Regex;

use crate::error::BoxError;

/// Port the OpenShift API and console listen on.
pub const OPENSHIFT_PORT: u16 = 8443;

static OPENSHIFT_IP_RE: OnceLock<Regex> = OnceLock::new();
static CLUSTER_URL_RE: OnceLock<Regex> = OnceLock::new();
static KOJI_URLS_RE: OnceLock<Regex> = OnceLock::new();

/// Koji endpoints printed by the hub container on startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KojiUrls {
    pub hub: String,
    pub files: String,
}

/// IPv4 address of the cluster from `oc cluster up` output.
///
/// Expects a URL of the form `https://<a.b.c.d>:8443` somewhere in the text,
/// e.g. `The server is accessible via web console at: https://10.0.0.5:8443`.
pub fn openshift_ip(output: &str) -> Result<Ipv4Addr, BoxError> {
    let re = OPENSHIFT_IP_RE
        .get_or_init(|| Regex::new(r"https://(\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3}):8443").unwrap());
    re.captures_iter(output)
        .find_map(|caps| caps[1].parse::<Ipv4Addr>().ok())
        .ok_or_else(|| unparseable("OpenShift IP", output))
}

/// Console URL from `oc cluster status` output: the first `https://` URL,
/// taken up to the end of its line.
pub fn cluster_url(output: &str) -> Result<String, BoxError> {
    let re = CLUSTER_URL_RE.get_or_init(|| Regex::new(r"(https://\S+)").unwrap());
    re.captures(output)
        .map(|caps| caps[1].to_string())
        .ok_or_else(|| unparseable("OpenShift URL", output))
}

/// Hub and files URLs from the koji-hub container log.
///
/// Expects a line ending in `/koji` immediately followed by a line ending in
/// `/kojifiles`, both starting with `http`.
pub fn koji_urls(output: &str) -> Result<KojiUrls, BoxError> {
    let re = KOJI_URLS_RE.get_or_init(|| {
        Regex::new(r"(?m)^.*?(http\S*/koji)\r?\n.*?(http\S*/kojifiles)\r?$").unwrap()
    });
    re.captures(output)
        .map(|caps| KojiUrls {
            hub: caps[1].to_string(),
            files: caps[2].to_string(),
        })
        .ok_or_else(|| unparseable("Koji hub URL", output))
}

fn unparseable(what: &'static str, output: &str) -> BoxError {
    BoxError::Unparseable {
        what,
        output: output.to_string(),
    }
}
