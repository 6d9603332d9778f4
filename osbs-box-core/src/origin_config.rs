//! Allow-listing the local registry in the cluster master config.
//!
//! The cluster refuses to import images from registries missing from
//! `imagePolicyConfig.allowedRegistriesForImport`. The patch appends
//! `{domainName: <registry>}` when absent and leaves the file untouched
//! otherwise, so applying it twice is a no-op.

use std::path::{Path, PathBuf};

use serde_yaml::{Mapping, Value};

use crate::error::{io_err, BoxError};

const IMAGE_POLICY: &str = "imagePolicyConfig";
const ALLOWED_REGISTRIES: &str = "allowedRegistriesForImport";
const DOMAIN_NAME: &str = "domainName";

/// Whether the patch modified the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchOutcome {
    Changed,
    Unchanged,
}

impl PatchOutcome {
    pub fn changed(self) -> bool {
        self == PatchOutcome::Changed
    }
}

/// Ensure `registry` is allow-listed in `doc`.
///
/// Missing `imagePolicyConfig` / `allowedRegistriesForImport` keys are
/// created. A non-mapping root or a non-sequence registry list is rejected
/// rather than overwritten.
pub fn patch_document(doc: &mut Value, registry: &str) -> Result<PatchOutcome, BoxError> {
    if doc.is_null() {
        *doc = Value::Mapping(Mapping::new());
    }
    let root = doc
        .as_mapping_mut()
        .ok_or_else(|| shape_error("document root is not a mapping"))?;

    let policy = root
        .entry(Value::from(IMAGE_POLICY))
        .or_insert_with(|| Value::Mapping(Mapping::new()));
    if policy.is_null() {
        *policy = Value::Mapping(Mapping::new());
    }
    let policy = policy
        .as_mapping_mut()
        .ok_or_else(|| shape_error("imagePolicyConfig is not a mapping"))?;

    let registries = policy
        .entry(Value::from(ALLOWED_REGISTRIES))
        .or_insert_with(|| Value::Sequence(Vec::new()));
    if registries.is_null() {
        *registries = Value::Sequence(Vec::new());
    }
    let registries = registries
        .as_sequence_mut()
        .ok_or_else(|| shape_error("allowedRegistriesForImport is not a list"))?;

    let present = registries
        .iter()
        .filter_map(|entry| entry.get(DOMAIN_NAME).and_then(Value::as_str))
        .any(|domain| domain == registry);
    if present {
        return Ok(PatchOutcome::Unchanged);
    }

    let mut entry = Mapping::new();
    entry.insert(Value::from(DOMAIN_NAME), Value::from(registry));
    registries.push(Value::Mapping(entry));
    Ok(PatchOutcome::Changed)
}

/// Read-modify-write the master config at `path`.
///
/// The file is only rewritten (via a sibling `.tmp` and rename) when the
/// patch changed it.
pub fn allow_local_registry(path: &Path, registry: &str) -> Result<PatchOutcome, BoxError> {
    let contents = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
    let mut doc: Value = serde_yaml::from_str(&contents).map_err(|e| master_err(path, e))?;

    let outcome = patch_document(&mut doc, registry).map_err(|err| match err {
        BoxError::Yaml(source) => master_err(path, source),
        other => other,
    })?;
    if outcome.changed() {
        let yaml = serde_yaml::to_string(&doc)?;
        write_atomic(path, &yaml)?;
        tracing::info!(path = %path.display(), registry, "allowed local registry for import");
    } else {
        tracing::debug!(path = %path.display(), registry, "local registry already allowed");
    }
    Ok(outcome)
}

fn write_atomic(path: &Path, contents: &str) -> Result<(), BoxError> {
    let tmp = PathBuf::from(format!("{}.tmp", path.display()));
    std::fs::write(&tmp, contents).map_err(|e| io_err(&tmp, e))?;
    if let Err(e) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(io_err(path, e));
    }
    Ok(())
}

fn master_err(path: &Path, source: serde_yaml::Error) -> BoxError {
    BoxError::MasterConfig {
        path: path.to_path_buf(),
        source,
    }
}

fn shape_error(msg: &str) -> BoxError {
    BoxError::Yaml(serde::de::Error::custom(msg))
}

#[cfg(test)]
mod tests {
    use super::*;

    const REGISTRY: &str = "172.17.0.1:5000";

    fn domains(doc: &Value) -> Vec<String> {
        doc[IMAGE_POLICY][ALLOWED_REGISTRIES]
            .as_sequence()
            .expect("registry list")
            .iter()
            .filter_map(|e| e.get(DOMAIN_NAME).and_then(Value::as_str))
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn creates_missing_sections() {
        let mut doc: Value = serde_yaml::from_str("kind: MasterConfig\n").expect("yaml");
        let outcome = patch_document(&mut doc, REGISTRY).expect("patch");
        assert_eq!(outcome, PatchOutcome::Changed);
        assert_eq!(domains(&doc), vec![REGISTRY]);
        assert_eq!(doc["kind"].as_str(), Some("MasterConfig"));
    }

    #[test]
    fn appends_exactly_one_entry_then_idempotent() {
        let mut doc: Value = serde_yaml::from_str(
            "imagePolicyConfig:\n  allowedRegistriesForImport:\n  - domainName: docker.io\n  - domainName: '*.redhat.com'\n    insecure: false\n",
        )
        .expect("yaml");

        assert_eq!(patch_document(&mut doc, REGISTRY).expect("patch"), PatchOutcome::Changed);
        assert_eq!(domains(&doc), vec!["docker.io", "*.redhat.com", REGISTRY]);

        assert_eq!(
            patch_document(&mut doc, REGISTRY).expect("patch"),
            PatchOutcome::Unchanged
        );
        assert_eq!(domains(&doc).len(), 3);
    }

    #[test]
    fn null_list_is_replaced() {
        let mut doc: Value =
            serde_yaml::from_str("imagePolicyConfig:\n  allowedRegistriesForImport:\n").expect("yaml");
        assert!(patch_document(&mut doc, REGISTRY).expect("patch").changed());
        assert_eq!(domains(&doc), vec![REGISTRY]);
    }

    #[test]
    fn file_is_written_once_then_left_alone() {
        let dir = tempfile::TempDir::new().expect("tempdir");
        let path = dir.path().join("master-config.yaml");
        std::fs::write(&path, "kind: MasterConfig\n").expect("write");

        assert_eq!(
            allow_local_registry(&path, REGISTRY).expect("first"),
            PatchOutcome::Changed
        );
        let after_first = std::fs::read(&path).expect("read");
        let doc: Value = serde_yaml::from_slice(&after_first).expect("reparse");
        assert_eq!(domains(&doc), vec![REGISTRY]);

        assert_eq!(
            allow_local_registry(&path, REGISTRY).expect("second"),
            PatchOutcome::Unchanged
        );
        assert_eq!(std::fs::read(&path).expect("read"), after_first);
        assert!(!dir.path().join("master-config.yaml.tmp").exists());
    }

    #[test]
    fn malformed_file_error_names_path() {
        let dir = tempfile::TempDir::new().expect("tempdir");
        let path = dir.path().join("master-config.yaml");
        std::fs::write(&path, "imagePolicyConfig: [1, 2]\n").expect("write");

        let err = allow_local_registry(&path, REGISTRY).unwrap_err();
        assert!(matches!(err, BoxError::MasterConfig { .. }), "got: {err}");
        let msg = err.to_string();
        assert!(msg.contains("master-config.yaml"), "got: {msg}");
        assert!(msg.contains("imagePolicyConfig is not a mapping"), "got: {msg}");
        assert_eq!(
            std::fs::read_to_string(&path).expect("read"),
            "imagePolicyConfig: [1, 2]\n"
        );
    }

    #[test]
    fn rejects_non_list_registries() {
        let mut doc: Value =
            serde_yaml::from_str("imagePolicyConfig:\n  allowedRegistriesForImport: nope\n")
                .expect("yaml");
        assert!(patch_document(&mut doc, REGISTRY).is_err());
    }
}
