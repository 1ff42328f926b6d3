//! Reading and rewriting the `version` field of JSON package manifests.

use std::fs;
use std::path::Path;

use serde_json::Value;
use tracing::info;

use crate::error::{ReleaseError, Result};

/// Writes a release version into a manifest file
pub trait ManifestWriter {
    fn set_version(&self, path: &Path, version: &str) -> Result<()>;
}

/// Rewrites JSON manifests in place.
///
/// Key order is kept and the output uses two-space indentation, matching what
/// npm writes. A trailing newline is kept if the file had one. For lock files
/// the root package entry (`packages[""]`) is bumped too.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonManifestWriter;

impl ManifestWriter for JsonManifestWriter {
    fn set_version(&self, path: &Path, version: &str) -> Result<()> {
        let original = fs::read_to_string(path).map_err(|e| {
            ReleaseError::manifest(format!("Cannot read {}: {}", path.display(), e))
        })?;
        let mut manifest: Value = serde_json::from_str(&original).map_err(|e| {
            ReleaseError::manifest(format!("Cannot parse {}: {}", path.display(), e))
        })?;

        let root = manifest.as_object_mut().ok_or_else(|| {
            ReleaseError::manifest(format!("{} is not a JSON object", path.display()))
        })?;
        root.insert("version".to_string(), Value::String(version.to_string()));

        if let Some(Value::Object(root_package)) = root
            .get_mut("packages")
            .and_then(|packages| packages.get_mut(""))
        {
            if root_package.contains_key("version") {
                root_package.insert("version".to_string(), Value::String(version.to_string()));
            }
        }

        let mut rendered = serde_json::to_string_pretty(&manifest)
            .map_err(|e| ReleaseError::manifest(e.to_string()))?;
        if original.ends_with('\n') {
            rendered.push('\n');
        }
        fs::write(path, rendered)?;

        info!("{} -> {}", path.display(), version);
        Ok(())
    }
}

/// Read the `version` field of a JSON manifest
pub fn read_version(path: &Path) -> Result<String> {
    let contents = fs::read_to_string(path)
        .map_err(|e| ReleaseError::manifest(format!("Cannot read {}: {}", path.display(), e)))?;
    let manifest: Value = serde_json::from_str(&contents)
        .map_err(|e| ReleaseError::manifest(format!("Cannot parse {}: {}", path.display(), e)))?;
    manifest
        .get("version")
        .and_then(Value::as_str)
        .map(|v| v.trim().to_string())
        .ok_or_else(|| ReleaseError::manifest(format!("{} has no version field", path.display())))
}
