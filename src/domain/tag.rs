use semver::Version;

use crate::error::{ReleaseError, Result};

/// Glob handed to the VCS when listing release tags
pub const RELEASE_TAG_GLOB: &str = "v*.*.*";

/// Format a version as a release tag (e.g., "1.2.3" -> "v1.2.3")
pub fn format_tag(version: &Version) -> String {
    format!("v{}", version)
}

/// Parse a release tag of the form `v<major>.<minor>.<patch>`.
///
/// Pre-release and build suffixes are rejected: only plain release points
/// count as previous releases.
pub fn parse_tag(tag: &str) -> Result<Version> {
    let rest = tag
        .strip_prefix('v')
        .ok_or_else(|| ReleaseError::no_valid_tag(format!("Invalid latest tag {}", tag)))?;

    let version = Version::parse(rest)
        .map_err(|e| ReleaseError::no_valid_tag(format!("Invalid latest tag {}: {}", tag, e)))?;

    if !version.pre.is_empty() || !version.build.is_empty() {
        return Err(ReleaseError::no_valid_tag(format!(
            "Invalid latest tag {}: pre-release and build tags are not release points",
            tag
        )));
    }

    Ok(version)
}

/// Pick the highest release tag by semver ordering, skipping unparsable names.
pub fn latest_release_tag<S: AsRef<str>>(tags: &[S]) -> Option<(String, Version)> {
    tags.iter()
        .filter_map(|tag| {
            let tag = tag.as_ref();
            parse_tag(tag).ok().map(|v| (tag.to_string(), v))
        })
        .max_by(|(_, a), (_, b)| a.cmp(b))
}

/// Extract the version a `release/vX.Y.Z` branch name announces, if any
pub fn version_in_release_branch(branch: &str) -> Option<Version> {
    branch
        .strip_prefix("release/")
        .and_then(|tag| parse_tag(tag).ok())
}
