use std::fmt;

use crate::domain::{BranchClass, SemverLevel};

/// Non-fatal conditions noticed while planning a release.
/// These are reported to the user but never stop the run.
#[derive(Debug, Clone, PartialEq)]
pub enum ReleaseWarning {
    /// Hotfixes always release as a patch, whatever level was asked for
    HotfixLevelIgnored { requested: Option<SemverLevel> },
    /// A patch bump was asked for on a branch that releases at least a minor
    PatchPromotedToMinor { class: BranchClass },
    /// The release branch name announces a different version than the computed tag
    ReleaseBranchVersionMismatch { branch: String, next_tag: String },
}

impl fmt::Display for ReleaseWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReleaseWarning::HotfixLevelIgnored { requested: Some(level) } => write!(
                f,
                "Hotfixes assume semver patch level. Ignoring requested '{}'.",
                level
            ),
            ReleaseWarning::HotfixLevelIgnored { requested: None } => {
                write!(f, "Hotfixes assume semver patch level.")
            }
            ReleaseWarning::PatchPromotedToMinor { class } => write!(
                f,
                "Non-hotfixes assume a minimum of minor version bump. Assuming 'minor' for {} branch.",
                class
            ),
            ReleaseWarning::ReleaseBranchVersionMismatch { branch, next_tag } => write!(
                f,
                "Branch '{}' does not match the computed release tag '{}'",
                branch, next_tag
            ),
        }
    }
}
