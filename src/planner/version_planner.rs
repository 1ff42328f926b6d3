use semver::Version;
use tracing::{debug, info, warn};

use crate::boundary::ReleaseWarning;
use crate::config::PolicyConfig;
use crate::domain::tag::version_in_release_branch;
use crate::domain::{format_tag, increment, parse_tag, BranchClass, SemverLevel};
use crate::error::{ReleaseError, Result};

/// Versions and names derived for one release
#[derive(Debug, Clone, PartialEq)]
pub struct VersionPlan {
    pub latest_tag: String,
    pub latest_version: Version,
    pub effective_level: SemverLevel,
    pub next_version: Version,
    pub next_tag_name: String,
    /// Only set for develop releases, which cut a new release branch
    pub release_branch_name: Option<String>,
    pub warnings: Vec<ReleaseWarning>,
}

/// Works out the effective semver level and the next version for a release
#[derive(Debug, Clone)]
pub struct VersionPlanner {
    promote_patch_to_minor: bool,
}

impl Default for VersionPlanner {
    fn default() -> Self {
        VersionPlanner {
            promote_patch_to_minor: true,
        }
    }
}

impl VersionPlanner {
    /// Create a planner following the configured release policy
    pub fn new(policy: &PolicyConfig) -> Self {
        VersionPlanner {
            promote_patch_to_minor: policy.promote_patch_to_minor,
        }
    }

    /// Resolve the level actually released for a branch class.
    ///
    /// Hotfixes are always `patch`. Every other valid class needs an explicit
    /// level, and `patch` is promoted to `minor` unless the policy disables it.
    /// Nothing is logged here, so callers can validate input up front.
    pub fn effective_level(
        &self,
        class: BranchClass,
        requested: Option<SemverLevel>,
    ) -> Result<(SemverLevel, Option<ReleaseWarning>)> {
        match class {
            BranchClass::Invalid => Err(ReleaseError::invalid_branch(class.name())),
            BranchClass::Hotfix => Ok((
                SemverLevel::Patch,
                Some(ReleaseWarning::HotfixLevelIgnored { requested }),
            )),
            _ => match requested {
                None => Err(ReleaseError::invalid_level(
                    "--semver-level required and must be one of major|minor|patch",
                )),
                Some(SemverLevel::Patch) if self.promote_patch_to_minor => Ok((
                    SemverLevel::Minor,
                    Some(ReleaseWarning::PatchPromotedToMinor { class }),
                )),
                Some(level) => Ok((level, None)),
            },
        }
    }

    /// Plan versions and names for a release.
    ///
    /// # Arguments
    /// * `class` - Classification of the target branch
    /// * `requested` - Level given on the command line, if any
    /// * `latest_tag` - Highest existing release tag, if one was found
    ///
    /// # Returns
    /// * `Ok(VersionPlan)` - Next version, tag and release branch names
    /// * `Err(InvalidBranch | InvalidLevel | NoValidTag)` - If the inputs cannot produce a release
    pub fn plan(
        &self,
        class: BranchClass,
        requested: Option<SemverLevel>,
        latest_tag: Option<&str>,
    ) -> Result<VersionPlan> {
        let (effective_level, warning) = self.effective_level(class, requested)?;
        match &warning {
            Some(w @ ReleaseWarning::HotfixLevelIgnored { .. }) => info!("{}", w),
            Some(w) => warn!("{}", w),
            None => {}
        }

        let latest_tag = latest_tag.ok_or_else(|| {
            ReleaseError::no_valid_tag("no tag matching v<major>.<minor>.<patch> found")
        })?;
        let latest_version = parse_tag(latest_tag)?;

        let next_version = increment(&latest_version, effective_level);
        let next_tag_name = format_tag(&next_version);
        let release_branch_name =
            (class == BranchClass::Develop).then(|| format!("release/{}", next_tag_name));

        debug!(
            latest = %latest_tag,
            next = %next_tag_name,
            level = %effective_level,
            "planned release version"
        );

        Ok(VersionPlan {
            latest_tag: latest_tag.to_string(),
            latest_version,
            effective_level,
            next_version,
            next_tag_name,
            release_branch_name,
            warnings: warning.into_iter().collect(),
        })
    }

    /// Warn when a `release/vX.Y.Z` target disagrees with the computed tag.
    pub fn check_release_branch(target_branch: &str, plan: &VersionPlan) -> Option<ReleaseWarning> {
        let announced = version_in_release_branch(target_branch)?;
        if announced == plan.next_version {
            return None;
        }
        let warning = ReleaseWarning::ReleaseBranchVersionMismatch {
            branch: target_branch.to_string(),
            next_tag: plan.next_tag_name.clone(),
        };
        warn!("{}", warning);
        Some(warning)
    }
}
