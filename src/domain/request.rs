use std::fmt;

use super::branch::BranchClass;
use super::version::SemverLevel;

/// Which package manager's lock file gets version-bumped alongside `package.json`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PackageManager {
    #[default]
    Npm,
    Yarn,
}

impl PackageManager {
    /// Manifest files carrying the package version for this package manager
    pub fn manifest_files(&self) -> Vec<String> {
        match self {
            PackageManager::Npm => vec![
                "package.json".to_string(),
                "package-lock.json".to_string(),
            ],
            PackageManager::Yarn => vec!["package.json".to_string()],
        }
    }
}

impl fmt::Display for PackageManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PackageManager::Npm => f.write_str("npm"),
            PackageManager::Yarn => f.write_str("yarn"),
        }
    }
}

/// A single release invocation, built once from CLI input
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseRequest {
    pub target_branch: String,
    pub requested_level: Option<SemverLevel>,
    pub package_manager: PackageManager,
}

impl ReleaseRequest {
    pub fn new(target_branch: impl Into<String>, requested_level: Option<SemverLevel>) -> Self {
        ReleaseRequest {
            target_branch: target_branch.into(),
            requested_level,
            package_manager: PackageManager::default(),
        }
    }

    pub fn with_package_manager(mut self, package_manager: PackageManager) -> Self {
        self.package_manager = package_manager;
        self
    }

    pub fn class(&self) -> BranchClass {
        BranchClass::classify(&self.target_branch)
    }
}
