use std::fmt;
use std::str::FromStr;

use semver::Version;

use crate::error::ReleaseError;

/// Which component of a version a release bumps
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SemverLevel {
    Patch,
    Minor,
    Major,
}

impl SemverLevel {
    pub const ALL: [SemverLevel; 3] = [SemverLevel::Major, SemverLevel::Minor, SemverLevel::Patch];

    pub fn name(&self) -> &'static str {
        match self {
            SemverLevel::Major => "major",
            SemverLevel::Minor => "minor",
            SemverLevel::Patch => "patch",
        }
    }
}

impl fmt::Display for SemverLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SemverLevel {
    type Err = ReleaseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "major" => Ok(SemverLevel::Major),
            "minor" => Ok(SemverLevel::Minor),
            "patch" => Ok(SemverLevel::Patch),
            other => Err(ReleaseError::invalid_level(format!(
                "must be one of major|minor|patch. Got: {}",
                other
            ))),
        }
    }
}

/// Bump a version, resetting every lower component to zero.
///
/// Pre-release and build metadata are dropped, so the result is always
/// strictly greater than the input.
pub fn increment(version: &Version, level: SemverLevel) -> Version {
    match level {
        SemverLevel::Major => Version::new(version.major + 1, 0, 0),
        SemverLevel::Minor => Version::new(version.major, version.minor + 1, 0),
        SemverLevel::Patch => Version::new(version.major, version.minor, version.patch + 1),
    }
}
