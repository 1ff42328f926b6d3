use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

/// Git-flow classification of a release target branch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BranchClass {
    Develop,
    Hotfix,
    Release,
    Feature,
    Bugfix,
    Invalid,
}

/// Patterns checked in order; the first match wins.
const BRANCH_PATTERNS: &[(&str, BranchClass)] = &[
    (r"^develop$", BranchClass::Develop),
    (r"^hotfix/.+", BranchClass::Hotfix),
    (r"^release/.+", BranchClass::Release),
    (r"^feature/.+", BranchClass::Feature),
    (r"^bugfix/.+", BranchClass::Bugfix),
];

fn compiled_patterns() -> &'static [(Regex, BranchClass)] {
    static PATTERNS: OnceLock<Vec<(Regex, BranchClass)>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        BRANCH_PATTERNS
            .iter()
            .filter_map(|(pattern, class)| Regex::new(pattern).ok().map(|re| (re, *class)))
            .collect()
    })
}

impl BranchClass {
    /// Classify a target branch name.
    ///
    /// Pure and total: anything that does not match one of the five git-flow
    /// patterns, including the empty string, is [`BranchClass::Invalid`].
    ///
    /// # Example
    /// ```
    /// use gitflow_release::domain::BranchClass;
    /// assert_eq!(BranchClass::classify("hotfix/login"), BranchClass::Hotfix);
    /// assert_eq!(BranchClass::classify("hotfix"), BranchClass::Invalid);
    /// ```
    pub fn classify(branch_name: &str) -> Self {
        compiled_patterns()
            .iter()
            .find(|(re, _)| re.is_match(branch_name))
            .map(|(_, class)| *class)
            .unwrap_or(BranchClass::Invalid)
    }

    pub fn is_valid(&self) -> bool {
        !matches!(self, BranchClass::Invalid)
    }

    /// Whether this class always releases as a patch
    pub fn forces_patch(&self) -> bool {
        matches!(self, BranchClass::Hotfix)
    }

    pub fn name(&self) -> &'static str {
        match self {
            BranchClass::Develop => "develop",
            BranchClass::Hotfix => "hotfix",
            BranchClass::Release => "release",
            BranchClass::Feature => "feature",
            BranchClass::Bugfix => "bugfix",
            BranchClass::Invalid => "invalid",
        }
    }
}

impl fmt::Display for BranchClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
