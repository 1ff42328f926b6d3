use std::fmt;

use crate::config::Config;
use crate::domain::{BranchClass, PackageManager};
use crate::error::{ReleaseError, Result};

use super::version_planner::VersionPlan;

/// One abstract git operation in a release flow
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowStep {
    Checkout(String),
    CheckoutNew(String),
    /// Fast-forward the current branch from the remote
    Pull,
    MergeNoFF {
        from: String,
        into: String,
        message: String,
    },
    /// Rewrite the `version` field of each manifest file
    BumpManifests {
        files: Vec<String>,
        version: String,
    },
    Commit {
        files: Vec<String>,
        message: String,
    },
    Tag {
        name: String,
        message: String,
    },
    PushBranch(String),
    PushTag(String),
    DeleteBranch(String),
}

impl fmt::Display for FlowStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlowStep::Checkout(branch) => write!(f, "checkout {}", branch),
            FlowStep::CheckoutNew(branch) => write!(f, "checkout -b {}", branch),
            FlowStep::Pull => write!(f, "pull"),
            FlowStep::MergeNoFF { from, into, .. } => {
                write!(f, "merge --no-ff {} into {}", from, into)
            }
            FlowStep::BumpManifests { files, version } => {
                write!(f, "set version {} in {}", version, files.join(","))
            }
            FlowStep::Commit { message, .. } => write!(f, "commit \"{}\"", message),
            FlowStep::Tag { name, .. } => write!(f, "tag -a {}", name),
            FlowStep::PushBranch(branch) => write!(f, "push branch {}", branch),
            FlowStep::PushTag(tag) => write!(f, "push tag {}", tag),
            FlowStep::DeleteBranch(branch) => write!(f, "delete branch {}", branch),
        }
    }
}

/// Branch names and switches that shape every plan
#[derive(Debug, Clone, PartialEq)]
pub struct FlowPolicy {
    pub develop: String,
    pub master: String,
    pub delete_merged_branch: bool,
    pub manifest_files: Vec<String>,
}

impl Default for FlowPolicy {
    fn default() -> Self {
        FlowPolicy {
            develop: "develop".to_string(),
            master: "master".to_string(),
            delete_merged_branch: false,
            manifest_files: PackageManager::default().manifest_files(),
        }
    }
}

impl FlowPolicy {
    pub fn from_config(config: &Config, package_manager: PackageManager) -> Self {
        FlowPolicy {
            develop: config.branches.develop.clone(),
            master: config.branches.master.clone(),
            delete_merged_branch: config.policy.delete_merged_branch,
            manifest_files: config.manifest_files(package_manager),
        }
    }
}

/// A fully planned release, ready to execute
#[derive(Debug, Clone, PartialEq)]
pub struct FlowPlan {
    pub class: BranchClass,
    pub target_branch: String,
    pub version: VersionPlan,
    pub steps: Vec<FlowStep>,
}

impl FlowPlan {
    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.steps.iter().filter_map(|step| match step {
            FlowStep::PushTag(tag) => Some(tag.as_str()),
            _ => None,
        })
    }

    pub fn pushed_branches(&self) -> impl Iterator<Item = &str> {
        self.steps.iter().filter_map(|step| match step {
            FlowStep::PushBranch(branch) => Some(branch.as_str()),
            _ => None,
        })
    }
}

/// Turns a classified target and its version plan into git-flow steps
#[derive(Debug, Clone, Default)]
pub struct FlowPlanner {
    policy: FlowPolicy,
}

impl FlowPlanner {
    pub fn new(policy: FlowPolicy) -> Self {
        FlowPlanner { policy }
    }

    pub fn policy(&self) -> &FlowPolicy {
        &self.policy
    }

    /// Build the ordered step list for a release.
    ///
    /// Every flow first checks out and pulls the target so that it starts
    /// from the remote state of that branch.
    ///
    /// # Returns
    /// * `Ok(FlowPlan)` - The steps for the branch class
    /// * `Err(InvalidBranch)` - If the class is [`BranchClass::Invalid`]
    pub fn build_plan(
        &self,
        class: BranchClass,
        version: &VersionPlan,
        target_branch: &str,
    ) -> Result<FlowPlan> {
        let mut steps = vec![FlowStep::Checkout(target_branch.to_string()), FlowStep::Pull];

        match class {
            BranchClass::Invalid => return Err(ReleaseError::invalid_branch(target_branch)),
            BranchClass::Feature | BranchClass::Bugfix => {
                steps.push(FlowStep::Checkout(self.policy.develop.clone()));
                steps.push(self.merge(target_branch, &self.policy.develop));
                steps.push(FlowStep::PushBranch(self.policy.develop.clone()));
            }
            BranchClass::Develop => {
                let release_branch = version
                    .release_branch_name
                    .clone()
                    .unwrap_or_else(|| format!("release/{}", version.next_tag_name));
                steps.push(FlowStep::CheckoutNew(release_branch.clone()));
                steps.push(FlowStep::BumpManifests {
                    files: self.policy.manifest_files.clone(),
                    version: version.next_version.to_string(),
                });
                steps.push(FlowStep::Commit {
                    files: self.policy.manifest_files.clone(),
                    message: release_branch.clone(),
                });
                steps.push(FlowStep::PushBranch(release_branch));
            }
            BranchClass::Hotfix | BranchClass::Release => {
                let develop = &self.policy.develop;
                let master = &self.policy.master;
                steps.push(FlowStep::Checkout(develop.clone()));
                steps.push(FlowStep::Pull);
                steps.push(self.merge(target_branch, develop));
                steps.push(FlowStep::Checkout(master.clone()));
                steps.push(FlowStep::Pull);
                steps.push(self.merge(target_branch, master));
                steps.push(FlowStep::Tag {
                    name: version.next_tag_name.clone(),
                    message: merge_message(target_branch, master),
                });
                steps.push(FlowStep::PushTag(version.next_tag_name.clone()));
                steps.push(FlowStep::PushBranch(develop.clone()));
                steps.push(FlowStep::PushBranch(master.clone()));
            }
        }

        if self.policy.delete_merged_branch && class != BranchClass::Develop {
            steps.push(FlowStep::DeleteBranch(target_branch.to_string()));
        }

        Ok(FlowPlan {
            class,
            target_branch: target_branch.to_string(),
            version: version.clone(),
            steps,
        })
    }

    fn merge(&self, from: &str, into: &str) -> FlowStep {
        FlowStep::MergeNoFF {
            from: from.to_string(),
            into: into.to_string(),
            message: merge_message(from, into),
        }
    }
}

fn merge_message(from: &str, into: &str) -> String {
    format!("Merge {} into {}", from, into)
}
