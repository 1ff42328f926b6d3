//! Release workflow orchestration
//!
//! Drives one release from a [ReleaseRequest] to pushed refs:
//! classify, validate, fetch, check the tree, find the latest tag, plan,
//! then execute the plan step by step against a [Vcs].
//!
//! Execution stops at the first failing step. Nothing is rolled back:
//! branches and tags already pushed stay on the remote, and the checkout may
//! be left on an intermediate branch for the operator to sort out.

use std::path::{Path, PathBuf};

use tracing::{error, info, warn};

use crate::boundary::ReleaseWarning;
use crate::config::Config;
use crate::domain::{latest_release_tag, BranchClass, ReleaseRequest, RELEASE_TAG_GLOB};
use crate::error::{ReleaseError, Result};
use crate::git::Vcs;
use crate::manifest::ManifestWriter;
use crate::planner::{FlowPlan, FlowPlanner, FlowPolicy, FlowStep, VersionPlanner};

/// Outcome of a release run
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub class: BranchClass,
    pub target_branch: String,
    pub previous_tag: String,
    pub next_tag: String,
    pub release_branch: Option<String>,
    pub steps_executed: usize,
    pub pushed_branches: Vec<String>,
    pub pushed_tags: Vec<String>,
    pub warnings: Vec<ReleaseWarning>,
    pub dry_run: bool,
}

/// Runs release flows against an injected VCS and manifest writer
pub struct ReleaseOrchestrator<'a, V: Vcs, M: ManifestWriter> {
    vcs: &'a V,
    manifests: &'a M,
    config: Config,
    workdir: PathBuf,
    dry_run: bool,
}

impl<'a, V: Vcs, M: ManifestWriter> ReleaseOrchestrator<'a, V, M> {
    pub fn new(vcs: &'a V, manifests: &'a M, config: Config) -> Self {
        ReleaseOrchestrator {
            vcs,
            manifests,
            config,
            workdir: PathBuf::from("."),
            dry_run: false,
        }
    }

    /// Directory manifest paths are resolved against (defaults to the current one)
    pub fn with_workdir(mut self, workdir: impl Into<PathBuf>) -> Self {
        self.workdir = workdir.into();
        self
    }

    /// Plan and report without running any mutating step
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Full pipeline: prepare the plan, then execute it.
    pub fn run(&self, request: &ReleaseRequest) -> Result<Summary> {
        let plan = self.prepare(request)?;
        self.execute(&plan)
    }

    /// Validate the request and compute the release plan.
    ///
    /// Branch and level validation happen before the VCS is touched. Then the
    /// remote is fetched, the tree checked and the latest release tag resolved.
    pub fn prepare(&self, request: &ReleaseRequest) -> Result<FlowPlan> {
        let class = request.class();
        if !class.is_valid() {
            return Err(ReleaseError::invalid_branch(&request.target_branch));
        }

        let version_planner = VersionPlanner::new(&self.config.policy);
        version_planner.effective_level(class, request.requested_level)?;

        info!("Fetching from {}.", self.config.remote);
        self.vcs.fetch()?;

        info!("Checking if tree is clean.");
        let state = self.vcs.status()?;
        if !state.is_clean {
            return Err(ReleaseError::DirtyTree);
        }

        info!("Looking for latest tag.");
        let tags = self.vcs.list_tags(RELEASE_TAG_GLOB)?;
        let latest = latest_release_tag(&tags);

        let mut version = version_planner.plan(
            class,
            request.requested_level,
            latest.as_ref().map(|(tag, _)| tag.as_str()),
        )?;
        if class == BranchClass::Release {
            if let Some(warning) =
                VersionPlanner::check_release_branch(&request.target_branch, &version)
            {
                version.warnings.push(warning);
            }
        }

        let flow_planner = FlowPlanner::new(FlowPolicy::from_config(
            &self.config,
            request.package_manager,
        ));
        let plan = flow_planner.build_plan(class, &version, &request.target_branch)?;

        info!(
            branch = %request.target_branch,
            current = %state.current_branch,
            class = %class,
            "{} release: {} -> {}",
            version.effective_level,
            version.latest_tag,
            version.next_tag_name
        );
        Ok(plan)
    }

    /// Execute a plan, stopping at the first failing step.
    ///
    /// The working tree must be clean; otherwise [ReleaseError::DirtyTree] is
    /// returned before any step runs. In dry-run mode only that check runs.
    pub fn execute(&self, plan: &FlowPlan) -> Result<Summary> {
        let state = self.vcs.status()?;
        if !state.is_clean {
            return Err(ReleaseError::DirtyTree);
        }

        let mut summary = Summary {
            class: plan.class,
            target_branch: plan.target_branch.clone(),
            previous_tag: plan.version.latest_tag.clone(),
            next_tag: plan.version.next_tag_name.clone(),
            release_branch: plan.version.release_branch_name.clone(),
            steps_executed: 0,
            pushed_branches: Vec::new(),
            pushed_tags: Vec::new(),
            warnings: plan.version.warnings.clone(),
            dry_run: self.dry_run,
        };

        if self.dry_run {
            for (index, step) in plan.steps.iter().enumerate() {
                info!(step = index + 1, "would run: {}", step);
            }
            return Ok(summary);
        }

        for (index, step) in plan.steps.iter().enumerate() {
            let number = index + 1;
            info!(step = number, total = plan.steps.len(), "{}", step);

            if let Err(source) = self.apply(step) {
                error!(step = number, "{} failed: {}", step, source);
                if !summary.pushed_branches.is_empty() || !summary.pushed_tags.is_empty() {
                    warn!(
                        branches = ?summary.pushed_branches,
                        tags = ?summary.pushed_tags,
                        "already pushed to {}; nothing is rolled back",
                        self.config.remote
                    );
                }
                return Err(ReleaseError::StepFailed {
                    index: number,
                    step: step.to_string(),
                    source: Box::new(source),
                });
            }

            match step {
                FlowStep::PushBranch(branch) => summary.pushed_branches.push(branch.clone()),
                FlowStep::PushTag(tag) => summary.pushed_tags.push(tag.clone()),
                _ => {}
            }
            summary.steps_executed = number;
            info!(step = number, "done: {}", step);
        }

        info!("Done.");
        Ok(summary)
    }

    fn apply(&self, step: &FlowStep) -> Result<()> {
        match step {
            FlowStep::Checkout(branch) => self.vcs.checkout(branch),
            FlowStep::CheckoutNew(branch) => self.vcs.checkout_new(branch),
            FlowStep::Pull => self.vcs.pull(),
            FlowStep::MergeNoFF { from, message, .. } => self.vcs.merge(from, true, message),
            FlowStep::BumpManifests { files, version } => {
                info!("Updating versions in {}", files.join(","));
                for file in files {
                    self.manifests
                        .set_version(&self.manifest_path(file), version)?;
                }
                Ok(())
            }
            FlowStep::Commit { files, message } => self.vcs.commit(files, message),
            FlowStep::Tag { name, message } => self.vcs.tag(name, message),
            FlowStep::PushBranch(branch) => self.vcs.push_branch(branch),
            FlowStep::PushTag(tag) => self.vcs.push_tag(tag),
            FlowStep::DeleteBranch(branch) => self.vcs.delete_branch(branch),
        }
    }

    fn manifest_path(&self, file: &str) -> PathBuf {
        let path = Path::new(file);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.workdir.join(path)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SemverLevel;
    use crate::git::{MockVcs, VcsCall};
    use std::cell::RefCell;

    #[derive(Default)]
    struct RecordingWriter {
        writes: RefCell<Vec<(PathBuf, String)>>,
    }

    impl ManifestWriter for RecordingWriter {
        fn set_version(&self, path: &Path, version: &str) -> Result<()> {
            self.writes
                .borrow_mut()
                .push((path.to_path_buf(), version.to_string()));
            Ok(())
        }
    }

    #[test]
    fn test_invalid_branch_stops_before_vcs() {
        let vcs = MockVcs::default();
        let writer = RecordingWriter::default();
        let orchestrator = ReleaseOrchestrator::new(&vcs, &writer, Config::default());

        let err = orchestrator
            .run(&ReleaseRequest::new("main", Some(SemverLevel::Minor)))
            .unwrap_err();

        assert!(matches!(err, ReleaseError::InvalidBranch(ref b) if b == "main"));
        assert!(vcs.calls().is_empty());
    }

    #[test]
    fn test_missing_level_stops_before_vcs() {
        let vcs = MockVcs::default();
        let writer = RecordingWriter::default();
        let orchestrator = ReleaseOrchestrator::new(&vcs, &writer, Config::default());

        let err = orchestrator
            .run(&ReleaseRequest::new("develop", None))
            .unwrap_err();

        assert!(matches!(err, ReleaseError::InvalidLevel(_)));
        assert!(vcs.calls().is_empty());
    }

    #[test]
    fn test_manifest_paths_resolve_against_workdir() {
        let vcs = MockVcs::new("develop").with_tags(["v1.2.0"]);
        let writer = RecordingWriter::default();
        let orchestrator = ReleaseOrchestrator::new(&vcs, &writer, Config::default())
            .with_workdir("/srv/ext");

        orchestrator
            .run(&ReleaseRequest::new("develop", Some(SemverLevel::Minor)))
            .unwrap();

        assert_eq!(
            writer.writes.borrow().clone(),
            vec![
                (PathBuf::from("/srv/ext/package.json"), "1.3.0".to_string()),
                (PathBuf::from("/srv/ext/package-lock.json"), "1.3.0".to_string()),
            ]
        );
    }

    #[test]
    fn test_manifest_failure_is_reported_as_step() {
        struct FailingWriter;
        impl ManifestWriter for FailingWriter {
            fn set_version(&self, _path: &Path, _version: &str) -> Result<()> {
                Err(ReleaseError::manifest("package-lock.json not found"))
            }
        }

        let vcs = MockVcs::new("develop").with_tags(["v1.2.0"]);
        let orchestrator = ReleaseOrchestrator::new(&vcs, &FailingWriter, Config::default());
        let err = orchestrator
            .run(&ReleaseRequest::new("develop", Some(SemverLevel::Major)))
            .unwrap_err();

        match err {
            ReleaseError::StepFailed { index, source, .. } => {
                assert_eq!(index, 4);
                assert!(matches!(*source, ReleaseError::Manifest(_)));
            }
            other => panic!("unexpected error: {}", other),
        }
        assert!(!vcs
            .calls()
            .iter()
            .any(|c| matches!(c, VcsCall::Commit { .. } | VcsCall::PushBranch(_))));
    }
}
