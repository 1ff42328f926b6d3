use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use gitflow_release::cli::ReleaseOrchestrator;
use gitflow_release::config;
use gitflow_release::domain::{BranchClass, PackageManager, ReleaseRequest, SemverLevel};
use gitflow_release::git::Git2Vcs;
use gitflow_release::logging;
use gitflow_release::manifest::JsonManifestWriter;
use gitflow_release::ui;
use gitflow_release::ReleaseError;

#[derive(clap::Parser)]
#[command(
    name = "make-release",
    version,
    about = "Cut a git-flow release: bump, merge, tag and push"
)]
struct Args {
    #[arg(short, long, help = "Branch to release from: develop, release/*, hotfix/*, feature/* or bugfix/*")]
    target_branch: String,

    #[arg(short, long, help = "Semver level to bump: major, minor or patch (ignored for hotfixes)")]
    semver_level: Option<String>,

    #[arg(short, long, value_enum, default_value = "npm", help = "Package manager whose manifests are bumped")]
    package_manager: PackageManagerArg,

    #[arg(short, long, help = "Custom configuration file path")]
    config: Option<String>,

    #[arg(long, help = "Remote to fetch from and push to (overrides config)")]
    remote: Option<String>,

    #[arg(long, help = "Print the planned steps without changing anything")]
    dry_run: bool,

    #[arg(short, long, action = clap::ArgAction::Count, help = "More logging (-vv for trace)")]
    verbose: u8,

    #[arg(short, long, help = "Only log warnings and errors")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy)]
enum PackageManagerArg {
    Npm,
    Yarn,
}

impl From<PackageManagerArg> for PackageManager {
    fn from(arg: PackageManagerArg) -> Self {
        match arg {
            PackageManagerArg::Npm => PackageManager::Npm,
            PackageManagerArg::Yarn => PackageManager::Yarn,
        }
    }
}

fn main() {
    let args = Args::parse();
    logging::init(args.verbose, args.quiet);

    if let Err(err) = run(args) {
        ui::display_error(&format!("{:#}", err));
        let code = err
            .downcast_ref::<ReleaseError>()
            .map(ReleaseError::exit_code)
            .unwrap_or(1);
        std::process::exit(code);
    }
}

fn run(args: Args) -> Result<()> {
    let class = BranchClass::classify(&args.target_branch);
    if !class.is_valid() {
        return Err(ReleaseError::invalid_branch(&args.target_branch).into());
    }
    let level = requested_level(class, args.semver_level.as_deref())?;

    let mut config = config::load_config(args.config.as_deref())?;
    if let Some(remote) = args.remote {
        config.remote = remote;
    }

    let vcs = Git2Vcs::open(".", config.remote.clone()).context("Not inside a git repository")?;
    let workdir = vcs
        .workdir()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));

    let request = ReleaseRequest::new(args.target_branch, level)
        .with_package_manager(args.package_manager.into());
    let orchestrator = ReleaseOrchestrator::new(&vcs, &JsonManifestWriter, config)
        .with_workdir(workdir)
        .with_dry_run(args.dry_run);

    let plan = orchestrator.prepare(&request)?;
    ui::display_plan(&plan);

    let summary = orchestrator.execute(&plan)?;
    ui::display_summary(&summary);
    Ok(())
}

/// Hotfixes always release as a patch, so their level is never validated.
/// A recognised level still reaches the planner, which reports it as ignored.
fn requested_level(class: BranchClass, raw: Option<&str>) -> Result<Option<SemverLevel>> {
    match raw {
        None => Ok(None),
        Some(raw) if class.forces_patch() => {
            let level = raw.parse::<SemverLevel>().ok();
            if level.is_none() {
                info!(requested = %raw, "hotfix releases are always patch; ignoring --semver-level");
            }
            Ok(level)
        }
        Some(raw) => Ok(Some(raw.parse::<SemverLevel>()?)),
    }
}
