use std::env;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;

use gitflow_release::config;
use gitflow_release::git::Git2Vcs;
use gitflow_release::logging;
use gitflow_release::manifest::{read_version, JsonManifestWriter};
use gitflow_release::publish::{
    build_dir_in, resolve_branch, ChromeWebStore, PackagePublisher, PublishRequest,
    StoreCredentials, ZipCommand,
};
use gitflow_release::ui;
use gitflow_release::ReleaseError;

#[derive(clap::Parser)]
#[command(
    name = "publish-extension",
    about = "Zip a browser-extension build and publish it to the Chrome Web Store",
    long_about = "Zip a browser-extension build and publish it to the Chrome Web Store.\n\n\
Requires the `zip` command on PATH. Credentials are read from the environment."
)]
struct Args {
    #[arg(short, long, help = "Extension build directory (default from config, then 'build')")]
    build_dir: Option<String>,

    #[arg(long = "version", help = "Version to publish (default: version in package.json)")]
    release_version: Option<String>,

    #[arg(short, long, help = "Custom configuration file path")]
    config: Option<String>,

    #[arg(short, long, action = clap::ArgAction::Count, help = "More logging (-vv for trace)")]
    verbose: u8,

    #[arg(short, long, help = "Only log warnings and errors")]
    quiet: bool,
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
    let config = config::load_config(args.config.as_deref())?;

    let vcs = Git2Vcs::open(".", config.remote.clone()).context("Not inside a git repository")?;
    let workdir = vcs
        .workdir()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));

    let store = ChromeWebStore::new()?;
    let publisher = PackagePublisher::new(&store, &ZipCommand, &JsonManifestWriter)
        .with_master(config.branches.master.clone())
        .with_output_dir(workdir.clone());

    let branch = resolve_branch(env::var(&config.publish.ci_branch_env).ok(), &vcs)?;
    publisher.check_branch(&branch)?;
    let credentials = StoreCredentials::from_env(&config.publish)?;

    let version = match args.release_version {
        Some(version) => version,
        None => read_version(&workdir.join("package.json"))
            .context("No --version given and package.json has no usable version")?,
    };
    let build_dir = build_dir_in(
        &workdir,
        args.build_dir.as_deref().unwrap_or(&config.publish.build_dir),
    );

    ui::display_status(&format!(
        "Publishing v{} from {}",
        version,
        display_relative(&build_dir, &workdir)
    ));
    let report = publisher.publish(
        &PublishRequest {
            branch,
            build_dir,
            version,
        },
        &credentials,
    )?;
    ui::display_publish_report(&report);
    Ok(())
}

fn display_relative(path: &Path, base: &Path) -> String {
    path.strip_prefix(base)
        .unwrap_or(path)
        .display()
        .to_string()
}
