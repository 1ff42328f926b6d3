// tests/git_repository_test.rs
//
// Drives Git2Vcs against a throwaway working repository with a bare
// repository as its `origin` remote.
use std::fs;
use std::path::{Path, PathBuf};

use git2::{Commit, Oid, Repository};
use tempfile::TempDir;

use gitflow_release::cli::ReleaseOrchestrator;
use gitflow_release::config::Config;
use gitflow_release::domain::{ReleaseRequest, SemverLevel, RELEASE_TAG_GLOB};
use gitflow_release::git::{Git2Vcs, Vcs};
use gitflow_release::manifest::JsonManifestWriter;
use gitflow_release::ReleaseError;

const PACKAGE_JSON: &str = "{\n  \"name\": \"ext\",\n  \"version\": \"1.2.0\"\n}\n";
const PACKAGE_LOCK: &str =
    "{\n  \"name\": \"ext\",\n  \"version\": \"1.2.0\",\n  \"packages\": {\n    \"\": {\n      \"version\": \"1.2.0\"\n    }\n  }\n}\n";

struct Fixture {
    _dir: TempDir,
    work: PathBuf,
    origin: PathBuf,
}

impl Fixture {
    /// master and develop at one commit tagged v1.2.0, both pushed to origin
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let work = dir.path().join("work");
        let origin = dir.path().join("origin.git");
        Repository::init_bare(&origin)
            .unwrap()
            .set_head("refs/heads/master")
            .unwrap();

        let repo = Repository::init(&work).unwrap();
        {
            let mut config = repo.config().unwrap();
            config.set_str("user.name", "Release Bot").unwrap();
            config.set_str("user.email", "release@example.com").unwrap();
        }
        repo.set_head("refs/heads/master").unwrap();
        commit_file(&repo, "package.json", PACKAGE_JSON, "initial");
        let oid = commit_file(&repo, "package-lock.json", PACKAGE_LOCK, "lockfile");
        let commit = repo.find_commit(oid).unwrap();
        repo.branch("develop", &commit, false).unwrap();
        repo.tag_lightweight("v1.2.0", commit.as_object(), false)
            .unwrap();
        repo.remote("origin", origin.to_str().unwrap()).unwrap();

        let vcs = Git2Vcs::open(&work, "origin").unwrap();
        vcs.push_branch("master").unwrap();
        vcs.push_branch("develop").unwrap();
        vcs.push_tag("v1.2.0").unwrap();

        Fixture {
            _dir: dir,
            work,
            origin,
        }
    }

    fn repo(&self) -> Repository {
        Repository::open(&self.work).unwrap()
    }

    fn origin(&self) -> Repository {
        Repository::open_bare(&self.origin).unwrap()
    }

    fn vcs(&self) -> Git2Vcs {
        Git2Vcs::open(&self.work, "origin").unwrap()
    }

    /// Create `branch` at HEAD, switch to it and commit one file on it
    fn branch_with_commit(&self, branch: &str, file: &str, contents: &str) -> Oid {
        let repo = self.repo();
        let head = repo.head().unwrap().peel_to_commit().unwrap();
        repo.branch(branch, &head, false).unwrap();
        repo.set_head(&format!("refs/heads/{}", branch)).unwrap();
        commit_file(&repo, file, contents, &format!("work on {}", branch))
    }
}

fn commit_file(repo: &Repository, name: &str, contents: &str, message: &str) -> Oid {
    let workdir = repo.workdir().unwrap();
    fs::write(workdir.join(name), contents).unwrap();

    let mut index = repo.index().unwrap();
    index.add_path(Path::new(name)).unwrap();
    index.write().unwrap();
    let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();
    let signature = repo.signature().unwrap();

    let parents: Vec<Commit> = repo
        .head()
        .ok()
        .and_then(|head| head.peel_to_commit().ok())
        .into_iter()
        .collect();
    let parent_refs: Vec<&Commit> = parents.iter().collect();
    repo.commit(Some("HEAD"), &signature, &signature, message, &tree, &parent_refs)
        .unwrap()
}

fn file_at(repo: &Repository, refname: &str, path: &str) -> String {
    let commit = repo
        .find_reference(refname)
        .unwrap()
        .peel_to_commit()
        .unwrap();
    let entry = commit.tree().unwrap().get_path(Path::new(path)).unwrap();
    let blob = repo.find_blob(entry.id()).unwrap();
    String::from_utf8(blob.content().to_vec()).unwrap()
}

#[test]
fn test_status_and_tags_of_fresh_repo() {
    let fixture = Fixture::new();
    let vcs = fixture.vcs();

    let state = vcs.status().unwrap();
    assert_eq!(state.current_branch, "master");
    assert!(state.is_clean);
    assert_eq!(vcs.list_tags(RELEASE_TAG_GLOB).unwrap(), vec!["v1.2.0"]);
}

#[test]
fn test_untracked_file_makes_tree_dirty() {
    let fixture = Fixture::new();
    fs::write(fixture.work.join("notes.txt"), "scratch").unwrap();

    assert!(!fixture.vcs().status().unwrap().is_clean);
}

#[test]
fn test_checkout_creates_local_branch_from_remote() {
    let fixture = Fixture::new();
    let vcs = fixture.vcs();
    vcs.checkout("develop").unwrap();
    vcs.delete_branch("master").unwrap();

    vcs.fetch().unwrap();
    vcs.checkout("master").unwrap();

    assert_eq!(vcs.status().unwrap().current_branch, "master");
    let repo = fixture.repo();
    let master = repo.find_branch("master", git2::BranchType::Local).unwrap();
    assert_eq!(master.upstream().unwrap().name().unwrap(), Some("origin/master"));
}

#[test]
fn test_merge_no_ff_creates_merge_commit() {
    let fixture = Fixture::new();
    let feature_tip = fixture.branch_with_commit("feature/a", "a.txt", "a\n");
    let vcs = fixture.vcs();
    vcs.checkout("develop").unwrap();

    vcs.merge("feature/a", true, "Merge feature/a into develop")
        .unwrap();

    let repo = fixture.repo();
    let head = repo.head().unwrap().peel_to_commit().unwrap();
    assert_eq!(head.parent_count(), 2);
    assert_eq!(head.parent_id(1).unwrap(), feature_tip);
    assert_eq!(head.message(), Some("Merge feature/a into develop"));
    assert!(fixture.work.join("a.txt").exists());
}

#[test]
fn test_conflicting_merge_fails_with_command_error() {
    let fixture = Fixture::new();
    fixture.branch_with_commit("feature/a", "same.txt", "feature\n");
    let vcs = fixture.vcs();
    vcs.checkout("develop").unwrap();
    commit_file(&fixture.repo(), "same.txt", "develop\n", "conflicting");

    let err = vcs
        .merge("feature/a", true, "Merge feature/a into develop")
        .unwrap_err();

    match err {
        ReleaseError::CommandFailed { command, code, .. } => {
            assert!(command.starts_with("git merge --no-ff"));
            assert_eq!(code, 1);
        }
        other => panic!("unexpected error: {}", other),
    }
}

#[test]
fn test_pull_refuses_diverged_branch() {
    let fixture = Fixture::new();
    let vcs = fixture.vcs();

    // origin/master moves ahead through a second clone
    let dir = TempDir::new().unwrap();
    let other = Repository::clone(fixture.origin.to_str().unwrap(), dir.path()).unwrap();
    {
        let mut config = other.config().unwrap();
        config.set_str("user.name", "Someone Else").unwrap();
        config.set_str("user.email", "else@example.com").unwrap();
    }
    commit_file(&other, "remote.txt", "remote\n", "remote change");
    Git2Vcs::from_git2(other, "origin").push_branch("master").unwrap();

    commit_file(&fixture.repo(), "local.txt", "local\n", "local change");

    let err = vcs.pull().unwrap_err();
    assert_eq!(err.exit_code(), 128);
}

#[test]
fn test_hotfix_release_end_to_end() {
    let fixture = Fixture::new();
    let hotfix_tip = fixture.branch_with_commit("hotfix/crash", "fix.txt", "fixed\n");
    let vcs = fixture.vcs();
    let orchestrator = ReleaseOrchestrator::new(&vcs, &JsonManifestWriter, Config::default())
        .with_workdir(&fixture.work);

    let summary = orchestrator
        .run(&ReleaseRequest::new("hotfix/crash", None))
        .unwrap();

    assert_eq!(summary.next_tag, "v1.2.1");
    assert_eq!(summary.pushed_tags, vec!["v1.2.1"]);

    let origin = fixture.origin();
    let master = origin.refname_to_id("refs/heads/master").unwrap();
    let develop = origin.refname_to_id("refs/heads/develop").unwrap();
    assert!(origin.graph_descendant_of(master, hotfix_tip).unwrap());
    assert!(origin.graph_descendant_of(develop, hotfix_tip).unwrap());

    let tag = origin
        .find_reference("refs/tags/v1.2.1")
        .unwrap()
        .peel_to_commit()
        .unwrap();
    assert_eq!(tag.id(), master);
    assert_eq!(tag.parent_count(), 2);
}

#[test]
fn test_develop_release_end_to_end() {
    let fixture = Fixture::new();
    let vcs = fixture.vcs();
    vcs.checkout("develop").unwrap();
    let orchestrator = ReleaseOrchestrator::new(&vcs, &JsonManifestWriter, Config::default())
        .with_workdir(&fixture.work);

    orchestrator
        .run(&ReleaseRequest::new("develop", Some(SemverLevel::Minor)))
        .unwrap();

    let origin = fixture.origin();
    let package = file_at(&origin, "refs/heads/release/v1.3.0", "package.json");
    assert!(package.contains("\"version\": \"1.3.0\""));
    let lock = file_at(&origin, "refs/heads/release/v1.3.0", "package-lock.json");
    assert_eq!(lock.matches("1.3.0").count(), 2);
    assert!(origin.find_reference("refs/tags/v1.3.0").is_err());

    let release_head = origin
        .find_reference("refs/heads/release/v1.3.0")
        .unwrap()
        .peel_to_commit()
        .unwrap();
    assert_eq!(release_head.message(), Some("release/v1.3.0"));
    assert!(vcs.status().unwrap().is_clean);
}
