use std::cell::Cell;
use std::path::{Path, PathBuf};

use git2::build::CheckoutBuilder;
use git2::{
    AutotagOption, BranchType, Commit, Cred, CredentialType, FetchOptions, ObjectType, Oid,
    PushOptions, RemoteCallbacks, Repository, StatusOptions,
};
use tracing::{debug, warn};

use crate::error::{ReleaseError, Result};
use crate::git::{RepoState, Vcs};

/// Give up after this many credential attempts instead of letting libgit2 loop.
const MAX_CREDENTIAL_ATTEMPTS: usize = 4;

/// [Vcs] implementation backed by a git2 repository and one named remote
pub struct Git2Vcs {
    repo: Repository,
    remote: String,
}

impl Git2Vcs {
    /// Open or discover a git repository at `path` and release through `remote`
    pub fn open<P: AsRef<Path>>(path: P, remote: impl Into<String>) -> Result<Self> {
        let repo = Repository::discover(path)
            .map_err(|e| ReleaseError::git("git rev-parse --show-toplevel", &e))?;
        Ok(Git2Vcs {
            repo,
            remote: remote.into(),
        })
    }

    /// Create from an existing git2::Repository
    pub fn from_git2(repo: Repository, remote: impl Into<String>) -> Self {
        Git2Vcs {
            repo,
            remote: remote.into(),
        }
    }

    pub fn remote_name(&self) -> &str {
        &self.remote
    }

    /// Root of the working tree (`None` for bare repositories)
    pub fn workdir(&self) -> Option<&Path> {
        self.repo.workdir()
    }

    /// Builds remote callbacks that authenticate through SSH keys, the SSH
    /// agent or the configured credential helper.
    fn remote_callbacks(&self) -> RemoteCallbacks<'_> {
        let mut callbacks = RemoteCallbacks::new();
        let git_config = self.repo.config().ok();
        let attempts = Cell::new(0usize);

        callbacks.credentials(move |url, username_from_url, allowed_types| {
            attempts.set(attempts.get() + 1);
            if attempts.get() > MAX_CREDENTIAL_ATTEMPTS {
                return Err(git2::Error::from_str("authentication failed"));
            }
            let username = username_from_url.unwrap_or("git");

            if allowed_types.contains(CredentialType::SSH_KEY) {
                let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
                for key in ["id_ed25519", "id_rsa", "id_ecdsa"] {
                    let path = home.join(".ssh").join(key);
                    if path.exists() {
                        if let Ok(cred) = Cred::ssh_key(username, None, &path, None) {
                            return Ok(cred);
                        }
                    }
                }
                if let Ok(cred) = Cred::ssh_key_from_agent(username) {
                    return Ok(cred);
                }
            }

            if allowed_types.contains(CredentialType::USER_PASS_PLAINTEXT) {
                if let Some(config) = git_config.as_ref() {
                    if let Ok(cred) = Cred::credential_helper(config, url, username_from_url) {
                        return Ok(cred);
                    }
                }
            }

            Cred::default()
        });

        callbacks
    }

    fn push_refspec(&self, refspec: &str, command: &str) -> Result<()> {
        let mut remote = self
            .repo
            .find_remote(&self.remote)
            .map_err(|e| ReleaseError::git(command, &e))?;

        let mut callbacks = self.remote_callbacks();
        callbacks.push_update_reference(|refname, status| match status {
            Some(status) => Err(git2::Error::from_str(&format!(
                "remote rejected {}: {}",
                refname, status
            ))),
            None => Ok(()),
        });

        let mut push_options = PushOptions::new();
        push_options.remote_callbacks(callbacks);

        remote
            .push(&[refspec], Some(&mut push_options))
            .map_err(|e| ReleaseError::git(command, &e))
    }

    fn head_commit(&self, command: &str) -> Result<Commit<'_>> {
        self.repo
            .head()
            .and_then(|head| head.peel_to_commit())
            .map_err(|e| ReleaseError::git(command, &e))
    }

    /// Resolve a branch to a commit, preferring the local branch over the
    /// remote-tracking one
    fn resolve_branch(&self, branch: &str, command: &str) -> Result<Oid> {
        let local = format!("refs/heads/{}", branch);
        let tracking = format!("refs/remotes/{}/{}", self.remote, branch);
        self.repo
            .refname_to_id(&local)
            .or_else(|_| self.repo.refname_to_id(&tracking))
            .map_err(|e| ReleaseError::git(command, &e))
    }

    /// Move the working tree to `oid`, refusing to clobber local changes
    fn checkout_commit(&self, oid: Oid, command: &str) -> Result<()> {
        let git = |e: git2::Error| ReleaseError::git(command, &e);
        let object = self.repo.find_object(oid, None).map_err(git)?;
        self.repo
            .checkout_tree(&object, Some(CheckoutBuilder::new().safe()))
            .map_err(git)
    }

    fn workdir_relative(&self, file: &str) -> PathBuf {
        let path = Path::new(file);
        match self.repo.workdir() {
            Some(workdir) if path.is_absolute() => path
                .strip_prefix(workdir)
                .map(Path::to_path_buf)
                .unwrap_or_else(|_| path.to_path_buf()),
            _ => path
                .strip_prefix("./")
                .map(Path::to_path_buf)
                .unwrap_or_else(|_| path.to_path_buf()),
        }
    }
}

impl Vcs for Git2Vcs {
    fn fetch(&self) -> Result<()> {
        let command = format!("git fetch {}", self.remote);
        let mut remote = self
            .repo
            .find_remote(&self.remote)
            .map_err(|e| ReleaseError::git(&command, &e))?;

        let mut fetch_options = FetchOptions::new();
        fetch_options.remote_callbacks(self.remote_callbacks());
        fetch_options.download_tags(AutotagOption::All);

        let refspec_heads = format!("+refs/heads/*:refs/remotes/{}/*", self.remote);
        let refspecs = [refspec_heads.as_str(), "+refs/tags/*:refs/tags/*"];
        remote
            .fetch(&refspecs, Some(&mut fetch_options), None)
            .map_err(|e| ReleaseError::git(&command, &e))
    }

    fn status(&self) -> Result<RepoState> {
        let command = "git status --porcelain";
        let git = |e: git2::Error| ReleaseError::git(command, &e);

        let head = self.repo.head().map_err(git)?;
        let current_branch = head.shorthand().unwrap_or("HEAD").to_string();

        let mut options = StatusOptions::new();
        options
            .include_untracked(true)
            .include_ignored(false)
            .recurse_untracked_dirs(true);
        let statuses = self.repo.statuses(Some(&mut options)).map_err(git)?;

        Ok(RepoState {
            current_branch,
            is_clean: statuses.is_empty(),
        })
    }

    fn list_tags(&self, pattern: &str) -> Result<Vec<String>> {
        let command = format!("git tag -l '{}'", pattern);
        let names = self
            .repo
            .tag_names(Some(pattern))
            .map_err(|e| ReleaseError::git(&command, &e))?;
        Ok(names.iter().flatten().map(str::to_string).collect())
    }

    fn checkout(&self, branch: &str) -> Result<()> {
        let command = format!("git checkout {}", branch);
        let git = |e: git2::Error| ReleaseError::git(&command, &e);

        let local = match self.repo.find_branch(branch, BranchType::Local) {
            Ok(local) => local,
            Err(_) => {
                let tracking_name = format!("{}/{}", self.remote, branch);
                let tracking = self
                    .repo
                    .find_branch(&tracking_name, BranchType::Remote)
                    .map_err(git)?;
                let commit = tracking.get().peel_to_commit().map_err(git)?;
                let mut local = self.repo.branch(branch, &commit, false).map_err(git)?;
                local.set_upstream(Some(&tracking_name)).map_err(git)?;
                debug!(branch, upstream = %tracking_name, "created local branch from remote");
                local
            }
        };

        let reference = local.into_reference();
        let refname = reference
            .name()
            .ok_or_else(|| ReleaseError::command(&command, 1, "branch name is not valid UTF-8"))?
            .to_string();
        let oid = reference.peel_to_commit().map_err(git)?.id();

        self.checkout_commit(oid, &command)?;
        self.repo.set_head(&refname).map_err(git)
    }

    fn checkout_new(&self, branch: &str) -> Result<()> {
        let command = format!("git checkout -b {}", branch);
        let git = |e: git2::Error| ReleaseError::git(&command, &e);

        let head = self.head_commit(&command)?;
        self.repo.branch(branch, &head, false).map_err(git)?;
        self.repo
            .set_head(&format!("refs/heads/{}", branch))
            .map_err(git)
    }

    fn pull(&self) -> Result<()> {
        let command = "git pull";
        let git = |e: git2::Error| ReleaseError::git(command, &e);

        let head = self.repo.head().map_err(git)?;
        if !head.is_branch() {
            return Err(ReleaseError::command(command, 1, "HEAD is detached"));
        }
        let branch = head
            .shorthand()
            .ok_or_else(|| ReleaseError::command(command, 1, "branch name is not valid UTF-8"))?
            .to_string();
        let local_oid = head
            .target()
            .ok_or_else(|| ReleaseError::command(command, 1, "HEAD has no target"))?;

        self.fetch()?;

        let tracking = format!("refs/remotes/{}/{}", self.remote, branch);
        let remote_oid = match self.repo.refname_to_id(&tracking) {
            Ok(oid) => oid,
            Err(_) => {
                debug!(%branch, "no remote counterpart, nothing to pull");
                return Ok(());
            }
        };

        if local_oid == remote_oid || self.repo.graph_descendant_of(local_oid, remote_oid).map_err(git)? {
            return Ok(());
        }
        if !self.repo.graph_descendant_of(remote_oid, local_oid).map_err(git)? {
            return Err(ReleaseError::command(
                command,
                128,
                format!(
                    "Not possible to fast-forward {} to {}/{}, aborting.",
                    branch, self.remote, branch
                ),
            ));
        }

        self.checkout_commit(remote_oid, command)?;
        let mut reference = self
            .repo
            .find_reference(&format!("refs/heads/{}", branch))
            .map_err(git)?;
        reference
            .set_target(remote_oid, &format!("pull: fast-forward from {}", tracking))
            .map_err(git)?;
        Ok(())
    }

    fn merge(&self, branch: &str, no_fast_forward: bool, message: &str) -> Result<()> {
        let command = if no_fast_forward {
            format!("git merge --no-ff -m \"{}\" {}", message, branch)
        } else {
            format!("git merge -m \"{}\" {}", message, branch)
        };
        let git = |e: git2::Error| ReleaseError::git(&command, &e);

        let ours = self.head_commit(&command)?;
        let their_oid = self.resolve_branch(branch, &command)?;
        let theirs = self.repo.find_commit(their_oid).map_err(git)?;

        if ours.id() == their_oid || self.repo.graph_descendant_of(ours.id(), their_oid).map_err(git)? {
            debug!(branch, "already up to date");
            return Ok(());
        }

        if !no_fast_forward && self.repo.graph_descendant_of(their_oid, ours.id()).map_err(git)? {
            self.checkout_commit(their_oid, &command)?;
            let mut head = self.repo.head().map_err(git)?;
            head.set_target(their_oid, &format!("merge {}: Fast-forward", branch))
                .map_err(git)?;
            return Ok(());
        }

        let mut index = self.repo.merge_commits(&ours, &theirs, None).map_err(git)?;
        if index.has_conflicts() {
            return Err(ReleaseError::command(
                &command,
                1,
                "Automatic merge failed; fix conflicts and then commit the result.",
            ));
        }
        let tree_oid = index.write_tree_to(&self.repo).map_err(git)?;
        let tree = self.repo.find_tree(tree_oid).map_err(git)?;

        // Update the working tree before HEAD moves so the checkout baseline is the old tree.
        self.repo
            .checkout_tree(tree.as_object(), Some(CheckoutBuilder::new().safe()))
            .map_err(git)?;

        let signature = self.repo.signature().map_err(git)?;
        self.repo
            .commit(
                Some("HEAD"),
                &signature,
                &signature,
                message,
                &tree,
                &[&ours, &theirs],
            )
            .map_err(git)?;
        Ok(())
    }

    fn commit(&self, files: &[String], message: &str) -> Result<()> {
        let command = format!("git add {} && git commit -m \"{}\"", files.join(" "), message);
        let git = |e: git2::Error| ReleaseError::git(&command, &e);

        let mut index = self.repo.index().map_err(git)?;
        for file in files {
            index.add_path(&self.workdir_relative(file)).map_err(git)?;
        }
        index.write().map_err(git)?;
        let tree_oid = index.write_tree().map_err(git)?;
        let tree = self.repo.find_tree(tree_oid).map_err(git)?;

        let parent = self.head_commit(&command)?;
        let signature = self.repo.signature().map_err(git)?;
        self.repo
            .commit(Some("HEAD"), &signature, &signature, message, &tree, &[&parent])
            .map_err(git)?;
        Ok(())
    }

    fn tag(&self, name: &str, message: &str) -> Result<()> {
        let command = format!("git tag -a {} -m \"{}\"", name, message);
        let git = |e: git2::Error| ReleaseError::git(&command, &e);

        let target = self
            .repo
            .head()
            .and_then(|head| head.peel(ObjectType::Commit))
            .map_err(git)?;
        let signature = self.repo.signature().map_err(git)?;
        self.repo
            .tag(name, &target, &signature, message, false)
            .map_err(git)?;
        Ok(())
    }

    fn push_branch(&self, branch: &str) -> Result<()> {
        let command = format!("git push {} {}:{}", self.remote, branch, branch);
        self.push_refspec(&format!("refs/heads/{0}:refs/heads/{0}", branch), &command)?;

        if let Ok(mut local) = self.repo.find_branch(branch, BranchType::Local) {
            if local.upstream().is_err() {
                let upstream = format!("{}/{}", self.remote, branch);
                if let Err(e) = local.set_upstream(Some(&upstream)) {
                    warn!(branch, %upstream, "could not set upstream: {}", e.message());
                }
            }
        }
        Ok(())
    }

    fn push_tag(&self, tag: &str) -> Result<()> {
        let command = format!("git push {} {}", self.remote, tag);
        self.push_refspec(&format!("refs/tags/{0}:refs/tags/{0}", tag), &command)
    }

    fn delete_branch(&self, branch: &str) -> Result<()> {
        let command = format!("git branch -d {}", branch);
        let git = |e: git2::Error| ReleaseError::git(&command, &e);
        let mut local = self
            .repo
            .find_branch(branch, BranchType::Local)
            .map_err(git)?;
        local.delete().map_err(git)
    }
}
