//! Version control abstraction layer
//!
//! The release flow never talks to git directly. It drives the [Vcs] trait,
//! which has two implementations:
//!
//! - [repository::Git2Vcs]: the real thing, backed by the `git2` crate
//! - [mock::MockVcs]: an in-memory recorder used by tests and dry runs
//!
//! Every method maps to one git command the release scripts used to shell
//! out to, and every failure comes back as [crate::error::ReleaseError::CommandFailed]
//! naming that command.

pub mod mock;
pub mod repository;

pub use mock::{MockVcs, VcsCall};
pub use repository::Git2Vcs;

use crate::error::Result;

/// Working tree state read before a release starts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoState {
    pub current_branch: String,
    /// No staged, unstaged or untracked changes
    pub is_clean: bool,
}

/// Git operations a release needs.
///
/// Calls block until the operation finishes. Implementations are not
/// expected to be shared between threads: one release owns one checkout.
pub trait Vcs {
    /// `git fetch` branches and tags from the configured remote
    fn fetch(&self) -> Result<()>;

    /// Current branch and whether the tree is clean
    fn status(&self) -> Result<RepoState>;

    /// Tag names matching a glob (e.g., `v*.*.*`)
    fn list_tags(&self, pattern: &str) -> Result<Vec<String>>;

    /// Switch to an existing branch, creating it from the remote-tracking
    /// branch when only the remote has it
    fn checkout(&self, branch: &str) -> Result<()>;

    /// Create a branch at HEAD and switch to it
    fn checkout_new(&self, branch: &str) -> Result<()>;

    /// Fast-forward the current branch to its remote counterpart
    fn pull(&self) -> Result<()>;

    /// Merge `branch` into the current branch
    fn merge(&self, branch: &str, no_fast_forward: bool, message: &str) -> Result<()>;

    /// Stage the given paths and commit them
    fn commit(&self, files: &[String], message: &str) -> Result<()>;

    /// Create an annotated tag at HEAD
    fn tag(&self, name: &str, message: &str) -> Result<()>;

    fn push_branch(&self, branch: &str) -> Result<()>;

    fn push_tag(&self, tag: &str) -> Result<()>;

    /// Delete a local branch
    fn delete_branch(&self, branch: &str) -> Result<()>;
}
