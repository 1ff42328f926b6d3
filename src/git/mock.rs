use std::cell::RefCell;

use crate::error::{ReleaseError, Result};
use crate::git::{RepoState, Vcs};

/// One recorded call against a [MockVcs]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VcsCall {
    Fetch,
    Status,
    ListTags(String),
    Checkout(String),
    CheckoutNew(String),
    Pull,
    Merge {
        branch: String,
        no_fast_forward: bool,
        message: String,
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

impl VcsCall {
    /// Whether the call changes the working tree, refs or the remote
    pub fn is_mutating(&self) -> bool {
        !matches!(self, VcsCall::Fetch | VcsCall::Status | VcsCall::ListTags(_))
    }
}

/// Mock VCS for testing without actual git operations
///
/// Records every call in order, tracks the current branch across checkouts
/// and fails any call that matches a registered failure.
#[derive(Debug)]
pub struct MockVcs {
    current_branch: RefCell<String>,
    is_clean: bool,
    tags: Vec<String>,
    failures: Vec<(VcsCall, i32, String)>,
    calls: RefCell<Vec<VcsCall>>,
}

impl MockVcs {
    /// Create a clean mock repository checked out on `branch`
    pub fn new(branch: impl Into<String>) -> Self {
        MockVcs {
            current_branch: RefCell::new(branch.into()),
            is_clean: true,
            tags: Vec::new(),
            failures: Vec::new(),
            calls: RefCell::new(Vec::new()),
        }
    }

    /// Mark the working tree as having uncommitted changes
    pub fn dirty(mut self) -> Self {
        self.is_clean = false;
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    /// Make `call` fail with the given exit code and stderr
    pub fn fail_on(mut self, call: VcsCall, code: i32, stderr: impl Into<String>) -> Self {
        self.failures.push((call, code, stderr.into()));
        self
    }

    /// All calls made so far, in order
    pub fn calls(&self) -> Vec<VcsCall> {
        self.calls.borrow().clone()
    }

    pub fn mutating_calls(&self) -> Vec<VcsCall> {
        self.calls
            .borrow()
            .iter()
            .filter(|call| call.is_mutating())
            .cloned()
            .collect()
    }

    pub fn current_branch(&self) -> String {
        self.current_branch.borrow().clone()
    }

    fn record(&self, call: VcsCall) -> Result<()> {
        self.calls.borrow_mut().push(call.clone());
        match self.failures.iter().find(|(failing, _, _)| *failing == call) {
            Some((_, code, stderr)) => Err(ReleaseError::command(
                format!("{:?}", call),
                *code,
                stderr.clone(),
            )),
            None => Ok(()),
        }
    }
}

impl Default for MockVcs {
    fn default() -> Self {
        Self::new("develop")
    }
}

impl Vcs for MockVcs {
    fn fetch(&self) -> Result<()> {
        self.record(VcsCall::Fetch)
    }

    fn status(&self) -> Result<RepoState> {
        self.record(VcsCall::Status)?;
        Ok(RepoState {
            current_branch: self.current_branch(),
            is_clean: self.is_clean,
        })
    }

    fn list_tags(&self, pattern: &str) -> Result<Vec<String>> {
        self.record(VcsCall::ListTags(pattern.to_string()))?;
        Ok(self.tags.clone())
    }

    fn checkout(&self, branch: &str) -> Result<()> {
        self.record(VcsCall::Checkout(branch.to_string()))?;
        *self.current_branch.borrow_mut() = branch.to_string();
        Ok(())
    }

    fn checkout_new(&self, branch: &str) -> Result<()> {
        self.record(VcsCall::CheckoutNew(branch.to_string()))?;
        *self.current_branch.borrow_mut() = branch.to_string();
        Ok(())
    }

    fn pull(&self) -> Result<()> {
        self.record(VcsCall::Pull)
    }

    fn merge(&self, branch: &str, no_fast_forward: bool, message: &str) -> Result<()> {
        self.record(VcsCall::Merge {
            branch: branch.to_string(),
            no_fast_forward,
            message: message.to_string(),
        })
    }

    fn commit(&self, files: &[String], message: &str) -> Result<()> {
        self.record(VcsCall::Commit {
            files: files.to_vec(),
            message: message.to_string(),
        })
    }

    fn tag(&self, name: &str, message: &str) -> Result<()> {
        self.record(VcsCall::Tag {
            name: name.to_string(),
            message: message.to_string(),
        })
    }

    fn push_branch(&self, branch: &str) -> Result<()> {
        self.record(VcsCall::PushBranch(branch.to_string()))
    }

    fn push_tag(&self, tag: &str) -> Result<()> {
        self.record(VcsCall::PushTag(tag.to_string()))
    }

    fn delete_branch(&self, branch: &str) -> Result<()> {
        self.record(VcsCall::DeleteBranch(branch.to_string()))
    }
}
