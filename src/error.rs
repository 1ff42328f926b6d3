use thiserror::Error;

/// Unified error type for release and publish operations
#[derive(Error, Debug)]
pub enum ReleaseError {
    #[error("Invalid target branch '{0}': must be one of develop|hotfix/*|feature/*|bugfix/*|release/*")]
    InvalidBranch(String),

    #[error("Invalid semver level: {0}")]
    InvalidLevel(String),

    #[error("Current tree not clean. Stash or commit changes before attempting this again.")]
    DirtyTree,

    #[error("No valid release tag: {0}")]
    NoValidTag(String),

    #[error("Command '{command}' failed with exit code {code}: {stderr}")]
    CommandFailed {
        command: String,
        code: i32,
        stderr: String,
    },

    #[error("Missing credential: {0}")]
    MissingCredential(String),

    #[error("Cannot publish from non-{expected} branch: {actual}")]
    WrongBranch { expected: String, actual: String },

    #[error("Step {index} ({step}) failed: {source}")]
    StepFailed {
        index: usize,
        step: String,
        #[source]
        source: Box<ReleaseError>,
    },

    #[error("Failed to upload to store: {0}")]
    UploadFailed(String),

    #[error("Failed to publish to store: {0}")]
    PublishFailed(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Manifest error: {0}")]
    Manifest(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience type alias for Results in gitflow-release
pub type Result<T> = std::result::Result<T, ReleaseError>;

impl ReleaseError {
    pub fn invalid_branch(branch: impl Into<String>) -> Self {
        ReleaseError::InvalidBranch(branch.into())
    }

    pub fn invalid_level(msg: impl Into<String>) -> Self {
        ReleaseError::InvalidLevel(msg.into())
    }

    pub fn no_valid_tag(msg: impl Into<String>) -> Self {
        ReleaseError::NoValidTag(msg.into())
    }

    /// Create a command failure carrying the exit code and captured stderr
    pub fn command(command: impl Into<String>, code: i32, stderr: impl Into<String>) -> Self {
        ReleaseError::CommandFailed {
            command: command.into(),
            code,
            stderr: stderr.into(),
        }
    }

    /// Wrap a git2 error as a failed command
    pub fn git(command: impl Into<String>, err: &git2::Error) -> Self {
        ReleaseError::command(command, err.raw_code(), err.message())
    }

    pub fn missing_credential(name: impl Into<String>) -> Self {
        ReleaseError::MissingCredential(name.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        ReleaseError::Config(msg.into())
    }

    pub fn manifest(msg: impl Into<String>) -> Self {
        ReleaseError::Manifest(msg.into())
    }

    /// Process exit code for this error.
    ///
    /// A failed command with a positive exit code propagates it; everything else exits 1.
    pub fn exit_code(&self) -> i32 {
        match self {
            ReleaseError::CommandFailed { code, .. } if (1..=255).contains(code) => *code,
            ReleaseError::StepFailed { source, .. } => source.exit_code(),
            _ => 1,
        }
    }
}
