//! Domain logic - pure release rules independent of git operations

pub mod branch;
pub mod request;
pub mod tag;
pub mod version;

pub use branch::BranchClass;
pub use request::{PackageManager, ReleaseRequest};
pub use tag::{format_tag, latest_release_tag, parse_tag, RELEASE_TAG_GLOB};
pub use version::{increment, SemverLevel};
