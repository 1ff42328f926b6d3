//! Command-line plumbing shared by the binaries

pub mod orchestration;

pub use orchestration::{ReleaseOrchestrator, Summary};
