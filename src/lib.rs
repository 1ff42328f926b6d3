pub mod boundary;
pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod git;
pub mod logging;
pub mod manifest;
pub mod planner;
pub mod publish;
pub mod ui;

pub use error::{ReleaseError, Result};
