//! User interface module.
//!
//! Everything the binaries print for a human goes through here; diagnostics
//! go through `tracing` instead.

pub mod formatter;

pub use formatter::{
    display_error, display_plan, display_publish_report, display_status, display_success,
    display_summary, display_warning, format_plan, format_release_banner, format_summary,
};
