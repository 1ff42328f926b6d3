//! Tracing setup shared by both binaries.
//!
//! `LOG_LEVEL` holds an `EnvFilter` directive (e.g. `debug` or
//! `gitflow_release=trace`). `-v`/`-q` on the command line win over it.

use std::env;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

pub const LOG_LEVEL_ENV: &str = "LOG_LEVEL";

const DEFAULT_DIRECTIVE: &str = "info";

/// Pick the filter directive from the command line flags and the environment.
pub fn filter_directive(verbose: u8, quiet: bool, env_value: Option<&str>) -> String {
    if quiet {
        return "warn".to_string();
    }
    match verbose {
        0 => env_value
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .unwrap_or(DEFAULT_DIRECTIVE)
            .to_string(),
        1 => "debug".to_string(),
        _ => "trace".to_string(),
    }
}

/// Install the global subscriber. Later calls are ignored.
pub fn init(verbose: u8, quiet: bool) {
    let env_value = env::var(LOG_LEVEL_ENV).ok();
    let directive = filter_directive(verbose, quiet, env_value.as_deref());
    let filter = EnvFilter::try_new(&directive).unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .try_init()
        .ok();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_info() {
        assert_eq!(filter_directive(0, false, None), "info");
        assert_eq!(filter_directive(0, false, Some("  ")), "info");
    }

    #[test]
    fn test_env_value_used_without_flags() {
        assert_eq!(filter_directive(0, false, Some("debug")), "debug");
    }

    #[test]
    fn test_flags_override_env() {
        assert_eq!(filter_directive(1, false, Some("error")), "debug");
        assert_eq!(filter_directive(3, false, None), "trace");
        assert_eq!(filter_directive(2, true, Some("trace")), "warn");
    }
}
