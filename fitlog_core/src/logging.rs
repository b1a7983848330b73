//! Tracing subscriber for the fitlog binaries.
//!
//! Everything goes to stderr; stdout belongs to command output.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Quiet by default: only problems are worth a line
const QUIET: &str = "warn";
/// Storage and service detail from our own crates, warnings from the rest
const VERBOSE: &str = "warn,fitlog_core=debug,fitlog=debug";

/// Filter for a run; RUST_LOG wins over the `--verbose` choice
pub fn filter(verbose: bool) -> EnvFilter {
    let default = if verbose { VERBOSE } else { QUIET };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

/// Install the global subscriber. Call once, after argument parsing.
pub fn init(verbose: bool) {
    tracing_subscriber::registry()
        .with(filter(verbose))
        .with(
            fmt::layer()
                .compact()
                .without_time()
                .with_writer(std::io::stderr),
        )
        .init();
}

#[cfg(test)]
pub fn init_test() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter(EnvFilter::new("debug"))
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbose_enables_debug_for_own_crates() {
        std::env::remove_var("RUST_LOG");
        let verbose = filter(true).to_string();
        assert!(verbose.contains("fitlog_core=debug"));
        assert_eq!(filter(false).to_string(), "warn");
    }
}
