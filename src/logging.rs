//! Tracing subscriber setup for the command-line binary

use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is not set
pub fn default_filter(debug: bool) -> &'static str {
    if debug {
        "xlpivot=debug"
    } else {
        "xlpivot=info"
    }
}

/// Install the global subscriber. `RUST_LOG` wins over `debug`.
///
/// Logs go to stderr so that `evaluate --json` output stays parseable.
pub fn init(debug: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter(debug).into());

    // A second init (e.g. from tests) is not an error worth surfacing
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
