//! Tracing subscriber setup for the `catalog` binary.
//!
//! Logs go to stderr so command output on stdout stays pipeable. The level
//! comes from `RUST_LOG` and defaults to `info`.

use tracing_subscriber::EnvFilter;

/// Install the global subscriber. Calling it twice is harmless.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
