//! Logging setup for test binaries.

use tracing_subscriber::EnvFilter;

/// Install a `tracing` subscriber writing through the test harness's
/// captured output. Honors `RUST_LOG`, defaulting to `warn`.
///
/// Safe to call from every test; only the first call installs anything.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}
