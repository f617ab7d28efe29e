//! Tracing/logging initialization.

use tracing_subscriber::EnvFilter;

/// Default filter when `RUST_LOG` is unset. Authorization denials are logged
/// at `warn` by the service layer, so `info` keeps them visible.
const DEFAULT_DIRECTIVES: &str = "info";

/// Install the process-wide subscriber: JSON lines, `RUST_LOG`-filtered.
///
/// Safe to call multiple times (subsequent calls are no-ops), which lets
/// every integration test call it without coordination.
pub fn init() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .json()
        .with_target(false)
        .try_init();
}
