//! Tracing/logging initialization.

use tracing_subscriber::EnvFilter;

/// Filter directives read before falling back to `RUST_LOG`.
pub const LOG_FILTER_ENV: &str = "CARBONLEDGER_LOG";

const DEFAULT_FILTER: &str = "info";

/// Initialize tracing/logging for the process.
///
/// Filter precedence: `CARBONLEDGER_LOG`, then `RUST_LOG`, then `info`.
/// Returns whether this call installed the subscriber.
pub fn init() -> bool {
    let filter = EnvFilter::try_from_env(LOG_FILTER_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    install(filter)
}

/// Initialize tracing with explicit filter directives (e.g. `"carbonledger_infra=debug"`).
///
/// Invalid directives fall back to `info`.
pub fn init_with_filter(directives: &str) -> bool {
    let filter = EnvFilter::try_new(directives).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    install(filter)
}

fn install(filter: EnvFilter) -> bool {
    // JSON logs + timestamps.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .json()
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .with_target(true)
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_initialization_is_a_no_op() {
        // Only one global subscriber per test binary; whichever call wins, the
        // next one must report that nothing was installed.
        let _ = init_with_filter("not a valid [filter");
        assert!(!init());
        assert!(!init_with_filter("debug"));
        ::tracing::info!(component = "observability", "logging after init");
    }
}
