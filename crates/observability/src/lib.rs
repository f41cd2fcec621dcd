//! Tracing/logging setup shared by every process embedding the ledger.

/// Initialize process-wide observability (tracing/logging).
///
/// This is safe to call multiple times; subsequent calls become no-ops and
/// return `false`.
pub fn init() -> bool {
    tracing::init()
}

/// Tracing configuration (filters, layers).
pub mod tracing;

pub use crate::tracing::{LOG_FILTER_ENV, init_with_filter};
