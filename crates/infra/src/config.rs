//! Configuration loading.
//!
//! Settings come from the environment. `from_lookup` takes any key lookup so
//! tests never touch the process environment.

use std::path::{Path, PathBuf};

use anyhow::Context;

use carbonledger_emissions::EmissionFactorTable;

/// Path to a JSON emission-factor table (list of
/// `{vehicle_mode, fuel_type, grams_per_km}` rows).
pub const FACTORS_FILE_ENV: &str = "CARBONLEDGER_FACTORS_FILE";

pub use carbonledger_observability::LOG_FILTER_ENV;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LedgerConfig {
    /// Custom factor table; the standard table is used when unset.
    pub factors_file: Option<PathBuf>,
    /// `tracing` filter directives; the environment's `RUST_LOG` (or `info`) applies when unset.
    pub log_filter: Option<String>,
}

impl LedgerConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_blank = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        Self {
            factors_file: non_blank(FACTORS_FILE_ENV).map(PathBuf::from),
            log_filter: non_blank(LOG_FILTER_ENV),
        }
    }

    /// Install the process-wide JSON logger. Returns `false` if one was already set.
    pub fn init_logging(&self) -> bool {
        match &self.log_filter {
            Some(directives) => carbonledger_observability::init_with_filter(directives),
            None => carbonledger_observability::init(),
        }
    }

    /// Build the emission-factor table this configuration selects.
    pub fn load_factors(&self) -> anyhow::Result<EmissionFactorTable> {
        match &self.factors_file {
            Some(path) => load_factor_file(path),
            None => Ok(EmissionFactorTable::standard()),
        }
    }
}

fn load_factor_file(path: &Path) -> anyhow::Result<EmissionFactorTable> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading emission factors from {}", path.display()))?;
    let table: EmissionFactorTable = serde_json::from_str(&raw)
        .with_context(|| format!("parsing emission factors in {}", path.display()))?;
    tracing::info!(
        path = %path.display(),
        factors = table.len(),
        "loaded emission factor table"
    );
    Ok(table)
}
