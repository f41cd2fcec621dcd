//! Infrastructure layer: event store, the emission ledger service, configuration.

pub mod config;
pub mod error;
pub mod event_store;
pub mod ledger;

#[cfg(test)]
mod integration_tests;

pub use config::LedgerConfig;
pub use error::LedgerError;
pub use event_store::{EventStore, EventStoreError, InMemoryEventStore, StoredEvent};
pub use ledger::{ACCOUNT_STREAM, EmissionLedger};
