//! Append-only event store boundary.
//!
//! Every accepted trip is persisted as an event in its account's stream before
//! the in-memory ledger state changes, so the ledger can always be rebuilt.

pub mod in_memory;
pub mod r#trait;

pub use in_memory::InMemoryEventStore;
pub use r#trait::{EventStore, EventStoreError, StoredEvent, UncommittedEvent};
