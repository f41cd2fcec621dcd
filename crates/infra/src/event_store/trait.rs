use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;

use carbonledger_core::{AccountId, EventId, ExpectedVersion};
use carbonledger_events::EventEnvelope;
use std::sync::Arc;

/// An event ready to be appended to an account stream (no sequence number yet).
///
/// Built from a typed domain event with `UncommittedEvent::from_typed()`, which
/// serializes the payload to JSON and captures the metadata needed to decode it
/// again (event type, schema version, business time).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UncommittedEvent {
    pub event_id: EventId,
    pub account_id: AccountId,
    pub stream_type: String,

    pub event_type: String,
    pub event_version: u32,
    pub occurred_at: DateTime<Utc>,

    pub payload: JsonValue,
}

/// A persisted event with its position in the account stream.
///
/// Sequence numbers start at 1, increase by exactly 1 per event and never
/// change once assigned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredEvent {
    pub event_id: EventId,
    pub account_id: AccountId,
    pub stream_type: String,

    /// Monotonically increasing position in the account stream.
    pub sequence_number: u64,

    pub event_type: String,
    pub event_version: u32,
    pub occurred_at: DateTime<Utc>,

    pub payload: JsonValue,
}

impl StoredEvent {
    pub fn stream_version(&self) -> u64 {
        self.sequence_number
    }

    /// Untyped envelope view of this event.
    pub fn to_envelope(&self) -> EventEnvelope<JsonValue> {
        EventEnvelope::new(
            self.event_id,
            self.account_id,
            self.stream_type.clone(),
            self.sequence_number,
            self.payload.clone(),
        )
    }

    /// Decode the JSON payload back into a typed domain event.
    pub fn decode<E>(&self) -> Result<EventEnvelope<E>, EventStoreError>
    where
        E: DeserializeOwned,
    {
        let payload = serde_json::from_value(self.payload.clone()).map_err(|e| {
            EventStoreError::Decode(format!(
                "{} #{} ({}): {e}",
                self.account_id, self.sequence_number, self.event_type
            ))
        })?;
        Ok(self.to_envelope().map(|_| payload))
    }
}

/// Event store operation error.
///
/// These are storage failures (concurrency, stream mixing, decoding) as opposed
/// to domain errors (validation, lookups).
#[derive(Debug, Error)]
pub enum EventStoreError {
    #[error("optimistic concurrency check failed: {0}")]
    Concurrency(String),

    #[error("stream type mismatch: {0}")]
    StreamTypeMismatch(String),

    #[error("invalid append: {0}")]
    InvalidAppend(String),

    #[error("payload decode failed: {0}")]
    Decode(String),

    #[error("event store lock poisoned")]
    Poisoned,
}

/// Append-only event store, one stream per account.
///
/// `append()`:
/// - requires every event in the batch to target the same account and stream type
/// - checks `expected_version` against the current stream version
/// - assigns sequence numbers starting at `current_version + 1`
/// - persists the batch atomically (all or nothing)
///
/// `load_stream()` returns events in sequence order, or an empty vector for an
/// account that has no stream yet.
pub trait EventStore: Send + Sync {
    fn append(
        &self,
        events: Vec<UncommittedEvent>,
        expected_version: ExpectedVersion,
    ) -> Result<Vec<StoredEvent>, EventStoreError>;

    fn load_stream(&self, account_id: AccountId) -> Result<Vec<StoredEvent>, EventStoreError>;

    /// Every account that has at least one stored event.
    fn streams(&self) -> Result<Vec<AccountId>, EventStoreError>;
}

impl<S> EventStore for Arc<S>
where
    S: EventStore + ?Sized,
{
    fn append(
        &self,
        events: Vec<UncommittedEvent>,
        expected_version: ExpectedVersion,
    ) -> Result<Vec<StoredEvent>, EventStoreError> {
        (**self).append(events, expected_version)
    }

    fn load_stream(&self, account_id: AccountId) -> Result<Vec<StoredEvent>, EventStoreError> {
        (**self).load_stream(account_id)
    }

    fn streams(&self) -> Result<Vec<AccountId>, EventStoreError> {
        (**self).streams()
    }
}

impl UncommittedEvent {
    /// Convenience constructor from a typed domain event.
    pub fn from_typed<E>(
        account_id: AccountId,
        stream_type: impl Into<String>,
        event_id: EventId,
        event: &E,
    ) -> Result<Self, EventStoreError>
    where
        E: carbonledger_events::Event + Serialize,
    {
        let payload = serde_json::to_value(event).map_err(|e| {
            EventStoreError::InvalidAppend(format!("payload serialization failed: {e}"))
        })?;

        Ok(Self {
            event_id,
            account_id,
            stream_type: stream_type.into(),
            event_type: event.event_type().to_string(),
            event_version: event.version(),
            occurred_at: event.occurred_at(),
            payload,
        })
    }
}
