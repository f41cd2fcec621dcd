use serde::{Deserialize, Serialize};

use carbonledger_core::{AccountId, EventId};

/// Envelope for an event, containing stream metadata.
///
/// - **Append-only**: `sequence_number` is monotonically increasing per account stream,
///   starting at 1.
/// - `payload` is the typed (or raw JSON) event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventEnvelope<E> {
    event_id: EventId,
    account_id: AccountId,
    stream_type: String,

    /// Monotonically increasing position in the account stream.
    sequence_number: u64,

    payload: E,
}

impl<E> EventEnvelope<E> {
    pub fn new(
        event_id: EventId,
        account_id: AccountId,
        stream_type: impl Into<String>,
        sequence_number: u64,
        payload: E,
    ) -> Self {
        Self {
            event_id,
            account_id,
            stream_type: stream_type.into(),
            sequence_number,
            payload,
        }
    }

    pub fn event_id(&self) -> EventId {
        self.event_id
    }

    pub fn account_id(&self) -> AccountId {
        self.account_id
    }

    pub fn stream_type(&self) -> &str {
        &self.stream_type
    }

    pub fn sequence_number(&self) -> u64 {
        self.sequence_number
    }

    pub fn payload(&self) -> &E {
        &self.payload
    }

    pub fn into_payload(self) -> E {
        self.payload
    }

    /// Transform the payload while keeping stream metadata.
    pub fn map<F, T>(self, f: F) -> EventEnvelope<T>
    where
        F: FnOnce(E) -> T,
    {
        EventEnvelope {
            event_id: self.event_id,
            account_id: self.account_id,
            stream_type: self.stream_type,
            sequence_number: self.sequence_number,
            payload: f(self.payload),
        }
    }
}
